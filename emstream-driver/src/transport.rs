//! Transport adapter contract

/// Outcome of a single transmit attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// The whole buffer was accepted for transmission.
    Done,
    /// The transport cannot take data right now; retry later.
    Busy,
    /// The write failed. The caller may retry on a later attempt.
    Failed,
}

/// Transmit side of a byte-pipe transport (UART, USB-CDC).
///
/// Writes are all-or-nothing from the caller's perspective: a
/// [`TxStatus::Done`] result means every byte of `buf` was accepted in this
/// one call. Any staging the hardware needs is the driver's business.
pub trait Transport {
    /// Attempts exactly one write of the whole buffer.
    fn try_write(&mut self, buf: &[u8]) -> TxStatus;

    /// True when the link can transmit immediately, e.g. the USB device is
    /// configured and the host asserted DTR.
    fn link_ready(&self) -> bool;

    /// Maximum safe length for a single [`Transport::try_write`] call.
    ///
    /// Must be large enough for a maximum-size protocol frame.
    fn best_chunk(&self) -> usize;
}

/// Receive-direction byte consumer.
///
/// The application wiring hands a sink to the transport driver, which then
/// pushes every received chunk into it. Delivery may happen in interrupt
/// context; implementations must stay short and must not block.
pub trait ByteSink {
    fn receive(&mut self, bytes: &[u8]);
}
