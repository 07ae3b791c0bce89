use core::fmt::{self, Debug, Display};

/// Errors surfaced by this driver.
///
/// `E` is the transport's associated error type ([`crate::transport::Bus::Error`]).
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error<E> {
    /// A caller-supplied page/sector/block index or offset was out of
    /// range. No bytes were sent to the device.
    InvalidAddress,
    /// The transport reported a hard failure.
    Io(E),
    /// A busy-wait or command timeout elapsed. The device may still be
    /// mid-operation; the caller should wait out the worst-case timeout
    /// for the operation it attempted before retrying.
    Timeout,
    /// The JEDEC manufacturer byte returned during probing is not one this
    /// driver recognizes.
    UnknownVendor(u8),
    /// The JEDEC capacity code returned during probing is outside the
    /// supported 1–512 Mbit range.
    UnsupportedSize(u8),
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidAddress => f.write_str("address out of range"),
            Error::Io(e) => write!(f, "transport error: {:?}", e),
            Error::Timeout => f.write_str("timed out waiting for the device"),
            Error::UnknownVendor(id) => write!(f, "unrecognized JEDEC manufacturer id 0x{:02X}", id),
            Error::UnsupportedSize(code) => {
                write!(f, "unsupported JEDEC capacity code 0x{:02X}", code)
            }
        }
    }
}
