//! The external contract the core consumes: a full-duplex SPI transfer with
//! a timeout, a chip-select line, and a millisecond clock/delay source.
//!
//! None of these are implemented by this crate. A caller provides concrete
//! types that implement [`Bus`] and [`Clock`]; [`ChipSelect`] has a blanket
//! implementation over [`embedded_hal::digital::OutputPin`] so any HAL pin
//! type works out of the box.

use embedded_hal::digital::OutputPin;

/// A full-duplex SPI byte transfer with an explicit per-call timeout.
///
/// Implementations own chip-select framing is handled separately by
/// [`ChipSelect`] — a single call to [`Bus::transfer`] corresponds to one
/// SPI clock burst inside an already-asserted CS window, not a whole
/// command. On a timeout the implementation must leave the bus in a
/// consistent idle state.
pub trait Bus {
    /// The error type surfaced on a hard transport failure.
    type Error;

    /// Shifts `tx.len()` bytes out while capturing the same number of bytes
    /// into `rx`. `tx.len()` must equal `rx.len()`.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], timeout_ms: u32) -> Result<(), Self::Error>;
}

/// Chip-select control. `false` asserts (selects) the device, `true`
/// deasserts it — active-low, matching the hardware signal directly.
///
/// Must be infallible: a GPIO that can fail to toggle is not a usable
/// chip-select line for this driver.
pub trait ChipSelect {
    fn set(&mut self, deasserted: bool);
}

impl<P: OutputPin> ChipSelect for P {
    fn set(&mut self, deasserted: bool) {
        let _ = if deasserted {
            self.set_high()
        } else {
            self.set_low()
        };
    }
}

/// A free-running millisecond counter plus a cooperative delay primitive.
///
/// [`Clock::now_ms`] must be read with wraparound-safe (unsigned,
/// wrapping) subtraction by callers — this trait does not itself wrap, the
/// underlying counter is free to overflow and restart at zero.
pub trait Clock {
    /// The current value of a free-running millisecond counter.
    fn now_ms(&mut self) -> u32;

    /// Cooperatively yields for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Returns `true` once at least `timeout_ms` have elapsed since `start`,
/// using wraparound-safe unsigned subtraction so a counter overflow between
/// `start` and `now` never causes a premature or missed timeout.
pub(crate) fn elapsed_since(start: u32, now: u32, timeout_ms: u32) -> bool {
    now.wrapping_sub(start) >= timeout_ms
}
