//! Free-running clock capability.
//!
//! The protocol evaluates every deadline (retry, HELLO cadence, receive
//! budget, bit sampling instants) against a monotonically increasing clock
//! sampled at each call. There are no timers or interrupts; the host hands
//! the driver whatever hardware counter it has.

/// A monotonically increasing clock with microsecond and millisecond views.
///
/// Both counters wrap at `u32::MAX`; the driver only ever compares elapsed
/// durations via wrapping subtraction, so wraparound is harmless as long as
/// no single wait approaches the full counter range (~71 minutes for the
/// microsecond view).
///
/// Methods take `&mut self` so implementations backed by a hardware timer
/// peripheral can latch or page registers while reading.
pub trait Monotonic {
    /// Microseconds since an arbitrary epoch.
    fn now_micros(&mut self) -> u32;

    /// Milliseconds since an arbitrary epoch.
    fn now_millis(&mut self) -> u32;
}
