//! Software-timed bit transport over one shared open-drain line.
//!
//! This module provides [`WirePhy`], which exchanges single bytes over a
//! line that is driven low to signal 0 and released to the pull-up to signal
//! 1, framed like an asynchronous serial byte: one start bit, 8 data bits
//! least-significant-bit first, one stop bit. It needs no UART hardware,
//! only a GPIO, a busy-wait delay, and a free-running clock.
//!
//! ## Design notes
//!
//! Because neither device has dedicated serial hardware, received bits are
//! sampled near the middle of each bit period to tolerate clock drift and
//! propagation delay. Two guards make the shared line robust:
//!
//! - **Idle detection** before transmitting: the line must have been
//!   continuously high for three bit periods, so a transmission never starts
//!   while the peer is mid-frame. This wait has no timeout; a stuck line
//!   delays transmission indefinitely rather than corrupting it.
//! - **Glitch filtering** on reception: a falling edge is re-checked a
//!   quarter bit period later, so electrical noise mimicking a start edge is
//!   absorbed without aborting the receive attempt.
//!
//! The [`ByteTransport`] trait is the seam consumed by
//! [`MonoLink`](crate::link::MonoLink); hosts with real serial hardware (or
//! tests with an in-memory line) can substitute their own implementation.

use crate::consts::{DEFAULT_BIT_US, MAX_BIT_US, MIN_BIT_US};
use crate::error::TransportError;
use crate::time::Monotonic;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Byte-oriented channel between exactly two devices.
///
/// The protocol engine is generic over this seam. [`WirePhy`] is the
/// bit-banged GPIO implementation.
pub trait ByteTransport {
    /// Line fault reported by the underlying hardware.
    type Error;

    /// Reconfigures the duration of one bit, if the transport has one.
    ///
    /// Transports with fixed timing may ignore this.
    fn set_bit_time_us(&mut self, _us: u16) {}

    /// Transmits one byte.
    ///
    /// Blocks until the line has been idle long enough, then for the fixed
    /// ten-bit-period frame duration. Failure is not modeled beyond line
    /// faults; a permanently busy line delays indefinitely.
    fn send_byte(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Attempts to capture one byte within `timeout_ms` milliseconds.
    ///
    /// Intended to be invoked frequently and briefly by a polling loop, with
    /// a short budget shared across every wait step of the attempt.
    fn receive_byte(&mut self, timeout_ms: u32) -> Result<u8, TransportError<Self::Error>>;
}

/// Bit-banged half-duplex byte transport on a single GPIO.
///
/// The pin must behave open-drain: [`OutputPin::set_low`] drives the line
/// low, [`OutputPin::set_high`] releases it to the external (or internal)
/// pull-up, and [`InputPin::is_high`] reads the resulting line level. On
/// hardware without true open-drain outputs this is typically emulated by
/// switching the pin between output-low and input mode.
///
/// ## Type parameters
///
/// - `P`: the shared line, both [`OutputPin`] and [`InputPin`]
/// - `D`: busy-wait delay source ([`DelayNs`])
/// - `C`: free-running clock ([`Monotonic`])
///
/// ## Example
///
/// ```rust
/// # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
/// # use embedded_hal_mock::eh1::delay::NoopDelay;
/// use monolink::phy::WirePhy;
/// use monolink::time::Monotonic;
///
/// #[derive(Debug)]
/// struct Ticker(u32);
/// impl Monotonic for Ticker {
///     fn now_micros(&mut self) -> u32 {
///         self.0 = self.0.wrapping_add(50);
///         self.0
///     }
///     fn now_millis(&mut self) -> u32 {
///         self.now_micros() / 1000
///     }
/// }
///
/// # let pin = Pin::new(&[PinTransaction::set(PinState::High)]);
/// let mut phy = WirePhy::new(pin, NoopDelay::new(), Ticker(0)).unwrap();
/// phy.set_bit_time_us(300); // short cable, fast line
/// # let (mut pin, _, _) = phy.release();
/// # pin.done();
/// ```
#[derive(Debug)]
pub struct WirePhy<P, D, C> {
    pin: P,
    delay: D,
    clock: C,
    bit_us: u16,
    half_bit_us: u16,
    idle_min_us: u32,
}

impl<P, D, C> WirePhy<P, D, C>
where
    P: OutputPin + InputPin,
    D: DelayNs,
    C: Monotonic,
{
    /// Creates the transport and releases the line.
    ///
    /// The line starts released (high) so a freshly constructed transport
    /// never holds the bus. Timing defaults to a 500 µs bit period.
    pub fn new(mut pin: P, delay: D, clock: C) -> Result<Self, P::Error> {
        pin.set_high()?;
        Ok(Self {
            pin,
            delay,
            clock,
            bit_us: DEFAULT_BIT_US,
            half_bit_us: DEFAULT_BIT_US / 2,
            idle_min_us: 3 * DEFAULT_BIT_US as u32,
        })
    }

    /// Reconfigures the bit period, clamped to 300..=2000 µs.
    ///
    /// Also re-derives the half-bit sampling offset and the three-bit idle
    /// threshold. Both ends of the wire must agree on the bit period.
    pub fn set_bit_time_us(&mut self, us: u16) {
        let us = us.clamp(MIN_BIT_US, MAX_BIT_US);
        self.bit_us = us;
        self.half_bit_us = us / 2;
        self.idle_min_us = 3 * us as u32;
    }

    /// Tears the transport down, handing back its parts.
    pub fn release(self) -> (P, D, C) {
        (self.pin, self.delay, self.clock)
    }

    /// Blocks until the line has been continuously high for the idle
    /// threshold. The high-since stamp resets on every low observation.
    fn wait_idle(&mut self) -> Result<(), P::Error> {
        let mut high_since = self.clock.now_micros();
        loop {
            let now = self.clock.now_micros();
            if self.pin.is_high()? {
                if now.wrapping_sub(high_since) >= self.idle_min_us {
                    return Ok(());
                }
            } else {
                high_since = now;
            }
        }
    }

    /// Samples 8 data bits after a confirmed start edge at `edge_us`.
    fn sample_bits(
        &mut self,
        edge_us: u32,
        start_ms: u32,
        timeout_ms: u32,
    ) -> Result<u8, TransportError<P::Error>> {
        // Mid-bit target: skip the rest of the start bit plus half a data bit.
        let mut sample_at = edge_us.wrapping_add(self.bit_us as u32 + self.half_bit_us as u32);
        let mut value = 0u8;
        for i in 0..8 {
            while (self.clock.now_micros().wrapping_sub(sample_at) as i32) < 0 {
                if self.clock.now_millis().wrapping_sub(start_ms) > timeout_ms {
                    return Err(TransportError::Timeout);
                }
            }
            if self.pin.is_high().map_err(TransportError::Line)? {
                value |= 1 << i;
            }
            sample_at = sample_at.wrapping_add(self.bit_us as u32);
        }
        Ok(value)
    }
}

impl<P, D, C> ByteTransport for WirePhy<P, D, C>
where
    P: OutputPin + InputPin,
    D: DelayNs,
    C: Monotonic,
{
    type Error = P::Error;

    fn set_bit_time_us(&mut self, us: u16) {
        WirePhy::set_bit_time_us(self, us);
    }

    fn send_byte(&mut self, value: u8) -> Result<(), Self::Error> {
        self.wait_idle()?;

        // Start bit.
        self.pin.set_low()?;
        self.delay.delay_us(self.bit_us as u32);

        // 8 data bits, LSB first: low = 0, released = 1.
        for i in 0..8 {
            if value & (1 << i) != 0 {
                self.pin.set_high()?;
            } else {
                self.pin.set_low()?;
            }
            self.delay.delay_us(self.bit_us as u32);
        }

        // Stop bit.
        self.pin.set_high()?;
        self.delay.delay_us(self.bit_us as u32);
        Ok(())
    }

    fn receive_byte(&mut self, timeout_ms: u32) -> Result<u8, TransportError<Self::Error>> {
        let start_ms = self.clock.now_millis();

        // The peer may be mid-frame: wait for the line to go high first.
        while self.pin.is_low().map_err(TransportError::Line)? {
            if self.clock.now_millis().wrapping_sub(start_ms) > timeout_ms {
                return Err(TransportError::Timeout);
            }
        }

        // Watch for the falling edge of a start bit. The budget is shared
        // across glitch retries within this call.
        loop {
            if self.clock.now_millis().wrapping_sub(start_ms) > timeout_ms {
                return Err(TransportError::Timeout);
            }
            if self.pin.is_low().map_err(TransportError::Line)? {
                let edge = self.clock.now_micros();

                // Re-check after a quarter bit: a line already back high was
                // noise, not a start bit.
                self.delay.delay_us(self.half_bit_us as u32 / 2);
                if self.pin.is_low().map_err(TransportError::Line)? {
                    return self.sample_bits(edge, start_ms, timeout_ms);
                }
            }
        }
    }
}
