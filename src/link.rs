//! Logical link layer: frame reassembly, acknowledgment, retry, duplicate
//! filtering, and HELLO device discovery.
//!
//! [`MonoLink`] owns one [`ByteTransport`] and threads a byte stream into
//! validated frames. It is a cooperative, single-threaded engine: it does no
//! work except inside [`poll()`](MonoLink::poll), which the host must invoke
//! as frequently as it can. One poll ingests at most one received byte, then
//! runs the retry deadline check and the periodic-HELLO check; nothing blocks
//! beyond the short per-byte receive budget.
//!
//! ## Delivery semantics
//!
//! Every checksum-valid HELLO or DATA frame is acknowledged immediately,
//! duplicates included, so the sender's retry slot clears even when the
//! receiver has already seen the message. A DATA frame whose message id
//! matches the immediately preceding accepted one is suppressed before it
//! reaches the host: at-least-once on the wire, exactly-once observed.
//!
//! Sends with `request_ack` are retransmitted on a timeout until a matching
//! ACK arrives or the retry budget is exhausted, at which point the attempt
//! is abandoned silently. There is exactly one tracked in-flight send; a
//! second acknowledged send while one is pending goes out once but is not
//! retried.

use crate::consts::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_HELLO_INTERVAL_MS, DEFAULT_MAX_RETRIES, MAX_BODY_LEN,
    MAX_PAYLOAD, MIN_BODY_LEN, POLL_RX_TIMEOUT_MS, START_BYTE,
};
use crate::error::TransportError;
use crate::frame::{self, FrameType};
use crate::phy::ByteTransport;
use crate::time::Monotonic;
use heapless::Vec;

/// Host hook invoked for every delivered frame.
///
/// The engine calls [`on_frame`](FrameHandler::on_frame) for each
/// checksum-valid, non-duplicate HELLO or DATA frame. ACK frames are
/// consumed internally and never reach the handler.
pub trait FrameHandler {
    /// Called with the sender's message id, the frame type, and the payload
    /// (empty for payload-less frames). The payload borrow ends with the
    /// call; copy out whatever must outlive it.
    fn on_frame(&mut self, msg_id: u8, kind: FrameType, payload: &[u8]);
}

/// No handler: delivered frames are dropped silently.
///
/// Frames are still acknowledged and duplicate-filtered; only the final
/// hand-off to the host is skipped.
impl FrameHandler for () {
    fn on_frame(&mut self, _msg_id: u8, _kind: FrameType, _payload: &[u8]) {}
}

/// Plain function handlers, for hosts that need no captured state.
impl FrameHandler for fn(u8, FrameType, &[u8]) {
    fn on_frame(&mut self, msg_id: u8, kind: FrameType, payload: &[u8]) {
        (self)(msg_id, kind, payload)
    }
}

/// Receive reassembly state, advanced one byte at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    AwaitStart,
    AwaitLength,
    ReadBody,
}

/// The single tracked in-flight acknowledged send.
///
/// Its existence is the pending flag: the slot is occupied only by sends
/// that requested an acknowledgment, and is vacated by a matching ACK or by
/// retry exhaustion.
#[derive(Debug)]
struct PendingTx {
    kind: FrameType,
    msg_id: u8,
    payload: Vec<u8, MAX_PAYLOAD>,
    retries: u8,
    last_send_ms: u32,
}

/// The protocol engine for one shared-wire bus.
///
/// ## Type parameters
///
/// - `T`: the byte transport, typically [`WirePhy`](crate::phy::WirePhy)
/// - `C`: free-running clock for retry and HELLO deadlines
/// - `H`: the host's [`FrameHandler`]; use `()` for none
///
/// A multi-bus host instantiates one independent engine per physical bus;
/// there is no cross-instance state.
///
/// ## Example
///
/// ```rust
/// use core::convert::Infallible;
/// use std::collections::VecDeque;
/// use monolink::error::TransportError;
/// use monolink::link::MonoLink;
/// use monolink::phy::ByteTransport;
/// use monolink::time::Monotonic;
///
/// // A loopback wire standing in for the bit-banged GPIO transport.
/// #[derive(Debug, Default)]
/// struct Loopback(VecDeque<u8>);
/// impl ByteTransport for Loopback {
///     type Error = Infallible;
///     fn send_byte(&mut self, value: u8) -> Result<(), Infallible> {
///         self.0.push_back(value);
///         Ok(())
///     }
///     fn receive_byte(&mut self, _timeout_ms: u32) -> Result<u8, TransportError<Infallible>> {
///         self.0.pop_front().ok_or(TransportError::Timeout)
///     }
/// }
///
/// #[derive(Debug)]
/// struct Millis(u32);
/// impl Monotonic for Millis {
///     fn now_micros(&mut self) -> u32 { self.0.wrapping_mul(1000) }
///     fn now_millis(&mut self) -> u32 { self.0 }
/// }
///
/// let mut link = MonoLink::new(Loopback::default(), Millis(0), 0x10, ());
/// link.begin(true).unwrap(); // announce ourselves with a HELLO
/// let msg_id = link.send(&[10, 20, 30], true).unwrap();
/// assert_ne!(msg_id, 0); // id 0 is never assigned
/// link.poll().unwrap();
/// ```
#[derive(Debug)]
pub struct MonoLink<T, C, H> {
    transport: T,
    clock: C,
    handler: H,
    id: u8,
    remote_id: Option<u8>,

    rx_state: RxState,
    rx_expected: usize,
    rx_buf: Vec<u8, MAX_BODY_LEN>,

    // Duplicate filter: 0 is the sentinel, never assigned to real traffic.
    last_data_id: u8,

    pending: Option<PendingTx>,
    ack_timeout_ms: u32,
    max_retries: u8,

    hello_interval_ms: u32,
    last_hello_ms: u32,

    next_msg_id: u8,
}

impl<T, C, H> MonoLink<T, C, H>
where
    T: ByteTransport,
    C: Monotonic,
    H: FrameHandler,
{
    /// Creates an engine with this device's fixed 8-bit id.
    ///
    /// The id is immutable for the engine's lifetime and is what the peer
    /// learns from our HELLO frames. Defaults: 40 ms ACK timeout, 2 retries,
    /// HELLO every 5 s.
    pub fn new(transport: T, clock: C, device_id: u8, handler: H) -> Self {
        Self {
            transport,
            clock,
            handler,
            id: device_id,
            remote_id: None,
            rx_state: RxState::AwaitStart,
            rx_expected: 0,
            rx_buf: Vec::new(),
            last_data_id: 0,
            pending: None,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            hello_interval_ms: DEFAULT_HELLO_INTERVAL_MS,
            last_hello_ms: 0,
            next_msg_id: 1,
        }
    }

    /// Starts the engine, optionally announcing this device with a HELLO.
    pub fn begin(&mut self, send_hello_on_start: bool) -> Result<(), T::Error> {
        self.last_hello_ms = self.clock.now_millis();
        if send_hello_on_start {
            self.send_hello()?;
        }
        Ok(())
    }

    /// One engine tick; call as frequently as the host can.
    ///
    /// Attempts one short-budget byte receive and feeds any byte into the
    /// reassembly state machine, then runs the retry deadline check and the
    /// periodic-HELLO check. A receive timeout means "nothing arrived this
    /// cycle" and is not an error.
    pub fn poll(&mut self) -> Result<(), T::Error> {
        match self.transport.receive_byte(POLL_RX_TIMEOUT_MS) {
            Ok(byte) => self.ingest(byte)?,
            Err(TransportError::Timeout) => {}
            Err(TransportError::Line(e)) => return Err(e),
        }

        let now = self.clock.now_millis();

        // Retry deadline. Taking the slot sidesteps re-borrowing `self` for
        // the retransmission; it is put back unless retries are exhausted.
        if let Some(mut p) = self.pending.take() {
            if now.wrapping_sub(p.last_send_ms) > self.ack_timeout_ms {
                if p.retries < self.max_retries {
                    p.retries += 1;
                    p.last_send_ms = now;
                    self.send_raw(p.kind, p.msg_id, &p.payload)?;
                    self.pending = Some(p);
                }
                // Retries exhausted: the send is abandoned without a signal.
            } else {
                self.pending = Some(p);
            }
        }

        if self.hello_interval_ms != 0
            && now.wrapping_sub(self.last_hello_ms) > self.hello_interval_ms
        {
            self.send_hello()?;
        }
        Ok(())
    }

    /// Sends an application payload as a DATA frame.
    ///
    /// Payloads longer than [`MAX_PAYLOAD`] bytes are truncated. Returns the
    /// message id assigned to the frame.
    ///
    /// With `request_ack`, the frame is captured into the single pending
    /// slot and retransmitted until acknowledged or the retry budget runs
    /// out. If another send is already pending, this frame still goes out
    /// once but is not tracked; later requests are not queued. There is no
    /// delivery query: an abandoned send is indistinguishable from a slow
    /// ACK except by the peer's behavior.
    pub fn send(&mut self, payload: &[u8], request_ack: bool) -> Result<u8, T::Error> {
        let payload = &payload[..payload.len().min(MAX_PAYLOAD)];
        let msg_id = self.take_msg_id();
        self.send_raw(FrameType::Data, msg_id, payload)?;

        if request_ack && self.pending.is_none() {
            let mut copy = Vec::new();
            let _ = copy.extend_from_slice(payload);
            self.pending = Some(PendingTx {
                kind: FrameType::Data,
                msg_id,
                payload: copy,
                retries: 0,
                last_send_ms: self.clock.now_millis(),
            });
        }
        Ok(msg_id)
    }

    /// Sets the acknowledgment timeout in milliseconds.
    pub fn set_ack_timeout_ms(&mut self, ms: u32) {
        self.ack_timeout_ms = ms;
    }

    /// Sets the number of retransmissions before an unacknowledged send is
    /// abandoned.
    pub fn set_max_retries(&mut self, retries: u8) {
        self.max_retries = retries;
    }

    /// Sets the periodic HELLO interval in milliseconds; 0 disables it.
    pub fn set_hello_interval_ms(&mut self, ms: u32) {
        self.hello_interval_ms = ms;
    }

    /// Picks line speed by quality level: 1 = fast, 4 = slow and robust.
    ///
    /// Levels 1..=4 map to bit periods of 300/500/800/1200 µs (out-of-range
    /// levels are clamped) and scale the acknowledgment timeout to match the
    /// slower frame duration: 40 ms up to 500 µs bits, 60 ms up to 800 µs,
    /// 80 ms beyond.
    pub fn set_speed_quality(&mut self, level: u8) {
        let us = match level.clamp(1, 4) {
            1 => 300,
            2 => 500,
            3 => 800,
            _ => 1200,
        };
        self.transport.set_bit_time_us(us);
        self.ack_timeout_ms = if us <= 500 {
            40
        } else if us <= 800 {
            60
        } else {
            80
        };
    }

    /// This device's fixed id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// The peer's id, once a HELLO from it has been validated.
    pub fn remote_id(&self) -> Option<u8> {
        self.remote_id
    }

    /// Draws the next message id from the rolling generator, skipping 0 on
    /// wrap so the duplicate-filter sentinel stays unused by real traffic.
    fn take_msg_id(&mut self) -> u8 {
        let id = self.next_msg_id;
        self.next_msg_id = match self.next_msg_id.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        id
    }

    fn send_hello(&mut self) -> Result<(), T::Error> {
        let payload = [self.id];
        let msg_id = self.take_msg_id();
        self.send_raw(FrameType::Hello, msg_id, &payload)?;
        self.last_hello_ms = self.clock.now_millis();
        Ok(())
    }

    fn send_raw(&mut self, kind: FrameType, msg_id: u8, payload: &[u8]) -> Result<(), T::Error> {
        let bytes = frame::encode(kind, msg_id, payload);
        for &b in &bytes {
            self.transport.send_byte(b)?;
        }
        Ok(())
    }

    /// Advances the reassembly state machine by one received byte.
    ///
    /// Bytes outside a frame and malformed length fields are discarded
    /// silently; the machine self-resets and keeps running.
    fn ingest(&mut self, byte: u8) -> Result<(), T::Error> {
        match self.rx_state {
            RxState::AwaitStart => {
                if byte == START_BYTE {
                    self.rx_state = RxState::AwaitLength;
                }
            }
            RxState::AwaitLength => {
                let len = byte as usize;
                if (MIN_BODY_LEN..=MAX_BODY_LEN).contains(&len) {
                    self.rx_expected = len;
                    self.rx_buf.clear();
                    self.rx_state = RxState::ReadBody;
                } else {
                    // Malformed frame abandoned with no report.
                    self.rx_state = RxState::AwaitStart;
                }
            }
            RxState::ReadBody => {
                // Cannot overflow: rx_expected <= MAX_BODY_LEN == capacity.
                let _ = self.rx_buf.push(byte);
                if self.rx_buf.len() >= self.rx_expected {
                    self.rx_state = RxState::AwaitStart;
                    self.process_frame()?;
                }
            }
        }
        Ok(())
    }

    /// Handles one complete, reassembled frame body.
    fn process_frame(&mut self) -> Result<(), T::Error> {
        let body = self.rx_buf.clone();
        self.rx_buf.clear();

        let Some(f) = frame::parse_body(&body) else {
            return Ok(()); // corrupt or unrecognized: discard, no callback
        };

        if f.kind == FrameType::Hello && !f.payload.is_empty() {
            self.remote_id = Some(f.payload[0]);
        }

        if f.kind == FrameType::Ack {
            // The only way a pending send resolves successfully.
            if self.pending.as_ref().is_some_and(|p| p.msg_id == f.msg_id) {
                self.pending = None;
            }
            return Ok(());
        }

        // Single-slot duplicate memory: equal to the immediately preceding
        // accepted DATA id means the peer retransmitted an acked frame.
        let mut duplicate = false;
        if f.kind == FrameType::Data {
            if f.msg_id == self.last_data_id {
                duplicate = true;
            } else {
                self.last_data_id = f.msg_id;
            }
        }

        // Acknowledge every valid HELLO/DATA, duplicates included, so the
        // sender's retry slot clears even when we suppress the delivery.
        self.send_raw(FrameType::Ack, f.msg_id, &[])?;

        if duplicate {
            return Ok(());
        }

        self.handler.on_frame(f.msg_id, f.kind, f.payload);
        Ok(())
    }
}
