//! Constants shared across the link protocol.
//!
//! This module pins down the on-wire frame geometry, the bit-timing bounds
//! the transport will accept, and the engine's scheduling defaults.
//!
//! ## Key concepts
//!
//! - **Frame geometry**: every frame is START, LENGTH, then a body of
//!   TYPE + MESSAGE_ID + payload + CHECKSUM. LENGTH counts the body bytes,
//!   so a body outside [`MIN_BODY_LEN`]..=[`MAX_BODY_LEN`] is malformed.
//! - **Bit timing**: one bit occupies [`DEFAULT_BIT_US`] microseconds unless
//!   reconfigured; the transport clamps requests to
//!   [`MIN_BIT_US`]..=[`MAX_BIT_US`]. A transmission may only start after the
//!   line has been continuously high for three bit periods.
//! - **Scheduling defaults**: the acknowledgment timeout, retry budget, and
//!   HELLO cadence the engine starts out with before any host configuration.
//!
//! Use these wherever framing or buffer logic is implemented so message
//! boundaries stay consistent between the two ends of the wire.

/// Start-of-frame marker preceding every frame on the wire.
pub const START_BYTE: u8 = 0xA5;

/// Maximum application payload bytes carried by one frame.
pub const MAX_PAYLOAD: usize = 16;

/// Smallest valid frame body: TYPE + MESSAGE_ID + CHECKSUM, no payload.
pub const MIN_BODY_LEN: usize = 3;

/// Largest valid frame body: TYPE + MESSAGE_ID + full payload + CHECKSUM.
pub const MAX_BODY_LEN: usize = 2 + MAX_PAYLOAD + 1;

/// Size of a complete encoded frame: START + LENGTH + largest body.
pub const MAX_FRAME_LEN: usize = 2 + MAX_BODY_LEN;

/// Default duration of one transmitted bit, in microseconds.
pub const DEFAULT_BIT_US: u16 = 500;

/// Shortest accepted bit period. Faster lines lose too many edges to
/// software timing jitter.
pub const MIN_BIT_US: u16 = 300;

/// Longest accepted bit period.
pub const MAX_BIT_US: u16 = 2000;

/// Default time to wait for an ACK before retransmitting, in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u32 = 40;

/// Default number of retransmissions before an unacknowledged send is
/// abandoned.
pub const DEFAULT_MAX_RETRIES: u8 = 2;

/// Default interval between periodic HELLO frames, in milliseconds.
pub const DEFAULT_HELLO_INTERVAL_MS: u32 = 5000;

/// Per-poll budget for a single byte-receive attempt, in milliseconds.
pub const POLL_RX_TIMEOUT_MS: u32 = 10;
