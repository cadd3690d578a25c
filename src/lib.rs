//! # monolink
//!
//! A portable, no_std Rust driver for a half-duplex link between exactly two
//! embedded devices sharing a single open-drain signal line (plus ground).
//!
//! Neither side needs UART hardware: the bit transport is software-timed,
//! turning one GPIO into a byte channel with asynchronous-serial framing
//! (start bit, 8 data bits LSB first, stop bit). On top of that sits a small
//! logical layer that turns the byte stream into reliable, de-duplicated,
//! identified messages:
//!
//! - framed messages with an 8-bit checksum (polynomial 0x07)
//! - automatic acknowledgment with a single-slot retry mechanism
//! - duplicate filtering for DATA frames
//! - periodic HELLO frames for device discovery
//!
//! The driver uses:
//! - `embedded-hal` traits for digital I/O and busy-wait timing
//! - `heapless` fixed-capacity buffers (message sizes are statically bounded)
//! - a [`Monotonic`](time::Monotonic) clock capability supplied by the host
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Disables `#![no_std]` support |
//! | `defmt-0-3` | Uses `defmt` formatting |
//! | `log`       | Uses `log` logging |
//!
//! ## Layering
//!
//! [`phy::WirePhy`] is the bit transport: it drives the line low for a 0,
//! releases it to the pull-up for a 1, detects idle before transmitting, and
//! samples received bits mid-period to tolerate clock drift. It implements
//! [`phy::ByteTransport`], the seam the logical layer consumes.
//!
//! [`link::MonoLink`] is the protocol engine: give it one [`poll()`] per
//! cooperative scheduling slot and it will ingest at most one byte, run the
//! retry deadline check, and emit periodic HELLOs. All protocol failures
//! (noise, corrupt frames, exhausted retries) are absorbed silently; the only
//! error the host ever sees is a line fault from its own pin implementation.
//!
//! [`poll()`]: link::MonoLink::poll
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monolink::link::MonoLink;
//! use monolink::phy::WirePhy;
//!
//! let phy = WirePhy::new(pin, delay, clock)?;
//! let mut link = MonoLink::new(phy, engine_clock, 0x10, ());
//! link.begin(true)?; // announce ourselves with a HELLO
//! loop {
//!     link.poll()?; // call as often as the host can
//! }
//! ```
//!
//! ## Integration notes
//!
//! - Exactly one peer per bus; instantiate one engine per physical bus.
//! - `poll()` must never be invoked concurrently from two threads of control.
//! - Transmission blocks while the line is busy (idle detection has no
//!   timeout); reception blocks only up to its per-poll budget.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use heapless;

pub mod consts;
pub mod crc;
pub mod error;
pub mod frame;
pub mod link;
pub mod phy;
pub mod time;
