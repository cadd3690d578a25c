//! End-to-end scenario: two engines on a perfect in-memory line.

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use monolink::error::TransportError;
use monolink::frame::FrameType;
use monolink::link::{FrameHandler, MonoLink};
use monolink::phy::ByteTransport;
use monolink::time::Monotonic;

/// Lossless bidirectional byte pipe shared by the two endpoints.
#[derive(Debug, Default)]
struct Bus {
    a_to_b: VecDeque<u8>,
    b_to_a: VecDeque<u8>,
}

#[derive(Debug)]
struct Endpoint {
    bus: Rc<RefCell<Bus>>,
    is_a: bool,
}

impl ByteTransport for Endpoint {
    type Error = Infallible;

    fn send_byte(&mut self, value: u8) -> Result<(), Infallible> {
        let mut bus = self.bus.borrow_mut();
        if self.is_a {
            bus.a_to_b.push_back(value);
        } else {
            bus.b_to_a.push_back(value);
        }
        Ok(())
    }

    fn receive_byte(&mut self, _timeout_ms: u32) -> Result<u8, TransportError<Infallible>> {
        let mut bus = self.bus.borrow_mut();
        let queue = if self.is_a {
            &mut bus.b_to_a
        } else {
            &mut bus.a_to_b
        };
        queue.pop_front().ok_or(TransportError::Timeout)
    }
}

#[derive(Debug, Clone, Default)]
struct SharedClock(Rc<RefCell<u32>>);

impl SharedClock {
    fn advance_ms(&self, ms: u32) {
        *self.0.borrow_mut() += ms;
    }
}

impl Monotonic for SharedClock {
    fn now_micros(&mut self) -> u32 {
        self.0.borrow().wrapping_mul(1000)
    }

    fn now_millis(&mut self) -> u32 {
        *self.0.borrow()
    }
}

#[derive(Debug, Clone, Default)]
struct Inbox(Rc<RefCell<Vec<(u8, FrameType, Vec<u8>)>>>);

impl FrameHandler for Inbox {
    fn on_frame(&mut self, msg_id: u8, kind: FrameType, payload: &[u8]) {
        self.0.borrow_mut().push((msg_id, kind, payload.to_vec()));
    }
}

type Engine = MonoLink<Endpoint, SharedClock, Inbox>;

fn make_pair() -> (Engine, Inbox, Engine, Inbox, SharedClock, Rc<RefCell<Bus>>) {
    let bus = Rc::new(RefCell::new(Bus::default()));
    let clock = SharedClock::default();
    let inbox_a = Inbox::default();
    let inbox_b = Inbox::default();
    let a = MonoLink::new(
        Endpoint {
            bus: bus.clone(),
            is_a: true,
        },
        clock.clone(),
        0x10,
        inbox_a.clone(),
    );
    let b = MonoLink::new(
        Endpoint {
            bus: bus.clone(),
            is_a: false,
        },
        clock.clone(),
        0x20,
        inbox_b.clone(),
    );
    (a, inbox_a, b, inbox_b, clock, bus)
}

/// Polls both engines until the bus drains in both directions.
fn settle(a: &mut Engine, b: &mut Engine, bus: &Rc<RefCell<Bus>>) {
    loop {
        let (pending_ab, pending_ba) = {
            let bus = bus.borrow();
            (bus.a_to_b.len(), bus.b_to_a.len())
        };
        if pending_ab == 0 && pending_ba == 0 {
            return;
        }
        for _ in 0..pending_ab {
            b.poll().unwrap();
        }
        for _ in 0..pending_ba {
            a.poll().unwrap();
        }
    }
}

#[test]
fn hello_then_acknowledged_data_round_trip() {
    let (mut a, _inbox_a, mut b, inbox_b, clock, bus) = make_pair();

    // A announces itself; B learns A's id from the HELLO.
    a.begin(true).unwrap();
    b.begin(false).unwrap();
    settle(&mut a, &mut b, &bus);
    assert_eq!(b.remote_id(), Some(0x10));
    assert_eq!(a.remote_id(), None); // B never sent a HELLO

    // Quiet the periodic HELLOs so the wire carries only the scenario.
    a.set_hello_interval_ms(0);
    b.set_hello_interval_ms(0);

    let sent_before = bus.borrow().a_to_b.len();
    assert_eq!(sent_before, 0);

    // A sends acknowledged DATA; B observes it exactly once.
    let msg_id = a.send(&[10, 20, 30], true).unwrap();
    settle(&mut a, &mut b, &bus);

    let delivered: Vec<_> = inbox_b
        .0
        .borrow()
        .iter()
        .filter(|(_, kind, _)| *kind == FrameType::Data)
        .cloned()
        .collect();
    assert_eq!(delivered, vec![(msg_id, FrameType::Data, vec![10, 20, 30])]);

    // The ACK cleared A's pending slot: long after the timeout, nothing is
    // retransmitted (zero retries used).
    clock.advance_ms(1000);
    a.poll().unwrap();
    assert!(bus.borrow().a_to_b.is_empty());
    settle(&mut a, &mut b, &bus);
    assert_eq!(
        inbox_b
            .0
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == FrameType::Data)
            .count(),
        1
    );
}

#[test]
fn lost_ack_triggers_retry_and_duplicate_suppression() {
    let (mut a, _inbox_a, mut b, inbox_b, clock, bus) = make_pair();
    a.begin(false).unwrap();
    b.begin(false).unwrap();
    a.set_hello_interval_ms(0);
    b.set_hello_interval_ms(0);

    let msg_id = a.send(&[42], true).unwrap();

    // B receives the DATA but its ACK is lost in transit.
    let pending_ab = bus.borrow().a_to_b.len();
    for _ in 0..pending_ab {
        b.poll().unwrap();
    }
    bus.borrow_mut().b_to_a.clear();

    // A times out and retransmits; B suppresses the duplicate but ACKs it,
    // which finally clears A's slot.
    clock.advance_ms(41);
    a.poll().unwrap();
    assert!(!bus.borrow().a_to_b.is_empty(), "no retransmission happened");
    settle(&mut a, &mut b, &bus);

    assert_eq!(
        inbox_b.0.borrow().as_slice(),
        &[(msg_id, FrameType::Data, vec![42])]
    );

    // Slot cleared: no further retransmissions.
    clock.advance_ms(1000);
    a.poll().unwrap();
    assert!(bus.borrow().a_to_b.is_empty());
}

#[test]
fn both_sides_discover_each_other() {
    let (mut a, _inbox_a, mut b, _inbox_b, _clock, bus) = make_pair();
    a.begin(true).unwrap();
    b.begin(true).unwrap();
    settle(&mut a, &mut b, &bus);

    assert_eq!(a.remote_id(), Some(0x20));
    assert_eq!(b.remote_id(), Some(0x10));
    assert_eq!(a.id(), 0x10);
    assert_eq!(b.id(), 0x20);
}
