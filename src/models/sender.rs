//! The sending side of the Alternating Bit Protocol.
//!
//! The sender is passive until a control signal arrives. It then transmits a
//! bounded sequence of numbered packets one at a time, alternating a single
//! sequence bit. After every transmission it waits for the matching
//! acknowledgement within a timeout window; on timeout it retransmits the
//! same packet, on a matching acknowledgement it advances to the next one.
//! When the batch is exhausted it returns to the passive phase.

use log::debug;

use crate::component::{AtomicModel, PASSIVE};
use crate::message::Message;
use crate::port::{Bag, Port};

/// Default delay between deciding to send a packet and emitting it.
pub const PREPARATION_TIME: f64 = 10.0;
/// Default acknowledgement timeout.
pub const TIMEOUT: f64 = 20.0;

/// Sender state, mutated only by the sender's own transitions.
#[derive(Debug)]
struct State {
    ack: bool,
    packet_num: i64,
    total_packet_num: i64,
    alt_bit: i64,
    sending: bool,
    model_active: bool,
    next_internal: f64,
}

/// The ABP sender.
///
/// Ports: [`Port::ControlIn`], [`Port::AckIn`] in; [`Port::DataOut`],
/// [`Port::PacketSentOut`], [`Port::AckReceivedOut`] out.
pub struct Sender {
    name: String,
    preparation_time: f64,
    timeout: f64,
    state: State,
}

impl Sender {
    /// Creates a passive sender with the default preparation time and timeout.
    pub fn new(name: &str) -> Self {
        Self::with_timing(name, PREPARATION_TIME, TIMEOUT)
    }

    /// Creates a passive sender with explicit timing parameters.
    pub fn with_timing(name: &str, preparation_time: f64, timeout: f64) -> Self {
        Self {
            name: name.to_string(),
            preparation_time,
            timeout,
            state: State {
                ack: false,
                packet_num: 0,
                total_packet_num: 0,
                alt_bit: 0,
                sending: false,
                model_active: false,
                next_internal: PASSIVE,
            },
        }
    }

    /// True while a batch is in progress.
    pub fn is_active(&self) -> bool {
        self.state.model_active
    }

    /// The number of the packet currently being sent or awaited.
    pub fn packet_num(&self) -> i64 {
        self.state.packet_num
    }

    /// The current sequence bit.
    pub fn alt_bit(&self) -> i64 {
        self.state.alt_bit
    }

    fn on_control(&mut self, msg: Message) {
        if self.state.model_active {
            // A batch is already running; late control signals are ignored.
            return;
        }
        let count = msg.as_int();
        if count <= 0 {
            panic!(
                "{}: control value {} is not a positive packet count",
                self.name, msg
            );
        }
        self.state.total_packet_num = count;
        self.state.packet_num = 1;
        self.state.ack = false;
        self.state.sending = true;
        // The first packet of a batch always carries bit 1.
        self.state.alt_bit = self.state.packet_num % 2;
        self.state.model_active = true;
        self.state.next_internal = self.preparation_time;
        debug!("{}: starting batch of {} packets", self.name, count);
    }

    fn on_ack(&mut self, msg: Message, elapsed: f64) {
        if !self.state.model_active {
            return;
        }
        if msg.as_int() == self.state.alt_bit {
            self.state.ack = true;
            self.state.sending = false;
            self.state.next_internal = 0.0;
            debug!("{}: packet {} acknowledged", self.name, self.state.packet_num);
        } else if self.state.next_internal != PASSIVE {
            // Stale or duplicate bit: not a protocol action, just keep the
            // remaining wait correct now that the clock base resets.
            self.state.next_internal -= elapsed;
        }
    }
}

impl AtomicModel for Sender {
    fn name(&self) -> &str {
        &self.name
    }

    fn internal_transition(&mut self) {
        if self.state.ack {
            if self.state.packet_num < self.state.total_packet_num {
                self.state.packet_num += 1;
                self.state.ack = false;
                self.state.alt_bit = (self.state.alt_bit + 1) % 2;
                self.state.sending = true;
                self.state.next_internal = self.preparation_time;
            } else {
                self.state.model_active = false;
                self.state.next_internal = PASSIVE;
            }
        } else if self.state.sending {
            // Packet just went out; wait for the acknowledgement.
            self.state.sending = false;
            self.state.next_internal = self.timeout;
        } else {
            // Timed out unacknowledged; queue the same packet again.
            self.state.sending = true;
            self.state.next_internal = self.preparation_time;
        }
    }

    fn external_transition(&mut self, elapsed: f64, inputs: &Bag) {
        if let Some(msg) = inputs.one(Port::ControlIn, &self.name) {
            self.on_control(msg);
        }
        if let Some(msg) = inputs.one(Port::AckIn, &self.name) {
            self.on_ack(msg, elapsed);
        }
    }

    fn output(&self, bag: &mut Bag) {
        if self.state.sending {
            let value = (self.state.packet_num * 10 + self.state.alt_bit) as f64;
            bag.push(Port::DataOut, Message::new(value));
            bag.push(Port::PacketSentOut, Message::new(self.state.packet_num as f64));
        } else if self.state.ack {
            bag.push(Port::AckReceivedOut, Message::new(self.state.alt_bit as f64));
        }
    }

    fn time_advance(&self) -> f64 {
        self.state.next_internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(count: f64) -> Bag {
        let mut bag = Bag::new();
        bag.push(Port::ControlIn, Message::new(count));
        bag
    }

    fn ack(bit: f64) -> Bag {
        let mut bag = Bag::new();
        bag.push(Port::AckIn, Message::new(bit));
        bag
    }

    fn data_value(sender: &Sender) -> Option<f64> {
        let mut bag = Bag::new();
        sender.output(&mut bag);
        bag.one(Port::DataOut, "test").map(|m| m.value)
    }

    #[test]
    fn passive_until_control() {
        let sender = Sender::new("sender1");
        assert!(!sender.is_active());
        assert_eq!(sender.time_advance(), PASSIVE);
    }

    #[test]
    fn first_packet_carries_bit_one() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(3.0));
        assert!(sender.is_active());
        assert_eq!(sender.alt_bit(), 1);
        assert_eq!(sender.time_advance(), PREPARATION_TIME);
        assert_eq!(data_value(&sender), Some(11.0));
    }

    #[test]
    fn bits_alternate_across_acknowledged_packets() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(3.0));
        let mut bits = vec![];
        for _ in 0..3 {
            bits.push(sender.alt_bit());
            sender.internal_transition(); // packet emitted, start waiting
            sender.external_transition(5.0, &ack(sender.alt_bit() as f64));
            sender.internal_transition(); // ack pass-through fired
        }
        assert_eq!(bits, vec![1, 0, 1]);
        assert!(!sender.is_active());
        assert_eq!(sender.time_advance(), PASSIVE);
    }

    #[test]
    fn timeout_retransmits_the_same_packet() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(2.0));
        let first = data_value(&sender);
        sender.internal_transition(); // sent, waiting with timeout
        assert_eq!(sender.time_advance(), TIMEOUT);
        sender.internal_transition(); // timeout, queue resend
        assert_eq!(sender.time_advance(), PREPARATION_TIME);
        assert_eq!(data_value(&sender), first);
        assert_eq!(sender.packet_num(), 1);
    }

    #[test]
    fn mismatched_ack_is_ignored_and_wait_corrected() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(2.0));
        sender.internal_transition(); // waiting, alt_bit == 1
        sender.external_transition(8.0, &ack(0.0));
        assert_eq!(sender.time_advance(), TIMEOUT - 8.0);
        assert_eq!(sender.packet_num(), 1);
    }

    #[test]
    fn matching_ack_fires_immediately() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(1.0));
        sender.internal_transition();
        sender.external_transition(16.0, &ack(1.0));
        assert_eq!(sender.time_advance(), 0.0);
        let mut bag = Bag::new();
        sender.output(&mut bag);
        assert_eq!(bag.one(Port::AckReceivedOut, "test"), Some(Message::new(1.0)));
    }

    #[test]
    fn ack_at_timeout_instant_resolves_internal_first() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(1.0));
        sender.internal_transition(); // t=10: sent, waiting until t=30
        // Ack arrives exactly when the timeout fires: the resend branch runs
        // first, then the ack lands and suppresses the retransmission.
        sender.confluent_transition(TIMEOUT, &ack(1.0));
        assert_eq!(sender.time_advance(), 0.0);
        sender.internal_transition();
        assert!(!sender.is_active());
    }

    #[test]
    fn control_while_active_is_ignored() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(2.0));
        sender.external_transition(1.0, &control(5.0));
        assert_eq!(sender.packet_num(), 1);
        assert_eq!(sender.time_advance(), PREPARATION_TIME);
    }

    #[test]
    #[should_panic(expected = "not a positive packet count")]
    fn non_positive_control_is_rejected() {
        let mut sender = Sender::new("sender1");
        sender.external_transition(0.0, &control(0.0));
    }
}
