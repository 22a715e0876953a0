//! The receiving side of the Alternating Bit Protocol.
//!
//! Passive until a packet arrives; then emits an acknowledgement carrying the
//! packet's sequence bit after a fixed preparation delay and goes passive
//! again.

use crate::component::{AtomicModel, PASSIVE};
use crate::message::Message;
use crate::port::{Bag, Port};

/// Default delay between receiving a packet and emitting its acknowledgement.
pub const PREPARATION_TIME: f64 = 10.0;

#[derive(Debug)]
struct State {
    ack_num: i64,
    sending: bool,
}

/// The ABP receiver. Ports: [`Port::In`] in, [`Port::Out`] out.
pub struct Receiver {
    name: String,
    preparation_time: f64,
    state: State,
}

impl Receiver {
    /// Creates a passive receiver with the default preparation time.
    pub fn new(name: &str) -> Self {
        Self::with_timing(name, PREPARATION_TIME)
    }

    /// Creates a passive receiver with an explicit preparation time.
    pub fn with_timing(name: &str, preparation_time: f64) -> Self {
        Self {
            name: name.to_string(),
            preparation_time,
            state: State {
                ack_num: 0,
                sending: false,
            },
        }
    }
}

impl AtomicModel for Receiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn internal_transition(&mut self) {
        self.state.sending = false;
    }

    fn external_transition(&mut self, _elapsed: f64, inputs: &Bag) {
        if let Some(msg) = inputs.one(Port::In, &self.name) {
            self.state.ack_num = msg.as_int();
            self.state.sending = true;
        }
    }

    fn output(&self, bag: &mut Bag) {
        if self.state.sending {
            // The low digit isolates the sequence bit from the packet number
            // encoding used by the sender.
            bag.push(Port::Out, Message::new((self.state.ack_num % 10) as f64));
        }
    }

    fn time_advance(&self) -> f64 {
        if self.state.sending {
            self.preparation_time
        } else {
            PASSIVE
        }
    }
}
