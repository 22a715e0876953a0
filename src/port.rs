//! Typed port identifiers and per-instant message bags.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::message::Message;

/// Direction of a port relative to the component that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Messages flow into the component.
    In,
    /// Messages flow out of the component.
    Out,
}

/// Every port name used by the ABP network.
///
/// The `In`/`Out` pair belongs to the single-channel components (Receiver,
/// Subnet); the numbered variants are the boundary ports of the Network
/// coupled model, one pair per direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Port {
    /// Sender: packet count to start a run.
    ControlIn,
    /// Sender: incoming acknowledgement bit.
    AckIn,
    /// Sender: encoded packet (`packet_num * 10 + alt_bit`).
    DataOut,
    /// Sender: bare packet number of each transmission.
    PacketSentOut,
    /// Sender: acknowledgement bit passed through on delivery.
    AckReceivedOut,
    /// Receiver/Subnet input.
    In,
    /// Receiver/Subnet output.
    Out,
    /// Network boundary: input of direction A.
    In1,
    /// Network boundary: input of direction B.
    In2,
    /// Network boundary: output of direction A.
    Out1,
    /// Network boundary: output of direction B.
    Out2,
}

impl Port {
    /// The direction of this port.
    pub fn direction(&self) -> Direction {
        match self {
            Port::ControlIn | Port::AckIn | Port::In | Port::In1 | Port::In2 => Direction::In,
            Port::DataOut
            | Port::PacketSentOut
            | Port::AckReceivedOut
            | Port::Out
            | Port::Out1
            | Port::Out2 => Direction::Out,
        }
    }

    /// Parses the trace token back into a port.
    pub fn from_token(token: &str) -> Option<Port> {
        let port = match token {
            "controlIn" => Port::ControlIn,
            "ackIn" => Port::AckIn,
            "dataOut" => Port::DataOut,
            "packetSentOut" => Port::PacketSentOut,
            "ackReceivedOut" => Port::AckReceivedOut,
            "in" => Port::In,
            "out" => Port::Out,
            "in1" => Port::In1,
            "in2" => Port::In2,
            "out1" => Port::Out1,
            "out2" => Port::Out2,
            _ => return None,
        };
        Some(port)
    }
}

// The Display token is what appears in trace lines.
impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Port::ControlIn => "controlIn",
            Port::AckIn => "ackIn",
            Port::DataOut => "dataOut",
            Port::PacketSentOut => "packetSentOut",
            Port::AckReceivedOut => "ackReceivedOut",
            Port::In => "in",
            Port::Out => "out",
            Port::In1 => "in1",
            Port::In2 => "in2",
            Port::Out1 => "out1",
            Port::Out2 => "out2",
        };
        f.write_str(token)
    }
}

/// The messages present on a component's ports at a single simulated instant.
///
/// The ABP topology never produces more than one message per port per instant;
/// a bag holding two is a structural bug, not a protocol event, and reading it
/// aborts the run.
#[derive(Debug, Default)]
pub struct Bag {
    slots: FxHashMap<Port, Vec<Message>>,
}

impl Bag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message on `port`.
    pub fn push(&mut self, port: Port, msg: Message) {
        self.slots.entry(port).or_default().push(msg);
    }

    /// Returns the single message on `port`, if any.
    ///
    /// Panics with a diagnostic naming `model` and the port if the bag holds
    /// more than one message there (contract breach, see crate docs).
    pub fn one(&self, port: Port, model: &str) -> Option<Message> {
        match self.slots.get(&port) {
            None => None,
            Some(msgs) if msgs.len() <= 1 => msgs.first().copied(),
            Some(msgs) => panic!(
                "{}: {} messages on port {} in one instant, at most one is allowed",
                model,
                msgs.len(),
                port
            ),
        }
    }

    /// True if no port holds a message.
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(|msgs| msgs.is_empty())
    }

    /// Iterates over non-empty ports and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (Port, &[Message])> {
        self.slots
            .iter()
            .filter(|(_, msgs)| !msgs.is_empty())
            .map(|(port, msgs)| (*port, msgs.as_slice()))
    }
}
