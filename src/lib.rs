//! Discrete-event simulation of the Alternating Bit Protocol (ABP), built as
//! a network of timed, event-driven components.
//!
//! ## Basic Concepts
//!
//! **Atomic model.** Each protocol component is a small timed automaton
//! implementing the [`AtomicModel`] contract: private state plus five
//! operations — an internal transition fired when the component's own
//! time-advance elapses, an external transition fired when input arrives
//! first, a confluent transition resolving the tie when both coincide
//! (internal first, then external — a fixed policy the protocol logic depends
//! on), an output function evaluated immediately before an internal or
//! confluent transition, and a time-advance giving the duration until the
//! next unprompted event (infinite while passive). Virtual time advances only
//! in discrete jumps; a component never sees the global clock, only
//! durations.
//!
//! **Messages and ports.** Components exchange [`Message`] values over typed,
//! directed [`Port`]s. The topology guarantees at most one message per port
//! per instant; a bag holding two is a fatal contract breach and aborts the
//! run with a diagnostic naming the component and port.
//!
//! **Topology.** A [`Topology`](coupling::Topology) is an immutable
//! description of a coupled model: its components and the couplings between
//! their ports, fixed at construction. [`coupling::network`] couples two
//! [`Subnet`](models::Subnet)s into a bidirectional lossy channel;
//! [`coupling::abp_simulator`] couples [`Sender`](models::Sender),
//! [`Receiver`](models::Receiver) and the channel into the full ABP network,
//! exposing one control input and the packet-sent / ack-received output
//! streams.
//!
//! **Simulation.** A [`Simulation`] drives a topology: it owns the global
//! clock, advances it to the minimum over all components' next events and
//! scheduled external injections, evaluates outputs, routes them along the
//! couplings and fires exactly one transition per involved component.
//! Everything externally visible lands in a [`TraceLog`](trace::TraceLog)
//! passed in at construction, which can mirror the classic trace line format
//! and render the four-column report table.
//!
//! ## The protocol
//!
//! The sender transmits one packet at a time, tagging it with a single
//! alternating sequence bit (the first packet of a batch carries bit 1), and
//! retransmits on timeout until the matching acknowledgement arrives. The
//! receiver acknowledges every packet with its sequence bit after a fixed
//! preparation delay. Each direction of the channel forwards values with
//! probability 0.95 after a normally distributed delay, else drops them —
//! loss is the modeled failure mode the timeout exists for, not an error.
//!
//! ## Example
//!
//! ```rust
//! use abpsim::coupling::abp_simulator;
//! use abpsim::models::{Receiver, Sender, Subnet, SubnetParams};
//! use abpsim::trace::TraceLog;
//! use abpsim::{AtomicModel, Port, Simulation};
//!
//! // A deterministic run: lossless channels with a fixed 3-unit delay.
//! let models: Vec<Box<dyn AtomicModel>> = vec![
//!     Box::new(Sender::new("sender1")),
//!     Box::new(Receiver::new("receiver1")),
//!     Box::new(Subnet::new("subnet1", SubnetParams::reliable(), 1)),
//!     Box::new(Subnet::new("subnet2", SubnetParams::reliable(), 2)),
//! ];
//! let mut sim = Simulation::new(abp_simulator(), models, TraceLog::new());
//!
//! // Ask the sender for a batch of one packet at time zero.
//! sim.schedule(0.0, Port::ControlIn, 1.0);
//! sim.run_until(3600.0);
//!
//! let acks: Vec<f64> = sim
//!     .external_outputs()
//!     .iter()
//!     .filter(|(_, port, _)| *port == Port::AckReceivedOut)
//!     .map(|(_, _, msg)| msg.value)
//!     .collect();
//! assert_eq!(acks, [1.0]);
//! ```

#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]

pub mod component;
pub mod coupling;
pub mod generator;
pub mod message;
pub mod models;
pub mod port;
pub mod simulation;
pub mod trace;

pub use colored;
pub use component::{AtomicModel, Id, PASSIVE};
pub use message::Message;
pub use port::{Bag, Direction, Port};
pub use simulation::{Simulation, EPSILON};
