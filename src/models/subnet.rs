//! A lossy, delaying relay — one direction of the network.
//!
//! Passive until a value arrives; then forwards it after a normally
//! distributed propagation delay with the configured pass probability, or
//! silently drops it. Loss here is the expected failure mode the sender's
//! timeout exists for, not an error.

use log::debug;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;

use crate::component::{AtomicModel, PASSIVE};
use crate::message::Message;
use crate::port::{Bag, Port};

/// Relay parameters: loss and delay distribution.
#[derive(Clone, Copy, Debug)]
pub struct SubnetParams {
    /// Probability that a value is forwarded rather than dropped.
    pub pass_probability: f64,
    /// Mean of the propagation delay distribution.
    pub delay_mean: f64,
    /// Standard deviation of the propagation delay distribution.
    pub delay_std: f64,
}

impl Default for SubnetParams {
    fn default() -> Self {
        Self {
            pass_probability: 0.95,
            delay_mean: 3.0,
            delay_std: 1.0,
        }
    }
}

impl SubnetParams {
    /// A lossless channel with a fixed delay equal to the default mean.
    /// Useful for deterministic runs.
    pub fn reliable() -> Self {
        Self {
            pass_probability: 1.0,
            delay_std: 0.0,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct State {
    transmitting: bool,
    packet: i64,
    /// Count of values seen, for diagnostics only.
    index: i64,
    /// Drawn on arrival: whether this value survives the channel.
    deliver: bool,
    /// Drawn on arrival: this value's propagation delay.
    delay: f64,
}

/// One direction of the lossy channel.
/// Ports: [`Port::In`] in, [`Port::Out`] out.
///
/// Both the loss decision and the delay are drawn from the subnet's own
/// generator when the value arrives and held in state, keeping
/// [`output`](AtomicModel::output) and [`time_advance`](AtomicModel::time_advance)
/// pure. Each arrival draws fresh.
pub struct Subnet {
    name: String,
    params: SubnetParams,
    rng: Pcg64,
    state: State,
}

impl Subnet {
    /// Creates a passive subnet with its own generator seeded from `seed`.
    pub fn new(name: &str, params: SubnetParams, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            params,
            rng: Pcg64::seed_from_u64(seed),
            state: State {
                transmitting: false,
                packet: 0,
                index: 0,
                deliver: false,
                delay: PASSIVE,
            },
        }
    }

    /// Number of values this subnet has seen.
    pub fn index(&self) -> i64 {
        self.state.index
    }
}

impl AtomicModel for Subnet {
    fn name(&self) -> &str {
        &self.name
    }

    fn internal_transition(&mut self) {
        self.state.transmitting = false;
    }

    fn external_transition(&mut self, _elapsed: f64, inputs: &Bag) {
        self.state.index += 1;
        if let Some(msg) = inputs.one(Port::In, &self.name) {
            self.state.packet = msg.as_int();
            self.state.transmitting = true;
            self.state.deliver = self.rng.gen_bool(self.params.pass_probability);
            let normal = Normal::new(self.params.delay_mean, self.params.delay_std)
                .unwrap_or_else(|_| {
                    panic!("{}: invalid delay distribution {:?}", self.name, self.params)
                });
            // Integer granularity, never negative.
            self.state.delay = normal.sample(&mut self.rng).round().max(0.0);
            if !self.state.deliver {
                debug!("{}: dropping value {}", self.name, self.state.packet);
            }
        }
    }

    fn output(&self, bag: &mut Bag) {
        if self.state.transmitting && self.state.deliver {
            bag.push(Port::Out, Message::new(self.state.packet as f64));
        }
    }

    fn time_advance(&self) -> f64 {
        if self.state.transmitting {
            self.state.delay
        } else {
            PASSIVE
        }
    }
}
