//! The discrete-event runner driving a coupled topology.
//!
//! Single-threaded and driven by virtual time: the runner owns the global
//! clock and advances it in discrete jumps to the next event — the minimum
//! over every component's scheduled internal event and the next scheduled
//! external injection. At each instant it collects the outputs of imminent
//! components, routes them along the topology's couplings, then fires exactly
//! one transition per involved component: confluent when an internal event
//! and input coincide, internal when only the time-advance elapsed, external
//! when only input arrived. No two transitions ever run concurrently and no
//! state is shared between components.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::component::{AtomicModel, Id};
use crate::coupling::Topology;
use crate::generator::InputScript;
use crate::message::Message;
use crate::port::{Bag, Port};
use crate::trace::{TraceLog, TraceRecord};

/// Tolerance for comparing virtual times.
pub const EPSILON: f64 = 1e-9;

/// Component name used for trace records of injected inputs.
const GENERATOR: &str = "generator_con";

struct Injection {
    time: f64,
    to: Id,
    port: Port,
    msg: Message,
}

/// A configured simulation run: components, wiring, clock and trace.
pub struct Simulation {
    topology: Topology,
    models: Vec<Box<dyn AtomicModel>>,
    clock: f64,
    /// Per component, the time of its last transition of any kind.
    last_transition: Vec<f64>,
    /// Pending injections, sorted by time.
    pending: Vec<Injection>,
    trace: TraceLog,
    external_outputs: Vec<(f64, Port, Message)>,
}

impl Simulation {
    /// Builds a simulation over `topology`, with `models` given in the
    /// topology's component order. The trace sink is threaded in explicitly;
    /// there is no global logging state.
    ///
    /// Panics if the models do not match the topology's components.
    pub fn new(topology: Topology, models: Vec<Box<dyn AtomicModel>>, trace: TraceLog) -> Self {
        assert_eq!(
            topology.components().len(),
            models.len(),
            "{}: topology declares {} components but {} models were supplied",
            topology.name(),
            topology.components().len(),
            models.len()
        );
        for (declared, model) in topology.components().iter().zip(&models) {
            assert_eq!(
                declared,
                model.name(),
                "{}: model order does not match the topology",
                topology.name()
            );
        }
        let count = models.len();
        Self {
            topology,
            models,
            clock: 0.0,
            last_transition: vec![0.0; count],
            pending: Vec::new(),
            trace,
            external_outputs: Vec::new(),
        }
    }

    /// The current virtual time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// The topology this run drives.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The trace so far.
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Consumes the simulation, returning the trace.
    pub fn into_trace(self) -> TraceLog {
        self.trace
    }

    /// Everything emitted on the topology's boundary output ports.
    pub fn external_outputs(&self) -> &[(f64, Port, Message)] {
        &self.external_outputs
    }

    /// Schedules `value` for delivery at `time` on the boundary input `port`.
    ///
    /// Panics if the port has no external-input coupling or `time` is in the
    /// past — both are configuration errors.
    pub fn schedule(&mut self, time: f64, port: Port, value: f64) {
        assert!(
            time >= self.clock,
            "{}: cannot schedule input at {} before current time {}",
            self.topology.name(),
            time,
            self.clock
        );
        let targets = self.topology.resolve_input(port);
        assert!(
            !targets.is_empty(),
            "{}: no external-input coupling for boundary port {}",
            self.topology.name(),
            port
        );
        for (to, to_port) in targets {
            let idx = self
                .pending
                .partition_point(|inj| inj.time <= time);
            self.pending.insert(
                idx,
                Injection {
                    time,
                    to,
                    port: to_port,
                    msg: Message::new(value),
                },
            );
        }
    }

    /// Schedules every entry of `script` on the boundary input `port`.
    pub fn schedule_script(&mut self, script: &InputScript, port: Port) {
        for entry in script.entries() {
            self.schedule(entry.time, port, entry.value);
        }
    }

    /// The virtual time of the next event, infinite when nothing is pending.
    pub fn next_event_time(&self) -> f64 {
        let mut next = self.pending.first().map_or(f64::INFINITY, |inj| inj.time);
        for (i, model) in self.models.iter().enumerate() {
            next = next.min(self.last_transition[i] + model.time_advance());
        }
        next
    }

    /// Advances to the next event and fires it; returns its time, or `None`
    /// when every component is passive and no injections remain.
    pub fn step(&mut self) -> Option<f64> {
        let t = self.next_event_time();
        if !t.is_finite() {
            return None;
        }
        self.clock = t;

        let imminent: Vec<bool> = self
            .models
            .iter()
            .enumerate()
            .map(|(i, m)| self.last_transition[i] + m.time_advance() <= t + EPSILON)
            .collect();
        debug!(
            "t={} imminent: [{}]",
            t,
            self.models
                .iter()
                .zip(&imminent)
                .filter(|(_, imm)| **imm)
                .map(|(m, _)| m.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        // Outputs first, for every imminent component, routed before any
        // transition runs.
        let mut inboxes: FxHashMap<usize, Bag> = FxHashMap::default();
        for i in 0..self.models.len() {
            if !imminent[i] {
                continue;
            }
            let mut out = Bag::new();
            self.models[i].output(&mut out);
            for (port, msgs) in out.iter() {
                for msg in msgs {
                    let record = TraceRecord {
                        time: t,
                        value: msg.value,
                        port,
                        component: self.models[i].name().to_string(),
                    };
                    trace!("emitted {}", record.to_json());
                    self.trace.record(record);
                    for (to, to_port) in self.topology.internal_targets(i as Id, port) {
                        inboxes.entry(to as usize).or_default().push(to_port, *msg);
                    }
                    for boundary in self.topology.output_boundaries(i as Id, port) {
                        self.external_outputs.push((t, boundary, *msg));
                    }
                }
            }
        }

        // Injections due at this instant join the same input bags.
        while self
            .pending
            .first()
            .is_some_and(|inj| inj.time <= t + EPSILON)
        {
            let inj = self.pending.remove(0);
            self.trace.record(TraceRecord {
                time: t,
                value: inj.msg.value,
                port: Port::Out,
                component: GENERATOR.to_string(),
            });
            inboxes.entry(inj.to as usize).or_default().push(inj.port, inj.msg);
        }

        // One transition per involved component.
        for i in 0..self.models.len() {
            let inputs = inboxes.remove(&i);
            let elapsed = t - self.last_transition[i];
            match (imminent[i], inputs) {
                (true, Some(bag)) => {
                    self.models[i].confluent_transition(elapsed, &bag);
                    self.last_transition[i] = t;
                }
                (true, None) => {
                    self.models[i].internal_transition();
                    self.last_transition[i] = t;
                }
                (false, Some(bag)) => {
                    self.models[i].external_transition(elapsed, &bag);
                    self.last_transition[i] = t;
                }
                (false, None) => {}
            }
        }
        Some(t)
    }

    /// Runs events up to and including `horizon`; returns the number of
    /// steps executed.
    pub fn run_until(&mut self, horizon: f64) -> usize {
        let mut steps = 0;
        while self.next_event_time() <= horizon {
            if self.step().is_none() {
                break;
            }
            steps += 1;
        }
        steps
    }
}
