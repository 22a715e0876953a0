//! The timed-automaton contract every protocol component implements.

use crate::port::Bag;

/// Identifier of a component within a topology.
///
/// Assigned sequentially in the order components are declared; also the index
/// of the component in the model vector handed to the simulation.
pub type Id = u32;

/// Time-advance value of a passive component.
pub const PASSIVE: f64 = f64::INFINITY;

/// An atomic model: state plus the five operations a discrete-event scheduler
/// drives it through.
///
/// Virtual time is an `f64` of simulated seconds. The scheduler owns the
/// global clock; a component only ever sees durations — the elapsed time since
/// its last transition and its own time-advance.
///
/// The scheduler guarantees:
/// - [`output`](AtomicModel::output) is called immediately before an internal
///   or confluent transition, never before an external-only transition;
/// - all inputs of an instant are present in the bag before the transition runs;
/// - when an internal event and external input coincide,
///   [`confluent_transition`](AtomicModel::confluent_transition) resolves them.
pub trait AtomicModel {
    /// The instance name, used in diagnostics and trace lines.
    fn name(&self) -> &str;

    /// Reacts to the component's own time-advance elapsing with no input.
    /// Updates state only; any output was already collected via [`output`](AtomicModel::output).
    fn internal_transition(&mut self);

    /// Reacts to input arriving before the scheduled internal event.
    /// `elapsed` is the time since this component's last transition of any kind.
    fn external_transition(&mut self, elapsed: f64, inputs: &Bag);

    /// Resolves an internal event coinciding with external input.
    ///
    /// The policy is fixed: internal first, then external with zero elapsed
    /// time. Component logic depends on this ordering (it is how "ack arrives
    /// exactly at send time" is resolved), so implementors should not override
    /// it.
    fn confluent_transition(&mut self, _elapsed: f64, inputs: &Bag) {
        self.internal_transition();
        self.external_transition(0.0, inputs);
    }

    /// Emits this instant's output into `bag`. Pure function of current state.
    fn output(&self, bag: &mut Bag);

    /// Duration until the next internal event, [`PASSIVE`] when suspended.
    /// Pure function of current state.
    fn time_advance(&self) -> f64;
}
