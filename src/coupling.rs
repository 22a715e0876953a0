//! Immutable topology descriptors: which components exist and how their ports
//! are wired.
//!
//! A topology is built once through [`TopologyBuilder`] and never changes
//! afterwards; it is the authoritative definition of the network the
//! simulation drives. The hierarchical Network coupled model is flattened
//! here, at build time, so the runner only ever sees atomic components.

use crate::component::Id;
use crate::port::{Direction, Port};

/// The three kinds of coupling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplingKind {
    /// Outside world into an inner component.
    ExternalInput,
    /// Inner component out to the world.
    ExternalOutput,
    /// Component to component.
    Internal,
}

/// One end of a coupling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// A port on the coupled model's own boundary.
    Boundary(Port),
    /// A port on an inner component.
    Component(Id, Port),
}

/// A directed port-to-port wire, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coupling {
    /// Which of the three kinds this wire is.
    pub kind: CouplingKind,
    /// Source endpoint.
    pub from: Endpoint,
    /// Target endpoint.
    pub to: Endpoint,
}

/// A fixed graph of named components connected by typed port couplings.
#[derive(Debug)]
pub struct Topology {
    name: String,
    components: Vec<String>,
    couplings: Vec<Coupling>,
}

impl Topology {
    /// The coupled model's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component names, in [`Id`] order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// All coupling records.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    /// Looks a component up by name.
    pub fn component_id(&self, name: &str) -> Option<Id> {
        self.components
            .iter()
            .position(|c| c == name)
            .map(|i| i as Id)
    }

    /// Inner targets of a boundary input port.
    pub fn resolve_input(&self, boundary: Port) -> Vec<(Id, Port)> {
        self.couplings
            .iter()
            .filter(|c| c.kind == CouplingKind::ExternalInput && c.from == Endpoint::Boundary(boundary))
            .filter_map(|c| match c.to {
                Endpoint::Component(id, port) => Some((id, port)),
                Endpoint::Boundary(_) => None,
            })
            .collect()
    }

    /// Inner sources feeding a boundary output port.
    pub fn resolve_output(&self, boundary: Port) -> Vec<(Id, Port)> {
        self.couplings
            .iter()
            .filter(|c| {
                c.kind == CouplingKind::ExternalOutput && c.to == Endpoint::Boundary(boundary)
            })
            .filter_map(|c| match c.from {
                Endpoint::Component(id, port) => Some((id, port)),
                Endpoint::Boundary(_) => None,
            })
            .collect()
    }

    /// Inner targets of a component output port (internal couplings).
    pub fn internal_targets(&self, from: Id, port: Port) -> Vec<(Id, Port)> {
        self.couplings
            .iter()
            .filter(|c| c.kind == CouplingKind::Internal && c.from == Endpoint::Component(from, port))
            .filter_map(|c| match c.to {
                Endpoint::Component(id, port) => Some((id, port)),
                Endpoint::Boundary(_) => None,
            })
            .collect()
    }

    /// Boundary ports a component output port feeds (external-output couplings).
    pub fn output_boundaries(&self, from: Id, port: Port) -> Vec<Port> {
        self.couplings
            .iter()
            .filter(|c| {
                c.kind == CouplingKind::ExternalOutput && c.from == Endpoint::Component(from, port)
            })
            .filter_map(|c| match c.to {
                Endpoint::Boundary(port) => Some(port),
                Endpoint::Component(..) => None,
            })
            .collect()
    }
}

/// Builds a [`Topology`]; the result is immutable.
pub struct TopologyBuilder {
    name: String,
    components: Vec<String>,
    couplings: Vec<Coupling>,
}

impl TopologyBuilder {
    /// Starts a topology named `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            components: Vec::new(),
            couplings: Vec::new(),
        }
    }

    /// Declares a component; ids are assigned in declaration order.
    pub fn component(&mut self, name: &str) -> Id {
        assert!(
            !self.components.iter().any(|c| c == name),
            "{}: duplicate component name {}",
            self.name,
            name
        );
        self.components.push(name.to_string());
        (self.components.len() - 1) as Id
    }

    fn check_component(&self, id: Id) {
        assert!(
            (id as usize) < self.components.len(),
            "{}: coupling references unknown component id {}",
            self.name,
            id
        );
    }

    /// Wires a boundary input port to an inner input port.
    pub fn external_input(&mut self, boundary: Port, to: Id, port: Port) -> &mut Self {
        self.check_component(to);
        assert_eq!(boundary.direction(), Direction::In);
        assert_eq!(port.direction(), Direction::In);
        self.couplings.push(Coupling {
            kind: CouplingKind::ExternalInput,
            from: Endpoint::Boundary(boundary),
            to: Endpoint::Component(to, port),
        });
        self
    }

    /// Wires an inner output port to a boundary output port.
    pub fn external_output(&mut self, from: Id, port: Port, boundary: Port) -> &mut Self {
        self.check_component(from);
        assert_eq!(port.direction(), Direction::Out);
        assert_eq!(boundary.direction(), Direction::Out);
        self.couplings.push(Coupling {
            kind: CouplingKind::ExternalOutput,
            from: Endpoint::Component(from, port),
            to: Endpoint::Boundary(boundary),
        });
        self
    }

    /// Wires an inner output port to an inner input port.
    pub fn internal(&mut self, from: Id, from_port: Port, to: Id, to_port: Port) -> &mut Self {
        self.check_component(from);
        self.check_component(to);
        assert_eq!(from_port.direction(), Direction::Out);
        assert_eq!(to_port.direction(), Direction::In);
        self.couplings.push(Coupling {
            kind: CouplingKind::Internal,
            from: Endpoint::Component(from, from_port),
            to: Endpoint::Component(to, to_port),
        });
        self
    }

    /// Finishes the topology.
    pub fn build(self) -> Topology {
        Topology {
            name: self.name,
            components: self.components,
            couplings: self.couplings,
        }
    }
}

/// The bidirectional lossy channel: two subnets, one per direction, with no
/// coupling between them.
pub fn network() -> Topology {
    let mut b = TopologyBuilder::new("Network");
    let subnet1 = b.component("subnet1");
    let subnet2 = b.component("subnet2");
    b.external_input(Port::In1, subnet1, Port::In)
        .external_input(Port::In2, subnet2, Port::In)
        .external_output(subnet1, Port::Out, Port::Out1)
        .external_output(subnet2, Port::Out, Port::Out2);
    b.build()
}

/// The full ABP network: sender, receiver and the two directions of the
/// channel, with the [`network`] boundary flattened into direct wires.
///
/// External input: [`Port::ControlIn`]. External outputs:
/// [`Port::PacketSentOut`] and [`Port::AckReceivedOut`].
pub fn abp_simulator() -> Topology {
    let net = network();
    let mut b = TopologyBuilder::new("ABPSimulator");
    let sender = b.component("sender1");
    let receiver = b.component("receiver1");
    let base = b.components.len() as Id;
    for name in net.components() {
        b.component(name);
    }

    b.external_input(Port::ControlIn, sender, Port::ControlIn);
    // sender.dataOut -> Network.in1, Network.out1 -> receiver.in
    for (id, port) in net.resolve_input(Port::In1) {
        b.internal(sender, Port::DataOut, base + id, port);
    }
    for (id, port) in net.resolve_output(Port::Out1) {
        b.internal(base + id, port, receiver, Port::In);
    }
    // receiver.out -> Network.in2, Network.out2 -> sender.ackIn
    for (id, port) in net.resolve_input(Port::In2) {
        b.internal(receiver, Port::Out, base + id, port);
    }
    for (id, port) in net.resolve_output(Port::Out2) {
        b.internal(base + id, port, sender, Port::AckIn);
    }
    b.external_output(sender, Port::PacketSentOut, Port::PacketSentOut)
        .external_output(sender, Port::AckReceivedOut, Port::AckReceivedOut);
    b.build()
}
