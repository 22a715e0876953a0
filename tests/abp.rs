//! End-to-end runs of the ABP network and of a sender driven standalone.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use abpsim::coupling::{abp_simulator, TopologyBuilder};
use abpsim::generator::InputScript;
use abpsim::models::{Receiver, Sender, Subnet, SubnetParams};
use abpsim::trace::{parse_trace, render_table, TraceLog};
use abpsim::{AtomicModel, Port, Simulation};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn abp(params1: SubnetParams, params2: SubnetParams, trace: TraceLog) -> Simulation {
    let models: Vec<Box<dyn AtomicModel>> = vec![
        Box::new(Sender::new("sender1")),
        Box::new(Receiver::new("receiver1")),
        Box::new(Subnet::new("subnet1", params1, 0xABCD)),
        Box::new(Subnet::new("subnet2", params2, 0xDCBA)),
    ];
    Simulation::new(abp_simulator(), models, trace)
}

fn boundary_values(sim: &Simulation, port: Port) -> Vec<f64> {
    sim.external_outputs()
        .iter()
        .filter(|(_, p, _)| *p == port)
        .map(|(_, _, msg)| msg.value)
        .collect()
}

fn traced_values(sim: &Simulation, component: &str, port: Port) -> Vec<f64> {
    sim.trace()
        .records()
        .iter()
        .filter(|r| r.component == component && r.port == port)
        .map(|r| r.value)
        .collect()
}

#[test]
fn scenario_a_three_packets_over_a_perfect_channel() {
    init_logger();
    let reliable = SubnetParams::reliable();
    let mut sim = abp(reliable, reliable, TraceLog::new());
    sim.schedule(0.0, Port::ControlIn, 3.0);
    sim.run_until(3600.0);

    assert_eq!(traced_values(&sim, "sender1", Port::DataOut), [11.0, 20.0, 31.0]);
    assert_eq!(boundary_values(&sim, Port::PacketSentOut), [1.0, 2.0, 3.0]);
    assert_eq!(boundary_values(&sim, Port::AckReceivedOut), [1.0, 0.0, 1.0]);
    // Batch done: everything passive again.
    assert!(!sim.next_event_time().is_finite());
}

#[test]
fn lost_data_is_retransmitted_unchanged() {
    init_logger();
    let black_hole = SubnetParams {
        pass_probability: 0.0,
        ..SubnetParams::default()
    };
    let mut sim = abp(black_hole, SubnetParams::reliable(), TraceLog::new());
    sim.schedule(0.0, Port::ControlIn, 1.0);
    sim.run_until(200.0);

    let sent = traced_values(&sim, "sender1", Port::DataOut);
    assert!(sent.len() > 2, "expected repeated retransmissions, got {:?}", sent);
    assert!(sent.iter().all(|v| *v == 11.0));
    // Nothing ever got through.
    assert!(boundary_values(&sim, Port::AckReceivedOut).is_empty());
}

#[test]
fn lost_acks_leave_the_packet_pending_unchanged() {
    init_logger();
    let black_hole = SubnetParams {
        pass_probability: 0.0,
        ..SubnetParams::default()
    };
    let mut sim = abp(SubnetParams::reliable(), black_hole, TraceLog::new());
    sim.schedule(0.0, Port::ControlIn, 2.0);
    sim.run_until(200.0);

    let sent = traced_values(&sim, "sender1", Port::DataOut);
    assert!(sent.len() > 2);
    assert!(sent.iter().all(|v| *v == 11.0));
    // The receiver keeps re-acknowledging bit 1; none reach the sender.
    let acks = traced_values(&sim, "receiver1", Port::Out);
    assert!(!acks.is_empty());
    assert!(acks.iter().all(|v| *v == 1.0));
}

#[test]
fn eventual_delivery_under_default_loss() {
    init_logger();
    let defaults = SubnetParams::default();
    let mut sim = abp(defaults, defaults, TraceLog::new());
    sim.schedule(0.0, Port::ControlIn, 10.0);
    sim.run_until(100_000.0);

    // Every packet of the batch eventually gets through.
    let acks = boundary_values(&sim, Port::AckReceivedOut);
    assert_eq!(acks.len(), 10);
    assert!(!sim.next_event_time().is_finite());

    // Single in-flight packet: every transmission carries the number right
    // after the last acknowledged one, retransmissions included.
    let mut acked = 0_i64;
    for (_, port, msg) in sim.external_outputs() {
        match port {
            Port::PacketSentOut => {
                assert_eq!(msg.value as i64, acked + 1, "a second packet went in flight");
            }
            Port::AckReceivedOut => acked += 1,
            _ => {}
        }
    }
    assert_eq!(acked, 10);
}

#[test]
fn alternation_holds_for_every_transmission() {
    init_logger();
    let defaults = SubnetParams::default();
    let mut sim = abp(defaults, defaults, TraceLog::new());
    sim.schedule(0.0, Port::ControlIn, 5.0);
    sim.run_until(100_000.0);

    for value in traced_values(&sim, "sender1", Port::DataOut) {
        let packet_num = (value as i64) / 10;
        let bit = (value as i64) % 10;
        // Retransmissions keep the bit; fresh packets alternate from bit 1.
        assert_eq!(bit, packet_num % 2);
    }
}

#[test]
fn control_stream_can_come_from_a_script() {
    init_logger();
    let script = InputScript::parse("# start one batch\n0 3\n").unwrap();
    let reliable = SubnetParams::reliable();
    let mut sim = abp(reliable, reliable, TraceLog::new());
    sim.schedule_script(&script, Port::ControlIn);
    sim.run_until(3600.0);
    assert_eq!(boundary_values(&sim, Port::AckReceivedOut), [1.0, 0.0, 1.0]);
}

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn trace_file_round_trips_and_renders() {
    init_logger();
    let buf = SharedBuf::default();
    let reliable = SubnetParams::reliable();
    let mut sim = abp(reliable, reliable, TraceLog::with_writer(Box::new(buf.clone())));
    sim.schedule(0.0, Port::ControlIn, 2.0);
    sim.run_until(3600.0);

    let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
    let parsed = parse_trace(&text).unwrap();
    assert_eq!(&parsed, sim.trace().records());

    let table = render_table(&parsed);
    assert!(table.starts_with(&format!(
        "{:>7}{:>20}{:>14}{:>22}\n",
        "Time", "Value", "Port", "Component"
    )));
    // Two packets: two dataOut rows reach the table, control noise does not.
    assert_eq!(table.matches("dataOut").count(), 2);
    assert!(!table.contains("controlIn"));
}

#[test]
fn standalone_sender_driven_by_injected_acks() {
    init_logger();
    // The sender alone, its ports lifted to the boundary.
    let mut b = TopologyBuilder::new("SenderTest");
    let sender = b.component("sender1");
    b.external_input(Port::ControlIn, sender, Port::ControlIn)
        .external_input(Port::AckIn, sender, Port::AckIn)
        .external_output(sender, Port::DataOut, Port::DataOut)
        .external_output(sender, Port::PacketSentOut, Port::PacketSentOut)
        .external_output(sender, Port::AckReceivedOut, Port::AckReceivedOut);
    let models: Vec<Box<dyn AtomicModel>> = vec![Box::new(Sender::new("sender1"))];
    let mut sim = Simulation::new(b.build(), models, TraceLog::new());

    sim.schedule(0.0, Port::ControlIn, 3.0);
    for (time, bit) in [(16.0, 1.0), (42.0, 0.0), (60.0, 1.0)] {
        sim.schedule(time, Port::AckIn, bit);
    }
    sim.run_until(3600.0);

    assert_eq!(boundary_values(&sim, Port::DataOut), [11.0, 20.0, 31.0]);
    assert_eq!(boundary_values(&sim, Port::PacketSentOut), [1.0, 2.0, 3.0]);
    assert_eq!(boundary_values(&sim, Port::AckReceivedOut), [1.0, 0.0, 1.0]);
    assert!(!sim.next_event_time().is_finite());
}
