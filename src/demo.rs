//! Packet-switch demo model
//!
//! A small deterministic model used by the `scantrace` binary: four senders
//! push packets through a switch to four receivers, and a host CPU issues a
//! few bus transactions to a memory. Every step is recorded, which makes
//! the resulting file a handy fixture for trace viewers.
//!
//! Module tree:
//!
//! ```text
//! pkt_switch_top
//! ├── sender0..3
//! ├── switch            (fifo0..3 are plain objects, not declared)
//! ├── receiver0..3
//! └── host
//!     ├── cpu
//!     └── memory
//! clk                   (root object, not a module)
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::category::EventCategory;
use crate::error::Result;
use crate::format::format_bool;
use crate::hierarchy::{HierarchySource, StaticHierarchy};
use crate::ids::{ObjectId, TraceKey};
use crate::properties::PropertySet;
use crate::session::{MarkOptions, TraceSession};
use crate::subject::{CustomTrace, GenericPayload, ResponseStatus, Subject};
use crate::time::{ManualClock, SimTime, TimeSource};

pub const PORTS: usize = 4;

const SEND_INTERVAL: SimTime = SimTime::from_ns(10);
const SWITCH_LATENCY: SimTime = SimTime::from_ns(5);
const DELIVERY_LATENCY: SimTime = SimTime::from_ns(2);
const BUS_LATENCY: SimTime = SimTime::from_ns(20);

/// Knobs for one demo run
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub packets_per_sender: usize,
    pub transactions: usize,
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            packets_per_sender: 4,
            transactions: 3,
            seed: 0x5eed,
        }
    }
}

/// What a demo run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemoSummary {
    pub packets_sent: usize,
    pub deliveries: usize,
    pub transactions: usize,
    pub end_time_ps: u64,
}

/// The switch model's object tree and the handles the run needs
#[derive(Debug, Clone)]
pub struct SwitchModel {
    pub tree: StaticHierarchy,
    pub top: ObjectId,
    pub senders: [ObjectId; PORTS],
    pub switch: ObjectId,
    pub receivers: [ObjectId; PORTS],
    pub cpu: ObjectId,
    pub memory: ObjectId,
}

impl SwitchModel {
    pub fn build() -> Self {
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "pkt_switch_top");
        let senders = [0, 1, 2, 3].map(|i| tree.add_module(Some(top), format!("sender{}", i)));
        let switch = tree.add_module(Some(top), "switch");
        for i in 0..PORTS {
            tree.add_object(Some(switch), format!("fifo{}", i));
        }
        let receivers = [0, 1, 2, 3].map(|i| tree.add_module(Some(top), format!("receiver{}", i)));
        let host = tree.add_module(Some(top), "host");
        let cpu = tree.add_module(Some(host), "cpu");
        let memory = tree.add_module(Some(host), "memory");
        tree.add_object(None, "clk");

        Self {
            tree,
            top,
            senders,
            switch,
            receivers,
            cpu,
            memory,
        }
    }
}

/// A switched packet, traced as a custom subject
///
/// Senders reuse one packet buffer each; the buffer is retired from the
/// session before it is refilled.
#[derive(Debug, Clone)]
pub struct Packet {
    key: TraceKey,
    pub data: u8,
    pub sender: u8,
    pub dest: [bool; PORTS],
}

impl Packet {
    pub fn new(sender: u8) -> Self {
        Self {
            key: TraceKey::issue(),
            data: 0,
            sender,
            dest: [false; PORTS],
        }
    }

    fn refill<R: Rng>(&mut self, rng: &mut R) {
        self.data = rng.gen();
        let mask = rng.gen::<u8>() & 0x0f;
        // Every packet goes somewhere.
        let mask = if mask == 0 {
            1 << (self.sender as usize % PORTS)
        } else {
            mask
        };
        for (i, dest) in self.dest.iter_mut().enumerate() {
            *dest = mask & (1 << i) != 0;
        }
    }
}

impl CustomTrace for Packet {
    fn trace_key(&self) -> TraceKey {
        self.key
    }

    fn properties(&self) -> PropertySet {
        let mut props = PropertySet::new();
        props.insert("Sender", self.sender);
        for (i, dest) in self.dest.iter().enumerate() {
            props.insert(format!("Targets Receiver {}", i), format_bool(*dest));
        }
        props.insert("Data", format!("0x{:X}", self.data));
        props
    }
}

impl<'a> From<&'a Packet> for Subject<'a> {
    fn from(packet: &'a Packet) -> Self {
        Subject::Custom(packet)
    }
}

/// Run the model, recording into `session`
///
/// `clock` must be the time source the session reads.
pub fn run<H, T>(
    session: &mut TraceSession<H, T>,
    model: &SwitchModel,
    clock: &ManualClock,
    config: &DemoConfig,
) -> Result<DemoSummary>
where
    H: HierarchySource,
    T: TimeSource,
{
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = DemoSummary::default();

    let mut route = EventCategory::new("Route");
    route.add_property("Latency", SWITCH_LATENCY.to_trace_string());
    session.register_category(&route)?;

    let mut packets: Vec<Packet> = (0..PORTS as u8).map(Packet::new).collect();
    for round in 0..config.packets_per_sender {
        for (port, packet) in packets.iter_mut().enumerate() {
            if round > 0 {
                session.retire_trace(&*packet);
            }
            packet.refill(&mut rng);

            clock.advance(SEND_INTERVAL);
            session.mark(model.senders[port], &*packet, "Send")?;
            summary.packets_sent += 1;

            clock.advance(SWITCH_LATENCY);
            session.mark_with(
                model.switch,
                &*packet,
                &route,
                MarkOptions::new().property("Input Port", port),
            )?;

            for (dest, wanted) in packet.dest.iter().enumerate() {
                if *wanted {
                    clock.advance(DELIVERY_LATENCY);
                    session.mark(model.receivers[dest], &*packet, "Receive")?;
                    summary.deliveries += 1;
                }
            }
        }
    }

    for n in 0..config.transactions {
        let address = 0x1000 + (n as u64) * 4;
        let mut payload = if n % 2 == 0 {
            GenericPayload::write(address, vec![rng.gen(), rng.gen()])
        } else {
            GenericPayload::read(address, 2)
        };
        session.initialize_named_trace(&format!("bus{}", n), &payload)?;

        clock.advance(BUS_LATENCY);
        session.mark(model.cpu, &payload, "Request")?;

        if let Some(data) = payload.data_mut() {
            for byte in data.iter_mut() {
                if *byte == 0 {
                    *byte = rng.gen();
                }
            }
        }
        payload.set_response_status(ResponseStatus::Ok);
        clock.advance(BUS_LATENCY);
        session.mark(model.memory, &payload, "Response")?;
        summary.transactions += 1;
    }

    summary.end_time_ps = clock.now().as_ps();
    debug!(
        "Demo finished: {} packets, {} deliveries, {} transactions",
        summary.packets_sent, summary.deliveries, summary.transactions
    );
    Ok(summary)
}
