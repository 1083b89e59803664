//!
//! A prefill/decode traffic scenario over a single bottleneck link.
//!
//! Requests arrive at random, each sending one latency sensitive prefill
//! packet followed by a train of deadline bound decode packets. All packets
//! pass through one queue discipline in front of a link, and are counted by
//! a sink on the other end.
//!
//! ```no_run
//! use des_calendar::scenario::{run, DisciplineKind, ScenarioConfig};
//!
//! let config = ScenarioConfig {
//!     discipline: DisciplineKind::Fifo,
//!     ..ScenarioConfig::default()
//! };
//! let report = run(config).unwrap();
//! println!("{report}");
//! ```
//!

use crate::{
    net::Packet,
    qdisc::{
        CalendarQueueDisc, ConfigError, FifoQueueDisc, QdiscId, QueueDisc, RotationEvent,
        StatsReport,
    },
    runtime::{Application, Builder, EventSet, EventSink, Runtime, RuntimeError, Scheduler},
    time::SimTime,
};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, info};

mod config;
pub use config::*;

mod source;
pub use source::*;

mod link;
pub use link::*;

mod sink;
pub use sink::*;

///
/// The state of a running scenario.
///
pub struct Scenario {
    config: ScenarioConfig,
    qdisc: Box<dyn QueueDisc>,
    source: Source,
    link: Link,
    sink: Sink,
    dropped: u64,
}

/// The events of a [`Scenario`].
#[derive(Debug)]
pub enum ScenarioEvent {
    /// A new request arrives at the source.
    RequestArrival,
    /// A packet is handed to the discipline.
    Send(Packet),
    /// The link finished a transmission.
    TransmissionDone,
    /// A timer of the discipline fired.
    Rotation(RotationEvent),
}

impl From<RotationEvent> for ScenarioEvent {
    fn from(event: RotationEvent) -> Self {
        Self::Rotation(event)
    }
}

impl From<TransmissionDone> for ScenarioEvent {
    fn from(_: TransmissionDone) -> Self {
        Self::TransmissionDone
    }
}

impl Scenario {
    /// Creates the scenario state.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario or discipline config is invalid.
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = QdiscId(0);
        let qdisc: Box<dyn QueueDisc> = match config.discipline {
            DisciplineKind::Calendar => {
                Box::new(CalendarQueueDisc::new(id, config.calendar.clone())?)
            }
            DisciplineKind::Fifo => Box::new(FifoQueueDisc::new(id, config.fifo.clone())),
        };

        Ok(Self {
            source: Source::new(&config),
            link: Link::new(config.link_bitrate),
            sink: Sink::new(),
            qdisc,
            config,
            dropped: 0,
        })
    }

    /// The scenario parameters.
    #[must_use]
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// The discipline in front of the link.
    #[must_use]
    pub fn qdisc(&self) -> &dyn QueueDisc {
        self.qdisc.as_ref()
    }

    /// The traffic source.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The bottleneck link.
    #[must_use]
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// The receiving sink.
    #[must_use]
    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// The number of packets the discipline refused.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, packet: Packet, sched: &mut Scheduler<'_, Self>) {
        match self.qdisc.enqueue(packet) {
            Ok(()) => {
                self.link.pull(self.qdisc.as_mut(), sched);
            }
            Err(packet) => {
                self.dropped += 1;
                debug!(packet = packet.id(), "dropped {}", packet);
            }
        }
    }

    /// Summarizes the run that ended at `sim_time` after `events` events.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self, sim_time: SimTime, events: usize) -> ScenarioReport {
        let secs = self.config.duration.as_secs_f64();
        ScenarioReport {
            discipline: self.config.discipline,
            seed: self.config.seed,
            sim_time,
            events,
            packets_sent: self.source.sent(),
            packets_dropped: self.dropped,
            packets_delivered: self.sink.packets(),
            bytes_delivered: self.sink.bytes(),
            goodput: self.sink.bytes() as f64 / secs,
            link_utilization: (self.link.busy_time().as_secs_f64() / secs).min(1.0),
            requests_started: self.config.requests - self.source.remaining(),
            requests_completed: self.sink.completed(),
            mean_completion_time: self.sink.mean_completion_time().as_secs_f64(),
            mean_prefill_time: self.sink.mean_prefill_time().as_secs_f64(),
            queue: self.qdisc.report(),
        }
    }
}

impl Application for Scenario {
    type EventSet = ScenarioEvent;

    fn at_sim_start(rt: &mut Runtime<Self>) {
        info!(
            discipline = %rt.app.config.discipline,
            seed = rt.app.config.seed,
            "scenario starting with {} requests",
            rt.app.config.requests
        );

        let (app, mut sched) = rt.split();
        app.qdisc.activate(&mut sched);
        rt.add_event(ScenarioEvent::RequestArrival, SimTime::now());
    }

    fn at_sim_end(rt: &mut Runtime<Self>) -> Result<(), RuntimeError> {
        let (app, mut sched) = rt.split();
        app.qdisc.deactivate(&mut sched);

        info!(
            delivered = app.sink.packets(),
            dropped = app.dropped,
            "scenario ended with {} packets buffered",
            app.qdisc.packet_count()
        );
        Ok(())
    }
}

impl EventSet<Scenario> for ScenarioEvent {
    fn handle(self, rt: &mut Runtime<Scenario>) {
        match self {
            Self::RequestArrival => {
                let (app, mut sched, rng) = rt.split_with_rng();
                let Some((request, emissions)) = app.source.start_request(rng) else {
                    return;
                };
                app.sink.open(request, app.source.packets_per_request());

                let now = SimTime::now();
                for (offset, packet) in emissions {
                    sched.add(ScenarioEvent::Send(packet), now + offset);
                }
                if app.source.remaining() > 0 {
                    let next = app.source.next_arrival(rng);
                    sched.add(ScenarioEvent::RequestArrival, now + next);
                }
            }
            Self::Send(packet) => {
                let (app, mut sched) = rt.split();
                app.send(packet, &mut sched);
            }
            Self::TransmissionDone => {
                let (app, mut sched) = rt.split();
                if let Some(packet) = app.link.complete() {
                    let request = app.source.request_of(packet.id());
                    app.sink.receive(&packet, request);
                }
                app.link.pull(app.qdisc.as_mut(), &mut sched);
            }
            Self::Rotation(event) => {
                let (app, mut sched) = rt.split();
                app.qdisc.handle_timer(event, &mut sched);
            }
        }
    }
}

///
/// The outcome of a scenario run.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// The discipline in front of the link.
    pub discipline: DisciplineKind,
    /// The seed of the run.
    pub seed: u64,
    /// The time of the last dispatched event.
    pub sim_time: SimTime,
    /// The number of dispatched events.
    pub events: usize,
    /// Packets handed to the discipline.
    pub packets_sent: u64,
    /// Packets refused by the discipline.
    pub packets_dropped: u64,
    /// Packets that reached the sink.
    pub packets_delivered: u64,
    /// Bytes that reached the sink.
    pub bytes_delivered: u64,
    /// Delivered bytes per second of simulated time.
    pub goodput: f64,
    /// The fraction of time the link was busy.
    pub link_utilization: f64,
    /// Requests that arrived.
    pub requests_started: u64,
    /// Requests whose packets were all delivered.
    pub requests_completed: usize,
    /// Mean time from request arrival to its last delivery in seconds.
    pub mean_completion_time: f64,
    /// Mean time from request arrival to its prefill delivery in seconds.
    pub mean_prefill_time: f64,
    /// The dequeue statistics of the discipline.
    pub queue: StatsReport,
}

impl Display for ScenarioReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.queue)?;
        writeln!(f, "Discipline: {} (seed {})", self.discipline, self.seed)?;
        writeln!(f, "Ended at {} after {} events", self.sim_time, self.events)?;
        writeln!(
            f,
            "Packets sent: {} dropped: {} delivered: {}",
            self.packets_sent, self.packets_dropped, self.packets_delivered
        )?;
        writeln!(f, "Total bytes received: {}", self.bytes_delivered)?;
        writeln!(f, "Goodput Bytes/sec: {}", self.goodput)?;
        writeln!(f, "Link utilization: {} %", self.link_utilization * 100.0)?;
        writeln!(
            f,
            "Requests completed: {} / {}",
            self.requests_completed, self.requests_started
        )?;
        writeln!(f, "Mean request completion time: {} s", self.mean_completion_time)?;
        write!(f, "Mean prefill completion time: {} s", self.mean_prefill_time)
    }
}

///
/// Runs a scenario to its configured duration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
///
/// Blocks while another runtime is alive.
///
pub fn run(config: ScenarioConfig) -> Result<ScenarioReport, RuntimeError> {
    let app = Scenario::new(config)?;
    let rt = Builder::seeded(app.config.seed)
        .quiet()
        .max_time(SimTime::from(app.config.duration))
        .build(app);

    let (app, time, profiler) = rt.run()?;
    Ok(app.report(time, profiler.event_count))
}
