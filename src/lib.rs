//!
//! A deadline aware calendar queue, simulated on a discrete event core.
//!
//! The crate models a packet scheduler that partitions outgoing traffic into
//! time-indexed bands. A rotation timer advances the current band on a fixed
//! interval. Latency sensitive ("prefill") traffic is placed into the earliest
//! band with room, deadline bound ("decode") traffic into the latest band that
//! still meets its deadline. A plain FIFO discipline with identical accounting
//! serves as a baseline.
//!
//! # The event core
//!
//! Underneath sits a small event [`runtime`](crate::runtime) with a virtual
//! clock, a future event set and cancellable one-shot events.
//!
//! ```
//! use des_calendar::prelude::*;
//!
//! #[derive(Default)]
//! struct Beacon {
//!     sent: Vec<SimTime>,
//! }
//!
//! enum BeaconEvent {
//!     Emit,
//! }
//!
//! impl Application for Beacon {
//!     type EventSet = BeaconEvent;
//!     fn at_sim_start(rt: &mut Runtime<Self>) {
//!         rt.add_event_in(BeaconEvent::Emit, Duration::from_millis(100));
//!     }
//! }
//!
//! impl EventSet<Beacon> for BeaconEvent {
//!     fn handle(self, rt: &mut Runtime<Beacon>) {
//!         rt.app.sent.push(SimTime::now());
//!         if rt.app.sent.len() < 3 {
//!             rt.add_event_in(BeaconEvent::Emit, Duration::from_millis(100));
//!         }
//!     }
//! }
//!
//! let rt = Builder::seeded(123).quiet().build(Beacon::default());
//! let (app, end, _) = rt.run().unwrap();
//! assert_eq!(app.sent.len(), 3);
//! assert_eq!(end, SimTime::from_duration(Duration::from_millis(300)));
//! ```
//!
//! # Queue disciplines
//!
//! Disciplines implement [`QueueDisc`](crate::qdisc::QueueDisc). Timers of a
//! discipline are scheduled through any [`EventSink`](crate::runtime::EventSink),
//! so they can be embedded into arbitrary applications.
//!
//! ```
//! use des_calendar::prelude::*;
//!
//! let config = CalendarQueueConfig::default().bands(20);
//! let mut qdisc = CalendarQueueDisc::new(QdiscId(0), config).unwrap();
//!
//! qdisc.enqueue(Packet::prefill(0, 8500)).unwrap();
//! qdisc.enqueue(Packet::decode(1, 2560, 5.0)).unwrap();
//! assert_eq!(qdisc.band_packet_count(0), Some(1));
//! assert_eq!(qdisc.band_packet_count(4), Some(1));
//! ```
//!
//! A complete traffic scenario over a bottleneck link is available in
//! [`scenario`](crate::scenario), and through the `qdisc-sim` binary.
//!

pub mod prelude;

pub mod logger;
pub mod net;
pub mod qdisc;
pub mod runtime;
pub mod scenario;
pub mod time;
