use des_calendar::prelude::*;
use serial_test::serial;

struct Bench {
    qdisc: CalendarQueueDisc,
    rotations: Vec<(SimTime, usize)>,
    enqueued: Vec<Result<(), Packet>>,
}

impl Bench {
    fn new(config: CalendarQueueConfig) -> Self {
        Self {
            qdisc: CalendarQueueDisc::new(QdiscId(1), config).unwrap(),
            rotations: Vec::new(),
            enqueued: Vec::new(),
        }
    }
}

#[derive(Debug)]
enum BenchEvent {
    Rotation(RotationEvent),
    Enqueue(Packet),
}

impl From<RotationEvent> for BenchEvent {
    fn from(value: RotationEvent) -> Self {
        Self::Rotation(value)
    }
}

impl Application for Bench {
    type EventSet = BenchEvent;

    fn at_sim_start(rt: &mut Runtime<Self>) {
        let (app, mut sched) = rt.split();
        app.qdisc.activate(&mut sched);
    }

    fn at_sim_end(rt: &mut Runtime<Self>) -> Result<(), RuntimeError> {
        let (app, mut sched) = rt.split();
        app.qdisc.deactivate(&mut sched);
        Ok(())
    }
}

impl EventSet<Bench> for BenchEvent {
    fn handle(self, rt: &mut Runtime<Bench>) {
        match self {
            BenchEvent::Rotation(event) => {
                let (app, mut sched) = rt.split();
                app.qdisc.handle_timer(event, &mut sched);
                app.rotations
                    .push((SimTime::now(), app.qdisc.rotation_offset()));
            }
            BenchEvent::Enqueue(packet) => {
                let result = rt.app.qdisc.enqueue(packet);
                rt.app.enqueued.push(result);
            }
        }
    }
}

fn small(bands: usize) -> CalendarQueueConfig {
    CalendarQueueConfig::default()
        .bands(bands)
        .rotation_interval(Duration::from_secs(1))
        .max_size(QueueSize::Bytes(25_000))
}

#[test]
#[serial]
fn rotations_advance_offset_modulo_bands() {
    let rt = Builder::seeded(1)
        .quiet()
        .max_time(SimTime::from(7.5))
        .build(Bench::new(small(4)));
    let (app, time, _) = rt.run().unwrap();

    assert_eq!(time, SimTime::from(7.0));
    assert_eq!(app.qdisc.rotation_count(), 7);
    assert_eq!(app.qdisc.rotation_offset(), 7 % 4);
    assert_eq!(app.qdisc.last_rotation_time(), SimTime::from(7.0));
    assert!(!app.qdisc.is_active());

    let offsets: Vec<usize> = app.rotations.iter().map(|(_, o)| *o).collect();
    assert_eq!(offsets, vec![1, 2, 3, 0, 1, 2, 3]);
    for (k, (t, _)) in app.rotations.iter().enumerate() {
        assert_eq!(*t, SimTime::from((k + 1) as f64));
    }
}

#[test]
#[serial]
fn rotation_outside_the_timer_keeps_one_pending() {
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    rt.start();
    assert_eq!(rt.num_events_pending(), 1);

    rt.dispatch_events_until(SimTime::from(0.5));
    {
        let (app, mut sched) = rt.split();
        app.qdisc
            .handle_timer(RotationEvent { qdisc: QdiscId(1) }, &mut sched);
    }
    assert_eq!(rt.app.qdisc.rotation_offset(), 1);
    assert_eq!(rt.num_events_pending(), 1);

    rt.dispatch_events_until(SimTime::from(3.0));
    assert_eq!(rt.app.qdisc.rotation_count(), 3);
    let times: Vec<SimTime> = rt.app.rotations.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![SimTime::from(1.5), SimTime::from(2.5)]);

    let (app, _, _) = rt.finish().unwrap();
    assert!(!app.qdisc.is_active());
}

#[test]
#[serial]
fn default_placement_of_both_flow_classes() {
    let config = CalendarQueueConfig::default()
        .bands(20)
        .rotation_interval(Duration::from_secs(1))
        .max_size(QueueSize::Bytes(25_000_000));
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(config));
    rt.add_event(BenchEvent::Enqueue(Packet::prefill(0, 8500)), SimTime::ZERO);
    rt.add_event(
        BenchEvent::Enqueue(Packet::decode(1, 2560, 5.0)),
        SimTime::ZERO,
    );
    rt.start();
    rt.dispatch_n_events(2);

    let qdisc = &rt.app.qdisc;
    assert!(rt.app.enqueued.iter().all(Result::is_ok));
    assert_eq!(qdisc.band_packet_count(0), Some(1));
    assert_eq!(qdisc.band_used(0), Some(8500));
    assert_eq!(qdisc.band_packet_count(4), Some(1));
    assert_eq!(qdisc.band_used(4), Some(2560));
    assert_eq!(qdisc.packet_count(), 2);
    assert_eq!(qdisc.byte_count(), 8500 + 2560);
}

#[test]
#[serial]
fn decode_target_follows_rotation() {
    let mut rt = Builder::seeded(1)
        .quiet()
        .build(Bench::new(small(20)));
    rt.start();
    rt.dispatch_events_until(SimTime::from(3.0));
    assert_eq!(rt.app.qdisc.rotation_offset(), 3);

    // (r + floor(d / I) - 1) mod N
    let qdisc = &mut rt.app.qdisc;
    assert_eq!(qdisc.deadline_target(5.0, Duration::ZERO), 7);
    assert_eq!(qdisc.deadline_target(5.9, Duration::ZERO), 7);
    assert_eq!(qdisc.deadline_target(1.0, Duration::ZERO), 3);
    assert_eq!(qdisc.deadline_target(19.0, Duration::ZERO), 1);

    qdisc.enqueue(Packet::decode(1, 1000, 10.0)).unwrap();
    assert_eq!(qdisc.band_packet_count(12), Some(1));
}

#[test]
#[serial]
fn decode_target_wraps_around_the_calendar() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(20)));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), small(20)).unwrap();

    // Beyond the horizon the target wraps modulo the band count.
    assert_eq!(qdisc.deadline_target(25.0, Duration::ZERO), 4);
    assert_eq!(qdisc.deadline_target(500.0, Duration::ZERO), 19);
    // Elapsed deadlines fold back to the band served last.
    assert_eq!(qdisc.deadline_target(0.5, Duration::ZERO), 19);
    assert_eq!(qdisc.deadline_target(5.0, Duration::from_secs(10)), 14);

    let mut late = Packet::decode(1, 1000, 5.0);
    late.tags.set_delay_budget(Duration::from_secs(2));
    qdisc.enqueue(late).unwrap();
    assert_eq!(qdisc.band_packet_count(2), Some(1));

    qdisc.enqueue(Packet::decode(2, 1000, 0.5)).unwrap();
    assert_eq!(qdisc.band_packet_count(19), Some(1));
    qdisc.enqueue(Packet::decode(3, 1000, 25.0)).unwrap();
    assert_eq!(qdisc.band_packet_count(4), Some(1));
}

#[test]
#[serial]
fn prefill_takes_earliest_band_with_room() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), small(4)).unwrap();

    for id in 0..5 {
        qdisc.enqueue(Packet::prefill(id, 10_000)).unwrap();
    }
    assert_eq!(qdisc.band_packet_count(0), Some(2));
    assert_eq!(qdisc.band_packet_count(1), Some(2));
    assert_eq!(qdisc.band_packet_count(2), Some(1));
    assert_eq!(qdisc.band_used(2), Some(10_000));
    assert_eq!(qdisc.band_packet_count(3), Some(0));

    // Smaller packets still fit into earlier bands.
    qdisc.enqueue(Packet::prefill(5, 5_000)).unwrap();
    assert_eq!(qdisc.band_packet_count(0), Some(3));
    assert_eq!(qdisc.band_used(0), Some(25_000));
}

#[test]
#[serial]
fn overflow_leaves_budget_untouched() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), small(4)).unwrap();

    for id in 0..8 {
        qdisc.enqueue(Packet::decode(id, 10_000, 2.0)).unwrap();
    }
    let used: Vec<_> = (0..4).map(|b| qdisc.band_used(b).unwrap()).collect();
    assert_eq!(used, vec![20_000; 4]);

    let rejected = qdisc.enqueue(Packet::decode(8, 10_000, 2.0)).unwrap_err();
    assert_eq!(rejected.id(), 8);
    assert!(rejected.tags.timestamp().is_none());
    let after: Vec<_> = (0..4).map(|b| qdisc.band_used(b).unwrap()).collect();
    assert_eq!(after, used);
    assert_eq!(qdisc.packet_count(), 8);
}

#[test]
#[serial]
fn packet_limited_bands_count_packets() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(2)));
    let config = small(2).max_size(QueueSize::Packets(2));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), config).unwrap();

    for id in 0..4 {
        qdisc.enqueue(Packet::prefill(id, 1)).unwrap();
    }
    assert_eq!(qdisc.band_used(0), Some(2));
    assert_eq!(qdisc.band_used(1), Some(2));
    assert!(qdisc.enqueue(Packet::prefill(4, 1)).is_err());
}

#[test]
#[serial]
fn sub_queue_limit_refuses_band() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(2)));
    let classes = vec![
        DropTailQueue::new(QueueSize::Packets(1)),
        DropTailQueue::new(QueueSize::Packets(1)),
    ];
    let mut qdisc =
        CalendarQueueDisc::with_classes(QdiscId(2), small(20), classes).unwrap();
    assert_eq!(qdisc.band_count(), 2);

    qdisc.enqueue(Packet::prefill(0, 100)).unwrap();
    qdisc.enqueue(Packet::prefill(1, 100)).unwrap();
    assert_eq!(qdisc.band_packet_count(1), Some(1));
    assert!(qdisc.enqueue(Packet::prefill(2, 100)).is_err());
    assert_eq!(qdisc.band_used(0), Some(100));
    assert_eq!(qdisc.band_used(1), Some(100));
}

#[test]
#[serial]
fn current_band_respects_remaining_link_capacity() {
    let config = small(4)
        .link_rate(10_000.0)
        .max_size(QueueSize::Bytes(1_000_000));
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(config));
    rt.start();
    rt.dispatch_events_until(SimTime::from(1.5));
    assert_eq!(rt.app.qdisc.rotation_offset(), 1);

    let qdisc = &mut rt.app.qdisc;
    assert!((qdisc.remaining_bytes() - 5_000.0).abs() < 1e-6);

    qdisc.enqueue(Packet::prefill(0, 4_000)).unwrap();
    assert_eq!(qdisc.band_packet_count(1), Some(1));
    assert!((qdisc.remaining_bytes() - 1_000.0).abs() < 1e-6);

    // Too large for the rest of this slot, but fine for the next band.
    qdisc.enqueue(Packet::prefill(1, 4_000)).unwrap();
    assert_eq!(qdisc.band_packet_count(1), Some(1));
    assert_eq!(qdisc.band_packet_count(2), Some(1));
}

#[test]
#[serial]
fn rotation_resets_expired_band_budget() {
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    rt.start();
    rt.app.qdisc.enqueue(Packet::prefill(0, 20_000)).unwrap();
    assert_eq!(rt.app.qdisc.band_used(0), Some(20_000));

    rt.dispatch_events_until(SimTime::from(1.0));
    assert_eq!(rt.app.qdisc.rotation_offset(), 1);
    assert_eq!(rt.app.qdisc.band_used(0), Some(0));
    assert_eq!(rt.app.qdisc.band_packet_count(0), Some(1));
}

#[test]
#[serial]
fn dequeue_follows_rotation_order() {
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    rt.start();
    {
        let qdisc = &mut rt.app.qdisc;
        assert!(qdisc.dequeue().is_none());
        assert!(qdisc.peek().is_none());
        qdisc.enqueue(Packet::prefill(0, 100)).unwrap();
        qdisc.enqueue(Packet::decode(1, 100, 3.0)).unwrap();
    }
    assert_eq!(rt.app.qdisc.band_packet_count(0), Some(1));
    assert_eq!(rt.app.qdisc.band_packet_count(2), Some(1));

    rt.dispatch_events_until(SimTime::from(1.0));
    let qdisc = &mut rt.app.qdisc;
    assert_eq!(qdisc.rotation_offset(), 1);
    assert_eq!(qdisc.peek().map(Packet::id), Some(1));
    assert_eq!(qdisc.dequeue().map(|p| p.id()), Some(1));
    assert_eq!(qdisc.dequeue().map(|p| p.id()), Some(0));
    assert!(qdisc.dequeue().is_none());
    assert!(qdisc.is_empty());
}

#[test]
#[serial]
fn timestamp_survives_a_second_discipline() {
    let mut rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    rt.start();

    let mut fifo = FifoQueueDisc::new(QdiscId(9), FifoQueueConfig::default());
    let mut calendar = CalendarQueueDisc::new(QdiscId(8), small(4)).unwrap();

    calendar.enqueue(Packet::decode(0, 1000, 5.0)).unwrap();
    rt.dispatch_events_until(SimTime::from(0.05));
    let packet = calendar.dequeue().unwrap();
    assert_eq!(packet.tags.timestamp().map(|t| t.0), Some(SimTime::ZERO));
    assert_eq!(
        packet.tags.delay_budget().map(|b| b.0),
        Some(Duration::ZERO)
    );

    fifo.enqueue(packet).unwrap();
    rt.dispatch_events_until(SimTime::from(0.25));
    let packet = fifo.dequeue().unwrap();
    assert_eq!(packet.tags.timestamp().map(|t| t.0), Some(SimTime::ZERO));
    assert_eq!(
        packet.tags.delay_budget().map(|b| b.0),
        Some(Duration::from_millis(150))
    );

    let report = calendar.report();
    assert_eq!(report.dequeued_decode, 1);
    assert_eq!(report.timeouts, 0);

    let report = fifo.report();
    assert_eq!(report.title, "FIFO Queue");
    assert_eq!(report.dequeued_decode, 1);
    assert_eq!(report.timeouts, 1);
    assert_eq!(report.average_delay, 0.25);
    assert_eq!(report.timeout_rate, 1.0);
}

#[test]
#[serial]
fn report_without_dequeues() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), small(4)).unwrap();
    qdisc.enqueue(Packet::decode(0, 100, 1.0)).unwrap();

    let report = qdisc.report();
    assert_eq!(report.title, "Calendar Queue");
    assert_eq!(report.dequeued_decode, 0);
    assert_eq!(report.average_delay, 0.0);
    assert_eq!(report.timeout_rate, 0.0);
    assert!(report
        .to_string()
        .starts_with("===== Calendar Queue Timeout Statistics ====="));
}

#[test]
#[serial]
fn priomap_assignment() {
    let _rt = Builder::seeded(1).quiet().build(Bench::new(small(4)));
    let mut qdisc = CalendarQueueDisc::new(QdiscId(2), small(4)).unwrap();

    assert_eq!(qdisc.band_for_priority(0).unwrap(), 1);
    qdisc.set_band_for_priority(0, 3).unwrap();
    assert_eq!(qdisc.band_for_priority(0).unwrap(), 3);
    assert!(matches!(
        qdisc.set_band_for_priority(0, 4),
        Err(ConfigError::BandOutOfRange { band: 4, bands: 4 })
    ));
    assert!(qdisc.band_for_priority(16).is_err());
}

#[test]
#[serial]
fn invalid_configurations_are_rejected() {
    assert!(matches!(
        CalendarQueueDisc::new(QdiscId(0), small(1)),
        Err(ConfigError::TooFewBands(1))
    ));
    assert!(matches!(
        CalendarQueueDisc::new(QdiscId(0), small(4).rotation_interval(Duration::ZERO)),
        Err(ConfigError::ZeroRotationInterval)
    ));
    assert!(CalendarQueueDisc::new(QdiscId(0), small(4).link_rate(0.0)).is_err());
}
