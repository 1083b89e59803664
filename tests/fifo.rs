use des_calendar::prelude::*;
use serial_test::serial;

struct Clock;

#[derive(Debug)]
enum Tick {}

impl Application for Clock {
    type EventSet = Tick;
}

impl EventSet<Clock> for Tick {
    fn handle(self, _rt: &mut Runtime<Clock>) {
        match self {}
    }
}

fn clock() -> Runtime<Clock> {
    let mut rt = Builder::seeded(1).quiet().build(Clock);
    rt.start();
    rt
}

#[test]
#[serial]
fn strict_fifo_order() {
    let _rt = clock();
    let mut fifo = FifoQueueDisc::new(QdiscId(0), FifoQueueConfig::default());
    assert!(fifo.dequeue().is_none());

    fifo.enqueue(Packet::decode(0, 100, 10.0)).unwrap();
    fifo.enqueue(Packet::prefill(1, 8500)).unwrap();
    fifo.enqueue(Packet::decode(2, 100, 1.0)).unwrap();
    assert_eq!(fifo.packet_count(), 3);
    assert_eq!(fifo.byte_count(), 8700);
    assert_eq!(fifo.peek().map(Packet::id), Some(0));

    let order: Vec<u64> = std::iter::from_fn(|| fifo.dequeue()).map(|p| p.id()).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(fifo.is_empty());
}

#[test]
#[serial]
fn capacity_limits_drop_tail() {
    let _rt = clock();
    let config = FifoQueueConfig::default().max_size(QueueSize::Bytes(10_000));
    let mut fifo = FifoQueueDisc::new(QdiscId(0), config);

    fifo.enqueue(Packet::prefill(0, 8500)).unwrap();
    let rejected = fifo.enqueue(Packet::prefill(1, 8500)).unwrap_err();
    assert_eq!(rejected.id(), 1);
    assert!(rejected.tags.timestamp().is_none());
    fifo.enqueue(Packet::decode(2, 1500, 5.0)).unwrap();
    assert_eq!(fifo.byte_count(), 10_000);

    let config = FifoQueueConfig::default().max_size(QueueSize::Packets(1));
    let mut fifo = FifoQueueDisc::new(QdiscId(1), config);
    fifo.enqueue(Packet::prefill(0, 1)).unwrap();
    assert!(fifo.enqueue(Packet::prefill(1, 1)).is_err());
}

#[test]
#[serial]
fn delay_and_timeout_accounting() {
    let mut rt = clock();
    let config = FifoQueueConfig::default().timeout_threshold(Duration::from_millis(300));
    let mut fifo = FifoQueueDisc::new(QdiscId(0), config);

    fifo.enqueue(Packet::decode(0, 100, 5.0)).unwrap();
    fifo.enqueue(Packet::prefill(1, 100)).unwrap();
    rt.dispatch_events_until(SimTime::from(0.5));
    fifo.enqueue(Packet::decode(2, 100, 5.0)).unwrap();
    fifo.enqueue(Packet::new(3, 100)).unwrap();

    rt.dispatch_events_until(SimTime::from(0.75));
    let first = fifo.dequeue().unwrap();
    assert_eq!(first.tags.timestamp().map(|t| t.0), Some(SimTime::ZERO));
    assert_eq!(
        first.tags.delay_budget().map(|b| b.0),
        Some(Duration::from_millis(450))
    );
    let prefill = fifo.dequeue().unwrap();
    assert_eq!(prefill.tags.delay_budget().map(|b| b.0), Some(Duration::ZERO));
    let on_time = fifo.dequeue().unwrap();
    assert_eq!(on_time.tags.delay_budget().map(|b| b.0), Some(Duration::ZERO));
    // Unclassified packets are neither measured nor timed out.
    let plain = fifo.dequeue().unwrap();
    assert!(plain.tags.flow_class().is_none());

    let stats = fifo.stats();
    assert_eq!(stats.dequeued(), 2);
    assert_eq!(stats.timeouts(), 1);
    assert_eq!(stats.prefill_count(), 1);

    let report = fifo.report();
    assert_eq!(report.title, "FIFO Queue");
    assert_eq!(report.timeout_rate, 0.5);
    assert!((report.average_delay - 0.5).abs() < 1e-9);
    assert!((report.average_prefill_delay - 0.75).abs() < 1e-9);
}
