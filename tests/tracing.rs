use des_calendar::{logger::format, prelude::*};
use tracing::{level_filters::LevelFilter, subscriber::with_default};

#[path = "common/mock.rs"]
mod mock;

fn subscriber(writer: &mock::CaptureWriter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(LevelFilter::TRACE)
        .event_format(format())
        .with_writer(writer.clone())
        .finish()
}

#[test]
#[serial_test::serial]
fn mock_output() {
    let writer = mock::CaptureWriter::new();
    with_default(subscriber(&writer), || {
        let _rt = Builder::seeded(123).quiet().build(Logged);

        tracing::info!(GENERAL = "Kenobi", "Hello there");
        assert_eq!(
            writer.content(),
            "[ 0ns ] INFO tracing: Hello there GENERAL=\"Kenobi\"\n"
        );
    });
}

#[test]
#[serial_test::serial]
fn span_recognition() {
    let writer = mock::CaptureWriter::new();
    with_default(subscriber(&writer), || {
        let _rt = Builder::seeded(123).quiet().build(Logged);

        let span = tracing::info_span!("link", rate = 20);
        let _guard = span.enter();
        tracing::warn!("saturated");
        assert_eq!(
            writer.content(),
            "[ 0ns ] WARN link{rate=20}: tracing: saturated\n"
        );
    });
}

struct Logged;

#[derive(Debug)]
enum LogEvent {
    Say(&'static str),
}

impl Application for Logged {
    type EventSet = LogEvent;
    fn at_sim_start(rt: &mut Runtime<Self>) {
        rt.add_event(LogEvent::Say("at(0s)"), SimTime::ZERO);
        rt.add_event(LogEvent::Say("at(5s)"), SimTime::from(5.0));
    }
}

impl EventSet<Logged> for LogEvent {
    fn handle(self, _rt: &mut Runtime<Logged>) {
        let LogEvent::Say(msg) = self;
        tracing::info!("says {msg}");
    }
}

#[test]
#[serial_test::serial]
fn time_recognition() {
    let writer = mock::CaptureWriter::new();
    with_default(subscriber(&writer), || {
        let _ = Builder::seeded(123).quiet().build(Logged).run();
        assert_eq!(
            writer.content(),
            "[ 0ns ] INFO tracing: says at(0s)\n[ 5s ] INFO tracing: says at(5s)\n"
        );
    });
}

struct Rotating {
    qdisc: CalendarQueueDisc,
}

#[derive(Debug)]
enum RotatingEvent {
    Rotation(RotationEvent),
}

impl From<RotationEvent> for RotatingEvent {
    fn from(value: RotationEvent) -> Self {
        Self::Rotation(value)
    }
}

impl Application for Rotating {
    type EventSet = RotatingEvent;
}

impl EventSet<Rotating> for RotatingEvent {
    fn handle(self, rt: &mut Runtime<Rotating>) {
        let RotatingEvent::Rotation(event) = self;
        let (app, mut sched) = rt.split();
        app.qdisc.handle_timer(event, &mut sched);
    }
}

#[test]
#[serial_test::serial]
fn calendar_rotation_is_logged() {
    let writer = mock::CaptureWriter::new();
    with_default(subscriber(&writer), || {
        let config = CalendarQueueConfig::default().bands(4);
        let qdisc = CalendarQueueDisc::new(QdiscId(7), config).unwrap();
        let mut rt = Builder::seeded(1).quiet().build(Rotating { qdisc });
        rt.start();
        {
            let (app, mut sched) = rt.split();
            app.qdisc.activate(&mut sched);
            app.qdisc
                .handle_timer(RotationEvent { qdisc: QdiscId(3) }, &mut sched);
        }
        rt.dispatch_n_events(1);

        let lines = writer.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[ 0ns ] DEBUG des_calendar::qdisc::calendar: "));
        assert!(lines[0].contains("calendar queue activated"));
        assert!(lines[1].starts_with("[ 0ns ] WARN "));
        assert!(lines[1].contains("ignoring timer event of qdisc#3"));
        assert!(lines[2].starts_with("[ 1s ] DEBUG "));
        assert!(lines[2].contains("rotated to band 1"));
        assert!(lines[2].contains("qdisc=qdisc#7"));
        assert_eq!(rt.app.qdisc.rotation_count(), 1);
    });
}
