pub use crate::runtime::{
    Application, Builder, Event, EventId, EventSet, EventSink, PeriodicTimer, Profiler, Runtime,
    RuntimeError, RuntimeLimit, Scheduler,
};

pub use crate::time::{Duration, SimTime};

pub use crate::net::{
    DeadlineTag, DelayBudgetTag, FlowClass, Packet, PacketTags, Tag, TagError, TimestampTag,
};

pub use crate::qdisc::{
    CalendarQueueConfig, CalendarQueueDisc, ConfigError, DropTailQueue, FifoQueueConfig,
    FifoQueueDisc, Priomap, QdiscId, QueueDisc, QueueSize, QueueStats, RotationEvent, StatsReport,
};
