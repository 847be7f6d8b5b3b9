//! Run event broadcasting: the bus, its sinks, and the event type.
//!
//! The scheduler and its workers push [`RunEvent`]s onto a single flume
//! channel; the [`EventBus`] listener task fans each event out to the
//! configured [`EventSink`]s (stdout, memory capture, or a live channel).

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::RunEvent;
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
