//! Outbound orchestrator events.
//!
//! The Urbanite FSM queues these from its actions; the
//! [`ParkingAssist`](super::service::ParkingAssist) service drains them into
//! an [`EventSink`](super::ports::EventSink) at the end of every poll.

use crate::fsm::urbanite::{Side, UrbaniteState};

/// Structured events emitted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrbaniteEvent {
    /// Long press while off: front sensing started.
    SystemOn,

    /// Long press while on: every sensor, display and the buzzer stopped.
    SystemOff,

    /// Display and buzzer muted (danger override still applies).
    Paused,

    /// Display and buzzer unmuted.
    Resumed,

    /// Live sensor pair swapped.
    ModeChanged(Side),

    /// A new batch-median distance was read from the live sensor.
    Distance { side: Side, cm: u32 },

    /// The orchestrator entered a low-power wait.
    EnteredSleep(UrbaniteState),

    /// The orchestrator left a low-power wait.
    Woke { from: UrbaniteState, to: UrbaniteState },
}

/// An event stamped with the board time at which it was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub millis: u32,
    pub event: UrbaniteEvent,
}
