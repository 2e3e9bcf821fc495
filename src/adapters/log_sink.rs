//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing orchestrator events through the
//! `log` facade (serial console on a board, `env_logger` on the host).
//! A telemetry link would implement the same trait.

use log::info;

use crate::app::events::{EventRecord, UrbaniteEvent};
use crate::app::ports::EventSink;

/// Adapter that logs every [`EventRecord`] as a single line.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, record: &EventRecord) {
        self.emitted += 1;
        let t = record.millis;
        match record.event {
            UrbaniteEvent::SystemOn => info!("{t:>8} ms | POWER | on, sensing FRONT"),
            UrbaniteEvent::SystemOff => info!("{t:>8} ms | POWER | off"),
            UrbaniteEvent::Paused => info!("{t:>8} ms | PAUSE | display and buzzer muted"),
            UrbaniteEvent::Resumed => info!("{t:>8} ms | PAUSE | resumed"),
            UrbaniteEvent::ModeChanged(side) => info!("{t:>8} ms | MODE  | now sensing {side}"),
            UrbaniteEvent::Distance { side, cm } => info!("{t:>8} ms | DIST  | {side} {cm} cm"),
            UrbaniteEvent::EnteredSleep(state) => info!("{t:>8} ms | SLEEP | {state:?}"),
            UrbaniteEvent::Woke { from, to } => info!("{t:>8} ms | WAKE  | {from:?} -> {to:?}"),
        }
    }
}

/// Collects records in memory, for tests and scripted runs.
impl EventSink for Vec<EventRecord> {
    fn emit(&mut self, record: &EventRecord) {
        self.push(*record);
    }
}
