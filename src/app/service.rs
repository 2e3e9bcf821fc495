//! Application service: the cooperative polling loop.
//!
//! [`ParkingAssist`] owns the orchestrator (which in turn owns every
//! peripheral FSM).  Each [`poll`](ParkingAssist::poll) fires every machine
//! exactly once in a fixed order, then drains the orchestrator's queued
//! events into an [`EventSink`].  All I/O flows through the board handle
//! injected at call sites, making the whole service testable with mock
//! adapters.
//!
//! ```text
//!  Board ──▶ ┌────────────────────────────────────────────┐ ──▶ EventSink
//!            │  button · front US · front display ·        │
//!            │  rear US · rear display · buzzer · urbanite │
//!            └────────────────────────────────────────────┘
//! ```

use log::{info, trace};

use crate::config::UrbaniteConfig;
use crate::error::Result;
use crate::fsm::Fired;
use crate::fsm::urbanite::{Peripherals, UrbaniteFsm, UrbaniteState};

use super::ports::{Board, EventSink};

// ───────────────────────────────────────────────────────────────
// ParkingAssist
// ───────────────────────────────────────────────────────────────

pub struct ParkingAssist<H> {
    urbanite: UrbaniteFsm<H>,
    config: UrbaniteConfig,
    poll_count: u64,
}

impl<H: Board> ParkingAssist<H> {
    /// Validate `config`, initialise every device through `hw` and wire the
    /// orchestrator.  Fails on the first unknown device id.
    pub fn new(config: UrbaniteConfig, hw: &mut H) -> Result<Self> {
        config.validate()?;
        let urbanite = UrbaniteFsm::new(&config, hw)?;
        info!(
            "ParkingAssist ready (on/off {} ms, change {} ms, pause {} ms, debounce {} ms)",
            config.on_off_press_time_ms,
            config.change_press_time_ms,
            config.pause_display_time_ms,
            config.button_debounce_ms,
        );
        Ok(Self {
            urbanite,
            config,
            poll_count: 0,
        })
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One loop iteration: fire every FSM once, then flush events.
    ///
    /// Returns the orchestrator transition, if one fired.
    pub fn poll(
        &mut self,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) -> Option<Fired<UrbaniteState>> {
        self.poll_count += 1;

        let p = self.urbanite.peripherals_mut();
        p.button.fire(hw);
        p.front.ultrasound.fire(hw);
        p.front.display.fire(hw);
        p.rear.ultrasound.fire(hw);
        p.rear.display.fire(hw);
        p.buzzer.fire(hw);
        let fired = self.urbanite.fire(hw);

        while let Some(record) = self.urbanite.pop_event() {
            sink.emit(&record);
        }
        if let Some(f) = fired {
            trace!("poll {}: {:?} -> {:?}", self.poll_count, f.from, f.to);
        }
        fired
    }

    /// Run `iterations` polls, calling `between` after each one.
    ///
    /// Simulations use `between` to advance their time base.
    pub fn run_for(
        &mut self,
        hw: &mut H,
        sink: &mut impl EventSink,
        iterations: u32,
        mut between: impl FnMut(&mut H),
    ) {
        for _ in 0..iterations {
            self.poll(hw, sink);
            between(hw);
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Current orchestrator state.
    pub fn state(&self) -> UrbaniteState {
        self.urbanite.state()
    }

    pub fn urbanite(&self) -> &UrbaniteFsm<H> {
        &self.urbanite
    }

    pub fn urbanite_mut(&mut self) -> &mut UrbaniteFsm<H> {
        &mut self.urbanite
    }

    pub fn peripherals(&self) -> &Peripherals<H> {
        self.urbanite.peripherals()
    }

    pub fn config(&self) -> &UrbaniteConfig {
        &self.config
    }

    /// Polls executed since construction.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }
}
