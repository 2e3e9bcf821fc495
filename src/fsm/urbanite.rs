//! Top-level parking-assist orchestrator ("Urbanite").
//!
//! ```text
//!                 [on press]                         [change press]
//!   OFF ─────────────────────────▶ MEASURE_FRONT ◀──────────────────▶ MEASURE_REAR
//!    │ ▲ ◀──────[off press]─────────┤  │ ▲ ⟲ pause / distance             │ ▲
//!    │ │                            │  │ │                                │ │
//! [idle][activity]               [idle][new measure]                [idle][new measure]
//!    ▼ │                            ▼  │                                ▼ │
//!  SLEEP_WHILE_OFF          SLEEP_WHILE_ON_FRONT                SLEEP_WHILE_ON_REAR
//! ```
//!
//! The orchestrator owns every peripheral FSM.  It never fires them itself
//! (the polling service does, in a fixed order); it only reads their
//! published values through guards and commands them from actions.
//!
//! Button presses are classified into tiers by length.  Tiers are checked
//! from the longest down, so a press at or above the on/off threshold is
//! always on/off even though it is also longer than the change threshold.
//!
//! Rows are evaluated in declared order and the order carries meaning:
//! on/off beats pause, pause beats a pending distance, a pending distance
//! beats a sensor swap, and sleep is only considered when nothing else
//! matched.

use core::fmt;

use heapless::Deque;
use log::{info, warn};

use super::button::ButtonFsm;
use super::buzzer::BuzzerFsm;
use super::display::{DisplayFsm, WARNING_MIN_CM};
use super::ultrasound::UltrasoundFsm;
use super::{Fired, Fsm, Transition};
use crate::app::events::{EventRecord, UrbaniteEvent};
use crate::app::ports::{
    Board, FRONT_PARKING_DISPLAY, FRONT_PARKING_SENSOR, PARKING_BUTTON, PARKING_BUZZER,
    REAR_PARKING_DISPLAY, REAR_PARKING_SENSOR,
};
use crate::config::UrbaniteConfig;
use crate::error::Result;

/// Below this distance a paused system shows and sounds anyway.
pub const DANGER_OVERRIDE_CM: u32 = (WARNING_MIN_CM / 2) as u32;

/// Capacity of the outbound event queue.
pub const EVENT_QUEUE_LEN: usize = 16;

// ───────────────────────────────────────────────────────────────
// States and sides
// ───────────────────────────────────────────────────────────────

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrbaniteState {
    Off,
    MeasureFront,
    MeasureRear,
    SleepWhileOff,
    SleepWhileOnFront,
    SleepWhileOnRear,
}

impl UrbaniteState {
    pub fn is_sleep(self) -> bool {
        matches!(
            self,
            Self::SleepWhileOff | Self::SleepWhileOnFront | Self::SleepWhileOnRear
        )
    }
}

/// Which sensor pair is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Rear,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "FRONT"),
            Self::Rear => write!(f, "REAR"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Press classification
// ───────────────────────────────────────────────────────────────

/// Meaning of a completed button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTier {
    /// No unread press.
    None,
    /// Shorter than the pause threshold.
    NoOp,
    Pause,
    Change,
    OnOff,
}

/// Press-length thresholds, in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressThresholds {
    pub on_off_ms: u32,
    pub change_ms: u32,
    pub pause_ms: u32,
}

impl PressThresholds {
    pub fn classify(&self, duration_ms: u32) -> PressTier {
        match duration_ms {
            0 => PressTier::None,
            d if d >= self.on_off_ms => PressTier::OnOff,
            d if d >= self.change_ms => PressTier::Change,
            d if d >= self.pause_ms => PressTier::Pause,
            _ => PressTier::NoOp,
        }
    }
}

impl From<&UrbaniteConfig> for PressThresholds {
    fn from(c: &UrbaniteConfig) -> Self {
        Self {
            on_off_ms: c.on_off_press_time_ms,
            change_ms: c.change_press_time_ms,
            pause_ms: c.pause_display_time_ms,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Owned peripherals
// ───────────────────────────────────────────────────────────────

/// One ultrasound sensor and the display that shows its reading.
pub struct SensorPair<H> {
    pub ultrasound: UltrasoundFsm<H>,
    pub display: DisplayFsm<H>,
}

/// Every peripheral FSM the orchestrator coordinates.
pub struct Peripherals<H> {
    pub button: ButtonFsm<H>,
    pub front: SensorPair<H>,
    pub rear: SensorPair<H>,
    pub buzzer: BuzzerFsm<H>,
}

impl<H: Board> Peripherals<H> {
    /// Build the reference board set: one button, front and rear sensor
    /// pairs, one buzzer.
    pub fn reference(button_debounce_ms: u32, hw: &mut H) -> Result<Self> {
        Ok(Self {
            button: ButtonFsm::new(PARKING_BUTTON, button_debounce_ms, hw)?,
            front: SensorPair {
                ultrasound: UltrasoundFsm::new(FRONT_PARKING_SENSOR, hw)?,
                display: DisplayFsm::new(FRONT_PARKING_DISPLAY, hw)?,
            },
            rear: SensorPair {
                ultrasound: UltrasoundFsm::new(REAR_PARKING_SENSOR, hw)?,
                display: DisplayFsm::new(REAR_PARKING_DISPLAY, hw)?,
            },
            buzzer: BuzzerFsm::new(PARKING_BUZZER, hw)?,
        })
    }

    pub fn pair(&self, side: Side) -> &SensorPair<H> {
        match side {
            Side::Front => &self.front,
            Side::Rear => &self.rear,
        }
    }

    /// `(live, other, buzzer)` as disjoint mutable borrows.
    fn split_mut(
        &mut self,
        live: Side,
    ) -> (&mut SensorPair<H>, &mut SensorPair<H>, &mut BuzzerFsm<H>) {
        match live {
            Side::Front => (&mut self.front, &mut self.rear, &mut self.buzzer),
            Side::Rear => (&mut self.rear, &mut self.front, &mut self.buzzer),
        }
    }

    /// Whether any peripheral needs the loop to keep running.
    pub fn check_activity(&self) -> bool {
        self.button.check_activity()
            || self.front.ultrasound.check_activity()
            || self.front.display.check_activity()
            || self.rear.ultrasound.check_activity()
            || self.rear.display.check_activity()
            || self.buzzer.check_activity()
    }
}

// ───────────────────────────────────────────────────────────────
// Context
// ───────────────────────────────────────────────────────────────

pub struct UrbaniteCtx<H> {
    periph: Peripherals<H>,
    thresholds: PressThresholds,
    is_paused: bool,
    is_rear: bool,
    events: Deque<EventRecord, EVENT_QUEUE_LEN>,
}

impl<H: Board> UrbaniteCtx<H> {
    fn live_side(&self) -> Side {
        if self.is_rear { Side::Rear } else { Side::Front }
    }

    fn press_tier(&self) -> PressTier {
        self.thresholds.classify(self.periph.button.duration())
    }

    /// Queue an event; the oldest one is dropped when the queue is full.
    fn push_event(&mut self, millis: u32, event: UrbaniteEvent) {
        if self.events.is_full() {
            if let Some(dropped) = self.events.pop_front() {
                warn!("URBANITE: event queue full, dropping {:?}", dropped.event);
            }
        }
        if let Err(rejected) = self.events.push_back(EventRecord { millis, event }) {
            warn!("URBANITE: event queue rejected {:?}", rejected.event);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Guards
// ───────────────────────────────────────────────────────────────

fn check_on_off<H: Board>(ctx: &UrbaniteCtx<H>, _hw: &H) -> bool {
    ctx.press_tier() == PressTier::OnOff
}

fn check_pause<H: Board>(ctx: &UrbaniteCtx<H>, _hw: &H) -> bool {
    ctx.press_tier() == PressTier::Pause
}

fn check_change<H: Board>(ctx: &UrbaniteCtx<H>, _hw: &H) -> bool {
    ctx.press_tier() == PressTier::Change
}

fn check_new_measure<H: Board>(ctx: &UrbaniteCtx<H>, _hw: &H) -> bool {
    ctx.periph
        .pair(ctx.live_side())
        .ultrasound
        .new_measurement_ready()
}

fn check_activity<H: Board>(ctx: &UrbaniteCtx<H>, _hw: &H) -> bool {
    ctx.periph.check_activity()
}

fn check_no_activity<H: Board>(ctx: &UrbaniteCtx<H>, hw: &H) -> bool {
    !check_activity(ctx, hw)
}

// ───────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────

fn do_start_up<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    ctx.periph.button.reset_duration();
    ctx.is_rear = false;
    ctx.periph.front.ultrasound.start(hw);
    ctx.periph.front.display.set_status(false);
    ctx.periph.buzzer.set_status(false);

    let now = hw.millis();
    info!("[URBANITE][{}] system ON", now);
    ctx.push_event(now, UrbaniteEvent::SystemOn);
}

fn do_stop<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    let p = &mut ctx.periph;
    p.button.reset_duration();
    p.front.ultrasound.stop(hw);
    p.front.display.set_status(false);
    p.rear.ultrasound.stop(hw);
    p.rear.display.set_status(false);
    p.buzzer.set_status(false);
    ctx.is_paused = false;

    let now = hw.millis();
    info!("[URBANITE][{}] system OFF", now);
    ctx.push_event(now, UrbaniteEvent::SystemOff);
}

/// Publish the live sensor's new median, honouring pause and the danger
/// override.
fn do_distance<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    let side = ctx.live_side();
    let paused = ctx.is_paused;
    let (live, other, buzzer) = ctx.periph.split_mut(side);

    other.display.set_status(false);
    let distance = live.ultrasound.distance();
    let cm = i32::try_from(distance).unwrap_or(i32::MAX);

    if !paused || distance < DANGER_OVERRIDE_CM {
        live.display.set_distance(cm);
        buzzer.set_distance(cm);
        live.display.set_status(true);
        buzzer.set_status(true);
    } else {
        live.display.set_status(false);
        buzzer.set_status(false);
    }

    let now = hw.millis();
    info!("[URBANITE][{}] distance {}: {} cm", now, side, distance);
    ctx.push_event(now, UrbaniteEvent::Distance { side, cm: distance });
}

fn do_pause<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    ctx.periph.button.reset_duration();
    ctx.is_paused = !ctx.is_paused;

    let active = !ctx.is_paused;
    let side = ctx.live_side();
    let (live, _, buzzer) = ctx.periph.split_mut(side);
    live.display.set_status(active);
    buzzer.set_status(active);

    let now = hw.millis();
    if ctx.is_paused {
        info!("[URBANITE][{}] display PAUSE", now);
        ctx.push_event(now, UrbaniteEvent::Paused);
    } else {
        info!("[URBANITE][{}] display RESUME", now);
        ctx.push_event(now, UrbaniteEvent::Resumed);
    }
}

fn change_to<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H, side: Side) {
    ctx.periph.button.reset_duration();
    let (new, old, _) = ctx.periph.split_mut(side);
    old.ultrasound.stop(hw);
    old.display.set_status(false);
    new.ultrasound.start(hw);
    new.display.set_status(false);
    ctx.is_rear = side == Side::Rear;

    let now = hw.millis();
    info!("[URBANITE][{}] change {}", now, side);
    ctx.push_event(now, UrbaniteEvent::ModeChanged(side));
}

fn do_change_rear<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    change_to(ctx, hw, Side::Rear);
}

fn do_change_front<H: Board>(ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    change_to(ctx, hw, Side::Front);
}

fn do_sleep<H: Board>(_ctx: &mut UrbaniteCtx<H>, hw: &mut H) {
    hw.sleep();
}

pub const URBANITE_TABLE_LEN: usize = 18;

#[rustfmt::skip]
pub fn build_urbanite_table<H: Board>()
-> [Transition<UrbaniteState, UrbaniteCtx<H>, H>; URBANITE_TABLE_LEN] {
    use UrbaniteState::*;
    [
        Transition { from: Off, guard: check_on_off::<H>, to: MeasureFront, action: Some(do_start_up::<H>) },
        Transition { from: Off, guard: check_no_activity::<H>, to: SleepWhileOff, action: Some(do_sleep::<H>) },

        Transition { from: MeasureFront, guard: check_on_off::<H>, to: Off, action: Some(do_stop::<H>) },
        Transition { from: MeasureFront, guard: check_pause::<H>, to: MeasureFront, action: Some(do_pause::<H>) },
        Transition { from: MeasureFront, guard: check_new_measure::<H>, to: MeasureFront, action: Some(do_distance::<H>) },
        Transition { from: MeasureFront, guard: check_change::<H>, to: MeasureRear, action: Some(do_change_rear::<H>) },
        Transition { from: MeasureFront, guard: check_no_activity::<H>, to: SleepWhileOnFront, action: Some(do_sleep::<H>) },

        Transition { from: MeasureRear, guard: check_on_off::<H>, to: Off, action: Some(do_stop::<H>) },
        Transition { from: MeasureRear, guard: check_pause::<H>, to: MeasureRear, action: Some(do_pause::<H>) },
        Transition { from: MeasureRear, guard: check_new_measure::<H>, to: MeasureRear, action: Some(do_distance::<H>) },
        Transition { from: MeasureRear, guard: check_change::<H>, to: MeasureFront, action: Some(do_change_front::<H>) },
        Transition { from: MeasureRear, guard: check_no_activity::<H>, to: SleepWhileOnRear, action: Some(do_sleep::<H>) },

        Transition { from: SleepWhileOnFront, guard: check_new_measure::<H>, to: MeasureFront, action: None },
        Transition { from: SleepWhileOnFront, guard: check_no_activity::<H>, to: SleepWhileOnFront, action: Some(do_sleep::<H>) },
        Transition { from: SleepWhileOnRear, guard: check_new_measure::<H>, to: MeasureRear, action: None },
        Transition { from: SleepWhileOnRear, guard: check_no_activity::<H>, to: SleepWhileOnRear, action: Some(do_sleep::<H>) },

        Transition { from: SleepWhileOff, guard: check_activity::<H>, to: Off, action: None },
        Transition { from: SleepWhileOff, guard: check_no_activity::<H>, to: SleepWhileOff, action: Some(do_sleep::<H>) },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Wrapper
// ═══════════════════════════════════════════════════════════════════════════

pub struct UrbaniteFsm<H> {
    fsm: Fsm<UrbaniteState, UrbaniteCtx<H>, H, URBANITE_TABLE_LEN>,
    ctx: UrbaniteCtx<H>,
}

impl<H: Board> UrbaniteFsm<H> {
    /// Wire the reference peripherals and start `Off`, front side live.
    pub fn new(config: &UrbaniteConfig, hw: &mut H) -> Result<Self> {
        let periph = Peripherals::reference(config.button_debounce_ms, hw)?;
        Self::with_peripherals(periph, PressThresholds::from(config))
    }

    pub fn with_peripherals(periph: Peripherals<H>, thresholds: PressThresholds) -> Result<Self> {
        Ok(Self {
            fsm: Fsm::from_table("urbanite", build_urbanite_table::<H>())?,
            ctx: UrbaniteCtx {
                periph,
                thresholds,
                is_paused: false,
                is_rear: false,
                events: Deque::new(),
            },
        })
    }

    /// Evaluate the orchestrator table once and record sleep entry / exit.
    pub fn fire(&mut self, hw: &mut H) -> Option<Fired<UrbaniteState>> {
        // Sleep actions block, so entry is stamped before the row fires.
        let before = hw.millis();
        let fired = self.fsm.fire(&mut self.ctx, hw)?;
        match (fired.from.is_sleep(), fired.to.is_sleep()) {
            (false, true) => {
                self.ctx
                    .push_event(before, UrbaniteEvent::EnteredSleep(fired.to));
            }
            (true, false) => {
                self.ctx.push_event(
                    hw.millis(),
                    UrbaniteEvent::Woke {
                        from: fired.from,
                        to: fired.to,
                    },
                );
            }
            _ => {}
        }
        Some(fired)
    }

    /// Oldest queued event, if any.
    pub fn pop_event(&mut self) -> Option<EventRecord> {
        self.ctx.events.pop_front()
    }

    pub fn pending_events(&self) -> usize {
        self.ctx.events.len()
    }

    pub fn peripherals(&self) -> &Peripherals<H> {
        &self.ctx.periph
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<H> {
        &mut self.ctx.periph
    }

    pub fn thresholds(&self) -> PressThresholds {
        self.ctx.thresholds
    }

    pub fn is_paused(&self) -> bool {
        self.ctx.is_paused
    }

    pub fn is_rear(&self) -> bool {
        self.ctx.is_rear
    }

    pub fn live_side(&self) -> Side {
        self.ctx.live_side()
    }

    pub fn check_activity(&self) -> bool {
        self.ctx.periph.check_activity()
    }

    pub fn state(&self) -> UrbaniteState {
        self.fsm.state()
    }

    pub fn set_state(&mut self, state: UrbaniteState) {
        self.fsm.set_state(state);
    }
}
