//! HC-SR04 style ultrasonic ranging FSM with a batch-median filter.
//!
//! ```text
//!  WAIT_START ──[on & ready]──▶ TRIGGER_START ──[trigger end]──▶ WAIT_ECHO_START
//!      ▲                            ▲                                 │
//!      │                         [ready]                        [echo rising]
//!    [off]                          │                                 ▼
//!      └─────────────────────── SET_DISTANCE ◀──[echo falling]── WAIT_ECHO_END
//! ```
//!
//! Every completed echo yields one raw sample.  Samples land in a window of
//! [`NUM_MEASUREMENTS`] slots; when the last slot is written the window is
//! sorted and its middle element becomes the published distance.  The
//! published value therefore changes once per full window, never in between.

use log::debug;

use super::{Fired, Fsm, Transition};
use crate::app::ports::{UltrasoundId, UltrasoundPort};
use crate::error::Result;

/// Samples per median window.  Odd, so the middle element is the median.
pub const NUM_MEASUREMENTS: usize = 5;

/// Speed of sound at 20 °C in m/s.
pub const SPEED_OF_SOUND_MS: u32 = 343;

/// The echo capture timer is 16 bits wide at 1 µs per tick.
pub const ECHO_TIMER_MODULUS: u32 = 65_536;

/// Ultrasound FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UltrasoundState {
    WaitStart,
    TriggerStart,
    WaitEchoStart,
    WaitEchoEnd,
    SetDistance,
}

#[derive(Debug, Clone)]
pub struct UltrasoundCtx {
    id: UltrasoundId,
    status: bool,
    distance_cm: u32,
    samples: [u32; NUM_MEASUREMENTS],
    idx: usize,
    new_measurement: bool,
}

/// Echo pulse length in µs, correcting for capture timer wraps.
pub fn echo_elapsed_us(init_tick: u32, end_tick: u32, overflows: u32) -> u32 {
    end_tick
        .wrapping_add(overflows.wrapping_mul(ECHO_TIMER_MODULUS))
        .wrapping_sub(init_tick)
}

/// Round-trip echo time to one-way distance in whole centimetres.
pub fn us_to_cm(elapsed_us: u32) -> u32 {
    let cm = u64::from(elapsed_us) * u64::from(SPEED_OF_SOUND_MS) / 20_000;
    u32::try_from(cm).unwrap_or(u32::MAX)
}

// ───────────────────────────────────────────────────────────────
// Guards
// ───────────────────────────────────────────────────────────────

fn check_on<H: UltrasoundPort>(ctx: &UltrasoundCtx, hw: &H) -> bool {
    hw.trigger_ready(ctx.id) && ctx.status
}

fn check_off<H: UltrasoundPort>(ctx: &UltrasoundCtx, _hw: &H) -> bool {
    !ctx.status
}

fn check_trigger_end<H: UltrasoundPort>(ctx: &UltrasoundCtx, hw: &H) -> bool {
    hw.trigger_end(ctx.id)
}

fn check_echo_init<H: UltrasoundPort>(ctx: &UltrasoundCtx, hw: &H) -> bool {
    hw.echo_init_tick(ctx.id) > 0
}

fn check_echo_received<H: UltrasoundPort>(ctx: &UltrasoundCtx, hw: &H) -> bool {
    hw.echo_received(ctx.id)
}

fn check_new_measurement<H: UltrasoundPort>(ctx: &UltrasoundCtx, hw: &H) -> bool {
    hw.trigger_ready(ctx.id)
}

// ───────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────

fn do_start_measurement<H: UltrasoundPort>(ctx: &mut UltrasoundCtx, hw: &mut H) {
    hw.start_measurement(ctx.id);
}

fn do_stop_trigger<H: UltrasoundPort>(ctx: &mut UltrasoundCtx, hw: &mut H) {
    hw.stop_trigger_timer(ctx.id);
    hw.set_trigger_end(ctx.id, false);
}

fn do_set_distance<H: UltrasoundPort>(ctx: &mut UltrasoundCtx, hw: &mut H) {
    let elapsed = echo_elapsed_us(
        hw.echo_init_tick(ctx.id),
        hw.echo_end_tick(ctx.id),
        hw.echo_overflows(ctx.id),
    );
    ctx.samples[ctx.idx] = us_to_cm(elapsed);

    if ctx.idx >= NUM_MEASUREMENTS - 1 {
        ctx.samples.sort_unstable();
        ctx.distance_cm = ctx.samples[NUM_MEASUREMENTS / 2];
        ctx.new_measurement = true;
        debug!("ultrasound {}: median {} cm", ctx.id.0, ctx.distance_cm);
    }
    ctx.idx = (ctx.idx + 1) % NUM_MEASUREMENTS;

    hw.stop_echo_timer(ctx.id);
    hw.reset_echo_ticks(ctx.id);
}

fn do_stop_measurement<H: UltrasoundPort>(ctx: &mut UltrasoundCtx, hw: &mut H) {
    hw.stop_ultrasound(ctx.id);
}

pub const ULTRASOUND_TABLE_LEN: usize = 6;

/// Build the ultrasound transition table.
///
/// In `SetDistance` the ready check precedes the off check: a pending cycle
/// is always completed before a disable takes effect.
#[rustfmt::skip]
pub fn build_ultrasound_table<H: UltrasoundPort>()
-> [Transition<UltrasoundState, UltrasoundCtx, H>; ULTRASOUND_TABLE_LEN] {
    use UltrasoundState::*;
    [
        Transition { from: WaitStart, guard: check_on::<H>, to: TriggerStart, action: Some(do_start_measurement::<H>) },
        Transition { from: TriggerStart, guard: check_trigger_end::<H>, to: WaitEchoStart, action: Some(do_stop_trigger::<H>) },
        Transition { from: WaitEchoStart, guard: check_echo_init::<H>, to: WaitEchoEnd, action: None },
        Transition { from: WaitEchoEnd, guard: check_echo_received::<H>, to: SetDistance, action: Some(do_set_distance::<H>) },
        Transition { from: SetDistance, guard: check_new_measurement::<H>, to: TriggerStart, action: Some(do_start_measurement::<H>) },
        Transition { from: SetDistance, guard: check_off::<H>, to: WaitStart, action: Some(do_stop_measurement::<H>) },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Wrapper
// ═══════════════════════════════════════════════════════════════════════════

pub struct UltrasoundFsm<H> {
    fsm: Fsm<UltrasoundState, UltrasoundCtx, H, ULTRASOUND_TABLE_LEN>,
    ctx: UltrasoundCtx,
}

impl<H: UltrasoundPort> UltrasoundFsm<H> {
    /// Initialise the sensor hardware; the FSM starts disabled in `WaitStart`.
    pub fn new(id: UltrasoundId, hw: &mut H) -> Result<Self> {
        hw.init_ultrasound(id)?;
        Ok(Self {
            fsm: Fsm::from_table("ultrasound", build_ultrasound_table::<H>())?,
            ctx: UltrasoundCtx {
                id,
                status: false,
                distance_cm: 0,
                samples: [0; NUM_MEASUREMENTS],
                idx: 0,
                new_measurement: false,
            },
        })
    }

    pub fn fire(&mut self, hw: &mut H) -> Option<Fired<UltrasoundState>> {
        self.fsm.fire(&mut self.ctx, hw)
    }

    /// Enable ranging.  Restarts the median window from its first slot.
    pub fn start(&mut self, hw: &mut H) {
        self.ctx.status = true;
        self.ctx.idx = 0;
        self.ctx.distance_cm = 0;
        self.ctx.new_measurement = false;
        hw.reset_echo_ticks(self.ctx.id);
        hw.set_trigger_ready(self.ctx.id, true);
        hw.start_new_measurement_timer(self.ctx.id);
        debug!("ultrasound {}: start", self.ctx.id.0);
    }

    /// Disable ranging and halt every timer.  Safe from any state.
    ///
    /// The machine is parked in `WaitStart` so a later [`start`](Self::start)
    /// begins a clean cycle instead of waiting on an echo that will never come.
    pub fn stop(&mut self, hw: &mut H) {
        self.ctx.status = false;
        hw.stop_ultrasound(self.ctx.id);
        self.fsm.set_state(UltrasoundState::WaitStart);
    }

    /// Last published median; clears the new-measurement flag.
    pub fn distance(&mut self) -> u32 {
        self.ctx.new_measurement = false;
        self.ctx.distance_cm
    }

    /// Peek the new-measurement flag without clearing it.
    pub fn new_measurement_ready(&self) -> bool {
        self.ctx.new_measurement
    }

    /// A running sensor never holds the system awake; its own timers wake it.
    pub fn check_activity(&self) -> bool {
        false
    }

    pub fn status(&self) -> bool {
        self.ctx.status
    }

    pub fn set_status(&mut self, status: bool) {
        self.ctx.status = status;
    }

    pub fn is_trigger_ready(&self, hw: &H) -> bool {
        hw.trigger_ready(self.ctx.id)
    }

    pub fn state(&self) -> UltrasoundState {
        self.fsm.state()
    }

    pub fn set_state(&mut self, state: UltrasoundState) {
        self.fsm.set_state(state);
    }

    pub fn id(&self) -> UltrasoundId {
        self.ctx.id
    }
}
