//! Debounced push-button FSM that measures press duration.
//!
//! ```text
//!  RELEASED ──[pressed]──▶ PRESSED_WAIT ──[debounce elapsed]──▶ PRESSED
//!     ▲                        │                                  │
//!     │      [debounce elapsed, already released]             [released]
//!     ├────────────────────────┘                                  ▼
//!     └──────────────[debounce elapsed]────────────────── RELEASED_WAIT
//! ```
//!
//! The debounce window is armed on both edges.  A completed press leaves its
//! length in [`ButtonFsm::duration`] until the consumer calls
//! [`ButtonFsm::reset_duration`]; a zero duration means "nothing unread".

use log::debug;

use super::{Fired, Fsm, Transition};
use crate::app::ports::{ButtonId, ButtonPort, Clock};
use crate::error::Result;

/// Button FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    PressedWait,
    Pressed,
    ReleasedWait,
}

/// Data owned by the button FSM and visible to its guards and actions.
#[derive(Debug, Clone)]
pub struct ButtonCtx {
    id: ButtonId,
    debounce_time_ms: u32,
    next_timeout: u32,
    tick_pressed: u32,
    duration: u32,
}

/// `true` once `now` is strictly past `deadline`, robust to `u32` wrap.
pub(crate) fn timeout_elapsed(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}

// ───────────────────────────────────────────────────────────────
// Guards
// ───────────────────────────────────────────────────────────────

fn check_button_pressed<H: ButtonPort + Clock>(ctx: &ButtonCtx, hw: &H) -> bool {
    hw.is_pressed(ctx.id)
}

fn check_button_released<H: ButtonPort + Clock>(ctx: &ButtonCtx, hw: &H) -> bool {
    !hw.is_pressed(ctx.id)
}

fn check_timeout<H: ButtonPort + Clock>(ctx: &ButtonCtx, hw: &H) -> bool {
    timeout_elapsed(hw.millis(), ctx.next_timeout)
}

/// Debounce over but the button is already up again: jitter, not a press.
fn check_timeout_released<H: ButtonPort + Clock>(ctx: &ButtonCtx, hw: &H) -> bool {
    check_timeout(ctx, hw) && check_button_released(ctx, hw)
}

// ───────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────

fn do_store_tick_pressed<H: ButtonPort + Clock>(ctx: &mut ButtonCtx, hw: &mut H) {
    let now = hw.millis();
    ctx.tick_pressed = now;
    ctx.next_timeout = now.wrapping_add(ctx.debounce_time_ms);
}

fn do_set_duration<H: ButtonPort + Clock>(ctx: &mut ButtonCtx, hw: &mut H) {
    let now = hw.millis();
    ctx.duration = now.wrapping_sub(ctx.tick_pressed);
    ctx.next_timeout = now.wrapping_add(ctx.debounce_time_ms);
    debug!("button {}: released after {} ms", ctx.id.0, ctx.duration);
}

/// Number of rows in the button transition table.
pub const BUTTON_TABLE_LEN: usize = 5;

/// Build the button transition table.
#[rustfmt::skip]
pub fn build_button_table<H: ButtonPort + Clock>()
-> [Transition<ButtonState, ButtonCtx, H>; BUTTON_TABLE_LEN] {
    use ButtonState::*;
    [
        Transition { from: Released, guard: check_button_pressed::<H>, to: PressedWait, action: Some(do_store_tick_pressed::<H>) },
        Transition { from: PressedWait, guard: check_timeout_released::<H>, to: Released, action: None },
        Transition { from: PressedWait, guard: check_timeout::<H>, to: Pressed, action: None },
        Transition { from: Pressed, guard: check_button_released::<H>, to: ReleasedWait, action: Some(do_set_duration::<H>) },
        Transition { from: ReleasedWait, guard: check_timeout::<H>, to: Released, action: None },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Wrapper
// ═══════════════════════════════════════════════════════════════════════════

pub struct ButtonFsm<H> {
    fsm: Fsm<ButtonState, ButtonCtx, H, BUTTON_TABLE_LEN>,
    ctx: ButtonCtx,
}

impl<H: ButtonPort + Clock> ButtonFsm<H> {
    /// Initialise the button hardware and bind a fresh FSM in `Released`.
    pub fn new(id: ButtonId, debounce_time_ms: u32, hw: &mut H) -> Result<Self> {
        hw.init_button(id)?;
        Ok(Self {
            fsm: Fsm::from_table("button", build_button_table::<H>())?,
            ctx: ButtonCtx {
                id,
                debounce_time_ms,
                next_timeout: 0,
                tick_pressed: 0,
                duration: 0,
            },
        })
    }

    pub fn fire(&mut self, hw: &mut H) -> Option<Fired<ButtonState>> {
        self.fsm.fire(&mut self.ctx, hw)
    }

    /// Length in ms of the last completed press, 0 if none is pending.
    pub fn duration(&self) -> u32 {
        self.ctx.duration
    }

    /// Mark the last press as consumed.
    pub fn reset_duration(&mut self) {
        self.ctx.duration = 0;
    }

    /// Any press or debounce in progress.
    pub fn check_activity(&self) -> bool {
        self.fsm.state() != ButtonState::Released
    }

    pub fn state(&self) -> ButtonState {
        self.fsm.state()
    }

    pub fn set_state(&mut self, state: ButtonState) {
        self.fsm.set_state(state);
    }

    pub fn id(&self) -> ButtonId {
        self.ctx.id
    }

    pub fn debounce_time_ms(&self) -> u32 {
        self.ctx.debounce_time_ms
    }

    pub fn tick_pressed(&self) -> u32 {
        self.ctx.tick_pressed
    }
}
