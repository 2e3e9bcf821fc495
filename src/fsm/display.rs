//! RGB parking display FSM.
//!
//! ```text
//!  WAIT_DISPLAY ──[active]──▶ SET_DISPLAY ──┐ [new colour]
//!       ▲                        │   ▲      │
//!       └──────[inactive]────────┘   └──────┘
//! ```
//!
//! The distance pushed by the orchestrator is turned into a colour by
//! piecewise-linear interpolation across six tiers:
//!
//! | Distance (cm) | Colour                |
//! |---------------|-----------------------|
//! | [0, 5]        | solid red             |
//! | (5, 25]       | red → yellow          |
//! | (25, 50]      | yellow → green        |
//! | (50, 150]     | green → turquoise     |
//! | (150, 175]    | turquoise → blue      |
//! | (175, 200]    | blue → off            |
//! | otherwise     | off                   |

use log::debug;

use super::{Fired, Fsm, Transition};
use crate::app::ports::{DisplayId, DisplayPort, Rgb};
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Tier bounds (cm)
// ───────────────────────────────────────────────────────────────

pub const HIGH_DANGER_MIN_CM: i32 = 0;
pub const DANGER_MIN_CM: i32 = 5;
pub const WARNING_MIN_CM: i32 = 25;
pub const NO_PROBLEM_MIN_CM: i32 = 50;
pub const INFO_MIN_CM: i32 = 150;
pub const OK_MIN_CM: i32 = 175;
pub const OK_MAX_CM: i32 = 200;

// ───────────────────────────────────────────────────────────────
// Anchor colours
// ───────────────────────────────────────────────────────────────

pub const COLOUR_RED: Rgb = Rgb::new(255, 0, 0);
pub const COLOUR_GREEN: Rgb = Rgb::new(0, 255, 0);
pub const COLOUR_BLUE: Rgb = Rgb::new(0, 0, 255);
/// 37 % of full scale on red and green.
pub const COLOUR_YELLOW: Rgb = Rgb::new(94, 94, 0);
pub const COLOUR_TURQUOISE: Rgb = Rgb::new(25, 89, 81);
pub const COLOUR_OFF: Rgb = Rgb::new(0, 0, 0);

fn lerp_channel(low: u8, high: u8, lo_cm: i32, hi_cm: i32, d: i32) -> u8 {
    let span = hi_cm - lo_cm;
    let v = i32::from(low) * (hi_cm - d) / span + i32::from(high) * (d - lo_cm) / span;
    v.clamp(0, 255) as u8
}

fn lerp(low: Rgb, high: Rgb, lo_cm: i32, hi_cm: i32, d: i32) -> Rgb {
    Rgb {
        r: lerp_channel(low.r, high.r, lo_cm, hi_cm, d),
        g: lerp_channel(low.g, high.g, lo_cm, hi_cm, d),
        b: lerp_channel(low.b, high.b, lo_cm, hi_cm, d),
    }
}

/// Colour shown for `distance_cm`.
pub fn colour_for_distance(distance_cm: i32) -> Rgb {
    let d = distance_cm;
    match d {
        _ if (HIGH_DANGER_MIN_CM..=DANGER_MIN_CM).contains(&d) => COLOUR_RED,
        _ if d > DANGER_MIN_CM && d <= WARNING_MIN_CM => {
            lerp(COLOUR_RED, COLOUR_YELLOW, DANGER_MIN_CM, WARNING_MIN_CM, d)
        }
        _ if d > WARNING_MIN_CM && d <= NO_PROBLEM_MIN_CM => {
            lerp(COLOUR_YELLOW, COLOUR_GREEN, WARNING_MIN_CM, NO_PROBLEM_MIN_CM, d)
        }
        _ if d > NO_PROBLEM_MIN_CM && d <= INFO_MIN_CM => {
            lerp(COLOUR_GREEN, COLOUR_TURQUOISE, NO_PROBLEM_MIN_CM, INFO_MIN_CM, d)
        }
        _ if d > INFO_MIN_CM && d <= OK_MIN_CM => {
            lerp(COLOUR_TURQUOISE, COLOUR_BLUE, INFO_MIN_CM, OK_MIN_CM, d)
        }
        _ if d > OK_MIN_CM && d <= OK_MAX_CM => {
            lerp(COLOUR_BLUE, COLOUR_OFF, OK_MIN_CM, OK_MAX_CM, d)
        }
        _ => COLOUR_OFF,
    }
}

/// Display FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    WaitDisplay,
    SetDisplay,
}

#[derive(Debug, Clone)]
pub struct DisplayCtx {
    id: DisplayId,
    distance_cm: i32,
    new_colour: bool,
    status: bool,
    idle: bool,
}

fn check_active<H: DisplayPort>(ctx: &DisplayCtx, _hw: &H) -> bool {
    ctx.status
}

fn check_set_new_colour<H: DisplayPort>(ctx: &DisplayCtx, _hw: &H) -> bool {
    ctx.new_colour
}

fn check_off<H: DisplayPort>(ctx: &DisplayCtx, _hw: &H) -> bool {
    !ctx.status
}

fn do_set_on<H: DisplayPort>(ctx: &mut DisplayCtx, hw: &mut H) {
    hw.set_rgb(ctx.id, COLOUR_OFF);
}

fn do_set_colour<H: DisplayPort>(ctx: &mut DisplayCtx, hw: &mut H) {
    let colour = colour_for_distance(ctx.distance_cm);
    hw.set_rgb(ctx.id, colour);
    ctx.new_colour = false;
    ctx.idle = true;
    debug!(
        "display {}: {} cm -> ({}, {}, {})",
        ctx.id.0, ctx.distance_cm, colour.r, colour.g, colour.b
    );
}

fn do_set_off<H: DisplayPort>(ctx: &mut DisplayCtx, hw: &mut H) {
    hw.set_rgb(ctx.id, COLOUR_OFF);
    ctx.idle = false;
}

pub const DISPLAY_TABLE_LEN: usize = 3;

#[rustfmt::skip]
pub fn build_display_table<H: DisplayPort>()
-> [Transition<DisplayState, DisplayCtx, H>; DISPLAY_TABLE_LEN] {
    use DisplayState::*;
    [
        Transition { from: WaitDisplay, guard: check_active::<H>, to: SetDisplay, action: Some(do_set_on::<H>) },
        Transition { from: SetDisplay, guard: check_set_new_colour::<H>, to: SetDisplay, action: Some(do_set_colour::<H>) },
        Transition { from: SetDisplay, guard: check_off::<H>, to: WaitDisplay, action: Some(do_set_off::<H>) },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Wrapper
// ═══════════════════════════════════════════════════════════════════════════

pub struct DisplayFsm<H> {
    fsm: Fsm<DisplayState, DisplayCtx, H, DISPLAY_TABLE_LEN>,
    ctx: DisplayCtx,
}

impl<H: DisplayPort> DisplayFsm<H> {
    /// Initialise the display hardware; inactive, nothing to show.
    pub fn new(id: DisplayId, hw: &mut H) -> Result<Self> {
        hw.init_display(id)?;
        Ok(Self {
            fsm: Fsm::from_table("display", build_display_table::<H>())?,
            ctx: DisplayCtx {
                id,
                distance_cm: -1,
                new_colour: false,
                status: false,
                idle: false,
            },
        })
    }

    pub fn fire(&mut self, hw: &mut H) -> Option<Fired<DisplayState>> {
        self.fsm.fire(&mut self.ctx, hw)
    }

    /// Queue a repaint for `distance_cm`.
    pub fn set_distance(&mut self, distance_cm: i32) {
        self.ctx.distance_cm = distance_cm;
        self.ctx.new_colour = true;
        self.ctx.idle = false;
    }

    pub fn distance(&self) -> i32 {
        self.ctx.distance_cm
    }

    pub fn status(&self) -> bool {
        self.ctx.status
    }

    pub fn set_status(&mut self, status: bool) {
        self.ctx.status = status;
    }

    pub fn is_idle(&self) -> bool {
        self.ctx.idle
    }

    /// Active with a repaint still pending.
    pub fn check_activity(&self) -> bool {
        self.ctx.status && !self.ctx.idle
    }

    pub fn state(&self) -> DisplayState {
        self.fsm.state()
    }

    pub fn set_state(&mut self, state: DisplayState) {
        self.fsm.set_state(state);
    }

    pub fn id(&self) -> DisplayId {
        self.ctx.id
    }
}
