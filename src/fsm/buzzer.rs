//! Parking buzzer FSM.
//!
//! Same two-state shape as the display FSM; the distance is mapped to a
//! sound level instead of a colour.  The level rises linearly from silent
//! at 200 cm to full scale at 0 cm, and is silent outside that range.

use log::debug;

use super::display::{HIGH_DANGER_MIN_CM, OK_MAX_CM};
use super::{Fired, Fsm, Transition};
use crate::app::ports::{BuzzerId, BuzzerPort};
use crate::error::Result;

pub const BUZZER_MAX_VALUE: u8 = 255;
pub const BUZZER_MIN_VALUE: u8 = 0;

/// Lowest tone, emitted for level 0 of an active buzzer.
pub const BASE_TONE_HZ: u32 = 200;
/// Tone increase per level step.
pub const TONE_STEP_HZ: u32 = 9;

/// Sound level for `distance_cm`.
pub fn level_for_distance(distance_cm: i32) -> u8 {
    if (HIGH_DANGER_MIN_CM..=OK_MAX_CM).contains(&distance_cm) {
        let level = i32::from(BUZZER_MAX_VALUE) * (OK_MAX_CM - distance_cm) / OK_MAX_CM;
        level.clamp(i32::from(BUZZER_MIN_VALUE), i32::from(BUZZER_MAX_VALUE)) as u8
    } else {
        BUZZER_MIN_VALUE
    }
}

/// PWM tone frequency for `level`, `None` when silent.
pub fn tone_hz(level: u8) -> Option<u32> {
    if level == BUZZER_MIN_VALUE {
        None
    } else {
        Some(BASE_TONE_HZ + TONE_STEP_HZ * u32::from(level))
    }
}

/// Buzzer FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerState {
    WaitBuzzer,
    SetBuzzer,
}

#[derive(Debug, Clone)]
pub struct BuzzerCtx {
    id: BuzzerId,
    distance_cm: i32,
    new_sound: bool,
    status: bool,
    idle: bool,
}

fn check_active<H: BuzzerPort>(ctx: &BuzzerCtx, _hw: &H) -> bool {
    ctx.status
}

fn check_set_new_sound<H: BuzzerPort>(ctx: &BuzzerCtx, _hw: &H) -> bool {
    ctx.new_sound
}

fn check_off<H: BuzzerPort>(ctx: &BuzzerCtx, _hw: &H) -> bool {
    !ctx.status
}

fn do_set_on<H: BuzzerPort>(ctx: &mut BuzzerCtx, hw: &mut H) {
    hw.set_sound(ctx.id, BUZZER_MIN_VALUE);
}

fn do_set_sound<H: BuzzerPort>(ctx: &mut BuzzerCtx, hw: &mut H) {
    let level = level_for_distance(ctx.distance_cm);
    hw.set_sound(ctx.id, level);
    ctx.new_sound = false;
    ctx.idle = true;
    debug!("buzzer {}: {} cm -> level {}", ctx.id.0, ctx.distance_cm, level);
}

fn do_set_off<H: BuzzerPort>(ctx: &mut BuzzerCtx, hw: &mut H) {
    hw.set_sound(ctx.id, BUZZER_MIN_VALUE);
    ctx.idle = false;
}

pub const BUZZER_TABLE_LEN: usize = 3;

#[rustfmt::skip]
pub fn build_buzzer_table<H: BuzzerPort>()
-> [Transition<BuzzerState, BuzzerCtx, H>; BUZZER_TABLE_LEN] {
    use BuzzerState::*;
    [
        Transition { from: WaitBuzzer, guard: check_active::<H>, to: SetBuzzer, action: Some(do_set_on::<H>) },
        Transition { from: SetBuzzer, guard: check_set_new_sound::<H>, to: SetBuzzer, action: Some(do_set_sound::<H>) },
        Transition { from: SetBuzzer, guard: check_off::<H>, to: WaitBuzzer, action: Some(do_set_off::<H>) },
    ]
}

pub struct BuzzerFsm<H> {
    fsm: Fsm<BuzzerState, BuzzerCtx, H, BUZZER_TABLE_LEN>,
    ctx: BuzzerCtx,
}

impl<H: BuzzerPort> BuzzerFsm<H> {
    pub fn new(id: BuzzerId, hw: &mut H) -> Result<Self> {
        hw.init_buzzer(id)?;
        Ok(Self {
            fsm: Fsm::from_table("buzzer", build_buzzer_table::<H>())?,
            ctx: BuzzerCtx {
                id,
                distance_cm: -1,
                new_sound: false,
                status: false,
                idle: false,
            },
        })
    }

    pub fn fire(&mut self, hw: &mut H) -> Option<Fired<BuzzerState>> {
        self.fsm.fire(&mut self.ctx, hw)
    }

    pub fn set_distance(&mut self, distance_cm: i32) {
        self.ctx.distance_cm = distance_cm;
        self.ctx.new_sound = true;
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

    pub fn check_activity(&self) -> bool {
        self.ctx.status && !self.ctx.idle
    }

    pub fn state(&self) -> BuzzerState {
        self.fsm.state()
    }

    pub fn set_state(&mut self, state: BuzzerState) {
        self.fsm.set_state(state);
    }

    pub fn id(&self) -> BuzzerId {
        self.ctx.id
    }
}
