//! Simulated board: a host implementation of every port trait.
//!
//! Owns a registry of simulated peripherals indexed by id and models the
//! interrupt side of the reference hardware:
//!
//! | Source              | Period / delay       | Latches                     |
//! |---------------------|----------------------|-----------------------------|
//! | Trigger timer       | 10 µs after start    | `trigger_end`               |
//! | Echo capture (1 µs) | 460 µs + echo width  | init / end tick, overflows  |
//! | Measurement timer   | 100 ms               | `trigger_ready`             |
//! | Button edge         | scripted             | pressed level               |
//!
//! Time advances only through [`SimBoard::advance`] and
//! [`SystemPort::sleep`]; both walk the board in 1 ms steps so each step
//! sees every edge that would have fired inside it.

use log::{debug, warn};

use crate::app::ports::{
    ButtonId, ButtonPort, BuzzerId, BuzzerPort, Clock, DisplayId, DisplayPort, Rgb, SystemPort,
    UltrasoundId, UltrasoundPort,
};
use crate::error::{DeviceKind, Error, Result};
use crate::fsm::ultrasound::{ECHO_TIMER_MODULUS, SPEED_OF_SOUND_MS};

/// Trigger pulse width.
pub const TRIGGER_PULSE_US: u64 = 10;
/// Delay between the end of the trigger and the echo rising edge.
pub const ECHO_RISE_DELAY_US: u64 = 460;
/// Echo width the sensor reports when nothing is in range.
pub const NO_TARGET_ECHO_US: u64 = 38_000;
/// Period of the new-measurement timer.
pub const MEASUREMENT_PERIOD_US: u64 = 100_000;
/// Longest a single `sleep()` may block without an event.
pub const SLEEP_HORIZON_MS: u32 = 1000;

/// Echo pulse width the sensor produces for an obstacle at `cm`.
pub fn echo_width_us(cm: u32) -> u64 {
    let speed = u64::from(SPEED_OF_SOUND_MS);
    (u64::from(cm) * 20_000 + speed - 1) / speed
}

// ───────────────────────────────────────────────────────────────
// Simulated peripherals
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct SimButton {
    pressed: bool,
}

#[derive(Debug, Clone, Copy)]
struct PlannedEcho {
    rise_us: u64,
    fall_us: u64,
}

#[derive(Debug, Default, Clone)]
struct SimUltrasound {
    obstacle_cm: Option<u32>,
    echo_lost: bool,

    trigger_ready: bool,
    trigger_end: bool,
    trigger_pin: bool,

    trigger_timer: bool,
    echo_timer: bool,
    measurement_timer: bool,

    /// Capture timer zero (start of the last measurement), µs.
    capture_origin_us: u64,
    next_period_us: u64,
    echo: Option<PlannedEcho>,

    echo_init_tick: u32,
    echo_end_tick: u32,
    echo_overflows: u32,
    echo_received: bool,
}

impl SimUltrasound {
    fn reset_echo(&mut self) {
        self.echo_init_tick = 0;
        self.echo_end_tick = 0;
        self.echo_overflows = 0;
        self.echo_received = false;
    }

    /// Apply every edge in `(from_us, to_us]`.  Returns `true` if any flag
    /// was latched.
    fn step(&mut self, from_us: u64, to_us: u64) -> bool {
        let mut event = false;

        if self.trigger_timer
            && self.trigger_pin
            && !self.trigger_end
            && to_us >= self.capture_origin_us + TRIGGER_PULSE_US
        {
            self.trigger_end = true;
            event = true;
        }

        if self.echo_timer {
            if let Some(echo) = self.echo {
                let origin = self.capture_origin_us;
                let modulus = u64::from(ECHO_TIMER_MODULUS);
                if echo.rise_us > from_us && echo.rise_us <= to_us {
                    self.echo_init_tick = ((echo.rise_us - origin) % modulus) as u32;
                    event = true;
                }
                if echo.fall_us > from_us && echo.fall_us <= to_us {
                    let rise = echo.rise_us - origin;
                    let fall = echo.fall_us - origin;
                    self.echo_end_tick = (fall % modulus) as u32;
                    self.echo_overflows = (fall / modulus - rise / modulus) as u32;
                    self.echo_received = true;
                    self.echo = None;
                    event = true;
                }
            }
        }

        if self.measurement_timer && to_us >= self.next_period_us {
            self.trigger_ready = true;
            self.next_period_us += MEASUREMENT_PERIOD_US;
            event = true;
        }

        event
    }
}

#[derive(Debug, Default, Clone)]
struct SimDisplay {
    rgb: Rgb,
    writes: u32,
}

#[derive(Debug, Default, Clone)]
struct SimBuzzer {
    level: u8,
}

#[derive(Debug, Clone, Copy)]
struct ScriptedEdge {
    at_ms: u32,
    id: ButtonId,
    pressed: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
//  SimBoard
// ═══════════════════════════════════════════════════════════════════════════

pub struct SimBoard {
    now_ms: u32,
    buttons: Vec<SimButton>,
    sensors: Vec<SimUltrasound>,
    displays: Vec<SimDisplay>,
    buzzers: Vec<SimBuzzer>,
    script: Vec<ScriptedEdge>,
    sleeps: u32,
}

impl SimBoard {
    /// Board with the given number of each peripheral, ids `0..n`.
    pub fn new(buttons: usize, sensors: usize, displays: usize, buzzers: usize) -> Self {
        Self {
            now_ms: 0,
            buttons: vec![SimButton::default(); buttons],
            sensors: vec![SimUltrasound::default(); sensors],
            displays: vec![SimDisplay::default(); displays],
            buzzers: vec![SimBuzzer::default(); buzzers],
            script: Vec::new(),
            sleeps: 0,
        }
    }

    /// The Urbanite reference board: one button, two sensors, two displays,
    /// one buzzer.
    pub fn reference() -> Self {
        Self::new(1, 2, 2, 1)
    }

    // ── Stimulus ──────────────────────────────────────────────

    /// Set the button level now (an edge interrupt).
    pub fn set_button(&mut self, id: ButtonId, pressed: bool) {
        if let Some(b) = self.buttons.get_mut(usize::from(id.0)) {
            b.pressed = pressed;
        } else {
            warn!("sim: unknown button id {}", id.0);
        }
    }

    /// Schedule a button edge at absolute board time `at_ms`.
    pub fn script_button(&mut self, at_ms: u32, id: ButtonId, pressed: bool) {
        self.script.push(ScriptedEdge { at_ms, id, pressed });
        self.script.sort_by_key(|e| e.at_ms);
    }

    /// Press at `at_ms` and release `hold_ms` later.
    pub fn script_press(&mut self, at_ms: u32, id: ButtonId, hold_ms: u32) {
        self.script_button(at_ms, id, true);
        self.script_button(at_ms + hold_ms, id, false);
    }

    /// Place an obstacle in front of a sensor (`None` = nothing in range).
    pub fn set_obstacle(&mut self, id: UltrasoundId, cm: Option<u32>) {
        if let Some(s) = self.sensor_mut(id) {
            s.obstacle_cm = cm;
        }
    }

    /// Make a sensor swallow its echoes (no echo edge is ever captured).
    pub fn set_echo_lost(&mut self, id: UltrasoundId, lost: bool) {
        if let Some(s) = self.sensor_mut(id) {
            s.echo_lost = lost;
        }
    }

    /// Walk the board forward by `ms` milliseconds.
    pub fn advance(&mut self, ms: u32) {
        for _ in 0..ms {
            self.step();
        }
    }

    /// Advance one millisecond and latch every interrupt that fires inside
    /// it.  Returns `true` if anything was latched.
    pub fn step(&mut self) -> bool {
        let from_us = u64::from(self.now_ms) * 1000;
        self.now_ms = self.now_ms.wrapping_add(1);
        let to_us = u64::from(self.now_ms) * 1000;

        let mut event = false;
        while let Some(edge) = self.script.first().copied() {
            if edge.at_ms > self.now_ms {
                break;
            }
            self.script.remove(0);
            if let Some(b) = self.buttons.get_mut(usize::from(edge.id.0)) {
                event |= b.pressed != edge.pressed;
                b.pressed = edge.pressed;
            }
        }
        for s in &mut self.sensors {
            event |= s.step(from_us, to_us);
        }
        event
    }

    // ── Observers ─────────────────────────────────────────────

    pub fn rgb(&self, id: DisplayId) -> Rgb {
        self.displays
            .get(usize::from(id.0))
            .map_or(Rgb::default(), |d| d.rgb)
    }

    /// Number of `set_rgb` calls a display received.
    pub fn rgb_writes(&self, id: DisplayId) -> u32 {
        self.displays.get(usize::from(id.0)).map_or(0, |d| d.writes)
    }

    pub fn sound(&self, id: BuzzerId) -> u8 {
        self.buzzers.get(usize::from(id.0)).map_or(0, |b| b.level)
    }

    pub fn sleep_count(&self) -> u32 {
        self.sleeps
    }

    /// Trigger pin currently high.
    pub fn is_triggering(&self, id: UltrasoundId) -> bool {
        self.sensors
            .get(usize::from(id.0))
            .is_some_and(|s| s.trigger_pin)
    }

    /// Any timer of the sensor still running.
    pub fn is_ranging(&self, id: UltrasoundId) -> bool {
        self.sensors
            .get(usize::from(id.0))
            .is_some_and(|s| s.trigger_timer || s.echo_timer || s.measurement_timer)
    }

    // ── Registry lookup ───────────────────────────────────────

    fn sensor(&self, id: UltrasoundId) -> Option<&SimUltrasound> {
        let s = self.sensors.get(usize::from(id.0));
        if s.is_none() {
            warn!("sim: unknown ultrasound id {}", id.0);
        }
        s
    }

    fn sensor_mut(&mut self, id: UltrasoundId) -> Option<&mut SimUltrasound> {
        let s = self.sensors.get_mut(usize::from(id.0));
        if s.is_none() {
            warn!("sim: unknown ultrasound id {}", id.0);
        }
        s
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::reference()
    }
}

// ── SystemPort implementation ─────────────────────────────────

impl Clock for SimBoard {
    fn millis(&self) -> u32 {
        self.now_ms
    }
}

impl SystemPort for SimBoard {
    fn sleep(&mut self) {
        self.sleeps += 1;
        for _ in 0..SLEEP_HORIZON_MS {
            if self.step() {
                break;
            }
        }
    }
}

// ── ButtonPort implementation ─────────────────────────────────

impl ButtonPort for SimBoard {
    fn init_button(&mut self, id: ButtonId) -> Result<()> {
        let b = self
            .buttons
            .get_mut(usize::from(id.0))
            .ok_or(Error::UnknownDevice { kind: DeviceKind::Button, id: id.0 })?;
        *b = SimButton::default();
        Ok(())
    }

    fn is_pressed(&self, id: ButtonId) -> bool {
        match self.buttons.get(usize::from(id.0)) {
            Some(b) => b.pressed,
            None => {
                warn!("sim: unknown button id {}", id.0);
                false
            }
        }
    }
}

// ── UltrasoundPort implementation ─────────────────────────────

impl UltrasoundPort for SimBoard {
    fn init_ultrasound(&mut self, id: UltrasoundId) -> Result<()> {
        let s = self
            .sensors
            .get_mut(usize::from(id.0))
            .ok_or(Error::UnknownDevice { kind: DeviceKind::Ultrasound, id: id.0 })?;
        let obstacle_cm = s.obstacle_cm;
        *s = SimUltrasound {
            obstacle_cm,
            trigger_ready: true,
            ..SimUltrasound::default()
        };
        Ok(())
    }

    fn trigger_ready(&self, id: UltrasoundId) -> bool {
        self.sensor(id).is_some_and(|s| s.trigger_ready)
    }

    fn set_trigger_ready(&mut self, id: UltrasoundId, ready: bool) {
        if let Some(s) = self.sensor_mut(id) {
            s.trigger_ready = ready;
        }
    }

    fn start_measurement(&mut self, id: UltrasoundId) {
        let now_us = u64::from(self.now_ms) * 1000;
        if let Some(s) = self.sensor_mut(id) {
            s.trigger_ready = false;
            s.trigger_pin = true;
            s.trigger_timer = true;
            s.echo_timer = true;
            s.measurement_timer = true;
            s.capture_origin_us = now_us;
            s.next_period_us = now_us + MEASUREMENT_PERIOD_US;

            s.echo = if s.echo_lost {
                None
            } else {
                let width = s.obstacle_cm.map_or(NO_TARGET_ECHO_US, echo_width_us);
                let rise_us = now_us + TRIGGER_PULSE_US + ECHO_RISE_DELAY_US;
                Some(PlannedEcho { rise_us, fall_us: rise_us + width })
            };
            debug!("sim: ultrasound {} triggered at {} ms", id.0, now_us / 1000);
        }
    }

    fn trigger_end(&self, id: UltrasoundId) -> bool {
        self.sensor(id).is_some_and(|s| s.trigger_end)
    }

    fn set_trigger_end(&mut self, id: UltrasoundId, end: bool) {
        if let Some(s) = self.sensor_mut(id) {
            s.trigger_end = end;
        }
    }

    fn stop_trigger_timer(&mut self, id: UltrasoundId) {
        if let Some(s) = self.sensor_mut(id) {
            s.trigger_pin = false;
            s.trigger_timer = false;
        }
    }

    fn echo_init_tick(&self, id: UltrasoundId) -> u32 {
        self.sensor(id).map_or(0, |s| s.echo_init_tick)
    }

    fn echo_end_tick(&self, id: UltrasoundId) -> u32 {
        self.sensor(id).map_or(0, |s| s.echo_end_tick)
    }

    fn echo_overflows(&self, id: UltrasoundId) -> u32 {
        self.sensor(id).map_or(0, |s| s.echo_overflows)
    }

    fn reset_echo_ticks(&mut self, id: UltrasoundId) {
        if let Some(s) = self.sensor_mut(id) {
            s.reset_echo();
        }
    }

    fn echo_received(&self, id: UltrasoundId) -> bool {
        self.sensor(id).is_some_and(|s| s.echo_received)
    }

    fn set_echo_received(&mut self, id: UltrasoundId, received: bool) {
        if let Some(s) = self.sensor_mut(id) {
            s.echo_received = received;
        }
    }

    fn stop_echo_timer(&mut self, id: UltrasoundId) {
        if let Some(s) = self.sensor_mut(id) {
            s.echo_timer = false;
        }
    }

    fn start_new_measurement_timer(&mut self, id: UltrasoundId) {
        let now_us = u64::from(self.now_ms) * 1000;
        if let Some(s) = self.sensor_mut(id) {
            if !s.measurement_timer {
                s.measurement_timer = true;
                s.next_period_us = now_us + MEASUREMENT_PERIOD_US;
            }
        }
    }

    fn stop_ultrasound(&mut self, id: UltrasoundId) {
        if let Some(s) = self.sensor_mut(id) {
            s.trigger_pin = false;
            s.trigger_timer = false;
            s.echo_timer = false;
            s.measurement_timer = false;
            s.trigger_end = false;
            s.echo = None;
            s.reset_echo();
        }
    }
}

// ── Output ports ──────────────────────────────────────────────

impl DisplayPort for SimBoard {
    fn init_display(&mut self, id: DisplayId) -> Result<()> {
        let d = self
            .displays
            .get_mut(usize::from(id.0))
            .ok_or(Error::UnknownDevice { kind: DeviceKind::Display, id: id.0 })?;
        *d = SimDisplay::default();
        Ok(())
    }

    fn set_rgb(&mut self, id: DisplayId, colour: Rgb) {
        match self.displays.get_mut(usize::from(id.0)) {
            Some(d) => {
                d.rgb = colour;
                d.writes += 1;
            }
            None => warn!("sim: unknown display id {}", id.0),
        }
    }
}

impl BuzzerPort for SimBoard {
    fn init_buzzer(&mut self, id: BuzzerId) -> Result<()> {
        let b = self
            .buzzers
            .get_mut(usize::from(id.0))
            .ok_or(Error::UnknownDevice { kind: DeviceKind::Buzzer, id: id.0 })?;
        *b = SimBuzzer::default();
        Ok(())
    }

    fn set_sound(&mut self, id: BuzzerId, level: u8) {
        match self.buzzers.get_mut(usize::from(id.0)) {
            Some(b) => b.level = level,
            None => warn!("sim: unknown buzzer id {}", id.0),
        }
    }
}
