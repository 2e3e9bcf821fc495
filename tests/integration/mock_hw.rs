//! Mock board for integration tests.
//!
//! Records every command the FSMs issue so tests can assert on the full
//! history, and exposes the interrupt-latched flags directly so a test can
//! play the role of the timer and edge interrupts step by step.

use urbanite::app::ports::{
    ButtonId, ButtonPort, BuzzerId, BuzzerPort, Clock, DisplayId, DisplayPort, Rgb, SystemPort,
    UltrasoundId, UltrasoundPort,
};
use urbanite::error::{DeviceKind, Error, Result};

// ── Command record ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    StartMeasurement(u8),
    StopTrigger(u8),
    StopEcho(u8),
    StartPeriodTimer(u8),
    StopUltrasound(u8),
    SetRgb(u8, Rgb),
    SetSound(u8, u8),
    Sleep,
}

// ── Latched sensor flags ──────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MockSensor {
    pub trigger_ready: bool,
    pub trigger_end: bool,
    pub init_tick: u32,
    pub end_tick: u32,
    pub overflows: u32,
    pub echo_received: bool,
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub now: u32,
    pub pressed: bool,
    pub sensors: [MockSensor; 2],
    pub calls: Vec<Call>,
    /// When set, `init_*` for this device class fails.
    pub missing: Option<DeviceKind>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            now: 0,
            pressed: false,
            sensors: [MockSensor::default(), MockSensor::default()],
            calls: Vec::new(),
            missing: None,
        }
    }

    pub fn advance(&mut self, ms: u32) {
        self.now = self.now.wrapping_add(ms);
    }

    pub fn sensor(&mut self, id: UltrasoundId) -> &mut MockSensor {
        &mut self.sensors[usize::from(id.0)]
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn last_rgb(&self, id: DisplayId) -> Option<Rgb> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetRgb(d, rgb) if *d == id.0 => Some(*rgb),
            _ => None,
        })
    }

    pub fn last_sound(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetSound(_, level) => Some(*level),
            _ => None,
        })
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check(&self, kind: DeviceKind, id: u8) -> Result<()> {
        if self.missing == Some(kind) {
            Err(Error::UnknownDevice { kind, id })
        } else {
            Ok(())
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockBoard {
    fn millis(&self) -> u32 {
        self.now
    }
}

/// Sleeping does not move the clock; the test owns time.
impl SystemPort for MockBoard {
    fn sleep(&mut self) {
        self.calls.push(Call::Sleep);
    }
}

impl ButtonPort for MockBoard {
    fn init_button(&mut self, id: ButtonId) -> Result<()> {
        self.check(DeviceKind::Button, id.0)
    }

    fn is_pressed(&self, _id: ButtonId) -> bool {
        self.pressed
    }
}

impl UltrasoundPort for MockBoard {
    fn init_ultrasound(&mut self, id: UltrasoundId) -> Result<()> {
        self.check(DeviceKind::Ultrasound, id.0)
    }

    fn trigger_ready(&self, id: UltrasoundId) -> bool {
        self.sensors[usize::from(id.0)].trigger_ready
    }

    fn set_trigger_ready(&mut self, id: UltrasoundId, ready: bool) {
        self.sensor(id).trigger_ready = ready;
    }

    fn start_measurement(&mut self, id: UltrasoundId) {
        self.sensor(id).trigger_ready = false;
        self.calls.push(Call::StartMeasurement(id.0));
    }

    fn trigger_end(&self, id: UltrasoundId) -> bool {
        self.sensors[usize::from(id.0)].trigger_end
    }

    fn set_trigger_end(&mut self, id: UltrasoundId, end: bool) {
        self.sensor(id).trigger_end = end;
    }

    fn stop_trigger_timer(&mut self, id: UltrasoundId) {
        self.calls.push(Call::StopTrigger(id.0));
    }

    fn echo_init_tick(&self, id: UltrasoundId) -> u32 {
        self.sensors[usize::from(id.0)].init_tick
    }

    fn echo_end_tick(&self, id: UltrasoundId) -> u32 {
        self.sensors[usize::from(id.0)].end_tick
    }

    fn echo_overflows(&self, id: UltrasoundId) -> u32 {
        self.sensors[usize::from(id.0)].overflows
    }

    fn reset_echo_ticks(&mut self, id: UltrasoundId) {
        let s = self.sensor(id);
        s.init_tick = 0;
        s.end_tick = 0;
        s.overflows = 0;
        s.echo_received = false;
    }

    fn echo_received(&self, id: UltrasoundId) -> bool {
        self.sensors[usize::from(id.0)].echo_received
    }

    fn set_echo_received(&mut self, id: UltrasoundId, received: bool) {
        self.sensor(id).echo_received = received;
    }

    fn stop_echo_timer(&mut self, id: UltrasoundId) {
        self.calls.push(Call::StopEcho(id.0));
    }

    fn start_new_measurement_timer(&mut self, id: UltrasoundId) {
        self.calls.push(Call::StartPeriodTimer(id.0));
    }

    fn stop_ultrasound(&mut self, id: UltrasoundId) {
        self.reset_echo_ticks(id);
        self.sensor(id).trigger_end = false;
        self.calls.push(Call::StopUltrasound(id.0));
    }
}

impl DisplayPort for MockBoard {
    fn init_display(&mut self, id: DisplayId) -> Result<()> {
        self.check(DeviceKind::Display, id.0)
    }

    fn set_rgb(&mut self, id: DisplayId, colour: Rgb) {
        self.calls.push(Call::SetRgb(id.0, colour));
    }
}

impl BuzzerPort for MockBoard {
    fn init_buzzer(&mut self, id: BuzzerId) -> Result<()> {
        self.check(DeviceKind::Buzzer, id.0)
    }

    fn set_sound(&mut self, id: BuzzerId, level: u8) {
        self.calls.push(Call::SetSound(id.0, level));
    }
}
