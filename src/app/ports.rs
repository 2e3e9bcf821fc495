//! Port traits: the hardware abstraction boundary.
//!
//! ```text
//!   Board adapter ──▶ Port traits ──▶ Button / Ultrasound / Display / Buzzer FSMs
//!                                          │
//!   Interrupt path ──▶ flags & ticks ──────┘  (read by guards on the next fire)
//! ```
//!
//! The FSM core never touches registers.  It issues synchronous commands
//! ("start trigger pulse", "set RGB colour") and reads flags that an
//! asynchronous, interrupt-like path latches ("echo received", "trigger
//! timer expired").  Each peripheral is addressed by an opaque id; the board
//! adapter owns the registry and resolves ids to concrete hardware.
//!
//! Handles are injected at call sites (`fire(&mut hw)`), never reached
//! through ambient global state.

use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Device ids
// ───────────────────────────────────────────────────────────────

/// Opaque id of a push button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonId(pub u8);

/// Opaque id of an ultrasonic range sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UltrasoundId(pub u8);

/// Opaque id of an RGB display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u8);

/// Opaque id of a buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuzzerId(pub u8);

/// The single parking button on the reference board.
pub const PARKING_BUTTON: ButtonId = ButtonId(0);
/// Rear ultrasonic sensor.
pub const REAR_PARKING_SENSOR: UltrasoundId = UltrasoundId(0);
/// Front ultrasonic sensor.
pub const FRONT_PARKING_SENSOR: UltrasoundId = UltrasoundId(1);
/// Rear RGB display.
pub const REAR_PARKING_DISPLAY: DisplayId = DisplayId(0);
/// Front RGB display.
pub const FRONT_PARKING_DISPLAY: DisplayId = DisplayId(1);
/// The shared parking buzzer.
pub const PARKING_BUZZER: BuzzerId = BuzzerId(0);

// ───────────────────────────────────────────────────────────────
// Colour
// ───────────────────────────────────────────────────────────────

/// 8-bit-per-channel RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

// ───────────────────────────────────────────────────────────────
// System
// ───────────────────────────────────────────────────────────────

/// Shared millisecond time base.
pub trait Clock {
    /// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
    fn millis(&self) -> u32;
}

/// System-level services beyond the clock.
pub trait SystemPort: Clock {
    /// Cooperative low-power suspend.
    ///
    /// Blocks until the next asynchronous event (button edge, echo edge,
    /// timer expiry) has been latched, then returns so the polling loop
    /// resumes exactly where it left off.
    fn sleep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Button
// ───────────────────────────────────────────────────────────────

pub trait ButtonPort {
    /// Configure the button input.  Fails if the id is unknown.
    fn init_button(&mut self, id: ButtonId) -> Result<()>;

    /// Latched pressed level, written by the edge interrupt.
    fn is_pressed(&self, id: ButtonId) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Ultrasound
// ───────────────────────────────────────────────────────────────

/// Trigger / echo sequencing primitives of an HC-SR04 style sensor.
///
/// Getters read flags and ticks latched by the timer interrupts; setters
/// clear or arm them.  Ticks come from a 1 µs, 16-bit echo capture timer;
/// `echo_overflows` counts its wraps while an echo is being timed.
pub trait UltrasoundPort {
    fn init_ultrasound(&mut self, id: UltrasoundId) -> Result<()>;

    /// `true` once the periodic measurement timer says a new cycle may start.
    fn trigger_ready(&self, id: UltrasoundId) -> bool;
    fn set_trigger_ready(&mut self, id: UltrasoundId, ready: bool);

    /// Raise the trigger pin and start the trigger, echo and period timers.
    fn start_measurement(&mut self, id: UltrasoundId);

    /// `true` once the trigger pulse timer has expired.
    fn trigger_end(&self, id: UltrasoundId) -> bool;
    fn set_trigger_end(&mut self, id: UltrasoundId, end: bool);

    /// Lower the trigger pin and stop the trigger pulse timer.
    fn stop_trigger_timer(&mut self, id: UltrasoundId);

    /// Capture tick of the echo rising edge (0 = not yet seen).
    fn echo_init_tick(&self, id: UltrasoundId) -> u32;
    /// Capture tick of the echo falling edge.
    fn echo_end_tick(&self, id: UltrasoundId) -> u32;
    /// Echo timer wraps counted between the two edges.
    fn echo_overflows(&self, id: UltrasoundId) -> u32;

    /// Zero both ticks, the overflow count and the received flag.
    fn reset_echo_ticks(&mut self, id: UltrasoundId);

    /// `true` once the falling edge has been captured.
    fn echo_received(&self, id: UltrasoundId) -> bool;
    fn set_echo_received(&mut self, id: UltrasoundId, received: bool);

    fn stop_echo_timer(&mut self, id: UltrasoundId);

    /// Arm the periodic timer that raises `trigger_ready`.
    fn start_new_measurement_timer(&mut self, id: UltrasoundId);

    /// Halt every timer of this sensor and clear its echo state.
    fn stop_ultrasound(&mut self, id: UltrasoundId);
}

// ───────────────────────────────────────────────────────────────
// Outputs
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    fn init_display(&mut self, id: DisplayId) -> Result<()>;

    /// Drive the three PWM channels of the RGB LED.
    fn set_rgb(&mut self, id: DisplayId, colour: Rgb);
}

pub trait BuzzerPort {
    fn init_buzzer(&mut self, id: BuzzerId) -> Result<()>;

    /// Sound level 0–255 (0 = silent).
    fn set_sound(&mut self, id: BuzzerId, level: u8);
}

// ───────────────────────────────────────────────────────────────
// Whole board
// ───────────────────────────────────────────────────────────────

/// Everything the orchestrator's polling loop needs from the hardware.
pub trait Board: SystemPort + ButtonPort + UltrasoundPort + DisplayPort + BuzzerPort {}

impl<T> Board for T where T: SystemPort + ButtonPort + UltrasoundPort + DisplayPort + BuzzerPort {}

// ───────────────────────────────────────────────────────────────
// Event sink
// ───────────────────────────────────────────────────────────────

/// The orchestrator emits structured [`EventRecord`](super::events::EventRecord)s
/// through this port.  Adapters decide where they go (serial log, test
/// recorder, telemetry link).
pub trait EventSink {
    fn emit(&mut self, record: &super::events::EventRecord);
}
