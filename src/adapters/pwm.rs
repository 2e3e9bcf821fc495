//! `embedded-hal` drivers for the Urbanite outputs and the parking button.
//!
//! These wrap HAL channels the board support crate hands out.  They are the
//! building blocks for a target board; the host build only has
//! [`SimBoard`](super::sim::SimBoard), so nothing here is wired to a port
//! yet.
//!
//! Outputs map one to one onto [`DisplayPort::set_rgb`] and
//! [`BuzzerPort::set_sound`].  The button is different:
//! [`ButtonPort::is_pressed`] reports a level latched by the edge interrupt,
//! so [`ActiveLowButton::is_pressed`] is meant to be sampled from that
//! interrupt, which owns the pin mutably.
//!
//! [`DisplayPort::set_rgb`]: crate::app::ports::DisplayPort::set_rgb
//! [`BuzzerPort::set_sound`]: crate::app::ports::BuzzerPort::set_sound
//! [`ButtonPort::is_pressed`]: crate::app::ports::ButtonPort::is_pressed

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::Rgb;
use crate::fsm::buzzer::{BUZZER_MIN_VALUE, tone_hz};

/// Full-scale value of one colour channel or sound level.
const CHANNEL_MAX: u16 = 255;

// ───────────────────────────────────────────────────────────────
// RGB LED
// ───────────────────────────────────────────────────────────────

/// Three-channel RGB LED, one PWM channel per colour.
pub struct PwmRgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    colour: Rgb,
}

impl<R, G, B> PwmRgbLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Wrap the channels and switch the LED off.
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            colour: Rgb::default(),
        };
        led.set(Rgb::default());
        led
    }

    /// Drive each channel with duty `value / 255`.
    pub fn set(&mut self, colour: Rgb) {
        let written = [
            self.red.set_duty_cycle_fraction(u16::from(colour.r), CHANNEL_MAX).is_ok(),
            self.green.set_duty_cycle_fraction(u16::from(colour.g), CHANNEL_MAX).is_ok(),
            self.blue.set_duty_cycle_fraction(u16::from(colour.b), CHANNEL_MAX).is_ok(),
        ];
        if written.contains(&false) {
            warn!("rgb led: PWM write failed for {colour:?}");
        }
        self.colour = colour;
    }

    /// Last colour written.
    pub fn colour(&self) -> Rgb {
        self.colour
    }

    pub fn free(self) -> (R, G, B) {
        (self.red, self.green, self.blue)
    }
}

// ───────────────────────────────────────────────────────────────
// Buzzer
// ───────────────────────────────────────────────────────────────

/// Passive buzzer on one PWM channel.
///
/// The HAL trait only covers duty, so the tone for the current level is
/// exposed through [`tone_hz`](Self::tone_hz) for the board to program into
/// the timer.
pub struct PwmBuzzer<P> {
    pin: P,
    level: u8,
}

impl<P: SetDutyCycle> PwmBuzzer<P> {
    pub fn new(pin: P) -> Self {
        let mut buzzer = Self { pin, level: BUZZER_MIN_VALUE };
        buzzer.set_level(BUZZER_MIN_VALUE);
        buzzer
    }

    /// Level 0 silences the output; anything else drives a 50 % square wave.
    pub fn set_level(&mut self, level: u8) {
        let res = if level == BUZZER_MIN_VALUE {
            self.pin.set_duty_cycle_fully_off()
        } else {
            self.pin.set_duty_cycle_percent(50)
        };
        if res.is_err() {
            warn!("buzzer: PWM write failed for level {level}");
        }
        self.level = level;
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Tone the timer should run at, `None` when silent.
    pub fn tone_hz(&self) -> Option<u32> {
        tone_hz(self.level)
    }

    pub fn free(self) -> P {
        self.pin
    }
}

// ───────────────────────────────────────────────────────────────
// Button
// ───────────────────────────────────────────────────────────────

/// Push button wired to ground with a pull-up: pressed reads low.
pub struct ActiveLowButton<P> {
    pin: P,
}

impl<P: InputPin> ActiveLowButton<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Sample the pin.  Read errors count as released.
    pub fn is_pressed(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }

    pub fn free(self) -> P {
        self.pin
    }
}
