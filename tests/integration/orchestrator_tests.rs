//! Integration tests for the ParkingAssist → Urbanite → peripheral FSM chain.
//!
//! The mock board stands in for every interrupt: the test raises
//! trigger-end, echo edges and the measurement timer by hand, so each
//! scenario controls exactly which poll sees which flag.

use crate::mock_hw::{Call, MockBoard};

use urbanite::adapters::sim::echo_width_us;
use urbanite::app::events::{EventRecord, UrbaniteEvent};
use urbanite::app::ports::{
    FRONT_PARKING_DISPLAY, FRONT_PARKING_SENSOR, REAR_PARKING_DISPLAY, REAR_PARKING_SENSOR, Rgb,
    UltrasoundId,
};
use urbanite::app::service::ParkingAssist;
use urbanite::config::UrbaniteConfig;
use urbanite::error::{DeviceKind, Error};
use urbanite::fsm::Fired;
use urbanite::fsm::button::ButtonState;
use urbanite::fsm::display::{COLOUR_OFF, colour_for_distance};
use urbanite::fsm::ultrasound::UltrasoundState;
use urbanite::fsm::urbanite::{Side, UrbaniteState};

struct Rig {
    assist: ParkingAssist<MockBoard>,
    hw: MockBoard,
    events: Vec<EventRecord>,
}

impl Rig {
    fn new() -> Self {
        let mut hw = MockBoard::new();
        let assist = ParkingAssist::new(UrbaniteConfig::default(), &mut hw).unwrap();
        Self {
            assist,
            hw,
            events: Vec::new(),
        }
    }

    fn poll(&mut self) -> Option<Fired<UrbaniteState>> {
        self.assist.poll(&mut self.hw, &mut self.events)
    }

    /// Poll once per millisecond for `ms` milliseconds.
    fn run(&mut self, ms: u32) {
        for _ in 0..ms {
            self.poll();
            self.hw.advance(1);
        }
    }

    /// Hold the button for `ms`, release it and return what the release
    /// poll fired.
    fn hold(&mut self, ms: u32) -> Option<Fired<UrbaniteState>> {
        self.hw.pressed = true;
        self.run(ms);
        self.hw.pressed = false;
        self.poll()
    }

    /// Let the release debounce expire.
    fn settle(&mut self) {
        self.run(150);
    }

    fn power_on(&mut self) {
        let fired = self.hold(3100);
        assert_eq!(
            fired,
            Some(Fired {
                from: UrbaniteState::Off,
                to: UrbaniteState::MeasureFront
            })
        );
        self.settle();
    }

    /// Play the interrupts of one trigger/echo cycle.  The sensor must be
    /// in `TriggerStart` and ends there again, re-armed.
    fn echo_cycle(&mut self, id: UltrasoundId, cm: u32) {
        self.hw.sensor(id).trigger_end = true;
        self.poll();
        self.hw.sensor(id).init_tick = 1;
        self.poll();
        let s = self.hw.sensor(id);
        s.end_tick = 1 + echo_width_us(cm) as u32;
        s.echo_received = true;
        self.poll();
        self.hw.sensor(id).trigger_ready = true;
        self.poll();
    }

    /// Feed a full median window of `cm` readings, then let the outputs
    /// repaint.
    fn measure(&mut self, id: UltrasoundId, cm: u32) {
        for _ in 0..5 {
            self.echo_cycle(id, cm);
        }
        self.run(5);
    }

    fn saw(&self, event: UrbaniteEvent) -> bool {
        self.events.iter().any(|r| r.event == event)
    }
}

// ── Power cycle ──────────────────────────────────────────────

#[test]
fn idle_controller_sleeps_while_off() {
    let mut rig = Rig::new();
    assert_eq!(rig.assist.state(), UrbaniteState::Off);

    let fired = rig.poll();
    assert_eq!(fired.map(|f| f.to), Some(UrbaniteState::SleepWhileOff));
    assert!(rig.saw(UrbaniteEvent::EnteredSleep(UrbaniteState::SleepWhileOff)));
    assert_eq!(rig.hw.count(Call::Sleep), 1);

    rig.poll();
    assert_eq!(rig.hw.count(Call::Sleep), 2, "staying asleep re-enters sleep");
}

#[test]
fn long_press_powers_on_front_sensing() {
    let mut rig = Rig::new();
    rig.run(10);
    rig.power_on();

    let urbanite = rig.assist.urbanite();
    let p = rig.assist.peripherals();
    assert_eq!(p.button.duration(), 0, "press consumed");
    assert!(p.front.ultrasound.status());
    assert!(!p.rear.ultrasound.status());
    assert!(!p.front.display.status());
    assert!(!p.buzzer.status());
    assert_eq!(urbanite.live_side(), Side::Front);
    assert!(!urbanite.is_paused());

    assert_eq!(rig.hw.count(Call::StartPeriodTimer(FRONT_PARKING_SENSOR.0)), 1);
    assert_eq!(rig.hw.count(Call::StartMeasurement(FRONT_PARKING_SENSOR.0)), 1);
    assert!(rig.saw(UrbaniteEvent::Woke {
        from: UrbaniteState::SleepWhileOff,
        to: UrbaniteState::Off
    }));
    assert!(rig.saw(UrbaniteEvent::SystemOn));
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOnFront);
}

#[test]
fn on_off_threshold_is_inclusive() {
    let mut rig = Rig::new();
    assert_eq!(rig.hold(2999), None);
    rig.settle();
    assert!(!rig.saw(UrbaniteEvent::SystemOn));

    let fired = rig.hold(3000);
    assert_eq!(fired.map(|f| f.to), Some(UrbaniteState::MeasureFront));
}

#[test]
fn short_presses_do_nothing_while_off() {
    let mut rig = Rig::new();
    rig.hold(600);
    rig.settle();
    rig.hold(1200);
    rig.settle();
    assert!(!rig.saw(UrbaniteEvent::SystemOn));
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOff);
}

#[test]
fn bounce_shorter_than_debounce_is_not_a_press() {
    let mut rig = Rig::new();
    rig.hold(50);
    assert_eq!(rig.assist.peripherals().button.state(), ButtonState::PressedWait);
    rig.settle();
    assert_eq!(rig.assist.peripherals().button.state(), ButtonState::Released);
    assert_eq!(rig.assist.peripherals().button.duration(), 0);
}

#[test]
fn long_press_while_on_powers_off() {
    let mut rig = Rig::new();
    rig.power_on();

    // Pressed while asleep: handled on the next wake.
    rig.hold(3100);
    rig.settle();
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOnFront);
    assert_eq!(rig.assist.peripherals().button.duration(), 3100);

    rig.measure(FRONT_PARKING_SENSOR, 50);
    assert!(rig.saw(UrbaniteEvent::SystemOff));
    assert!(!rig.saw(UrbaniteEvent::Distance { side: Side::Front, cm: 50 }));

    let p = rig.assist.peripherals();
    assert!(!p.front.ultrasound.status());
    assert!(!p.rear.ultrasound.status());
    assert_eq!(p.front.ultrasound.state(), UltrasoundState::WaitStart);
    assert!(!p.front.display.status());
    assert!(!p.buzzer.status());
    assert_eq!(rig.hw.count(Call::StopUltrasound(FRONT_PARKING_SENSOR.0)), 1);
    assert_eq!(rig.hw.count(Call::StopUltrasound(REAR_PARKING_SENSOR.0)), 1);
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOff);
}

// ── Distance reporting ───────────────────────────────────────

#[test]
fn median_reading_paints_display_and_buzzer() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.measure(FRONT_PARKING_SENSOR, 30);

    assert!(rig.saw(UrbaniteEvent::Distance { side: Side::Front, cm: 30 }));
    assert_eq!(rig.hw.last_rgb(FRONT_PARKING_DISPLAY), Some(Rgb::new(75, 126, 0)));
    assert_eq!(rig.hw.last_sound(), Some(216));

    let p = rig.assist.peripherals();
    assert!(p.front.display.status());
    assert!(p.front.display.is_idle());
    assert_eq!(p.front.display.distance(), 30);
    assert!(!p.rear.display.status());
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOnFront);
}

#[test]
fn partial_window_publishes_nothing() {
    let mut rig = Rig::new();
    rig.power_on();
    for _ in 0..4 {
        rig.echo_cycle(FRONT_PARKING_SENSOR, 80);
    }
    rig.run(5);
    assert!(!rig.events.iter().any(|r| matches!(r.event, UrbaniteEvent::Distance { .. })));
    assert_eq!(rig.hw.last_rgb(FRONT_PARKING_DISPLAY), None);
}

#[test]
fn new_measurement_wakes_the_orchestrator() {
    let mut rig = Rig::new();
    rig.power_on();
    assert_eq!(rig.assist.state(), UrbaniteState::SleepWhileOnFront);
    rig.events.clear();

    rig.measure(FRONT_PARKING_SENSOR, 120);
    assert_eq!(rig.events[0].event, UrbaniteEvent::Woke {
        from: UrbaniteState::SleepWhileOnFront,
        to: UrbaniteState::MeasureFront
    });
    assert_eq!(rig.events[1].event, UrbaniteEvent::Distance { side: Side::Front, cm: 120 });
    assert_eq!(
        rig.events[2].event,
        UrbaniteEvent::EnteredSleep(UrbaniteState::SleepWhileOnFront)
    );
}

// ── Pause ────────────────────────────────────────────────────

#[test]
fn paused_display_only_shows_danger() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.hold(600);
    rig.settle();

    rig.measure(FRONT_PARKING_SENSOR, 10);
    assert!(rig.saw(UrbaniteEvent::Paused));
    assert!(rig.assist.urbanite().is_paused());
    assert_eq!(
        rig.hw.last_rgb(FRONT_PARKING_DISPLAY),
        Some(colour_for_distance(10))
    );
    assert_eq!(rig.hw.last_sound(), Some(242));
    assert!(rig.assist.peripherals().front.display.status());

    rig.measure(FRONT_PARKING_SENSOR, 20);
    assert!(rig.saw(UrbaniteEvent::Distance { side: Side::Front, cm: 20 }));
    let p = rig.assist.peripherals();
    assert!(!p.front.display.status());
    assert!(!p.buzzer.status());
    assert_eq!(rig.hw.last_rgb(FRONT_PARKING_DISPLAY), Some(COLOUR_OFF));
    assert_eq!(rig.hw.last_sound(), Some(0));
}

#[test]
fn second_pause_resumes() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.hold(600);
    rig.settle();
    rig.measure(FRONT_PARKING_SENSOR, 60);
    assert!(rig.assist.urbanite().is_paused());

    rig.hold(700);
    rig.settle();
    rig.measure(FRONT_PARKING_SENSOR, 60);
    assert!(rig.saw(UrbaniteEvent::Resumed));
    assert!(!rig.assist.urbanite().is_paused());
    assert!(rig.assist.peripherals().front.display.status());
    assert_eq!(
        rig.hw.last_rgb(FRONT_PARKING_DISPLAY),
        Some(colour_for_distance(60))
    );
}

// ── Sensor swap ──────────────────────────────────────────────

#[test]
fn medium_press_swaps_to_rear() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.hold(1200);
    rig.settle();
    rig.measure(FRONT_PARKING_SENSOR, 100);

    assert!(rig.saw(UrbaniteEvent::ModeChanged(Side::Rear)));
    let urbanite = rig.assist.urbanite();
    assert!(urbanite.is_rear());
    assert_eq!(urbanite.live_side(), Side::Rear);
    assert_eq!(urbanite.state(), UrbaniteState::SleepWhileOnRear);

    let p = rig.assist.peripherals();
    assert_eq!(p.button.duration(), 0);
    assert!(!p.front.ultrasound.status());
    assert!(!p.front.display.status());
    assert!(p.rear.ultrasound.status());
    assert!(!p.rear.display.status());
    assert_eq!(rig.hw.count(Call::StopUltrasound(FRONT_PARKING_SENSOR.0)), 1);
    assert_eq!(rig.hw.count(Call::StartPeriodTimer(REAR_PARKING_SENSOR.0)), 1);

    rig.measure(REAR_PARKING_SENSOR, 40);
    assert!(rig.saw(UrbaniteEvent::Distance { side: Side::Rear, cm: 40 }));
    assert_eq!(rig.hw.last_rgb(REAR_PARKING_DISPLAY), Some(Rgb::new(37, 190, 0)));
    assert_eq!(rig.hw.last_rgb(FRONT_PARKING_DISPLAY), Some(COLOUR_OFF));
}

#[test]
fn swap_back_to_front() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.hold(1200);
    rig.settle();
    rig.measure(FRONT_PARKING_SENSOR, 100);
    assert!(rig.assist.urbanite().is_rear());

    rig.hold(1500);
    rig.settle();
    rig.measure(REAR_PARKING_SENSOR, 100);
    assert!(rig.saw(UrbaniteEvent::ModeChanged(Side::Front)));
    assert!(!rig.assist.urbanite().is_rear());
    assert!(rig.assist.peripherals().front.ultrasound.status());
    assert!(!rig.assist.peripherals().rear.ultrasound.status());
}

#[test]
fn power_on_after_rear_session_starts_front() {
    let mut rig = Rig::new();
    rig.power_on();
    rig.hold(1200);
    rig.settle();
    rig.measure(FRONT_PARKING_SENSOR, 100);
    rig.hold(3100);
    rig.settle();
    rig.measure(REAR_PARKING_SENSOR, 100);
    assert!(rig.saw(UrbaniteEvent::SystemOff));

    rig.hold(3100);
    assert_eq!(rig.assist.urbanite().live_side(), Side::Front);
    assert!(rig.assist.peripherals().front.ultrasound.status());
}

// ── Construction ─────────────────────────────────────────────

#[test]
fn missing_device_fails_construction() {
    let mut hw = MockBoard::new();
    hw.missing = Some(DeviceKind::Display);
    let err = ParkingAssist::new(UrbaniteConfig::default(), &mut hw).err();
    assert_eq!(
        err,
        Some(Error::UnknownDevice {
            kind: DeviceKind::Display,
            id: FRONT_PARKING_DISPLAY.0
        })
    );
}

#[test]
fn invalid_config_is_rejected() {
    let mut hw = MockBoard::new();
    let config = UrbaniteConfig {
        pause_display_time_ms: 1000,
        ..UrbaniteConfig::default()
    };
    assert!(matches!(
        ParkingAssist::new(config, &mut hw),
        Err(Error::Config(_))
    ));
}
