//! Urbanite host simulation.
//!
//! Runs the full controller against [`SimBoard`] through a scripted drive:
//! power on, creep towards an obstacle in front, pause (with the danger
//! override kicking in), resume, swap to the rear sensor, power off.
//!
//! ```text
//!   SimBoard ──▶ ParkingAssist::poll ──▶ LogEventSink
//!      ▲                                     │
//!      └── scripted presses / obstacles      └─▶ env_logger (RUST_LOG)
//! ```
//!
//! Usage: `urbanite [config.json]`

use std::{env, fs};

use anyhow::{Context, Result};
use log::info;

use urbanite::adapters::log_sink::LogEventSink;
use urbanite::adapters::sim::SimBoard;
use urbanite::app::ports::{
    Clock, DisplayId, FRONT_PARKING_DISPLAY, FRONT_PARKING_SENSOR, PARKING_BUTTON, PARKING_BUZZER,
    REAR_PARKING_DISPLAY, REAR_PARKING_SENSOR, UltrasoundId,
};
use urbanite::app::service::ParkingAssist;
use urbanite::config::UrbaniteConfig;

// ── Scenario ──────────────────────────────────────────────────

/// Button presses: (press at ms, hold ms).
const PRESSES: [(u32, u32); 5] = [
    (100, 3100),    // on
    (8_000, 600),   // pause
    (10_500, 600),  // resume
    (11_500, 1200), // swap to rear
    (14_000, 3100), // off
];

/// Obstacle moves: (at ms, sensor, distance).
const OBSTACLES: [(u32, UltrasoundId, Option<u32>); 9] = [
    (3_500, FRONT_PARKING_SENSOR, Some(180)),
    (4_500, FRONT_PARKING_SENSOR, Some(120)),
    (5_500, FRONT_PARKING_SENSOR, Some(60)),
    (6_500, FRONT_PARKING_SENSOR, Some(30)),
    (7_500, FRONT_PARKING_SENSOR, Some(20)),
    (9_000, FRONT_PARKING_SENSOR, Some(8)),
    (12_000, REAR_PARKING_SENSOR, Some(90)),
    (13_000, REAR_PARKING_SENSOR, Some(40)),
    (13_500, REAR_PARKING_SENSOR, None),
];

const RUN_UNTIL_MS: u32 = 19_000;

fn load_config() -> Result<UrbaniteConfig> {
    match env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            let config = UrbaniteConfig::from_json(&json)
                .with_context(|| format!("parsing config file {path}"))?;
            info!("Config loaded from {path}");
            Ok(config)
        }
        None => Ok(UrbaniteConfig::default()),
    }
}

fn log_outputs(hw: &SimBoard, label: &str, display: DisplayId) {
    let rgb = hw.rgb(display);
    info!(
        "{label:>5} display ({:>3},{:>3},{:>3})  buzzer {:>3}",
        rgb.r,
        rgb.g,
        rgb.b,
        hw.sound(PARKING_BUZZER)
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Urbanite v{:<26}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;

    let mut hw = SimBoard::reference();
    for (at, hold) in PRESSES {
        hw.script_press(at, PARKING_BUTTON, hold);
    }

    let mut assist = ParkingAssist::new(config, &mut hw)?;
    let mut sink = LogEventSink::new();
    let mut obstacles = OBSTACLES.iter().peekable();
    let mut next_report = 1_000;

    while hw.millis() < RUN_UNTIL_MS {
        while let Some(&&(at, id, cm)) = obstacles.peek() {
            if at > hw.millis() {
                break;
            }
            hw.set_obstacle(id, cm);
            obstacles.next();
        }

        assist.poll(&mut hw, &mut sink);
        hw.advance(1);

        if hw.millis() >= next_report {
            next_report = hw.millis() + 1_000;
            log_outputs(&hw, "front", FRONT_PARKING_DISPLAY);
            log_outputs(&hw, "rear", REAR_PARKING_DISPLAY);
        }
    }

    info!(
        "Done at {} ms: state {:?}, {} polls, {} sleeps, {} events",
        hw.millis(),
        assist.state(),
        assist.poll_count(),
        hw.sleep_count(),
        sink.emitted()
    );
    Ok(())
}
