//! Urbanite parking-assist controller.
//!
//! A button, two ultrasonic range sensors, two RGB displays and a buzzer,
//! each driven by its own table-driven state machine and coordinated by the
//! Urbanite orchestrator.  All hardware access goes through the port traits
//! in [`app::ports`]; [`adapters::sim::SimBoard`] implements them on the
//! host so every machine can be exercised without a board.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
