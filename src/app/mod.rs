//! Application core: pure coordination logic, zero I/O.
//!
//! This module contains the polling service that drives the Urbanite
//! orchestrator and its peripheral FSMs, the outbound event types, and the
//! hardware boundary.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
