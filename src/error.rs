//! Unified error types for the Urbanite controller.
//!
//! The FSM core itself never fails: a machine with no matching transition
//! simply stays where it is.  Errors only surface at construction time
//! (device lookup at the hardware boundary, configuration validation) or
//! when an internal invariant is broken, which is a programming fault.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Device kinds
// ---------------------------------------------------------------------------

/// Peripheral class, used to tag boundary lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Button,
    Ultrasound,
    Display,
    Buzzer,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button => write!(f, "button"),
            Self::Ultrasound => write!(f, "ultrasound"),
            Self::Display => write!(f, "display"),
            Self::Buzzer => write!(f, "buzzer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The hardware boundary has no device registered under this id.
    UnknownDevice { kind: DeviceKind, id: u8 },
    /// An internal invariant was violated (e.g. an FSM built without a
    /// transition table).  Reported, never recovered.
    Invariant(&'static str),
    /// Configuration is invalid or could not be decoded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDevice { kind, id } => write!(f, "unknown {kind} id {id}"),
            Self::Invariant(msg) => write!(f, "invariant violated: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
