//! System configuration parameters
//!
//! Button press-time thresholds that drive the Urbanite orchestrator, plus
//! the debounce window of the parking button.  Values can be overridden from
//! a JSON file on the host or persisted as a compact postcard blob on target.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrbaniteConfig {
    // --- Press-time tiers ---
    /// Hold time (ms) that toggles the whole system on or off
    pub on_off_press_time_ms: u32,
    /// Hold time (ms) that swaps between front and rear sensing
    pub change_press_time_ms: u32,
    /// Hold time (ms) that pauses or resumes the display and buzzer
    pub pause_display_time_ms: u32,

    // --- Button ---
    /// Debounce window (ms) applied on press and on release
    pub button_debounce_ms: u32,
}

impl Default for UrbaniteConfig {
    fn default() -> Self {
        Self {
            on_off_press_time_ms: 3000,
            change_press_time_ms: 1000,
            pause_display_time_ms: 500,

            button_debounce_ms: 100,
        }
    }
}

impl UrbaniteConfig {
    /// Reject threshold orderings that would make a press tier unreachable.
    pub fn validate(&self) -> Result<()> {
        if self.button_debounce_ms == 0 {
            return Err(Error::Config("button_debounce_ms must be non-zero"));
        }
        if self.pause_display_time_ms == 0 {
            return Err(Error::Config("pause_display_time_ms must be non-zero"));
        }
        if self.pause_display_time_ms >= self.change_press_time_ms {
            return Err(Error::Config(
                "pause_display_time_ms must be below change_press_time_ms",
            ));
        }
        if self.change_press_time_ms >= self.on_off_press_time_ms {
            return Err(Error::Config(
                "change_press_time_ms must be below on_off_press_time_ms",
            ));
        }
        Ok(())
    }

    /// Serialise to the compact blob stored in flash.
    pub fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("postcard encode failed"))
    }

    /// Decode and validate a stored blob.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("stored config corrupted"))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON override document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON config"))?;
        config.validate()?;
        Ok(config)
    }
}
