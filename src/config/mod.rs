//! Configuration module for falling-notes
//!
//! Defaults match the classic behaviour: a 100 ms tick, notes falling
//! 10 px per tick, 25 px squares. Any field can be overridden through an
//! environment variable prefixed with `FALLING_NOTES_`, for example
//! `FALLING_NOTES_TICK_PERIOD_MS=50`.

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::core::{Offset, Rect};

pub const ENV_PREFIX: &str = "FALLING_NOTES_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesConfig {
    pub tick_period_ms: u64,
    pub step_x: i32,
    pub step_y: i32,
    pub note_size: i32,
    pub window_width: i32,
    pub window_height: i32,
}

impl NotesConfig {
    pub const DEFAULT_TICK_PERIOD_MS: u64 = 100;
    pub const DEFAULT_STEP_Y: i32 = 10;
    pub const DEFAULT_NOTE_SIZE: i32 = 25;

    /// Client coordinates travel in 16-bit message words
    pub const MAX_DIMENSION: i32 = i16::MAX as i32;
    pub const MAX_TICK_PERIOD_MS: u64 = 60_000;

    /// Load defaults overlaid with `FALLING_NOTES_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate from an arbitrary provider stack
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.tick_period_ms > Self::MAX_TICK_PERIOD_MS {
            return Err(ConfigError::TickPeriodTooLong(self.tick_period_ms));
        }
        if self.step().is_zero() {
            return Err(ConfigError::ZeroStep);
        }
        let max = Self::MAX_DIMENSION.unsigned_abs();
        if self.step_x.unsigned_abs() > max || self.step_y.unsigned_abs() > max {
            return Err(ConfigError::StepTooLarge {
                x: self.step_x,
                y: self.step_y,
            });
        }
        if !(1..=Self::MAX_DIMENSION).contains(&self.note_size) {
            return Err(ConfigError::InvalidNoteSize(self.note_size));
        }
        let dimension = 1..=Self::MAX_DIMENSION;
        if !dimension.contains(&self.window_width) || !dimension.contains(&self.window_height) {
            return Err(ConfigError::InvalidWindowSize {
                width: self.window_width,
                height: self.window_height,
            });
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn step(&self) -> Offset {
        Offset::new(self.step_x, self.step_y)
    }

    /// Initial client area of the host window
    pub fn client_rect(&self) -> Rect {
        Rect::from_size(self.window_width, self.window_height)
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: Self::DEFAULT_TICK_PERIOD_MS,
            step_x: 0,
            step_y: Self::DEFAULT_STEP_Y,
            note_size: Self::DEFAULT_NOTE_SIZE,
            window_width: 640,
            window_height: 480,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
    #[error("Tick period must be at least 1 ms")]
    ZeroTickPeriod,
    #[error("Tick period must be at most {max} ms, got {0}", max = NotesConfig::MAX_TICK_PERIOD_MS)]
    TickPeriodTooLong(u64),
    #[error("Step vector is zero, notes would never leave the window")]
    ZeroStep,
    #[error("Step components must be within ±{max}, got ({x}, {y})", max = NotesConfig::MAX_DIMENSION)]
    StepTooLarge { x: i32, y: i32 },
    #[error("Note size must be between 1 and {max}, got {0}", max = NotesConfig::MAX_DIMENSION)]
    InvalidNoteSize(i32),
    #[error("Window size must be between 1 and {max} per side, got {width}x{height}", max = NotesConfig::MAX_DIMENSION)]
    InvalidWindowSize { width: i32, height: i32 },
}
