//! Keyboard-driven spin ramp for the blade.
//!
//! Arrow keys change a target angular velocity; every timer tick moves the
//! current velocity one step toward it and yields the incremental rotation to
//! apply. Velocities are in degrees per tick, so the speed in RPM is
//! `rate * fps / 6`.

use std::fmt;
use std::time::Duration;

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::AnimationConfig;
use crate::transform::rotation_about;

/// One keyboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinCommand {
    /// Raise the target by one increment (Up).
    SpeedUp,
    /// Lower the target by one increment (Down).
    SlowDown,
    /// Ramp quickly to a standstill (Left).
    Stop,
    /// Halt at once and return the blade to its initial position (Right).
    Reset,
}

/// Outcome of a command, shown to the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinStatus {
    SpeedSet { rpm: f32 },
    Stopped,
}

impl fmt::Display for SpinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeedSet { rpm } => write!(f, "The speed is set to: {rpm} RPM."),
            Self::Stopped => write!(f, "The animation is stopped and the fan position is reset."),
        }
    }
}

/// What a timer tick does to the rotation node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinStep {
    /// Turn by this many degrees about +Y.
    Rotate(f32),
    /// Snap back to zero rotation.
    Reset,
}

impl SpinStep {
    /// New value for a rotation node currently at `current`.
    pub fn apply(self, current: UnitQuaternion<f32>) -> UnitQuaternion<f32> {
        match self {
            Self::Rotate(degrees) => rotation_about(Vector3::y(), degrees.to_radians()) * current,
            Self::Reset => UnitQuaternion::identity(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpinController {
    config: AnimationConfig,
    rate: f32,
    target_rate: f32,
    accel: i8,
    accel_rate: f32,
    reset: bool,
    scheduled: bool,
}

impl SpinController {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            rate: 0.0,
            target_rate: 0.0,
            accel: 0,
            accel_rate: 0.0,
            reset: false,
            scheduled: false,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Current velocity, degrees per tick.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn target_rate(&self) -> f32 {
        self.target_rate
    }

    /// Direction of the last step: -1, 0 or 1.
    pub fn accel(&self) -> i8 {
        self.accel
    }

    pub fn accel_rate(&self) -> f32 {
        self.accel_rate
    }

    pub fn is_reset(&self) -> bool {
        self.reset
    }

    /// Ticks only run once a command has armed the timer.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.config.fps.max(1)))
    }

    pub fn rpm(&self) -> f32 {
        self.to_rpm(self.rate)
    }

    pub fn target_rpm(&self) -> f32 {
        self.to_rpm(self.target_rate)
    }

    fn to_rpm(&self, rate: f32) -> f32 {
        rate * self.config.fps as f32 / 6.0
    }

    /// Apply a keyboard command and arm the timer.
    pub fn handle(&mut self, command: SpinCommand) -> SpinStatus {
        self.scheduled = true;
        match command {
            SpinCommand::SpeedUp => {
                self.reset = false;
                self.target_rate += self.config.rate_increment;
                self.accel_rate = self.config.slow;
            }
            SpinCommand::SlowDown => {
                self.reset = false;
                self.target_rate -= self.config.rate_increment;
                self.accel_rate = self.config.slow;
            }
            SpinCommand::Stop => {
                self.reset = false;
                self.target_rate = 0.0;
                self.accel_rate = self.config.fast;
            }
            SpinCommand::Reset => {
                self.reset = true;
                self.target_rate = 0.0;
                return SpinStatus::Stopped;
            }
        }
        SpinStatus::SpeedSet {
            rpm: self.target_rpm(),
        }
    }

    /// Advance the ramp by one timer tick.
    ///
    /// Returns `None` while the timer has not been armed.
    pub fn tick(&mut self) -> Option<SpinStep> {
        if !self.scheduled {
            return None;
        }

        let diff = self.target_rate - self.rate;
        self.accel = if diff > self.config.dead_band {
            1
        } else if diff < -self.config.dead_band {
            -1
        } else {
            0
        };
        // Fixed step: a step wider than the dead band can oscillate around the target.
        self.rate += f32::from(self.accel) * self.accel_rate;

        if self.reset {
            self.rate = 0.0;
            Some(SpinStep::Reset)
        } else {
            Some(SpinStep::Rotate(self.rate))
        }
    }
}
