//! Hardware abstraction for the navigation controller.
//!
//! The controller is generic over these traits so the same control code runs
//! against the rover's drivetrain and against the deterministic simulation
//! used in tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single drive motor.
pub trait MotorDriver {
    /// Command the motor at a percentage of full power.
    ///
    /// Units: percent, positive is forwards
    fn set_percent(&mut self, percent: f64);

    /// Bring the motor to a stop.
    fn stop(&mut self);
}

/// A wheel shaft encoder.
pub trait EncoderSource {
    /// The number of counts accumulated since the last reset.
    fn counts(&self) -> i32;

    /// Zero the accumulated count.
    fn reset_counts(&mut self);
}

/// An absolute position sensor reporting the rover's pose on the field.
///
/// Readings below zero are sentinel values indicating a fault, see
/// [`crate::nav_ctrl::FixFault`].
pub trait PositionSensor {
    /// The field region the sensor believes the rover is in, negative if the
    /// sensor is not connected.
    fn current_region(&self) -> i32;

    /// Reported X position.
    ///
    /// Units: inches
    fn x(&self) -> f64;

    /// Reported Y position.
    ///
    /// Units: inches
    fn y(&self) -> f64;

    /// Reported heading.
    ///
    /// Units: degrees in [0, 360)
    fn heading(&self) -> f64;
}

/// Monotonic time source used for deadlines and settle delays.
pub trait Clock {
    /// Seconds elapsed since an arbitrary epoch.
    fn now(&self) -> f64;

    /// Yield for one control tick.
    fn idle(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The full set of devices the navigation controller drives.
pub struct Equipment<M, E, P, C> {
    pub left_motor: M,
    pub right_motor: M,
    pub left_encoder: E,
    pub right_encoder: E,
    pub pos_sensor: P,
    pub clock: C,
}

/// Wall-clock implementation of [`Clock`] for running on the rover.
pub struct SystemClock {
    epoch: Instant,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn idle(&mut self) {
        std::thread::sleep(Duration::from_millis(1));
    }
}
