//! Absolute position fixes from the overhead tracking sensor.
//!
//! The sensor tracks a marker mounted on the rover, not the rover's rotation
//! centre, and signals faults in-band with negative sentinel readings. This
//! module classifies those sentinels and reconciles good readings with the
//! calibrated marker offset to recover the pose of the rotation centre.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use thiserror::Error;

use util::maths::{rotate_2d, wrap_360};

use crate::hw::{Clock, EncoderSource, MotorDriver, PositionSensor};
use crate::odom::Pose;
use crate::NavResult;

use super::NavCtrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A reconciled absolute position fix for the rover's rotation centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    /// Units: inches
    pub x_in: f64,

    /// Units: inches
    pub y_in: f64,

    /// Units: degrees in [0, 360)
    pub heading_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Faults the tracking sensor signals through its sentinel readings.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FixFault {
    /// The sensor link is down entirely.
    #[error("Position sensor is not connected")]
    SensorNotConnected,

    /// The sensor is up but cannot see the rover's marker.
    #[error("Position sensor cannot find the marker")]
    TargetNotFound,

    /// The rover is inside a region the sensor does not cover.
    #[error("Rover is in a sensor deadzone")]
    InDeadzone,
}

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

pub type FixResult = Result<Fix, FixFault>;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Classify a raw sensor reading, in order of severity.
///
/// Readings below -1.5 mean the marker could not be found at all, readings
/// in [-1.5, 0) mean it was found inside a deadzone.
pub fn classify_raw(region: i32, x: f64, y: f64, heading: f64) -> Result<(), FixFault> {
    if region < 0 {
        return Err(FixFault::SensorNotConnected);
    }
    if x < -1.5 || y < -1.5 || heading < -1.5 {
        return Err(FixFault::TargetNotFound);
    }
    if x < 0.0 || y < 0.0 || heading < 0.0 {
        return Err(FixFault::InDeadzone);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M, E, P, C> NavCtrl<M, E, P, C>
where
    M: MotorDriver,
    E: EncoderSource,
    P: PositionSensor,
    C: Clock,
{
    /// Take an absolute position fix.
    ///
    /// Waits out the sensor settle delay, reads the raw marker pose, then
    /// maps it back to the rotation centre using the calibration offset.
    pub fn get_fix(&mut self) -> NavResult<FixResult> {
        self.settle(self.tunables.fix_settle_delay_s)?;

        let region = self.eqpt.pos_sensor.current_region();
        let raw_x = self.eqpt.pos_sensor.x();
        let raw_y = self.eqpt.pos_sensor.y();
        let raw_h = self.eqpt.pos_sensor.heading();

        if let Err(fault) = classify_raw(region, raw_x, raw_y, raw_h) {
            return Ok(Err(fault));
        }

        // The marker offset was measured in the body frame, rotate it out to
        // the world frame at the rover's actual heading
        let angle_rad = raw_h.to_radians() - self.calib.rel_heading_rad;
        let (off_x, off_y) =
            rotate_2d(self.calib.rel_x_in, self.calib.rel_y_in, angle_rad);

        Ok(Ok(Fix {
            x_in: raw_x - off_x,
            y_in: raw_y - off_y,
            heading_deg: wrap_360(angle_rad.to_degrees()),
        }))
    }

    /// The best available pose: an absolute fix when the sensor gives a
    /// valid in-field reading, the dead-reckoned estimate otherwise.
    ///
    /// A valid fix also re-anchors the odometry, so subsequent dead
    /// reckoning integrates from the corrected pose.
    pub fn fused_pose(&mut self) -> NavResult<Pose> {
        match self.get_fix()? {
            Ok(fix) if self.fix_in_field(&fix) => {
                let pose = Pose {
                    x_in: fix.x_in,
                    y_in: fix.y_in,
                    heading_deg: fix.heading_deg,
                };
                self.odom.anchor(pose);
                Ok(pose)
            }
            Ok(fix) => {
                warn!(
                    "Fix ({:.1}, {:.1}, {:.1}) outside the field, using odometry",
                    fix.x_in, fix.y_in, fix.heading_deg
                );
                Ok(self.odom.pose())
            }
            Err(fault) => {
                warn!("Position fix fault ({}), using odometry", fault);
                Ok(self.odom.pose())
            }
        }
    }

    pub fn get_x(&mut self) -> NavResult<f64> {
        Ok(self.fused_pose()?.x_in)
    }

    pub fn get_y(&mut self) -> NavResult<f64> {
        Ok(self.fused_pose()?.y_in)
    }

    pub fn get_h(&mut self) -> NavResult<f64> {
        Ok(self.fused_pose()?.heading_deg)
    }

    fn fix_in_field(&self, fix: &Fix) -> bool {
        fix.x_in >= self.params.field_x_min_in
            && fix.x_in <= self.params.field_x_max_in
            && fix.y_in >= self.params.field_y_min_in
            && fix.y_in <= self.params.field_y_max_in
            && fix.heading_deg >= 0.0
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::testing::sim_ctrl;
    use super::super::CalibOffset;
    use super::*;

    #[test]
    fn test_classify_raw_sentinels() {
        assert_eq!(
            classify_raw(-1, 10.0, 10.0, 90.0),
            Err(FixFault::SensorNotConnected)
        );
        assert_eq!(
            classify_raw(1, -2.0, 10.0, 90.0),
            Err(FixFault::TargetNotFound)
        );
        assert_eq!(
            classify_raw(1, 10.0, -1.0, 90.0),
            Err(FixFault::InDeadzone)
        );
        // -1.5 exactly is still a deadzone reading
        assert_eq!(
            classify_raw(1, 10.0, 10.0, -1.5),
            Err(FixFault::InDeadzone)
        );
        assert_eq!(classify_raw(1, 10.0, 10.0, 90.0), Ok(()));
    }

    #[test]
    fn test_fix_reconciles_marker_offset() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 18.0;
            sim.true_y_in = 30.0;
            sim.true_heading_deg = 90.0;
            sim.marker_rel_x_in = 6.0;
        }
        ctrl.set_calib(CalibOffset {
            rel_x_in: 6.0,
            rel_y_in: 0.0,
            rel_heading_rad: 0.0,
        });

        let fix = ctrl.get_fix().unwrap().unwrap();
        assert!((fix.x_in - 18.0).abs() < 1e-9);
        assert!((fix.y_in - 30.0).abs() < 1e-9);
        assert!((fix.heading_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_fused_pose_falls_back_to_odometry() {
        let (mut ctrl, sim, _) = sim_ctrl();
        ctrl.drive(10.0).unwrap();
        sim.borrow_mut().x_override = Some(-2.0);

        // Sensor lost the marker, fused pose must be the odometry estimate
        let pose = ctrl.fused_pose().unwrap();
        assert!((pose.x_in - ctrl.pose().x_in).abs() < 1e-9);
    }

    #[test]
    fn test_fused_pose_anchors_odometry() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 24.0;
            sim.true_y_in = 40.0;
            sim.true_heading_deg = 180.0;
        }

        let pose = ctrl.fused_pose().unwrap();
        assert!((pose.x_in - 24.0).abs() < 1e-9);
        assert!((ctrl.pose().y_in - 40.0).abs() < 1e-9);
        assert!((ctrl.pose().heading_deg - 180.0).abs() < 1e-9);
        assert!((pose.heading_deg - 180.0).abs() < 1e-9);
    }
}
