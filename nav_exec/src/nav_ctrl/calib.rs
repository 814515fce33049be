//! Marker offset calibration and point-to-point driving.
//!
//! The tracking sensor reports the pose of the marker mounted on the rover,
//! which is generally not at the rotation centre. The calibration routine
//! measures the offset empirically: drive straight to learn which way the
//! rover actually travels, then spin in place so the marker sweeps a circle
//! whose radius is the offset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use util::maths::{limit_angle, rotate_2d};

use crate::hw::{Clock, EncoderSource, MotorDriver, PositionSensor};
use crate::NavResult;

use super::pos_fix::FixFault;
use super::NavCtrl;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Straight-line distance driven by the calibration routine.
///
/// Units: inches
const CALIB_DRIVE_IN: f64 = 8.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose of the tracked marker relative to the rover's rotation centre, in
/// the rover's body frame. Established once, read-only afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CalibOffset {
    /// Units: inches
    pub rel_x_in: f64,

    /// Units: inches
    pub rel_y_in: f64,

    /// Units: radians
    pub rel_heading_rad: f64,
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
    /// Measure the marker offset and store it as the active calibration.
    ///
    /// Any fix fault aborts the routine without touching the previous
    /// calibration beyond the initial reset.
    pub fn calibrate_offset(&mut self) -> NavResult<Result<CalibOffset, FixFault>> {
        // Measure against raw readings, not a stale calibration
        self.calib = CalibOffset::default();

        let fix_1 = match self.get_fix()? {
            Ok(f) => f,
            Err(fault) => return Ok(Err(fault)),
        };
        let facing_rad = fix_1.heading_deg.to_radians();

        self.drive(CALIB_DRIVE_IN)?;
        let fix_2 = match self.get_fix()? {
            Ok(f) => f,
            Err(fault) => return Ok(Err(fault)),
        };

        // Direction the rover actually travelled
        let travel_x = fix_2.x_in - fix_1.x_in;
        let travel_y = fix_2.y_in - fix_1.y_in;
        let travel_angle_rad = travel_y.atan2(travel_x);

        // Angle from the travel direction to the heading the sensor reports
        let rel_heading_rad = angle_between(
            travel_x,
            travel_y,
            facing_rad.cos(),
            facing_rad.sin(),
        );

        // Spin half a turn, the marker traces a circle around the rotation
        // centre with the offset as its radius
        self.turn(180.0)?;
        let fix_3 = match self.get_fix()? {
            Ok(f) => f,
            Err(fault) => return Ok(Err(fault)),
        };

        let (rel_x_in, rel_y_in) = rotate_2d(
            (fix_2.x_in - fix_3.x_in) / 2.0,
            (fix_2.y_in - fix_3.y_in) / 2.0,
            -travel_angle_rad,
        );

        let offset = CalibOffset {
            rel_x_in,
            rel_y_in,
            rel_heading_rad,
        };

        info!(
            "Calibrated marker offset: ({:.2}, {:.2}) in, {:.3} rad",
            offset.rel_x_in, offset.rel_y_in, offset.rel_heading_rad
        );

        self.calib = offset;
        Ok(Ok(offset))
    }

    /// Drive to an absolute pose: turn to face the target, drive the straight
    /// line, then turn to the final heading. No obstacle avoidance and no
    /// arrival check.
    pub fn drive_to(
        &mut self,
        target_x_in: f64,
        target_y_in: f64,
        target_h_deg: f64,
    ) -> NavResult<Result<(), FixFault>> {
        self.goto_target(target_x_in, target_y_in, target_h_deg, false)
    }

    /// Same as [`Self::drive_to`] but driving in reverse.
    pub fn drive_to_backwards(
        &mut self,
        target_x_in: f64,
        target_y_in: f64,
        target_h_deg: f64,
    ) -> NavResult<Result<(), FixFault>> {
        self.goto_target(target_x_in, target_y_in, target_h_deg, true)
    }

    fn goto_target(
        &mut self,
        target_x_in: f64,
        target_y_in: f64,
        target_h_deg: f64,
        backwards: bool,
    ) -> NavResult<Result<(), FixFault>> {
        let fix = match self.get_fix()? {
            Ok(f) => f,
            Err(fault) => return Ok(Err(fault)),
        };

        let mut disp_x = target_x_in - fix.x_in;
        let mut disp_y = target_y_in - fix.y_in;
        if backwards {
            disp_x = -disp_x;
            disp_y = -disp_y;
        }

        let distance_in = disp_x.hypot(disp_y);
        if distance_in < 1e-9 {
            // Already at the target point, only the heading is left
            let error_deg = limit_angle(target_h_deg - fix.heading_deg);
            self.turn(-error_deg)?;
            return Ok(Ok(()));
        }

        let unit_x = disp_x / distance_in;
        let unit_y = disp_y / distance_in;

        // Face along the displacement
        let facing_rad = fix.heading_deg.to_radians();
        let angle_rad =
            angle_between(facing_rad.cos(), facing_rad.sin(), unit_x, unit_y);
        self.turn(-angle_rad.to_degrees())?;

        self.drive(if backwards { -distance_in } else { distance_in })?;

        // Turn from the travel direction to the final heading
        let target_rad = target_h_deg.to_radians();
        let angle_rad =
            angle_between(unit_x, unit_y, target_rad.cos(), target_rad.sin());
        self.turn(-angle_rad.to_degrees())?;

        Ok(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Signed angle from vector a to vector b.
///
/// Units: radians in [-pi, pi]
fn angle_between(a_x: f64, a_y: f64, b_x: f64, b_y: f64) -> f64 {
    (a_x * b_y - a_y * b_x).atan2(a_x * b_x + a_y * b_y)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::testing::sim_ctrl;
    use super::*;

    #[test]
    fn test_angle_between() {
        assert!((angle_between(1.0, 0.0, 0.0, 1.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((angle_between(0.0, 1.0, 1.0, 0.0) + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(angle_between(1.0, 0.0, 1.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_recovers_marker_offset() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 12.0;
            sim.true_y_in = 30.0;
            sim.marker_rel_x_in = 6.0;
        }

        let offset = ctrl.calibrate_offset().unwrap().unwrap();
        assert!((offset.rel_x_in - 6.0).abs() < 0.1);
        assert!(offset.rel_y_in.abs() < 0.1);
        assert!(offset.rel_heading_rad.abs() < 0.05);

        // The offset is now live, fixes must report the rotation centre
        let fix = ctrl.get_fix().unwrap().unwrap();
        let sim = sim.borrow();
        assert!((fix.x_in - sim.true_x_in).abs() < 0.1);
        assert!((fix.y_in - sim.true_y_in).abs() < 0.1);
    }

    #[test]
    fn test_calibration_aborts_on_fix_fault() {
        let (mut ctrl, sim, _) = sim_ctrl();
        sim.borrow_mut().region_override = Some(-1);

        let result = ctrl.calibrate_offset().unwrap();
        assert_eq!(result, Err(FixFault::SensorNotConnected));
    }

    #[test]
    fn test_drive_to_reaches_target() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 12.0;
            sim.true_y_in = 30.0;
            sim.true_heading_deg = 90.0;
        }

        ctrl.drive_to(12.0, 40.0, 90.0).unwrap().unwrap();

        let sim = sim.borrow();
        assert!((sim.true_x_in - 12.0).abs() < 0.2);
        assert!((sim.true_y_in - 40.0).abs() < 0.2);
        assert!((limit_angle(sim.true_heading_deg - 90.0)).abs() < 1.0);
    }
}
