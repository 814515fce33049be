//! Closed-loop alignment to headings and field axes.
//!
//! Each routine loops read-correct-reread until the error is inside
//! tolerance. Movement timeouts are recovered locally with a short unstick
//! drive, so a rover wedged against field furniture keeps trying rather than
//! aborting the whole routine.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use rand::Rng;

use util::maths::limit_angle;

use crate::hw::{Clock, EncoderSource, MotorDriver, PositionSensor};
use crate::nav_assert;
use crate::odom::Pose;
use crate::NavResult;

use super::NavCtrl;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which field axis an alignment targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// How a bounded alignment ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignOutcome {
    /// Both the held heading and the axis coordinate are within tolerance.
    Converged,

    /// The iteration bound was hit, the rover is at its last-reached pose.
    IterLimit,
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
    /// Turn until the rover's heading is within tolerance of the target.
    ///
    /// Units: degrees
    pub fn line_up_to_heading(&mut self, target_deg: f64) -> NavResult<()> {
        loop {
            let error_deg = limit_angle(target_deg - self.get_h()?);
            if error_deg.abs() <= self.tunables.heading_tolerance_deg {
                return Ok(());
            }

            debug!("Heading error {:.2} deg, correcting", error_deg);
            self.turn(-error_deg)?;
        }
    }

    /// Drive until the rover's coordinate on the given axis is within
    /// tolerance of the target.
    ///
    /// The needed delta is projected onto the rover's current heading, so
    /// this works at any approach angle that is not parallel to the axis.
    ///
    /// Units: inches
    pub fn line_up_to_axis(&mut self, target_in: f64, axis: Axis) -> NavResult<()> {
        loop {
            let pose = self.fused_pose()?;
            let delta_in = target_in - read_axis(&pose, axis);
            if delta_in.abs() <= self.tunables.linear_tolerance_in {
                return Ok(());
            }

            let dist_in = self.project_onto_heading(delta_in, axis, &pose)?;
            debug!("Axis error {:.2} in, driving {:.2} in", delta_in, dist_in);
            self.drive(dist_in)?;
        }
    }

    /// Reach an axis coordinate while holding a heading, correcting whichever
    /// has drifted on each pass.
    ///
    /// The heading is always corrected first: the axis projection is only
    /// meaningful once the rover actually faces the held heading. Movement
    /// timeouts trigger an unstick drive and another pass. Exits best-effort
    /// after the iteration bound without a convergence guarantee.
    pub fn line_up_to_axis_maintain_heading(
        &mut self,
        target_in: f64,
        axis: Axis,
        held_heading_deg: f64,
    ) -> NavResult<AlignOutcome> {
        for _ in 0..self.tunables.max_align_iters {
            self.cancel.check()?;

            let pose = self.fused_pose()?;

            let heading_error_deg =
                limit_angle(held_heading_deg - pose.heading_deg);
            if heading_error_deg.abs() > self.tunables.heading_tolerance_deg {
                if self.turn(-heading_error_deg)?.timed_out() {
                    self.unstick_random()?;
                }
                continue;
            }

            let delta_in = target_in - read_axis(&pose, axis);
            if delta_in.abs() <= self.tunables.linear_tolerance_in {
                return Ok(AlignOutcome::Converged);
            }

            let dist_in = self.project_onto_heading(delta_in, axis, &pose)?;
            if self.drive(dist_in)?.timed_out() {
                // Back off opposite to the intended correction
                self.drive(-self.params.unstick_drive_in * dist_in.signum())?;
            }
        }

        warn!(
            "Alignment to {:?} = {:.2} did not converge within {} iterations",
            axis, target_in, self.tunables.max_align_iters
        );
        Ok(AlignOutcome::IterLimit)
    }

    /// Convert an axis-aligned delta into a drive distance along the rover's
    /// current heading.
    fn project_onto_heading(
        &self,
        delta_in: f64,
        axis: Axis,
        pose: &Pose,
    ) -> NavResult<f64> {
        let heading_rad = pose.heading_deg.to_radians();
        let trig = match axis {
            Axis::X => heading_rad.cos(),
            Axis::Y => heading_rad.sin(),
        };

        nav_assert!(
            trig.abs() > 1e-3,
            "Heading {:.2} deg is parallel to the {:?} axis",
            pose.heading_deg,
            axis
        );

        Ok(delta_in / trig + self.params.marker_forward_offset_in)
    }

    /// Drive a short distance in a random direction to dislodge the rover.
    fn unstick_random(&mut self) -> NavResult<()> {
        let dist_in = if rand::thread_rng().gen_bool(0.5) {
            self.params.unstick_drive_in
        }
        else {
            -self.params.unstick_drive_in
        };

        debug!("Turn timed out, unsticking with a {:.1} in drive", dist_in);
        self.drive(dist_in)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn read_axis(pose: &Pose, axis: Axis) -> f64 {
    match axis {
        Axis::X => pose.x_in,
        Axis::Y => pose.y_in,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::testing::sim_ctrl;
    use super::*;
    use crate::hw::sim::Side;

    #[test]
    fn test_heading_alignment_converges() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 18.0;
            sim.true_y_in = 36.0;
        }

        ctrl.line_up_to_heading(90.0).unwrap();

        let heading = sim.borrow().true_heading_deg;
        assert!((heading - 90.0).abs() <= 0.5);
    }

    #[test]
    fn test_axis_alignment_already_in_tolerance_is_a_noop() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 24.0;
            sim.true_y_in = 36.0;
        }

        ctrl.line_up_to_axis(24.0, Axis::X).unwrap();

        // No motor command may have been issued
        assert!(sim.borrow().power_log.is_empty());
    }

    #[test]
    fn test_axis_alignment_drives_to_target() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 10.0;
            sim.true_y_in = 36.0;
        }

        ctrl.line_up_to_axis(20.0, Axis::X).unwrap();

        let x = sim.borrow().true_x_in;
        assert!((x - 20.0).abs() <= 0.2);
    }

    #[test]
    fn test_maintain_heading_corrects_heading_first() {
        let (mut ctrl, sim, _) = sim_ctrl();
        {
            let mut sim = sim.borrow_mut();
            sim.true_x_in = 24.0;
            sim.true_y_in = 10.0;
            sim.true_heading_deg = 75.0;
        }

        let outcome = ctrl
            .line_up_to_axis_maintain_heading(20.0, Axis::Y, 90.0)
            .unwrap();
        assert_eq!(outcome, AlignOutcome::Converged);

        // The first commands issued must be a turn, one wheel backwards
        let sim = sim.borrow();
        let left = sim
            .power_log
            .iter()
            .find(|(side, _)| *side == Side::Left)
            .unwrap();
        let right = sim
            .power_log
            .iter()
            .find(|(side, _)| *side == Side::Right)
            .unwrap();
        assert!(left.1 * right.1 < 0.0);

        assert!((sim.true_y_in - 20.0).abs() <= 0.2);
        assert!((sim.true_heading_deg - 90.0).abs() <= 0.5);
    }

    #[test]
    fn test_maintain_heading_hits_iteration_limit() {
        let (mut ctrl, sim, _) = sim_ctrl();
        sim.borrow_mut().true_heading_deg = 0.0;

        // Starve every movement of time so nothing ever converges
        ctrl.params.base_timeout_s = 0.01;
        ctrl.tunables_mut().timeout_per_inch_s = 0.0;

        let outcome = ctrl
            .line_up_to_axis_maintain_heading(30.0, Axis::Y, 90.0)
            .unwrap();
        assert_eq!(outcome, AlignOutcome::IterLimit);
    }
}
