//! Open-loop motion primitives.
//!
//! Both primitives run the shared staged-deceleration movement: drive at full
//! power, then shed power in stages as the encoder target approaches so the
//! rover does not skid past it. Every movement carries a deadline, and a
//! movement which stalls against an obstacle reports [`MnvrOutcome::TimedOut`]
//! rather than blocking the routine forever.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};

use crate::hw::{Clock, EncoderSource, MotorDriver, PositionSensor};
use crate::nav_assert;
use crate::NavResult;

use super::NavCtrl;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a motion primitive ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MnvrOutcome {
    /// The encoder target was reached.
    Complete,

    /// The deadline passed before the target was reached. The motors have
    /// been stopped.
    TimedOut,
}

impl MnvrOutcome {
    pub fn timed_out(self) -> bool {
        matches!(self, MnvrOutcome::TimedOut)
    }
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
    /// Turn on the spot by the given angle.
    ///
    /// Negative angles turn anticlockwise (increasing heading), positive
    /// angles clockwise.
    ///
    /// Units: degrees
    pub fn turn(&mut self, degrees: f64) -> NavResult<MnvrOutcome> {
        self.settle(self.tunables.settle_delay_s)?;

        let (mut left_power, mut right_power) = self.wheel_powers()?;

        // One wheel runs backwards
        if degrees < 0.0 {
            left_power = -left_power;
        }
        else {
            right_power = -right_power;
        }

        let target_counts =
            (degrees.abs() * self.params.counts_per_degree / 2.0) as i32;

        debug!("Turning {:.2} deg ({} counts/wheel)", degrees, target_counts);

        self.movement_with_slowdown(left_power, right_power, target_counts)
    }

    /// Drive straight by the given distance, backwards if negative.
    ///
    /// Units: inches
    pub fn drive(&mut self, distance_in: f64) -> NavResult<MnvrOutcome> {
        self.settle(self.tunables.settle_delay_s)?;

        let (mut left_power, mut right_power) = self.wheel_powers()?;

        if distance_in < 0.0 {
            left_power = -left_power;
            right_power = -right_power;
        }

        let target_counts =
            (distance_in.abs() * self.params.counts_per_inch) as i32;

        debug!("Driving {:.2} in ({} counts)", distance_in, target_counts);

        self.movement_with_slowdown(left_power, right_power, target_counts)
    }

    /// Start driving with no encoder target. The caller is responsible for
    /// stopping the motors.
    pub fn start(&mut self, forward: bool) -> NavResult<()> {
        let (mut left_power, mut right_power) = self.wheel_powers()?;

        if !forward {
            left_power = -left_power;
            right_power = -right_power;
        }

        self.eqpt.left_motor.set_percent(left_power);
        self.eqpt.right_motor.set_percent(right_power);
        Ok(())
    }

    /// Stop both drive motors.
    pub fn stop_motors(&mut self) {
        self.eqpt.left_motor.stop();
        self.eqpt.right_motor.stop();
    }

    /// Full-power commands for each wheel, with the power ratio applied to
    /// whichever side it slows.
    fn wheel_powers(&self) -> NavResult<(f64, f64)> {
        let max_power = self.tunables.max_power;
        let ratio = self.tunables.power_ratio;

        nav_assert!(
            max_power > 0.0 && max_power <= 100.0,
            "max_power must be in (0, 100], got {}",
            max_power
        );
        nav_assert!(ratio > 0.0, "power_ratio must be positive, got {}", ratio);

        if ratio < 1.0 {
            Ok((max_power, max_power * ratio))
        }
        else {
            Ok((max_power / ratio, max_power))
        }
    }

    /// Run the motors until the average encoder magnitude reaches the target,
    /// shedding power in stages on the approach.
    fn movement_with_slowdown(
        &mut self,
        mut left_power: f64,
        mut right_power: f64,
        target_counts: i32,
    ) -> NavResult<MnvrOutcome> {
        // Deadline scales with the encoder-equivalent distance, clamped so a
        // bad target cannot stall a routine indefinitely
        let timeout_s = f64::min(
            self.params.base_timeout_s
                + self.tunables.timeout_per_inch_s
                    * (target_counts as f64 / self.params.counts_per_inch),
            self.params.max_mnvr_duration_s,
        );
        let deadline = self.eqpt.clock.now() + timeout_s;

        self.eqpt.left_encoder.reset_counts();
        self.eqpt.right_encoder.reset_counts();
        self.odom.rebase(0, 0);

        self.eqpt.left_motor.set_percent(left_power);
        self.eqpt.right_motor.set_percent(right_power);

        // Counts-to-go at which the first power reduction happens
        let mut slowdown_counts =
            self.tunables.max_power * self.params.slowdown_threshold_coefficient;

        for _ in 0..self.tunables.slowdown_stages {
            let threshold = target_counts - slowdown_counts as i32;
            if self.wait_for_counts(threshold, deadline)?.timed_out() {
                warn!(
                    "Movement timed out after {:.2} s ({} counts short)",
                    timeout_s,
                    target_counts - self.avg_counts()
                );
                return Ok(MnvrOutcome::TimedOut);
            }

            left_power *= self.params.slowdown_power_reduction;
            right_power *= self.params.slowdown_power_reduction;
            self.eqpt.left_motor.set_percent(left_power);
            self.eqpt.right_motor.set_percent(right_power);

            slowdown_counts *= self.params.slowdown_distance_reduction;
        }

        let outcome = self.wait_for_counts(target_counts, deadline)?;
        self.stop_motors();

        if outcome.timed_out() {
            warn!(
                "Movement timed out after {:.2} s ({} counts short)",
                timeout_s,
                target_counts - self.avg_counts()
            );
        }

        Ok(outcome)
    }

    /// Poll until the average encoder magnitude reaches the threshold or the
    /// deadline passes, keeping the odometry estimate current.
    fn wait_for_counts(
        &mut self,
        threshold_counts: i32,
        deadline: f64,
    ) -> NavResult<MnvrOutcome> {
        loop {
            if let Err(e) = self.cancel.check() {
                self.stop_motors();
                return Err(e);
            }

            let left = self.eqpt.left_encoder.counts();
            let right = self.eqpt.right_encoder.counts();
            self.odom.advance(
                left,
                right,
                self.params.counts_per_degree,
                self.params.counts_per_inch,
            );

            if (left.abs() + right.abs()) / 2 >= threshold_counts {
                return Ok(MnvrOutcome::Complete);
            }
            if self.eqpt.clock.now() >= deadline {
                self.stop_motors();
                return Ok(MnvrOutcome::TimedOut);
            }

            self.eqpt.clock.idle();
        }
    }

    fn avg_counts(&self) -> i32 {
        (self.eqpt.left_encoder.counts().abs()
            + self.eqpt.right_encoder.counts().abs())
            / 2
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::testing::sim_ctrl;
    use super::*;
    use crate::NavError;

    #[test]
    fn test_drive_stops_at_exact_target() {
        for stages in [0u32, 1, 3] {
            let (mut ctrl, sim, _) = sim_ctrl();
            ctrl.tunables_mut().slowdown_stages = stages;

            let outcome = ctrl.drive(10.0).unwrap();
            assert_eq!(outcome, MnvrOutcome::Complete);

            let sim = sim.borrow();
            assert_eq!(sim.left_counts.trunc() as i32, 400, "stages {}", stages);
            assert_eq!(sim.right_counts.trunc() as i32, 400, "stages {}", stages);
            assert_eq!(sim.left_power, 0.0);
            assert_eq!(sim.right_power, 0.0);
        }
    }

    #[test]
    fn test_drive_updates_odometry() {
        let (mut ctrl, _, _) = sim_ctrl();
        ctrl.drive(10.0).unwrap();

        let pose = ctrl.pose();
        assert!((pose.x_in - 10.0).abs() < 0.05);
        assert!(pose.y_in.abs() < 0.05);
    }

    #[test]
    fn test_turn_updates_heading() {
        let (mut ctrl, _, _) = sim_ctrl();
        ctrl.turn(-90.0).unwrap();

        let pose = ctrl.pose();
        assert!((pose.heading_deg - 90.0).abs() < 1.0);
        assert!(pose.x_in.abs() < 0.1);
        assert!(pose.y_in.abs() < 0.1);
    }

    #[test]
    fn test_cancellation_stops_motors() {
        let (mut ctrl, sim, cancel) = sim_ctrl();
        sim.borrow_mut().cancel_at = Some((0.05, cancel));

        let result = ctrl.drive(10.0);
        assert!(matches!(result, Err(NavError::Cancelled)));

        let sim = sim.borrow();
        assert_eq!(sim.left_power, 0.0);
        assert_eq!(sim.right_power, 0.0);
    }

    #[test]
    fn test_timeout_reported_and_motors_stopped() {
        let (mut ctrl, sim, _) = sim_ctrl();
        ctrl.params.base_timeout_s = 0.01;
        ctrl.tunables_mut().timeout_per_inch_s = 0.0;

        let outcome = ctrl.drive(10.0).unwrap();
        assert_eq!(outcome, MnvrOutcome::TimedOut);

        let sim = sim.borrow();
        assert_eq!(sim.left_power, 0.0);
        assert_eq!(sim.right_power, 0.0);
    }

    #[test]
    fn test_power_ratio_slows_correct_side() {
        let (mut ctrl, sim, _) = sim_ctrl();
        ctrl.tunables_mut().power_ratio = 0.9;
        ctrl.start(true).unwrap();

        {
            let sim = sim.borrow();
            assert_eq!(sim.left_power, 40.0);
            assert_eq!(sim.right_power, 36.0);
        }
        ctrl.stop_motors();

        ctrl.tunables_mut().power_ratio = 1.25;
        ctrl.start(true).unwrap();

        let sim = sim.borrow();
        assert_eq!(sim.left_power, 32.0);
        assert_eq!(sim.right_power, 40.0);
    }

    #[test]
    fn test_invalid_power_rejected() {
        let (mut ctrl, _, _) = sim_ctrl();
        ctrl.tunables_mut().max_power = 0.0;

        assert!(matches!(
            ctrl.drive(1.0),
            Err(NavError::AssertionFailed { .. })
        ));
    }
}
