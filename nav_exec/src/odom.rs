//! Dead-reckoned odometry from the wheel encoders.
//!
//! The estimate is propagated with a midpoint heading rule: the translation
//! of each update is applied along the average of the headings before and
//! after the update, which removes the first-order bias of integrating
//! arcs as straight lines.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::wrap_360;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Units: inches
    pub x_in: f64,

    /// Units: inches
    pub y_in: f64,

    /// Units: degrees in [0, 360)
    pub heading_deg: f64,
}

/// Encoder-integrating pose estimator.
#[derive(Clone, Debug, Default)]
pub struct Odometry {
    pose: Pose,
    last_left_counts: i32,
    last_right_counts: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current pose estimate.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Replace the estimate with an externally supplied pose, for instance a
    /// validated absolute position fix.
    pub fn anchor(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Reset the encoder baselines without moving the estimate. Must be
    /// called whenever the encoders themselves are zeroed.
    pub fn rebase(&mut self, left_counts: i32, right_counts: i32) {
        self.last_left_counts = left_counts;
        self.last_right_counts = right_counts;
    }

    /// Integrate the encoder deltas since the previous call into the pose
    /// estimate.
    pub fn advance(
        &mut self,
        left_counts: i32,
        right_counts: i32,
        counts_per_degree: f64,
        counts_per_inch: f64,
    ) {
        let dl = (left_counts - self.last_left_counts) as f64;
        let dr = (right_counts - self.last_right_counts) as f64;
        self.last_left_counts = left_counts;
        self.last_right_counts = right_counts;

        let angle_diff_deg = (dr - dl) / counts_per_degree;
        let dist_in = (dl + dr) / 2.0 / counts_per_inch;
        let mid_heading_rad =
            (self.pose.heading_deg + angle_diff_deg / 2.0).to_radians();

        self.pose.x_in += dist_in * mid_heading_rad.cos();
        self.pose.y_in += dist_in * mid_heading_rad.sin();
        self.pose.heading_deg = wrap_360(self.pose.heading_deg + angle_diff_deg);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pure_turn_keeps_position() {
        let mut odom = Odometry::new();
        odom.advance(-128, 128, 2.56, 40.489);

        let pose = odom.pose();
        assert!(pose.x_in.abs() < 1e-9);
        assert!(pose.y_in.abs() < 1e-9);
        assert!((pose.heading_deg - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_drive_along_heading() {
        let mut odom = Odometry::new();
        odom.anchor(Pose {
            x_in: 5.0,
            y_in: 5.0,
            heading_deg: 90.0,
        });
        odom.advance(400, 400, 2.56, 40.0);

        let pose = odom.pose();
        assert!((pose.x_in - 5.0).abs() < 1e-9);
        assert!((pose.y_in - 15.0).abs() < 1e-9);
        assert!((pose.heading_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_round_trip_restores_heading() {
        let mut odom = Odometry::new();

        // Clockwise quarter turn then the exact opposite deltas
        odom.advance(115, -115, 2.56, 40.489);
        odom.advance(0, 0, 2.56, 40.489);

        assert!(odom.pose().heading_deg.abs() < 1e-9);
    }

    #[test]
    fn test_rebase_swallows_encoder_reset() {
        let mut odom = Odometry::new();
        odom.advance(400, 400, 2.56, 40.0);
        let before = odom.pose();

        // Encoders zeroed externally, estimate must not jump
        odom.rebase(0, 0);
        odom.advance(0, 0, 2.56, 40.0);
        assert_eq!(odom.pose(), before);
    }

    #[test]
    fn test_midpoint_heading_rule() {
        // A 90 degree left arc from heading 0: translation is applied at
        // the 45 degree midpoint heading
        let mut odom = Odometry::new();
        odom.advance(100, 330, 2.56, 40.0);

        let dist = (100.0 + 330.0) / 2.0 / 40.0;
        let mid = ((330.0 - 100.0) / 2.56 / 2.0f64).to_radians();
        let pose = odom.pose();
        assert!((pose.x_in - dist * mid.cos()).abs() < 1e-9);
        assert!((pose.y_in - dist * mid.sin()).abs() < 1e-9);
    }
}
