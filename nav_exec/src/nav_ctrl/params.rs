//! Navigation controller parameters.
//!
//! [`Params`] holds values fixed for a build of the rover, [`Tunables`] holds
//! values the operator may adjust at runtime through the routine registry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed navigation parameters, loaded from `nav_ctrl.toml`.
#[derive(Clone, Debug, Deserialize)]
pub struct Params {
    /// Encoder count difference (right minus left) accumulated per degree of
    /// rotation on the spot.
    ///
    /// Units: counts/degree
    pub counts_per_degree: f64,

    /// Encoder counts accumulated per inch of straight travel.
    ///
    /// Units: counts/inch
    pub counts_per_inch: f64,

    /// How many slowdown-distances short of the target the first power
    /// reduction happens.
    ///
    /// Units: none
    pub slowdown_threshold_coefficient: f64,

    /// Fraction of power removed at each slowdown stage.
    ///
    /// Units: none, in (0, 1)
    pub slowdown_power_reduction: f64,

    /// Factor applied to the slowdown distance after each stage.
    ///
    /// Units: none, in (0, 1)
    pub slowdown_distance_reduction: f64,

    /// Fixed component of the movement timeout.
    ///
    /// Units: seconds
    pub base_timeout_s: f64,

    /// Upper bound on the timeout of any single movement.
    ///
    /// Units: seconds
    pub max_mnvr_duration_s: f64,

    /// Extents of the field, used to validate absolute position fixes.
    ///
    /// Units: inches
    pub field_x_min_in: f64,
    pub field_x_max_in: f64,
    pub field_y_min_in: f64,
    pub field_y_max_in: f64,

    /// Distance from the rover's rotation centre to the point the axis
    /// line-ups actually place on the target line.
    ///
    /// Units: inches
    pub marker_forward_offset_in: f64,

    /// Distance driven to unstick the rover when a movement times out during
    /// an alignment.
    ///
    /// Units: inches
    pub unstick_drive_in: f64,
}

/// Runtime-adjustable parameters, loaded from `tunables.toml` and exposed
/// through [`crate::registry::TunableParam`].
#[derive(Clone, Debug, Deserialize)]
pub struct Tunables {
    /// Power of the faster wheel during a movement.
    ///
    /// Units: percent, in (0, 100]
    pub max_power: f64,

    /// Ratio of the slower wheel's power to the faster wheel's, compensating
    /// for drivetrain asymmetry. Values below 1 slow the right wheel, values
    /// above 1 slow the left.
    ///
    /// Units: none, > 0
    pub power_ratio: f64,

    /// Number of deceleration stages at the end of a movement.
    ///
    /// Units: none
    pub slowdown_stages: u32,

    /// Pause before each movement so the previous one has mechanically
    /// settled.
    ///
    /// Units: seconds
    pub settle_delay_s: f64,

    /// Pause before sampling the position sensor.
    ///
    /// Units: seconds
    pub fix_settle_delay_s: f64,

    /// Per-inch component of the movement timeout.
    ///
    /// Units: seconds/inch
    pub timeout_per_inch_s: f64,

    /// Heading error below which an alignment is converged.
    ///
    /// Units: degrees
    pub heading_tolerance_deg: f64,

    /// Linear error below which an alignment is converged.
    ///
    /// Units: inches
    pub linear_tolerance_in: f64,

    /// Iteration bound on the combined heading-and-axis alignment.
    ///
    /// Units: none
    pub max_align_iters: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            counts_per_degree: 2.56,
            counts_per_inch: 40.489,
            slowdown_threshold_coefficient: 2.0,
            slowdown_power_reduction: 0.4,
            slowdown_distance_reduction: 0.4,
            base_timeout_s: 1.0,
            max_mnvr_duration_s: 10.0,
            field_x_min_in: 0.0,
            field_x_max_in: 36.0,
            field_y_min_in: 0.0,
            field_y_max_in: 72.0,
            marker_forward_offset_in: 0.0,
            unstick_drive_in: 2.0,
        }
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_power: 40.0,
            power_ratio: 1.0,
            slowdown_stages: 1,
            settle_delay_s: 0.2,
            fix_settle_delay_s: 0.35,
            timeout_per_inch_s: 0.2,
            heading_tolerance_deg: 0.5,
            linear_tolerance_in: 0.2,
            max_align_iters: 30,
        }
    }
}
