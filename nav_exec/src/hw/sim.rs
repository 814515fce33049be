//! Deterministic drivetrain simulation used by the controller tests.
//!
//! A single [`SimState`] holds the simulated world. Each device handed to the
//! controller holds an `Rc<RefCell<SimState>>` onto that world, and the
//! simulated clock advances it by one tick per `idle()` call, so the
//! controller's own wait loops drive the physics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use util::maths::wrap_360;

use super::{Clock, EncoderSource, Equipment, MotorDriver, PositionSensor};
use crate::cancel::CancelToken;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Simulated time step per clock idle.
///
/// Units: seconds
pub const SIM_TICK_S: f64 = 0.001;

/// Encoder rate at 100% motor power.
///
/// Units: counts/second
pub const COUNTS_PER_S_AT_FULL: f64 = 800.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which side of the drivetrain a motor command was issued to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared simulated world.
pub struct SimState {
    /// Simulated time. Units: seconds
    pub time_s: f64,

    /// Commanded motor powers. Units: percent, signed
    pub left_power: f64,
    pub right_power: f64,

    /// Accumulated encoder counts, kept fractional so slow movements still
    /// integrate exactly.
    pub left_counts: f64,
    pub right_counts: f64,

    /// Ground-truth pose, integrated with the same kinematics the odometry
    /// uses.
    pub true_x_in: f64,
    pub true_y_in: f64,
    pub true_heading_deg: f64,

    /// Drivetrain geometry, matching the controller's parameters.
    pub counts_per_degree: f64,
    pub counts_per_inch: f64,

    /// Every motor power command issued, in order.
    pub power_log: Vec<(Side, f64)>,

    /// Overrides forcing the position sensor to report fixed raw values,
    /// used to inject sensor faults.
    pub region_override: Option<i32>,
    pub x_override: Option<f64>,
    pub y_override: Option<f64>,
    pub heading_override: Option<f64>,

    /// Mounting offset of the sensed marker relative to the rover centre,
    /// in the rover's body frame.
    pub marker_rel_x_in: f64,
    pub marker_rel_y_in: f64,
    pub marker_rel_heading_rad: f64,

    /// When set, the token is fired once simulated time reaches the given
    /// instant.
    pub cancel_at: Option<(f64, CancelToken)>,
}

/// Handle onto the shared simulated world.
pub type SimHandle = Rc<RefCell<SimState>>;

pub struct SimMotor {
    state: SimHandle,
    side: Side,
}

pub struct SimEncoder {
    state: SimHandle,
    side: Side,
    baseline: f64,
}

pub struct SimPositionSensor {
    state: SimHandle,
}

pub struct SimClock {
    state: SimHandle,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimState {
    pub fn new(counts_per_degree: f64, counts_per_inch: f64) -> Self {
        Self {
            time_s: 0.0,
            left_power: 0.0,
            right_power: 0.0,
            left_counts: 0.0,
            right_counts: 0.0,
            true_x_in: 0.0,
            true_y_in: 0.0,
            true_heading_deg: 0.0,
            counts_per_degree,
            counts_per_inch,
            power_log: Vec::new(),
            region_override: None,
            x_override: None,
            y_override: None,
            heading_override: None,
            marker_rel_x_in: 0.0,
            marker_rel_y_in: 0.0,
            marker_rel_heading_rad: 0.0,
            cancel_at: None,
        }
    }

    /// Advance the world by one tick.
    fn step(&mut self) {
        self.time_s += SIM_TICK_S;

        let dl = self.left_power / 100.0 * COUNTS_PER_S_AT_FULL * SIM_TICK_S;
        let dr = self.right_power / 100.0 * COUNTS_PER_S_AT_FULL * SIM_TICK_S;
        self.left_counts += dl;
        self.right_counts += dr;

        // Pose integration with the midpoint heading rule
        let angle_diff_deg = (dr - dl) / self.counts_per_degree;
        let dist_in = (dl + dr) / 2.0 / self.counts_per_inch;
        let mid_heading_rad =
            (self.true_heading_deg + angle_diff_deg / 2.0).to_radians();
        self.true_x_in += dist_in * mid_heading_rad.cos();
        self.true_y_in += dist_in * mid_heading_rad.sin();
        self.true_heading_deg = wrap_360(self.true_heading_deg + angle_diff_deg);

        if let Some((at, token)) = self.cancel_at.take() {
            if self.time_s >= at {
                token.request();
            }
            else {
                self.cancel_at = Some((at, token));
            }
        }
    }
}

impl MotorDriver for SimMotor {
    fn set_percent(&mut self, percent: f64) {
        let mut state = self.state.borrow_mut();
        match self.side {
            Side::Left => state.left_power = percent,
            Side::Right => state.right_power = percent,
        }
        state.power_log.push((self.side, percent));
    }

    fn stop(&mut self) {
        self.set_percent(0.0);
    }
}

impl EncoderSource for SimEncoder {
    fn counts(&self) -> i32 {
        let state = self.state.borrow();
        let raw = match self.side {
            Side::Left => state.left_counts,
            Side::Right => state.right_counts,
        };
        (raw - self.baseline).trunc() as i32
    }

    fn reset_counts(&mut self) {
        let state = self.state.borrow();
        self.baseline = match self.side {
            Side::Left => state.left_counts,
            Side::Right => state.right_counts,
        };
    }
}

impl PositionSensor for SimPositionSensor {
    fn current_region(&self) -> i32 {
        self.state.borrow().region_override.unwrap_or(1)
    }

    fn x(&self) -> f64 {
        let state = self.state.borrow();
        state.x_override.unwrap_or_else(|| {
            let (off_x, _) = util::maths::rotate_2d(
                state.marker_rel_x_in,
                state.marker_rel_y_in,
                state.true_heading_deg.to_radians(),
            );
            state.true_x_in + off_x
        })
    }

    fn y(&self) -> f64 {
        let state = self.state.borrow();
        state.y_override.unwrap_or_else(|| {
            let (_, off_y) = util::maths::rotate_2d(
                state.marker_rel_x_in,
                state.marker_rel_y_in,
                state.true_heading_deg.to_radians(),
            );
            state.true_y_in + off_y
        })
    }

    fn heading(&self) -> f64 {
        let state = self.state.borrow();
        state.heading_override.unwrap_or_else(|| {
            wrap_360(
                state.true_heading_deg
                    + state.marker_rel_heading_rad.to_degrees(),
            )
        })
    }
}

impl Clock for SimClock {
    fn now(&self) -> f64 {
        self.state.borrow().time_s
    }

    fn idle(&mut self) {
        self.state.borrow_mut().step();
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a full simulated equipment set sharing one world.
pub fn sim_equipment(
    counts_per_degree: f64,
    counts_per_inch: f64,
) -> (
    Equipment<SimMotor, SimEncoder, SimPositionSensor, SimClock>,
    SimHandle,
) {
    let state: SimHandle =
        Rc::new(RefCell::new(SimState::new(counts_per_degree, counts_per_inch)));

    let eqpt = Equipment {
        left_motor: SimMotor {
            state: state.clone(),
            side: Side::Left,
        },
        right_motor: SimMotor {
            state: state.clone(),
            side: Side::Right,
        },
        left_encoder: SimEncoder {
            state: state.clone(),
            side: Side::Left,
            baseline: 0.0,
        },
        right_encoder: SimEncoder {
            state: state.clone(),
            side: Side::Right,
            baseline: 0.0,
        },
        pos_sensor: SimPositionSensor {
            state: state.clone(),
        },
        clock: SimClock {
            state: state.clone(),
        },
    };

    (eqpt, state)
}
