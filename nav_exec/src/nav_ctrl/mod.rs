//! # Navigation Controller
//!
//! Owns the drivetrain and provides the motion primitives, position fixes and
//! closed-loop alignment routines built on top of them.
//!
//! The controller is split by concern:
//! - [`mnvr`] - open-loop motion primitives with staged deceleration
//! - [`pos_fix`] - absolute position fixes and fault classification
//! - [`align`] - closed-loop alignment to headings and field axes
//! - [`calib`] - sensor offset calibration and point-to-point driving

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod align;
mod calib;
mod mnvr;
mod params;
mod pos_fix;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use align::{AlignOutcome, Axis};
pub use calib::CalibOffset;
pub use mnvr::MnvrOutcome;
pub use params::{Params, Tunables};
pub use pos_fix::{Fix, FixFault, FixResult};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::cancel::CancelToken;
use crate::hw::{Clock, EncoderSource, Equipment, MotorDriver, PositionSensor};
use crate::odom::{Odometry, Pose};
use crate::NavResult;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The navigation controller.
pub struct NavCtrl<M, E, P, C> {
    pub(crate) eqpt: Equipment<M, E, P, C>,
    pub(crate) params: Params,
    pub(crate) tunables: Tunables,
    pub(crate) odom: Odometry,
    pub(crate) calib: CalibOffset,
    pub(crate) cancel: CancelToken,
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
    pub fn new(
        eqpt: Equipment<M, E, P, C>,
        params: Params,
        tunables: Tunables,
        cancel: CancelToken,
    ) -> Self {
        Self {
            eqpt,
            params,
            tunables,
            odom: Odometry::new(),
            calib: CalibOffset::default(),
            cancel,
        }
    }

    /// The current dead-reckoned pose estimate.
    pub fn pose(&self) -> Pose {
        self.odom.pose()
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn tunables_mut(&mut self) -> &mut Tunables {
        &mut self.tunables
    }

    pub fn calib(&self) -> CalibOffset {
        self.calib
    }

    pub fn set_calib(&mut self, calib: CalibOffset) {
        self.calib = calib;
    }

    /// Wait out a settle delay, polling for cancellation.
    pub(crate) fn settle(&mut self, duration_s: f64) -> NavResult<()> {
        let deadline = self.eqpt.clock.now() + duration_s;
        while self.eqpt.clock.now() < deadline {
            self.cancel.check()?;
            self.eqpt.clock.idle();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::hw::sim::{sim_equipment, SimClock, SimEncoder, SimHandle, SimMotor, SimPositionSensor};

    pub(crate) type SimCtrl =
        NavCtrl<SimMotor, SimEncoder, SimPositionSensor, SimClock>;

    /// Parameters with round drivetrain geometry so count targets in tests
    /// are exact.
    pub(crate) fn fast_params() -> Params {
        Params {
            counts_per_inch: 40.0,
            ..Params::default()
        }
    }

    /// Tunables with settle delays removed so tests spend simulated time on
    /// movement only.
    pub(crate) fn fast_tunables() -> Tunables {
        Tunables {
            settle_delay_s: 0.0,
            fix_settle_delay_s: 0.0,
            ..Tunables::default()
        }
    }

    /// A controller wired to a fresh simulated world.
    pub(crate) fn sim_ctrl() -> (SimCtrl, SimHandle, CancelToken) {
        let params = fast_params();
        let (eqpt, sim) =
            sim_equipment(params.counts_per_degree, params.counts_per_inch);
        let cancel = CancelToken::new();
        let ctrl = NavCtrl::new(eqpt, params, fast_tunables(), cancel.clone());
        (ctrl, sim, cancel)
    }
}
