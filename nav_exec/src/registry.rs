//! Operator-facing registry of tunable parameters and runnable routines.
//!
//! The operator interface works in names and plain numbers, this module maps
//! both onto the typed controller: every tunable is addressable through
//! [`TunableParam`], and routines are registered as named entries which
//! [`dispatch`] runs with a guaranteed motor stop afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, info, warn};

use crate::hw::{Clock, EncoderSource, MotorDriver, PositionSensor};
use crate::nav_ctrl::{NavCtrl, Tunables};
use crate::{NavError, NavResult};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifier for every runtime-adjustable parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunableParam {
    MaxPower,
    PowerRatio,
    SlowdownStages,
    SettleDelay,
    FixSettleDelay,
    TimeoutPerInch,
    HeadingTolerance,
    LinearTolerance,
    MaxAlignIters,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A routine runnable from the operator interface.
pub type Routine<Ctx> = fn(&mut Ctx) -> NavResult<()>;

/// Named routines available for dispatch.
pub struct RoutineRegistry<Ctx> {
    entries: Vec<(&'static str, Routine<Ctx>)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TunableParam {
    pub const ALL: [TunableParam; 9] = [
        TunableParam::MaxPower,
        TunableParam::PowerRatio,
        TunableParam::SlowdownStages,
        TunableParam::SettleDelay,
        TunableParam::FixSettleDelay,
        TunableParam::TimeoutPerInch,
        TunableParam::HeadingTolerance,
        TunableParam::LinearTolerance,
        TunableParam::MaxAlignIters,
    ];

    /// The name the operator interface shows for this parameter.
    pub fn name(self) -> &'static str {
        match self {
            TunableParam::MaxPower => "maxPower",
            TunableParam::PowerRatio => "motorPowerRatio",
            TunableParam::SlowdownStages => "slowdownStages",
            TunableParam::SettleDelay => "settleDelay",
            TunableParam::FixSettleDelay => "fixSettleDelay",
            TunableParam::TimeoutPerInch => "timeoutPerInch",
            TunableParam::HeadingTolerance => "headingToleranceDeg",
            TunableParam::LinearTolerance => "linearToleranceIn",
            TunableParam::MaxAlignIters => "maxAlignIters",
        }
    }
}

impl Tunables {
    /// Read a parameter by identifier.
    pub fn get(&self, param: TunableParam) -> f64 {
        match param {
            TunableParam::MaxPower => self.max_power,
            TunableParam::PowerRatio => self.power_ratio,
            TunableParam::SlowdownStages => self.slowdown_stages as f64,
            TunableParam::SettleDelay => self.settle_delay_s,
            TunableParam::FixSettleDelay => self.fix_settle_delay_s,
            TunableParam::TimeoutPerInch => self.timeout_per_inch_s,
            TunableParam::HeadingTolerance => self.heading_tolerance_deg,
            TunableParam::LinearTolerance => self.linear_tolerance_in,
            TunableParam::MaxAlignIters => self.max_align_iters as f64,
        }
    }

    /// Write a parameter by identifier, clamping where an out-of-range value
    /// would be dangerous rather than merely wrong.
    pub fn set(&mut self, param: TunableParam, value: f64) {
        match param {
            TunableParam::MaxPower => {
                self.max_power = util::maths::clamp(&value, &1.0, &100.0)
            }
            TunableParam::PowerRatio => self.power_ratio = value,
            TunableParam::SlowdownStages => {
                self.slowdown_stages = value.max(0.0) as u32
            }
            TunableParam::SettleDelay => self.settle_delay_s = value,
            TunableParam::FixSettleDelay => self.fix_settle_delay_s = value,
            TunableParam::TimeoutPerInch => self.timeout_per_inch_s = value,
            TunableParam::HeadingTolerance => self.heading_tolerance_deg = value,
            TunableParam::LinearTolerance => self.linear_tolerance_in = value,
            TunableParam::MaxAlignIters => {
                self.max_align_iters = value.max(0.0) as u32
            }
        }
    }
}

impl<Ctx> RoutineRegistry<Ctx> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a routine under a name. A later registration under the same
    /// name shadows the earlier one.
    pub fn register(&mut self, name: &'static str, routine: Routine<Ctx>) {
        self.entries.insert(0, (name, routine));
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<Routine<Ctx>> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, routine)| *routine)
    }
}

impl<Ctx> Default for RoutineRegistry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run a named routine against the controller.
///
/// The motors are stopped when the routine returns, however it returns.
/// Returns true if the routine ran to completion.
pub fn dispatch<M, E, P, C>(
    registry: &RoutineRegistry<NavCtrl<M, E, P, C>>,
    ctrl: &mut NavCtrl<M, E, P, C>,
    name: &str,
) -> bool
where
    M: MotorDriver,
    E: EncoderSource,
    P: PositionSensor,
    C: Clock,
{
    let routine = match registry.get(name) {
        Some(r) => r,
        None => {
            error!("No routine named {:?} is registered", name);
            return false;
        }
    };

    info!("Running routine {:?}", name);
    let result = routine(ctrl);
    ctrl.stop_motors();

    match result {
        Ok(()) => {
            info!("Routine {:?} complete", name);
            true
        }
        Err(NavError::Cancelled) => {
            warn!("Routine {:?} cancelled", name);
            false
        }
        Err(e) => {
            error!("Routine {:?} failed: {}", name, e);
            false
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::nav_ctrl::testing::{sim_ctrl, SimCtrl};

    #[test]
    fn test_tunable_get_set_roundtrip() {
        let mut tunables = Tunables::default();

        for param in TunableParam::ALL {
            let value = tunables.get(param);
            tunables.set(param, value);
            assert_eq!(tunables.get(param), value, "{}", param.name());
        }

        tunables.set(TunableParam::SlowdownStages, 3.0);
        assert_eq!(tunables.slowdown_stages, 3);

        // Power is clamped into a safe range
        tunables.set(TunableParam::MaxPower, 250.0);
        assert_eq!(tunables.max_power, 100.0);
        tunables.set(TunableParam::MaxPower, -5.0);
        assert_eq!(tunables.max_power, 1.0);
    }

    #[test]
    fn test_dispatch_stops_motors_on_error() {
        let (mut ctrl, sim, cancel) = sim_ctrl();
        cancel.request();

        let mut registry: RoutineRegistry<SimCtrl> = RoutineRegistry::new();
        registry.register("runaway()", |ctrl| {
            ctrl.start(true)?;
            ctrl.cancel.check()?;
            Ok(())
        });

        assert!(!dispatch(&registry, &mut ctrl, "runaway()"));

        let sim = sim.borrow();
        assert_eq!(sim.left_power, 0.0);
        assert_eq!(sim.right_power, 0.0);
    }

    #[test]
    fn test_dispatch_unknown_routine() {
        let (mut ctrl, _, _) = sim_ctrl();
        let registry: RoutineRegistry<SimCtrl> = RoutineRegistry::new();
        assert!(!dispatch(&registry, &mut ctrl, "missing()"));
    }
}
