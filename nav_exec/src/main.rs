//! Main navigation executable entry point.
//!
//! Runs a named navigation routine against the simulated drivetrain, which
//! is the standard way to check a routine before it is let loose on the
//! rover. The routine name is given as the first command line argument.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::env;

// Internal
use nav_lib::{
    cancel::CancelToken,
    hw::sim::{sim_equipment, SimClock, SimEncoder, SimMotor, SimPositionSensor},
    nav_ctrl::{Axis, NavCtrl, Params, Tunables},
    registry::{dispatch, RoutineRegistry, TunableParam},
    NavResult,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Routine run when no argument is given.
const DEFAULT_ROUTINE: &str = "squareTest()";

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Controller over the simulated equipment set.
type DemoCtrl = NavCtrl<SimMotor, SimEncoder, SimPositionSensor, SimClock>;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution
    info!("Hermes Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("nav_ctrl.toml").wrap_err("Could not load nav_ctrl params")?;
    let tunables: Tunables =
        util::params::load("tunables.toml").wrap_err("Could not load tunables")?;

    info!("Parameters loaded:");
    for param in TunableParam::ALL {
        info!("    {} = {}", param.name(), tunables.get(param));
    }

    // ---- INITIALISE CONTROLLER ----

    let (eqpt, sim) = sim_equipment(params.counts_per_degree, params.counts_per_inch);

    // Place the simulated rover inside the field so position fixes are valid
    {
        let mut sim = sim.borrow_mut();
        sim.true_x_in = 18.0;
        sim.true_y_in = 30.0;
    }

    let cancel = CancelToken::new();
    let mut ctrl = NavCtrl::new(eqpt, params, tunables, cancel);

    // ---- REGISTER ROUTINES ----

    let mut registry: RoutineRegistry<DemoCtrl> = RoutineRegistry::new();
    registry.register("calibrateOffset()", calibrate_offset);
    registry.register("squareTest()", square_test);
    registry.register("lineUpDemo()", line_up_demo);

    // ---- RUN ----

    let routine_name = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from(DEFAULT_ROUTINE));

    if registry.get(&routine_name).is_none() {
        let names: Vec<_> = registry.names().collect();
        return Err(eyre!(
            "No routine named {:?}, available routines: {:?}",
            routine_name,
            names
        ));
    }

    dispatch(&registry, &mut ctrl, &routine_name);

    let pose = ctrl.pose();
    info!(
        "Final pose estimate: ({:.2}, {:.2}) in, {:.2} deg",
        pose.x_in, pose.y_in, pose.heading_deg
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// ROUTINES
// ---------------------------------------------------------------------------

/// Drive a 12 inch square, finishing at the starting pose.
fn square_test(ctrl: &mut DemoCtrl) -> NavResult<()> {
    for _ in 0..4 {
        ctrl.drive(12.0)?;
        ctrl.turn(-90.0)?;
    }
    Ok(())
}

/// Measure the marker offset.
fn calibrate_offset(ctrl: &mut DemoCtrl) -> NavResult<()> {
    match ctrl.calibrate_offset()? {
        Ok(offset) => info!("Calibration complete: {:?}", offset),
        Err(fault) => warn!("Calibration aborted: {}", fault),
    }
    Ok(())
}

/// Line up facing north then climb to the middle of the field.
fn line_up_demo(ctrl: &mut DemoCtrl) -> NavResult<()> {
    ctrl.line_up_to_heading(90.0)?;
    let outcome = ctrl.line_up_to_axis_maintain_heading(42.0, Axis::Y, 90.0)?;
    info!("Line up finished: {:?}", outcome);
    Ok(())
}
