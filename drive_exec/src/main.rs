//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Drive control processing:
//!             - Sensor acquisition and monitoring
//!             - Odometry
//!             - Manual or trajectory velocity demand
//!             - Locomotion control
//!             - Actuator demands
//!         - Telemetry publishing
//!         - Simulation step
//!     - Telemetry thread, at a tenth of the cycle rate:
//!         - Archive the latest snapshot
//!
//! The executable currently drives the simulated base, the hardware ports of
//! a real robot plug in in its place.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use drive_lib::{
    drive_ctrl::{self, DriveCtrl},
    loc,
    sim::{SimBase, SimParams},
    tc_processor,
    tm::{TmHandle, TmRecord},
    traj_ctrl,
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    params,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of control cycles per telemetry cycle.
const TM_CYCLE_DIVIDER: u32 = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line interface of the executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Swerve drive control executable")]
struct Cli {
    /// Telecommand script to execute. Without one the drive stays stopped.
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many control cycles.
    #[structopt(short, long)]
    cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    None,
    Script(ScriptInterpreter),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", cli);

    // ---- LOAD PARAMETERS ----

    let drive_params: drive_ctrl::Params =
        params::load("drive_ctrl.toml").wrap_err("Could not load DriveCtrl params")?;
    let loc_params: loc::Params =
        params::load("loc.toml").wrap_err("Could not load localisation params")?;
    let traj_params: traj_ctrl::Params =
        params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;
    let sim_params: SimParams = params::load("sim.toml").wrap_err("Could not load sim params")?;

    let traj_dir = params::params_dir()
        .wrap_err("Could not find the params directory")?
        .join("trajectories");

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match cli.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, the drive will remain stopped\n");
            TcSource::None
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let period_s = drive_params.cycle_period_s;
    let start_pose = sim_params.start_pose;

    let sim = SimBase::new(sim_params, drive_params.loco.module_pos_m_rb)
        .wrap_err("Failed to initialise the simulation")?;

    let mut dc = DriveCtrl::new(drive_params, loc_params, traj_params, start_pose, sim)
        .wrap_err("Failed to initialise DriveCtrl")?;

    info!("Module initialisation complete\n");

    // ---- START TELEMETRY ----

    let tm = TmHandle::new();
    let tm_run = Arc::new(AtomicBool::new(true));

    let tm_jh = {
        let archiver = Archiver::from_path(&session, "drive_tm.csv")
            .wrap_err("Failed to create the telemetry archive")?;
        let tm = tm.clone();
        let run = tm_run.clone();
        let tm_period = Duration::from_secs_f64(period_s) * TM_CYCLE_DIVIDER;

        thread::spawn(move || tm_thread(tm, run, archiver, tm_period))
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let period = Duration::from_secs_f64(period_s);

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let loop_time_s = dc.cycle_count() as f64 * period_s;

        // ---- TELECOMMAND PROCESSING ----

        if let TcSource::Script(ref mut si) = tc_source {
            match si.get_pending_tcs(loop_time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        debug!("Executing {:?}", tc);
                        if let Err(e) = tc_processor::exec(&mut dc, tc, &traj_dir) {
                            warn!("Could not execute TC: {}", e);
                        }
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match dc.proc() {
            Ok(r) => {
                if r.traj_completed {
                    info!("Trajectory complete, pose {:?}", dc.get_pose());
                }
            }
            Err(e) => {
                error!("Error during DriveCtrl processing: {}", e);
                dc.make_safe();
            }
        }

        // ---- TELEMETRY ----

        if !tm.publish(&dc.tm_snapshot()) {
            debug!("Telemetry busy, snapshot skipped");
        }

        // ---- SIMULATION ----

        dc.hw_mut().step(period_s);

        if let Some(n) = cli.cycles {
            if dc.cycle_count() >= n {
                info!("Reached {} cycles, stopping", n);
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - period.as_secs_f64()
            ),
        }
    }

    // ---- SHUTDOWN ----

    if let Err(e) = dc.shutdown() {
        error!("Could not command the final stop: {}", e);
    }

    tm_run.store(false, Ordering::Relaxed);
    if tm_jh.join().is_err() {
        warn!("Telemetry thread panicked");
    }

    let truth = dc.hw().true_pose();
    info!("Final estimated pose: {:?}", dc.get_pose());
    info!("Final true pose:      {:?}", truth);

    info!("End of execution");

    Ok(())
}

/// Telemetry thread, archives the latest snapshot once per period.
fn tm_thread(tm: TmHandle, run: Arc<AtomicBool>, mut archiver: Archiver, period: Duration) {
    while run.load(Ordering::Relaxed) {
        let snapshot = tm.latest();

        if let Err(e) = archiver.serialise(TmRecord::new(session::get_elapsed_seconds(), &snapshot)) {
            warn!("Could not archive telemetry: {}", e);
        }

        debug!(
            "[TM] cycle {} {:?} pose ({:.3} m, {:.3} m, {:.3} rad), {} sensor faults",
            snapshot.cycle_count,
            snapshot.mode,
            snapshot.pose.x_m,
            snapshot.pose.y_m,
            snapshot.pose.heading_rad,
            snapshot.sens_faults.count()
        );

        thread::sleep(period);
    }
}
