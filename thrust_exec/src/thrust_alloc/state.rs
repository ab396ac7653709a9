//! Implementations for the ThrustAlloc state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::path::PathBuf;

// Internal
use super::{
    Axis, EquationSet, ForceBounds, Params, ThrustAllocError, ThrusterGeometry, NUM_AXES,
};
use comms_if::{
    cmd::AccelCmd,
    eqpt::{SolveTermination, ThrustForces, NUM_THRUSTERS},
};
use lsq::{Problem, ProblemError, SolverOptions, TerminationType};
use util::{
    archive::{Archived, Archiver},
    module::State,
    session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thrust allocation module state
pub struct ThrustAlloc {
    pub(crate) params: Params,

    geometry: ThrusterGeometry,

    equations: EquationSet,

    bounds: ForceBounds,

    solver_options: SolverOptions,

    phase: CyclePhase,

    num_cycles: u64,

    /// The report and context of the last completed solve, kept for archiving only.
    last: Option<(CycleContext, StatusReport)>,
    arch_report: Archiver,
}

/// Data required to initialise ThrustAlloc.
pub struct InitData {
    pub params: Params,

    pub geometry: ThrusterGeometry,

    /// Path of the CSV file cycle reports are written to, if `params.archive_reports` is set.
    pub archive_path: Option<PathBuf>,
}

/// Everything a single allocation cycle works on.
///
/// Built fresh from each command, so nothing from a previous command can leak into the next
/// solve.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleContext {
    /// Target acceleration of each axis, indexed by `Axis::index()`.
    pub targets: [f64; NUM_AXES],

    /// Force unknowns, ordered as `ThrusterId::ALL`. Zero until solved.
    pub forces: [f64; NUM_THRUSTERS],

    /// True if the command was clamped to the configured acceleration limits.
    pub cmd_limited: bool,
}

/// Status report for ThrustAlloc processing.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct StatusReport {
    /// True if the solver reported convergence.
    pub converged: bool,

    pub termination: SolveTermination,

    pub iterations: usize,

    pub initial_cost: f64,

    pub final_cost: f64,

    /// Achieved minus target acceleration on each axis.
    pub residuals: [f64; NUM_AXES],

    /// True for each thruster whose force sits on one of its bounds.
    pub saturated: [bool; NUM_THRUSTERS],

    /// True if the command was clamped before the solve.
    pub cmd_limited: bool,
}

/// A single row of the cycle archive.
#[derive(Serialize)]
struct CycleRecord {
    time_s: f64,
    cycle: u64,
    converged: bool,
    iterations: usize,
    final_cost: f64,
    cmd_limited: bool,
    target_surge: f64,
    target_sway: f64,
    target_heave: f64,
    target_roll: f64,
    target_pitch: f64,
    target_yaw: f64,
    surge_stbd_hi: f64,
    surge_port_hi: f64,
    surge_port_lo: f64,
    surge_stbd_lo: f64,
    sway_fwd: f64,
    sway_aft: f64,
    heave_port_aft: f64,
    heave_stbd_aft: f64,
    heave_stbd_fwd: f64,
    heave_port_fwd: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of the allocation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting for a command.
    Idle,

    /// A problem has been built for a command and is being solved.
    Solving,

    /// The forces have been solved and are waiting to be published.
    Publishing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ThrustAlloc {
    type InitData = InitData;
    type InitError = ThrustAllocError;

    type InputData = AccelCmd;
    type OutputData = ThrustForces;
    type StatusReport = StatusReport;
    type ProcError = ThrustAllocError;

    /// Initialise the ThrustAlloc module.
    ///
    /// The parameters are validated and the equations of motion are built once from the
    /// geometry.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let InitData {
            params,
            geometry,
            archive_path,
        } = init_data;

        params.validate()?;

        let arch_report = match (params.archive_reports, archive_path) {
            (true, Some(p)) => Archiver::create(p)
                .map_err(|e| ThrustAllocError::ArchiveError(e.to_string()))?,
            _ => Archiver::default(),
        };

        Ok(Self {
            equations: EquationSet::new(&params, &geometry),
            bounds: ForceBounds::from_params(&params),
            solver_options: params.solver_options(),
            params,
            geometry,
            phase: CyclePhase::Idle,
            num_cycles: 0,
            last: None,
            arch_report,
        })
    }

    /// Allocate a single acceleration command.
    ///
    /// A result is returned whether or not the solver converged, the status report says which.
    /// On return the module is in the `Publishing` phase, call `end_cycle` once the forces have
    /// been handed on.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.phase = CyclePhase::Solving;

        match self.solve_cycle(input_data) {
            Ok(r) => {
                self.phase = CyclePhase::Publishing;
                Ok(r)
            }
            Err(e) => {
                self.phase = CyclePhase::Idle;
                Err(e)
            }
        }
    }
}

impl Archived for ThrustAlloc {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (ctx, report) = match self.last {
            Some(ref l) => l,
            None => return Ok(()),
        };

        let t = &ctx.targets;
        let f = &ctx.forces;

        self.arch_report.serialise(CycleRecord {
            time_s: session::get_elapsed_seconds(),
            cycle: self.num_cycles,
            converged: report.converged,
            iterations: report.iterations,
            final_cost: report.final_cost,
            cmd_limited: report.cmd_limited,
            target_surge: t[0],
            target_sway: t[1],
            target_heave: t[2],
            target_roll: t[3],
            target_pitch: t[4],
            target_yaw: t[5],
            surge_stbd_hi: f[0],
            surge_port_hi: f[1],
            surge_port_lo: f[2],
            surge_stbd_lo: f[3],
            sway_fwd: f[4],
            sway_aft: f[5],
            heave_port_aft: f[6],
            heave_stbd_aft: f[7],
            heave_stbd_fwd: f[8],
            heave_port_fwd: f[9],
        })
    }
}

impl ThrustAlloc {
    /// Current phase of the allocation cycle.
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Mark the current cycle's result as handed on and return to `Idle`.
    pub fn end_cycle(&mut self) {
        self.phase = CyclePhase::Idle;
    }

    /// Number of commands solved since initialisation.
    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    pub fn geometry(&self) -> &ThrusterGeometry {
        &self.geometry
    }

    pub fn equations(&self) -> &EquationSet {
        &self.equations
    }

    pub fn bounds(&self) -> &ForceBounds {
        &self.bounds
    }

    fn solve_cycle(
        &mut self,
        cmd: &AccelCmd,
    ) -> Result<(ThrustForces, StatusReport), ThrustAllocError> {
        let mut ctx = CycleContext::new(cmd, &self.params)?;

        if ctx.cmd_limited {
            debug!("Command limited to {:?}", ctx.targets);
        }

        let problem = ctx
            .build_problem(&self.equations, &self.bounds)
            .map_err(ThrustAllocError::ProblemError)?;

        if self.params.log_cycle_report {
            debug!("Initial guess: {:?}", ctx.forces);
        }

        let summary = lsq::solve(&self.solver_options, &problem, &mut ctx.forces)
            .map_err(ThrustAllocError::SolveError)?;

        self.num_cycles += 1;

        let forces = ThrustForces::from_array(&ctx.forces);
        let termination = match summary.termination {
            TerminationType::Convergence => SolveTermination::Convergence,
            TerminationType::NoConvergence => SolveTermination::NoConvergence,
            TerminationType::Failure => SolveTermination::Failure,
        };

        let report = StatusReport {
            converged: summary.is_converged(),
            termination,
            iterations: summary.iterations,
            initial_cost: summary.initial_cost,
            final_cost: summary.final_cost,
            residuals: self.equations.residuals(&forces, &ctx.targets),
            saturated: self.bounds.saturated(&forces),
            cmd_limited: ctx.cmd_limited,
        };

        if !report.converged {
            warn!(
                "Thrust allocation did not converge ({:?}: {}), publishing best forces found",
                summary.termination, summary.message
            );
        }

        if self.params.log_cycle_report {
            debug!("Solved forces: {:?}", ctx.forces);
            debug!(
                "{:?} after {} iterations, cost {:e} -> {:e}",
                summary.termination, summary.iterations, summary.initial_cost, summary.final_cost
            );
        }
        if self.params.log_full_report {
            debug!("{}", summary);
        }

        trace!(
            "ThrustAlloc residuals: {}",
            Axis::ALL
                .iter()
                .map(|a| format!("{} {:+.3e}", a.name(), report.residuals[a.index()]))
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.last = Some((ctx, report));

        if self.arch_report.is_open() {
            if let Err(e) = self.write() {
                warn!("Could not archive the cycle report: {}", e);
            }
        }

        Ok((forces, report))
    }
}

impl CycleContext {
    /// Build the context for a command.
    ///
    /// Commands containing non-finite values are rejected. If acceleration limits are configured
    /// each component is clamped to them.
    pub fn new(cmd: &AccelCmd, params: &Params) -> Result<Self, ThrustAllocError> {
        if !cmd.is_finite() {
            return Err(ThrustAllocError::InvalidCmd(*cmd));
        }

        let mut targets = cmd.axes();
        let mut cmd_limited = false;

        for (i, t) in targets.iter_mut().enumerate() {
            let limit = match i {
                0..=2 => params.max_linear_accel_ms2,
                _ => params.max_angular_accel_rads2,
            };

            if let Some(l) = limit {
                if t.abs() > l {
                    *t = t.signum() * l;
                    cmd_limited = true;
                }
            }
        }

        Ok(Self {
            targets,
            forces: [0.0; NUM_THRUSTERS],
            cmd_limited,
        })
    }

    /// Build the least squares problem for this cycle: one residual per axis against this
    /// context's targets, with the force bounds as hard constraints.
    pub fn build_problem(
        &self,
        equations: &EquationSet,
        bounds: &ForceBounds,
    ) -> Result<Problem<'static>, ProblemError> {
        let mut problem = Problem::new(NUM_THRUSTERS);

        for eq in equations.iter() {
            problem.add_residual_block(
                Box::new(eq.residual(self.targets[eq.axis.index()])),
                &eq.param_indices(),
            )?;
        }

        bounds.apply(&mut problem)?;

        Ok(problem)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame_client::test::reference_geometry;
    use comms_if::eqpt::{ThrusterId, ThrusterRole};

    fn alloc_with(params: Params) -> ThrustAlloc {
        ThrustAlloc::init(InitData {
            params,
            geometry: reference_geometry(),
            archive_path: None,
        })
        .unwrap()
    }

    fn alloc() -> ThrustAlloc {
        alloc_with(Params::default())
    }

    fn role_sum(forces: &ThrustForces, role: ThrusterRole) -> f64 {
        ThrusterId::with_role(role).map(|id| forces.get(id)).sum()
    }

    #[test]
    fn test_zero_command() {
        let mut ta = alloc();
        let (forces, report) = ta.proc(&AccelCmd::default()).unwrap();

        for f in forces.to_array().iter() {
            assert!(f.abs() < 1e-12);
        }
        assert!(report.converged);
        assert_eq!(report.final_cost, 0.0);
        assert_eq!(ta.phase(), CyclePhase::Publishing);

        ta.end_cycle();
        assert_eq!(ta.phase(), CyclePhase::Idle);
    }

    #[test]
    fn test_bounds_respected() {
        let mut ta = alloc();

        let cmds = [
            [10.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [-5.0, 4.0, -7.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 50.0, -30.0, 20.0],
            [100.0, -100.0, 100.0, -100.0, 100.0, -100.0],
        ];

        for c in cmds.iter() {
            let (forces, _) = ta.proc(&AccelCmd::from_axes(*c)).unwrap();
            assert!(ta.bounds().contains(&forces), "{:?} out of bounds", forces);
        }
    }

    #[test]
    fn test_pure_surge() {
        let mut ta = alloc();
        let (forces, report) = ta
            .proc(&AccelCmd::from_axes([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();

        assert!(report.converged);
        assert!((role_sum(&forces, ThrusterRole::Surge) - 48.8428).abs() < 1e-4);

        for id in ThrusterId::ALL.iter().filter(|id| id.role() != ThrusterRole::Surge) {
            assert!(forces.get(*id).abs() < 1e-6, "{} = {}", id, forces.get(*id));
        }

        // The symmetric layout shares the load equally
        for id in ThrusterId::with_role(ThrusterRole::Surge) {
            assert!((forces.get(id) - 48.8428 / 4.0).abs() < 1e-4);
        }
        assert!(report.residuals.iter().all(|r| r.abs() < 1e-6));
        assert!(!report.saturated.iter().any(|s| *s));
    }

    #[test]
    fn test_surge_saturation() {
        let mut ta = alloc();
        let cmd = AccelCmd::from_axes([3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let (forces_a, report_a) = ta.proc(&cmd).unwrap();

        for id in ThrusterId::with_role(ThrusterRole::Surge) {
            assert!((forces_a.get(id) - 18.0).abs() < 1e-6);
            assert!(report_a.saturated[id.index()]);
        }
        for id in ThrusterId::ALL.iter().filter(|id| id.role() != ThrusterRole::Surge) {
            assert!(forces_a.get(*id).abs() < 1e-6);
        }

        let expected_residual = 72.0 / 48.8428 - 3.0;
        assert!((report_a.residuals[Axis::Surge.index()] - expected_residual).abs() < 1e-6);

        // The infeasible residual is the same on every solve
        let (forces_b, report_b) = ta.proc(&cmd).unwrap();
        assert_eq!(forces_a, forces_b);
        assert_eq!(
            report_a.residuals[Axis::Surge.index()],
            report_b.residuals[Axis::Surge.index()]
        );
    }

    #[test]
    fn test_deterministic() {
        let cmd = AccelCmd::from_axes([0.4, -0.2, 0.3, 0.5, -0.1, 0.2]);

        let mut ta = alloc();
        let (a, _) = ta.proc(&cmd).unwrap();
        let (b, _) = ta.proc(&cmd).unwrap();
        let (c, _) = alloc().proc(&cmd).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_roll_uses_heave_not_surge() {
        let mut ta = alloc();
        let (forces, report) = ta
            .proc(&AccelCmd::from_axes([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]))
            .unwrap();

        assert!(report.converged);

        for id in ThrusterId::with_role(ThrusterRole::Surge) {
            assert!(forces.get(id).abs() < 1e-9, "{} = {}", id, forces.get(id));
        }

        let heave: Vec<f64> = ThrusterId::with_role(ThrusterRole::Heave)
            .map(|id| forces.get(id))
            .collect();
        assert!(heave.iter().any(|f| f.abs() > 1e-3));

        // Port side pushes opposite to starboard
        assert!(
            forces.get(ThrusterId::HeavePortFwd).signum()
                != forces.get(ThrusterId::HeaveStbdFwd).signum()
        );
        assert!(report.residuals[Axis::Roll.index()].abs() < 1e-6);
    }

    #[test]
    fn test_previous_command_forgotten() {
        let mut ta = alloc();

        ta.proc(&AccelCmd::from_axes([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        ta.end_cycle();
        let (forces, _) = ta
            .proc(&AccelCmd::from_axes([0.0, 0.2, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();

        for id in ThrusterId::with_role(ThrusterRole::Surge) {
            assert!(forces.get(id).abs() < 1e-6);
        }
        assert!((role_sum(&forces, ThrusterRole::Sway) - 0.2 * 48.8428).abs() < 1e-4);
        assert_eq!(ta.num_cycles(), 2);
    }

    #[test]
    fn test_invalid_command() {
        let mut ta = alloc();
        let cmd = AccelCmd::from_axes([0.0, std::f64::NAN, 0.0, 0.0, 0.0, 0.0]);

        match ta.proc(&cmd) {
            Err(ThrustAllocError::InvalidCmd(_)) => (),
            r => panic!("Expected an invalid command error, got {:?}", r),
        }
        assert_eq!(ta.phase(), CyclePhase::Idle);
        assert_eq!(ta.num_cycles(), 0);

        let cmd = AccelCmd::from_axes([0.0, 0.0, 0.0, 0.0, std::f64::INFINITY, 0.0]);
        assert!(ta.proc(&cmd).is_err());
    }

    #[test]
    fn test_command_limits() {
        let mut params = Params::default();
        params.max_linear_accel_ms2 = Some(0.5);
        params.max_angular_accel_rads2 = Some(2.0);

        let ctx = CycleContext::new(
            &AccelCmd::from_axes([1.0, -0.7, 0.1, -3.0, 1.0, 0.0]),
            &params,
        )
        .unwrap();
        assert_eq!(ctx.targets, [0.5, -0.5, 0.1, -2.0, 1.0, 0.0]);
        assert!(ctx.cmd_limited);
        assert_eq!(ctx.forces, [0.0; NUM_THRUSTERS]);

        let mut ta = alloc_with(params);
        let (forces, report) = ta
            .proc(&AccelCmd::from_axes([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();

        assert!(report.cmd_limited);
        assert!((role_sum(&forces, ThrusterRole::Surge) - 0.5 * 48.8428).abs() < 1e-4);
        // Residuals are reported against the limited target
        assert!(report.residuals[Axis::Surge.index()].abs() < 1e-6);
    }

    #[test]
    fn test_unlimited_context() {
        let ctx = CycleContext::new(
            &AccelCmd::from_axes([10.0, 0.0, 0.0, 0.0, 0.0, -10.0]),
            &Params::default(),
        )
        .unwrap();

        assert_eq!(ctx.targets, [10.0, 0.0, 0.0, 0.0, 0.0, -10.0]);
        assert!(!ctx.cmd_limited);
    }

    #[test]
    fn test_problem_shape() {
        let ta = alloc();
        let ctx = CycleContext::new(&AccelCmd::default(), &ta.params).unwrap();
        let problem = ctx.build_problem(ta.equations(), ta.bounds()).unwrap();

        assert_eq!(problem.num_params(), NUM_THRUSTERS);
        assert_eq!(problem.num_residuals(), NUM_AXES);
        for i in 0..NUM_THRUSTERS {
            assert_eq!(problem.lower_bound(i), -18.0);
            assert_eq!(problem.upper_bound(i), 18.0);
        }
    }

    #[test]
    fn test_non_convergence_still_returns_forces() {
        let mut params = Params::default();
        params.solver.max_num_iterations = 1;

        let mut ta = alloc_with(params);
        let (forces, report) = ta
            .proc(&AccelCmd::from_axes([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();

        assert!(!report.converged);
        assert_eq!(report.termination, SolveTermination::NoConvergence);
        assert_eq!(report.iterations, 1);
        assert!(ta.bounds().contains(&forces));
        assert!(report.final_cost < report.initial_cost);
        assert_eq!(ta.phase(), CyclePhase::Publishing);
    }

    #[test]
    fn test_cholesky_agrees() {
        let mut params = Params::default();
        params.solver.linear_solver_type = lsq::LinearSolverType::DenseNormalCholesky;

        let cmd = AccelCmd::from_axes([0.3, 0.1, -0.2, 0.4, 0.0, -0.1]);
        let (a, _) = alloc().proc(&cmd).unwrap();
        let (b, _) = alloc_with(params).proc(&cmd).unwrap();

        for (fa, fb) in a.to_array().iter().zip(b.to_array().iter()) {
            assert!((fa - fb).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = Params::default();
        params.inertia_kgm2[2] = -1.0;

        match ThrustAlloc::init(InitData {
            params,
            geometry: reference_geometry(),
            archive_path: None,
        }) {
            Err(ThrustAllocError::InvalidParams(_)) => (),
            Err(e) => panic!("Unexpected error {}", e),
            Ok(_) => panic!("Expected invalid params to be rejected"),
        }
    }

    #[test]
    fn test_archive_cycles() {
        let mut path = std::env::temp_dir();
        path.push(format!("thrust_alloc_arch_test_{}", std::process::id()));
        path.push("cycle_report.csv");

        let mut params = Params::default();
        params.archive_reports = true;

        let mut ta = ThrustAlloc::init(InitData {
            params,
            geometry: reference_geometry(),
            archive_path: Some(path.clone()),
        })
        .unwrap();

        ta.proc(&AccelCmd::from_axes([0.5, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        ta.proc(&AccelCmd::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time_s,cycle,converged,iterations,final_cost,cmd_limited"));
        assert!(lines[0].ends_with("heave_stbd_fwd,heave_port_fwd"));
        assert!(lines[2].contains(",2,true,"));

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }
}
