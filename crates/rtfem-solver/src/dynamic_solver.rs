//! Real-time dynamic analysis by implicit velocity stepping.
//!
//! Advances the equation of motion
//!
//! ```text
//! M·ü + C·u̇ + K·u = F(t)
//! ```
//!
//! one fixed-size step at a time. Discretizing the velocity implicitly
//! (backward Euler in velocity) gives the linear system
//!
//! ```text
//! A·v₊ = b,   A = M + Δt·C + Δt²·K,   b = M·vₙ + Δt·(F − K·uₙ)
//! ```
//!
//! followed by the explicit updates `u₊ = uₙ + Δt·v₊` and
//! `a₊ = (v₊ − vₙ)/Δt`. The scheme is unconditionally stable, so the
//! step size trades accuracy against wall-clock budget, not stability.
//!
//! Damping is Rayleigh damping, `C = αM + βK`.
//!
//! For linear tetrahedra the geometry matrices and volumes never change,
//! so K, M and the per-element force data are assembled once at
//! construction; each iteration only rebuilds the global force vector,
//! forms the right-hand side and solves.

use nalgebra::{DMatrix, DVector, Vector3};
use nalgebra_sparse::CsrMatrix;

use rtfem_model::{BoundaryCondition, FemModel};

use crate::assembly::{self, GlobalSystem};
use crate::backend::{LinearSolver, LinearSystemData, MatVec, NativeBackend, SparseTriplets};
use crate::elements::{self, ElementSolverData, TetrahedronSolver};
use crate::error::{FemError, Result};
use crate::static_solver::SolverOutput;
use crate::timer::{IterationTiming, SolverTimer, StageClock};

/// Dynamic integration parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicConfig {
    /// Rayleigh damping α (mass-proportional).
    pub alpha_damping: f64,
    /// Rayleigh damping β (stiffness-proportional).
    pub beta_damping: f64,
}

impl DynamicConfig {
    /// Undamped configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Rayleigh damping parameters: C = α·M + β·K.
    pub fn with_rayleigh_damping(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha_damping = alpha;
        self.beta_damping = beta;
        self
    }
}

/// Dynamic analysis solver owning the transient state.
///
/// The model is frozen at construction; rest geometry, loads and
/// boundary conditions cannot change between iterations. Prescribed
/// displacements are held exactly: their DOFs carry zero velocity and
/// acceleration throughout the simulation.
pub struct DynamicSolver {
    model: FemModel,
    config: DynamicConfig,

    element_data: Vec<ElementSolverData>,
    stiffness: DMatrix<f64>,
    mass: DMatrix<f64>,
    stiffness_csr: CsrMatrix<f64>,
    mass_csr: CsrMatrix<f64>,
    // The velocity system is constrained to zero motion at fixed DOFs.
    velocity_constraints: Vec<BoundaryCondition>,

    displacement: DVector<f64>,
    velocity: DVector<f64>,
    acceleration: DVector<f64>,
    total_time: f64,
    timer: SolverTimer,
}

impl DynamicSolver {
    /// Build a dynamic solver: solve all elements, assemble K and M and
    /// initialize the state at rest (prescribed displacements applied).
    pub fn new(model: FemModel, config: DynamicConfig) -> Result<Self> {
        let element_solver = TetrahedronSolver::new();
        let element_data = assembly::compute_element_data(&model, &element_solver)?;

        let mut system = GlobalSystem::from_element_data(&model, &element_data)?;
        system.assemble_mass(&model, &element_data)?;

        let num_dofs = system.num_dofs;
        let stiffness = system.stiffness;
        let mass = match system.mass {
            Some(mass) => mass,
            None => {
                return Err(FemError::Configuration(
                    "mass matrix missing after assembly".into(),
                ));
            }
        };

        let stiffness_csr = SparseTriplets::from_dense(&stiffness).to_csr()?;
        let mass_csr = SparseTriplets::from_dense(&mass).to_csr()?;

        let mut displacement = DVector::zeros(num_dofs);
        let mut velocity_constraints = Vec::with_capacity(model.boundary_conditions().len());
        for bc in model.boundary_conditions() {
            for (k, &dof) in bc.dof_indices().iter().enumerate() {
                if dof >= num_dofs {
                    return Err(FemError::Configuration(format!(
                        "boundary condition on vertex {} addresses DOF {dof}, \
                         but the system has only {num_dofs} DOFs",
                        bc.vertex
                    )));
                }
                displacement[dof] = bc.value[k];
            }
            velocity_constraints.push(BoundaryCondition::fixed(bc.vertex));
        }

        Ok(Self {
            model,
            config,
            element_data,
            stiffness,
            mass,
            stiffness_csr,
            mass_csr,
            velocity_constraints,
            displacement,
            velocity: DVector::zeros(num_dofs),
            acceleration: DVector::zeros(num_dofs),
            total_time: 0.0,
            timer: SolverTimer::new(),
        })
    }

    /// The model being simulated.
    pub fn model(&self) -> &FemModel {
        &self.model
    }

    /// Current global displacement vector.
    pub fn displacement(&self) -> &DVector<f64> {
        &self.displacement
    }

    /// Current global velocity vector.
    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }

    /// Current global acceleration vector.
    pub fn acceleration(&self) -> &DVector<f64> {
        &self.acceleration
    }

    /// Current displacement of one vertex.
    pub fn vertex_displacement(&self, vertex: usize) -> Vector3<f64> {
        let base = vertex * 3;
        Vector3::new(
            self.displacement[base],
            self.displacement[base + 1],
            self.displacement[base + 2],
        )
    }

    /// Accumulated simulation time.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Per-stage timing instrumentation.
    pub fn timer(&self) -> &SolverTimer {
        &self.timer
    }

    /// Snapshot of the current displacement as a solver output.
    pub fn output(&self) -> SolverOutput {
        SolverOutput {
            displacement: self.displacement.clone(),
        }
    }

    /// Advance the simulation by one step with the default backend.
    pub fn run_iteration(&mut self, dt: f64) -> Result<()> {
        self.run_iteration_with_backend(dt, &NativeBackend)
    }

    /// Advance the simulation by one step of size `dt`.
    ///
    /// # Errors
    /// A configuration error for a non-positive step size and a solve
    /// failure if the effective system is singular. A failed iteration
    /// leaves the state untouched.
    pub fn run_iteration_with_backend<B>(&mut self, dt: f64, backend: &B) -> Result<()>
    where
        B: LinearSolver + MatVec + ?Sized,
    {
        self.check_step(dt)?;
        let mut clock = StageClock::start();
        let mut timing = IterationTiming::default();

        let force = self.assemble_force();
        timing.reassembly = clock.lap();

        let m_v = backend.multiply(&self.mass_csr, &self.velocity)?;
        let k_u = backend.multiply(&self.stiffness_csr, &self.displacement)?;
        let mut rhs = m_v + (force - k_u) * dt;
        let mut effective = self.effective_matrix(dt);
        timing.rhs = clock.lap();

        assembly::apply_constraints(&mut effective, &mut rhs, &self.velocity_constraints)?;
        timing.boundary = clock.lap();

        let system = LinearSystemData {
            stiffness: SparseTriplets::from_dense(&effective),
            num_dofs: rhs.len(),
            force: rhs,
            constrained_dofs: Vec::new(),
        };
        let (next_velocity, _info) = backend.solve_linear(&system)?;
        timing.solve = clock.lap();

        self.integrate(dt, next_velocity);
        timing.integration = clock.lap();

        self.timer.record(timing);
        Ok(())
    }

    /// Advance the simulation by one step using direct dense operations,
    /// bypassing the backend layer. Produces the same trajectory as
    /// [`DynamicSolver::run_iteration`] within floating-point tolerance.
    pub fn run_iteration_cpu(&mut self, dt: f64) -> Result<()> {
        self.check_step(dt)?;
        let mut clock = StageClock::start();
        let mut timing = IterationTiming::default();

        let force = self.assemble_force();
        timing.reassembly = clock.lap();

        let mut rhs =
            &self.mass * &self.velocity + (force - &self.stiffness * &self.displacement) * dt;
        let mut effective = self.effective_matrix(dt);
        timing.rhs = clock.lap();

        assembly::apply_constraints(&mut effective, &mut rhs, &self.velocity_constraints)?;
        timing.boundary = clock.lap();

        let next_velocity = effective
            .lu()
            .solve(&rhs)
            .ok_or_else(|| FemError::Solve("singular effective matrix".into()))?;
        timing.solve = clock.lap();

        self.integrate(dt, next_velocity);
        timing.integration = clock.lap();

        self.timer.record(timing);
        Ok(())
    }

    fn check_step(&self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(FemError::Configuration(format!(
                "step size must be positive and finite, got {dt}"
            )));
        }
        Ok(())
    }

    /// Rebuild the global force vector from the cached per-element data.
    fn assemble_force(&self) -> DVector<f64> {
        let mut force = DVector::zeros(self.displacement.len());
        for (element, data) in self
            .model
            .geometry()
            .elements
            .iter()
            .zip(self.element_data.iter())
        {
            let dof_indices = elements::global_dof_indices(element);
            for (local, &global) in dof_indices.iter().enumerate() {
                force[global] += data.force_vector[local];
            }
        }
        force
    }

    /// A = M + Δt·C + Δt²·K with C = αM + βK, collected per matrix:
    /// A = (1 + Δt·α)·M + (Δt·β + Δt²)·K.
    fn effective_matrix(&self, dt: f64) -> DMatrix<f64> {
        let mass_coeff = 1.0 + dt * self.config.alpha_damping;
        let stiffness_coeff = dt * self.config.beta_damping + dt * dt;
        &self.mass * mass_coeff + &self.stiffness * stiffness_coeff
    }

    /// Explicit state updates from the solved velocity, then pin
    /// constrained DOFs to their prescribed values.
    fn integrate(&mut self, dt: f64, next_velocity: DVector<f64>) {
        self.acceleration = (&next_velocity - &self.velocity) / dt;
        self.displacement += &next_velocity * dt;
        self.velocity = next_velocity;

        for bc in self.model.boundary_conditions() {
            for (k, &dof) in bc.dof_indices().iter().enumerate() {
                self.displacement[dof] = bc.value[k];
                self.velocity[dof] = 0.0;
                self.acceleration[dof] = 0.0;
            }
        }

        self.total_time += dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtfem_model::{FemGeometry, Material};

    const GRAVITY: f64 = -9.81;

    fn unit_tetrahedron_geometry() -> FemGeometry {
        let mut geometry = FemGeometry::new();
        geometry.add_vertex(0.0, 0.0, 0.0);
        geometry.add_vertex(1.0, 0.0, 0.0);
        geometry.add_vertex(0.0, 1.0, 0.0);
        geometry.add_vertex(0.0, 0.0, 1.0);
        geometry.add_element([0, 1, 2, 3]);
        geometry
    }

    fn free_falling_model() -> FemModel {
        let mut model = FemModel::new(
            unit_tetrahedron_geometry(),
            Material::new(1e7, 0.3, 1000.0),
        );
        model.add_body_force(Vector3::new(0.0, 0.0, GRAVITY));
        model
    }

    fn supported_model() -> FemModel {
        let mut model = free_falling_model();
        for vertex in 0..3 {
            model.add_boundary_condition(BoundaryCondition::fixed(vertex));
        }
        model
    }

    #[test]
    fn config_builder() {
        let config = DynamicConfig::new().with_rayleigh_damping(0.1, 0.001);
        assert_eq!(config.alpha_damping, 0.1);
        assert_eq!(config.beta_damping, 0.001);
        assert_eq!(DynamicConfig::default().alpha_damping, 0.0);
    }

    #[test]
    fn free_fall_velocity_matches_gravity() {
        // For a uniform body force the consistent force vector satisfies
        // M·g = F exactly, and rigid translation lies in K's null space,
        // so one implicit step yields v = g·Δt at every vertex.
        let dt = 0.01;
        let mut solver = DynamicSolver::new(free_falling_model(), DynamicConfig::new()).unwrap();
        solver.run_iteration(dt).unwrap();

        for vertex in 0..4 {
            let base = vertex * 3;
            assert!(solver.velocity()[base].abs() < 1e-12);
            assert!(solver.velocity()[base + 1].abs() < 1e-12);
            let vz = solver.velocity()[base + 2];
            assert!(
                (vz - GRAVITY * dt).abs() < 1e-9 * (GRAVITY * dt).abs(),
                "vertex {vertex}: vz = {vz}"
            );
        }

        // First-step acceleration is g.
        let az = solver.acceleration()[2];
        assert!((az - GRAVITY).abs() < 1e-6);
    }

    #[test]
    fn free_fall_displacement_grows_monotonically() {
        let mut solver = DynamicSolver::new(free_falling_model(), DynamicConfig::new()).unwrap();

        let mut previous = 0.0;
        for _ in 0..5 {
            solver.run_iteration(0.01).unwrap();
            let z = solver.vertex_displacement(3).z;
            assert!(z < previous, "displacement must keep growing downward");
            previous = z;
        }
    }

    #[test]
    fn fixed_vertices_do_not_move() {
        let mut solver = DynamicSolver::new(supported_model(), DynamicConfig::new()).unwrap();

        for _ in 0..3 {
            solver.run_iteration(0.005).unwrap();
        }

        for vertex in 0..3 {
            assert_eq!(solver.vertex_displacement(vertex), Vector3::zeros());
        }
        // The apex sags between the supports.
        assert!(solver.vertex_displacement(3).z < 0.0);
    }

    #[test]
    fn backend_and_cpu_paths_agree() {
        let mut with_backend =
            DynamicSolver::new(supported_model(), DynamicConfig::new()).unwrap();
        let mut cpu = DynamicSolver::new(supported_model(), DynamicConfig::new()).unwrap();

        for _ in 0..3 {
            with_backend.run_iteration(0.005).unwrap();
            cpu.run_iteration_cpu(0.005).unwrap();
        }

        let a = with_backend.displacement();
        let b = cpu.displacement();
        for i in 0..a.len() {
            let scale = a[i].abs().max(1e-9);
            assert!(
                (a[i] - b[i]).abs() < 1e-10 * scale.max(1.0),
                "paths diverge at DOF {i}: {} vs {}",
                a[i],
                b[i]
            );
        }
    }

    #[test]
    fn rayleigh_damping_slows_the_fall() {
        let dt = 0.01;
        let mut undamped = DynamicSolver::new(free_falling_model(), DynamicConfig::new()).unwrap();
        let damped_config = DynamicConfig::new().with_rayleigh_damping(10.0, 0.0);
        let mut damped = DynamicSolver::new(free_falling_model(), damped_config).unwrap();

        undamped.run_iteration(dt).unwrap();
        damped.run_iteration(dt).unwrap();

        let v_free = undamped.velocity()[2].abs();
        let v_damped = damped.velocity()[2].abs();
        assert!(v_damped < v_free);
    }

    #[test]
    fn rejects_non_positive_step() {
        let mut solver = DynamicSolver::new(supported_model(), DynamicConfig::new()).unwrap();
        assert!(matches!(
            solver.run_iteration(0.0),
            Err(FemError::Configuration(_))
        ));
        assert!(matches!(
            solver.run_iteration(-0.01),
            Err(FemError::Configuration(_))
        ));
        // Failed iterations advance nothing.
        assert_eq!(solver.total_time(), 0.0);
        assert_eq!(solver.timer().iterations(), 0);
    }

    #[test]
    fn accumulates_time_and_timings() {
        let mut solver = DynamicSolver::new(supported_model(), DynamicConfig::new()).unwrap();

        for _ in 0..4 {
            solver.run_iteration(0.01).unwrap();
        }

        assert!((solver.total_time() - 0.04).abs() < 1e-12);
        assert_eq!(solver.timer().iterations(), 4);
    }

    #[test]
    fn constraint_on_missing_vertex_fails_at_construction() {
        let mut model = free_falling_model();
        model.add_boundary_condition(BoundaryCondition::fixed(42));

        let result = DynamicSolver::new(model, DynamicConfig::new());
        assert!(matches!(result, Err(FemError::Configuration(_))));
    }
}
