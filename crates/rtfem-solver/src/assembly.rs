//! Global matrix assembly for finite element systems.
//!
//! Assembles per-element results into the global system:
//! - K: global stiffness matrix
//! - M: global mass matrix (optional, only needed by the dynamic solver)
//! - F: global force vector
//!
//! ## Assembly process
//!
//! 1. Solve every element independently (geometry matrix, force, volume).
//!    This stage is embarrassingly parallel and runs on the rayon pool.
//! 2. Scatter-add each element's stiffness, mass and force contributions
//!    into the global containers, sequentially and in element order, so
//!    the assembled system is reproducible run to run.
//! 3. Apply displacement boundary conditions by row and column
//!    elimination, which keeps fixed DOFs exact in the solution.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use rtfem_model::{BoundaryCondition, FemModel};

use crate::backend::{LinearSystemData, SparseTriplets};
use crate::elements::{self, ElementSolver, ElementSolverData};
use crate::error::{FemError, Result};

/// Global finite element system.
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// Global stiffness matrix.
    pub stiffness: DMatrix<f64>,
    /// Global mass matrix (only assembled for dynamic analysis).
    pub mass: Option<DMatrix<f64>>,
    /// Global force vector.
    pub force: DVector<f64>,
    /// Number of degrees of freedom.
    pub num_dofs: usize,
    /// Constrained DOFs, recorded when boundary conditions are applied.
    pub constrained_dofs: Vec<usize>,
}

/// Solve all elements of a model on the rayon pool.
///
/// Results come back in element order regardless of scheduling, so callers
/// may index them by element.
///
/// # Errors
/// The first element error aborts the whole pass.
pub fn compute_element_data(
    model: &FemModel,
    element_solver: &dyn ElementSolver,
) -> Result<Vec<ElementSolverData>> {
    let geometry = model.geometry();
    geometry
        .elements
        .par_iter()
        .map(|element| {
            element_solver.solve(
                element,
                &geometry.vertices,
                model.body_force(),
                model.material(),
            )
        })
        .collect()
}

/// Eliminate constrained DOFs from a system `A·x = b` in place.
///
/// For each constrained DOF `d` with prescribed value `s`:
/// 1. `b -= A[:, d] · s` (move the known contribution to the RHS)
/// 2. zero row `d` and column `d` of A
/// 3. `A[d, d] = 1`, `b[d] = s`
///
/// The reduced system stays symmetric and the solution carries the
/// prescribed values exactly. Returns the eliminated DOF indices.
///
/// # Errors
/// Returns a configuration error if a boundary condition addresses a DOF
/// outside the system.
pub fn apply_constraints(
    matrix: &mut DMatrix<f64>,
    rhs: &mut DVector<f64>,
    boundary_conditions: &[BoundaryCondition],
) -> Result<Vec<usize>> {
    let num_dofs = rhs.len();
    let mut constrained = Vec::with_capacity(boundary_conditions.len() * 3);

    for bc in boundary_conditions {
        for (k, &dof) in bc.dof_indices().iter().enumerate() {
            if dof >= num_dofs {
                return Err(FemError::Configuration(format!(
                    "boundary condition on vertex {} addresses DOF {dof}, \
                     but the system has only {num_dofs} DOFs",
                    bc.vertex
                )));
            }

            let value = bc.value[k];
            let column = matrix.column(dof).clone_owned();
            for i in 0..num_dofs {
                rhs[i] -= column[i] * value;
            }

            matrix.row_mut(dof).fill(0.0);
            matrix.column_mut(dof).fill(0.0);
            matrix[(dof, dof)] = 1.0;
            rhs[dof] = value;

            constrained.push(dof);
        }
    }

    Ok(constrained)
}

impl GlobalSystem {
    /// Create a new empty global system.
    pub fn new(num_dofs: usize) -> Self {
        Self {
            stiffness: DMatrix::zeros(num_dofs, num_dofs),
            mass: None,
            force: DVector::zeros(num_dofs),
            num_dofs,
            constrained_dofs: Vec::new(),
        }
    }

    /// Assemble stiffness and force from a model, then apply its boundary
    /// conditions. The mass matrix is not assembled here; call
    /// [`GlobalSystem::assemble_mass`] when dynamics need it.
    pub fn assemble(model: &FemModel, element_solver: &dyn ElementSolver) -> Result<Self> {
        let element_data = compute_element_data(model, element_solver)?;
        let mut system = Self::from_element_data(model, &element_data)?;
        system.apply_boundary_conditions(model.boundary_conditions())?;
        Ok(system)
    }

    /// Scatter-add precomputed element data into a fresh global system.
    ///
    /// No boundary conditions are applied; the caller decides when (the
    /// dynamic solver eliminates DOFs from its effective matrix instead).
    pub fn from_element_data(
        model: &FemModel,
        element_data: &[ElementSolverData],
    ) -> Result<Self> {
        let geometry = model.geometry();
        if geometry.vertices.is_empty() || geometry.elements.is_empty() {
            return Err(FemError::Configuration(
                "model has no vertices or no elements".into(),
            ));
        }
        if element_data.len() != geometry.elements.len() {
            return Err(FemError::Configuration(format!(
                "{} element results for {} elements",
                element_data.len(),
                geometry.elements.len()
            )));
        }

        let mut system = Self::new(geometry.dof_count());

        for (element, data) in geometry.elements.iter().zip(element_data.iter()) {
            let k_e = elements::stiffness_matrix(data, model.material());
            let dof_indices = elements::global_dof_indices(element);

            for (i_local, &i_global) in dof_indices.iter().enumerate() {
                for (j_local, &j_global) in dof_indices.iter().enumerate() {
                    system.stiffness[(i_global, j_global)] += k_e[(i_local, j_local)];
                }
                system.force[i_global] += data.force_vector[i_local];
            }
        }

        Ok(system)
    }

    /// Assemble the global mass matrix from precomputed element data,
    /// using the same scatter-add pattern as stiffness assembly.
    pub fn assemble_mass(
        &mut self,
        model: &FemModel,
        element_data: &[ElementSolverData],
    ) -> Result<()> {
        let geometry = model.geometry();
        if element_data.len() != geometry.elements.len() {
            return Err(FemError::Configuration(format!(
                "{} element results for {} elements",
                element_data.len(),
                geometry.elements.len()
            )));
        }

        let mut mass = DMatrix::zeros(self.num_dofs, self.num_dofs);

        for (element, data) in geometry.elements.iter().zip(element_data.iter()) {
            let m_e = elements::mass_matrix(data.volume, model.material());
            let dof_indices = elements::global_dof_indices(element);

            for (i_local, &i_global) in dof_indices.iter().enumerate() {
                for (j_local, &j_global) in dof_indices.iter().enumerate() {
                    mass[(i_global, j_global)] += m_e[(i_local, j_local)];
                }
            }
        }

        self.mass = Some(mass);
        Ok(())
    }

    /// Apply displacement boundary conditions to stiffness and force by
    /// row and column elimination.
    pub fn apply_boundary_conditions(
        &mut self,
        boundary_conditions: &[BoundaryCondition],
    ) -> Result<()> {
        let constrained =
            apply_constraints(&mut self.stiffness, &mut self.force, boundary_conditions)?;
        self.constrained_dofs.extend(constrained);
        Ok(())
    }

    /// Check that the assembled system is ready to solve: symmetric and
    /// without zero diagonal entries on free DOFs.
    pub fn validate(&self) -> Result<()> {
        for i in 0..self.num_dofs {
            if !self.constrained_dofs.contains(&i) && self.stiffness[(i, i)].abs() < 1e-10 {
                return Err(FemError::Configuration(format!(
                    "zero diagonal entry at DOF {i}; vertex {} is not \
                     attached to any element",
                    i / 3
                )));
            }
        }

        for i in 0..self.num_dofs {
            for j in (i + 1)..self.num_dofs {
                let diff = (self.stiffness[(i, j)] - self.stiffness[(j, i)]).abs();
                if diff > 1e-6 {
                    return Err(FemError::Configuration(format!(
                        "stiffness matrix not symmetric at ({i}, {j}): diff = {diff}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Export the assembled system as backend-agnostic [`LinearSystemData`].
    ///
    /// Converts the dense stiffness matrix to COO triplet format suitable
    /// for consumption by any solver backend.
    pub fn to_linear_system_data(&self) -> LinearSystemData {
        LinearSystemData {
            stiffness: SparseTriplets::from_dense(&self.stiffness),
            force: self.force.clone(),
            num_dofs: self.num_dofs,
            constrained_dofs: self.constrained_dofs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{TetrahedronSolver, TETRAHEDRON_DOFS};
    use nalgebra::Vector3;
    use rtfem_model::{FemGeometry, Material};

    fn unit_tetrahedron_model() -> FemModel {
        let mut geometry = FemGeometry::new();
        geometry.add_vertex(0.0, 0.0, 0.0);
        geometry.add_vertex(1.0, 0.0, 0.0);
        geometry.add_vertex(0.0, 1.0, 0.0);
        geometry.add_vertex(0.0, 0.0, 1.0);
        geometry.add_element([0, 1, 2, 3]);
        FemModel::new(geometry, Material::new(210e9, 0.3, 7850.0))
    }

    fn two_tetrahedra_model() -> FemModel {
        let mut geometry = FemGeometry::new();
        geometry.add_vertex(0.0, 0.0, 0.0);
        geometry.add_vertex(1.0, 0.0, 0.0);
        geometry.add_vertex(0.0, 1.0, 0.0);
        geometry.add_vertex(0.0, 0.0, 1.0);
        geometry.add_vertex(1.0, 1.0, 1.0);
        geometry.add_element([0, 1, 2, 3]);
        geometry.add_element([1, 2, 3, 4]);
        FemModel::new(geometry, Material::new(210e9, 0.3, 7850.0))
    }

    #[test]
    fn creates_empty_system() {
        let system = GlobalSystem::new(12);
        assert_eq!(system.num_dofs, 12);
        assert_eq!(system.stiffness.nrows(), 12);
        assert_eq!(system.stiffness.ncols(), 12);
        assert_eq!(system.force.len(), 12);
        assert!(system.mass.is_none());
    }

    #[test]
    fn rejects_empty_model() {
        let model = FemModel::new(FemGeometry::new(), Material::new(210e9, 0.3, 7850.0));
        let result = GlobalSystem::assemble(&model, &TetrahedronSolver::new());
        assert!(matches!(result, Err(FemError::Configuration(_))));
    }

    #[test]
    fn single_element_system_equals_element_stiffness() {
        let model = unit_tetrahedron_model();
        let solver = TetrahedronSolver::new();

        let data = compute_element_data(&model, &solver).unwrap();
        let system = GlobalSystem::from_element_data(&model, &data).unwrap();

        let k_e = elements::stiffness_matrix(&data[0], model.material());
        for i in 0..TETRAHEDRON_DOFS {
            for j in 0..TETRAHEDRON_DOFS {
                assert_eq!(system.stiffness[(i, j)], k_e[(i, j)]);
            }
        }
    }

    #[test]
    fn assembled_stiffness_is_symmetric() {
        let model = two_tetrahedra_model();
        let data = compute_element_data(&model, &TetrahedronSolver::new()).unwrap();
        let system = GlobalSystem::from_element_data(&model, &data).unwrap();

        for i in 0..system.num_dofs {
            for j in 0..system.num_dofs {
                let diff = (system.stiffness[(i, j)] - system.stiffness[(j, i)]).abs();
                let scale = system.stiffness[(i, j)].abs().max(1.0);
                assert!(diff < 1e-9 * scale, "not symmetric at ({i}, {j})");
            }
        }
        assert!(system.validate().is_ok());
    }

    #[test]
    fn assembly_is_independent_of_element_order() {
        let model = two_tetrahedra_model();
        let data = compute_element_data(&model, &TetrahedronSolver::new()).unwrap();
        let mut forward = GlobalSystem::from_element_data(&model, &data).unwrap();
        forward.assemble_mass(&model, &data).unwrap();

        let mut reversed_geometry = model.geometry().clone();
        reversed_geometry.elements.reverse();
        let reversed_model =
            FemModel::new(reversed_geometry, *model.material());
        let reversed_data =
            compute_element_data(&reversed_model, &TetrahedronSolver::new()).unwrap();
        let mut reversed =
            GlobalSystem::from_element_data(&reversed_model, &reversed_data).unwrap();
        reversed.assemble_mass(&reversed_model, &reversed_data).unwrap();

        let forward_mass = forward.mass.as_ref().unwrap();
        let reversed_mass = reversed.mass.as_ref().unwrap();

        // K, M and F must all come out identical under element permutation.
        for i in 0..forward.num_dofs {
            for j in 0..forward.num_dofs {
                let diff = (forward.stiffness[(i, j)] - reversed.stiffness[(i, j)]).abs();
                let scale = forward.stiffness[(i, j)].abs().max(1.0);
                assert!(diff < 1e-9 * scale, "order-dependent K entry at ({i}, {j})");

                let diff = (forward_mass[(i, j)] - reversed_mass[(i, j)]).abs();
                let scale = forward_mass[(i, j)].abs().max(1.0);
                assert!(diff < 1e-9 * scale, "order-dependent M entry at ({i}, {j})");
            }
            let diff = (forward.force[i] - reversed.force[i]).abs();
            assert!(diff < 1e-9 * forward.force[i].abs().max(1.0));
        }
    }

    #[test]
    fn body_force_accumulates_into_global_vector() {
        let base = unit_tetrahedron_model();
        let mut model =
            FemModel::new(base.geometry().clone(), Material::new(210e9, 0.3, 1000.0));
        model.add_body_force(Vector3::new(0.0, 0.0, -9.81));

        let data = compute_element_data(&model, &TetrahedronSolver::new()).unwrap();
        let system = GlobalSystem::from_element_data(&model, &data).unwrap();

        let total_z: f64 = (0..4).map(|i| system.force[i * 3 + 2]).sum();
        let expected = 1000.0 * (1.0 / 6.0) * -9.81;
        assert!((total_z - expected).abs() < 1e-9);
    }

    #[test]
    fn constraint_elimination_keeps_fixed_values_exact() {
        let mut model = unit_tetrahedron_model();
        model.add_boundary_condition(BoundaryCondition::fixed(0));
        model.add_boundary_condition(BoundaryCondition::new(
            1,
            Vector3::new(0.001, 0.0, 0.0),
        ));

        let system = GlobalSystem::assemble(&model, &TetrahedronSolver::new()).unwrap();

        assert_eq!(system.constrained_dofs.len(), 6);
        for &dof in &system.constrained_dofs {
            // Eliminated row: unit diagonal, zeros elsewhere.
            assert_eq!(system.stiffness[(dof, dof)], 1.0);
            for j in 0..system.num_dofs {
                if j != dof {
                    assert_eq!(system.stiffness[(dof, j)], 0.0);
                    assert_eq!(system.stiffness[(j, dof)], 0.0);
                }
            }
        }

        // The RHS carries the prescribed values exactly.
        assert_eq!(system.force[0], 0.0);
        assert_eq!(system.force[1], 0.0);
        assert_eq!(system.force[2], 0.0);
        assert_eq!(system.force[3], 0.001);
    }

    #[test]
    fn constraint_on_missing_dof_is_a_configuration_error() {
        let mut model = unit_tetrahedron_model();
        model.add_boundary_condition(BoundaryCondition::fixed(99));

        let result = GlobalSystem::assemble(&model, &TetrahedronSolver::new());
        assert!(matches!(result, Err(FemError::Configuration(_))));
    }

    #[test]
    fn mass_assembly_conserves_mass() {
        let model = two_tetrahedra_model();
        let data = compute_element_data(&model, &TetrahedronSolver::new()).unwrap();
        let mut system = GlobalSystem::from_element_data(&model, &data).unwrap();
        system.assemble_mass(&model, &data).unwrap();

        let mass = system.mass.as_ref().unwrap();
        assert_eq!(mass.nrows(), system.num_dofs);

        // Volumes: 1/6 and 1/3. All entries sum to 3 × physical mass.
        let total_volume = 1.0 / 6.0 + 1.0 / 3.0;
        let expected = 3.0 * 7850.0 * total_volume;
        let total: f64 = mass.iter().sum();
        assert!((total - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn exports_coo_triplets() {
        let mut model = unit_tetrahedron_model();
        model.add_boundary_condition(BoundaryCondition::fixed(0));

        let system = GlobalSystem::assemble(&model, &TetrahedronSolver::new()).unwrap();
        let data = system.to_linear_system_data();

        assert_eq!(data.num_dofs, system.num_dofs);
        assert_eq!(data.constrained_dofs, system.constrained_dofs);
        assert!(data.stiffness.nnz() > 0);

        // Reconstruct and compare entry by entry.
        let mut dense: DMatrix<f64> = DMatrix::zeros(data.num_dofs, data.num_dofs);
        for ((&i, &j), &v) in data
            .stiffness
            .row_indices
            .iter()
            .zip(data.stiffness.col_indices.iter())
            .zip(data.stiffness.values.iter())
        {
            dense[(i, j)] += v;
        }
        for i in 0..data.num_dofs {
            for j in 0..data.num_dofs {
                let reference = system.stiffness[(i, j)];
                let skipped = reference.abs() <= 1e-30;
                let value = if skipped { 0.0 } else { reference };
                assert_eq!(dense[(i, j)], value);
            }
        }
    }
}
