/*
Repair of a box that has drifted out of the unit-cell restrictions.

Pressure coupling with off-diagonal elements (or shear) slowly tilts the
box. Once an off-diagonal element grows beyond half the diagonal element
below it, a whole lower box vector is added to the offending one. That is
a lattice reduction: the lattice, and so the volume, stays the same.

Atoms whose periodic images were chosen with the old vectors keep their
meaning only when their integer shifts are rewritten as well, which is
what the optional `ShiftGraph` is for.
*/

use crate::constants::{Real, BOX_MARGIN_CORRECT, DIM, XX, YY, ZZ};
use crate::pbc::cell::{CellMatrix, IVec, RVec};
use log::info;
use serde::{Deserialize, Serialize};

/// Integer lattice offsets, one per atom, of the periodic image that was
/// used for each atom when making molecules whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftGraph {
    ishift: Vec<IVec>,
}

impl ShiftGraph {
    pub fn new(ishift: Vec<IVec>) -> Self {
        Self { ishift }
    }

    /// Graph for `n_atoms` atoms, all in the central image.
    pub fn with_atoms(n_atoms: usize) -> Self {
        Self {
            ishift: vec![IVec::zeros(); n_atoms],
        }
    }

    pub fn len(&self) -> usize {
        self.ishift.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ishift.is_empty()
    }

    pub fn shifts(&self) -> &[IVec] {
        &self.ishift
    }

    pub fn shifts_mut(&mut self) -> &mut [IVec] {
        &mut self.ishift
    }

    /// Cartesian translation of atom `atom` in `cell`.
    pub fn translation(&self, cell: &CellMatrix, atom: usize) -> Option<RVec> {
        self.ishift.get(atom).map(|n| cell.lattice_translation(n))
    }

    /// Rewrite the offsets after `box[v] += n[v][d] box[d]` was applied for
    /// (z,y), (z,x) and (y,x), in that order.
    fn apply_correction(&mut self, n: &[[i32; DIM]; DIM]) {
        for shift in self.ishift.iter_mut() {
            shift[YY] -= shift[ZZ] * n[ZZ][YY];
            shift[XX] -= shift[ZZ] * n[ZZ][XX];
            shift[XX] -= shift[YY] * n[YY][XX];
        }
    }
}

fn format_box(cell: &CellMatrix) -> String {
    (0..DIM)
        .map(|d| {
            let v = cell.vector(d);
            format!("{:10.5} {:10.5} {:10.5}", v[XX], v[YY], v[ZZ])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Correct the box if it does not obey the unit-cell restrictions.
///
/// Returns true when the box was changed. The graph, when given, is
/// updated so that every atom still refers to the same periodic image.
pub fn correct_box(cell: &mut CellMatrix, graph: Option<&mut ShiftGraph>) -> bool {
    let old = *cell;
    let mut n = [[0i32; DIM]; DIM];
    let mut corrected = false;

    for (v, d) in [(ZZ, YY), (ZZ, XX), (YY, XX)] {
        if !cell.has_length(d) {
            continue;
        }
        let diagonal = cell[(d, d)];
        let value = cell[(v, d)];
        let half: Real = 0.5;
        if value.abs() > BOX_MARGIN_CORRECT * half * diagonal {
            let count = -(value / diagonal).round();
            cell.add_vector(v, d, count);
            n[v][d] = count as i32;
            corrected = true;
        }
    }

    if corrected {
        info!(
            "correcting invalid box:\nold box:\n{}\nnew box:\n{}",
            format_box(&old),
            format_box(cell)
        );
        if let Some(graph) = graph {
            graph.apply_correction(&n);
        }
    }

    corrected
}
