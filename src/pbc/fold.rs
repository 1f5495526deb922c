/*
Putting atoms back in the box.

put_atoms_in_box folds every periodic coordinate into [0, box[m][m]), the
rectangular brick spanned by the diagonal. For triclinic boxes the
corrections are done for z, then y, then x, with whole box vectors, the
same order pbc_dx uses, so a folded coordinate and pbc_dx agree on which
image is which.

The shift counts are computed directly instead of looping one box vector
at a time, so an atom that has flown many boxes away costs the same as one
that just crossed the boundary.
*/

use crate::constants::{Real, DIM, XX, YY, ZZ};
use crate::error::{PbcError, Result};
use crate::pbc::cell::{CellMatrix, RVec};
use crate::pbc::classify::PeriodicityMode;
use crate::pbc::geometry::{BoxGeometry, DistanceKind};
use crate::pbc::unitcell::{calc_box_center, CenterMode};
use rayon::prelude::*;

// Subtract n times box vector m, which only has components 0..=m
#[inline]
fn subtract_vector(x: &mut RVec, cell: &CellMatrix, m: usize, n: Real) {
    for d in 0..=m {
        x[d] -= n * cell[(m, d)];
    }
}

/// Shift `x` by whole box vectors m until `x[m] - offset` lies in [0, box[m][m]).
#[inline]
fn shift_into_range(x: &mut RVec, cell: &CellMatrix, m: usize, offset: Real) {
    let length = cell[(m, m)];
    let n = ((x[m] - offset) / length).floor();
    if n != 0.0 {
        subtract_vector(x, cell, m, n);
    }
    // Rounding can put the result exactly on either face
    if x[m] - offset < 0.0 {
        subtract_vector(x, cell, m, -1.0);
    }
    if x[m] - offset >= length {
        subtract_vector(x, cell, m, 1.0);
    }
}

struct BoxFolder<'a> {
    cell: &'a CellMatrix,
    periodic: [bool; DIM],
    screw: bool,
}

impl<'a> BoxFolder<'a> {
    fn new(mode: PeriodicityMode, cell: &'a CellMatrix) -> Self {
        let mask = mode.periodic_mask();
        Self {
            cell,
            periodic: [XX, YY, ZZ].map(|d| mask[d] && cell.has_length(d)),
            screw: mode.is_screw(),
        }
    }

    fn fold(&self, x: &mut RVec) {
        if self.screw && self.periodic[XX] {
            let length = self.cell[(XX, XX)];
            let before = x[XX];
            shift_into_range(x, self.cell, XX, 0.0);
            let n = ((before - x[XX]) / length).round();
            // An odd number of screw shifts rotates around the x-axis
            if (n * 0.5).fract() != 0.0 {
                x[YY] = self.cell[(YY, YY)] - x[YY];
                x[ZZ] = self.cell[(ZZ, ZZ)] - x[ZZ];
            }
            for m in [ZZ, YY] {
                if self.periodic[m] {
                    shift_into_range(x, self.cell, m, 0.0);
                }
            }
            return;
        }

        for m in (0..DIM).rev() {
            if self.periodic[m] {
                shift_into_range(x, self.cell, m, 0.0);
            }
        }
    }

    fn fold_all(&self, x: &mut [RVec]) {
        for atom in x.iter_mut() {
            self.fold(atom);
        }
    }
}

/// Put all atoms in the rectangular brick of the box, along the periodic
/// dimensions of `mode`.
pub fn put_atoms_in_box(mode: PeriodicityMode, cell: &CellMatrix, x: &mut [RVec]) {
    BoxFolder::new(mode, cell).fold_all(x);
}

/// As [`put_atoms_in_box`], with the atoms split over `n_workers`
/// contiguous chunks that are folded in parallel. The result is identical
/// to the serial version.
pub fn put_atoms_in_box_parallel(
    mode: PeriodicityMode,
    cell: &CellMatrix,
    x: &mut [RVec],
    n_workers: usize,
) {
    if n_workers <= 1 || x.len() < 2 {
        put_atoms_in_box(mode, cell, x);
        return;
    }
    let folder = BoxFolder::new(mode, cell);
    let chunk = x.len().div_ceil(n_workers);
    x.par_chunks_mut(chunk).for_each(|atoms| folder.fold_all(atoms));
}

/// Put atoms in the triclinic unit cell centered around the box center
/// given by `center`.
pub fn put_atoms_in_triclinic_unitcell(center: CenterMode, cell: &CellMatrix, x: &mut [RVec]) {
    // shm applied to a position gives the offset of the cell face along
    // each dimension at that position
    let shm01 = if cell.has_length(YY) {
        cell[(YY, XX)] / cell[(YY, YY)]
    } else {
        0.0
    };
    let shm12 = if cell.has_length(ZZ) {
        cell[(ZZ, YY)] / cell[(ZZ, ZZ)]
    } else {
        0.0
    };
    let shm02 = if cell.has_length(YY) && cell.has_length(ZZ) {
        (cell[(YY, YY)] * cell[(ZZ, XX)] - cell[(ZZ, YY)] * cell[(YY, XX)])
            / (cell[(YY, YY)] * cell[(ZZ, ZZ)])
    } else {
        0.0
    };

    // Corner of the cell with its center at the requested box center
    let corner =
        calc_box_center(center, cell) - calc_box_center(CenterMode::Triclinic, cell);

    for atom in x.iter_mut() {
        let mut r = *atom - corner;
        for m in (0..DIM).rev() {
            if !cell.has_length(m) {
                continue;
            }
            let offset = match m {
                XX => shm01 * r[YY] + shm02 * r[ZZ],
                YY => shm12 * r[ZZ],
                _ => 0.0,
            };
            shift_into_range(&mut r, cell, m, offset);
        }
        *atom = r + corner;
    }
}

/// Put every atom at the image closest to the box center, giving the most
/// compact representation of the system.
pub fn put_atoms_in_compact_unitcell(
    mode: PeriodicityMode,
    center: CenterMode,
    cell: &CellMatrix,
    x: &mut [RVec],
) -> Result<()> {
    let geometry = BoxGeometry::new(Some(mode), cell);
    if geometry.kind() == DistanceKind::Unsupported {
        return Err(PbcError::UnsupportedBox(mode.to_string()));
    }

    let box_center = calc_box_center(center, cell);
    for atom in x.iter_mut() {
        *atom = box_center + geometry.pbc_dx(atom, &box_center);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbc::cell::Axis;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_atoms(rng: &mut StdRng, n: usize, extent: Real) -> Vec<RVec> {
        (0..n)
            .map(|_| {
                RVec::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                )
            })
            .collect()
    }

    fn skewed_cell() -> CellMatrix {
        CellMatrix::from_vectors(
            RVec::new(4.0, 0.0, 0.0),
            RVec::new(1.5, 5.0, 0.0),
            RVec::new(-1.0, 2.0, 6.0),
        )
    }

    fn fractional(cell: &CellMatrix, x: &RVec) -> RVec {
        let inverse = cell
            .matrix()
            .transpose()
            .try_inverse()
            .expect("cell is invertible");
        inverse * x
    }

    #[test]
    fn folded_atoms_are_in_the_brick() {
        let mut rng = StdRng::seed_from_u64(21);
        for cell in [CellMatrix::rectangular(3.0, 4.0, 5.0), skewed_cell()] {
            let mut x = random_atoms(&mut rng, 500, 50.0);
            put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut x);
            for atom in &x {
                for m in 0..DIM {
                    assert!(atom[m] >= 0.0 && atom[m] < cell[(m, m)], "{atom:?}");
                }
            }
        }
    }

    #[test]
    fn folding_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(22);
        let cell = skewed_cell();
        let mut x = random_atoms(&mut rng, 500, 30.0);
        put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut x);
        let once = x.clone();
        put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut x);
        for (a, b) in once.iter().zip(&x) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn folding_moves_by_lattice_vectors() {
        let mut rng = StdRng::seed_from_u64(23);
        let cell = skewed_cell();
        let geometry = BoxGeometry::new(None, &cell);
        let original = random_atoms(&mut rng, 300, 20.0);
        let mut x = original.clone();
        put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut x);
        for (folded, start) in x.iter().zip(&original) {
            let n = fractional(&cell, &(folded - start));
            for m in 0..DIM {
                assert!((n[m] - n[m].round()).abs() < 1e-3);
            }
            assert!(geometry.pbc_dx(folded, start).norm() < 1e-3);
        }
    }

    #[test]
    fn slab_leaves_z_alone() {
        let cell = CellMatrix::rectangular(10.0, 10.0, 0.0);
        let slab = PeriodicityMode::Periodic2D(Axis::X, Axis::Y);
        let mut x = vec![RVec::new(-1.0, 12.0, -7.0)];
        put_atoms_in_box(slab, &cell, &mut x);
        assert_relative_eq!(x[0], RVec::new(9.0, 2.0, -7.0), epsilon = 1e-5);
    }

    #[test]
    fn screw_reflects_on_odd_shifts() {
        let cell = CellMatrix::rectangular(10.0, 10.0, 10.0);
        let mut x = vec![RVec::new(12.0, 2.0, 3.0), RVec::new(-15.0, 2.0, 3.0)];
        put_atoms_in_box(PeriodicityMode::Screw3D, &cell, &mut x);
        assert_relative_eq!(x[0], RVec::new(2.0, 8.0, 7.0), epsilon = 1e-5);
        assert_relative_eq!(x[1], RVec::new(5.0, 2.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn value_just_below_zero_stays_in_range() {
        let cell = CellMatrix::rectangular(3.0, 3.0, 3.0);
        let tiny: Real = -1e-9;
        let mut x = vec![RVec::new(tiny, 0.0, 0.0)];
        put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut x);
        assert!(x[0][XX] >= 0.0 && x[0][XX] < 3.0);
    }

    #[test]
    fn parallel_matches_serial() {
        let mut rng = StdRng::seed_from_u64(24);
        let cell = skewed_cell();
        let original = random_atoms(&mut rng, 1001, 25.0);
        let mut serial = original.clone();
        put_atoms_in_box(PeriodicityMode::Periodic3D, &cell, &mut serial);
        for workers in [1, 2, 3, 8] {
            let mut parallel = original.clone();
            put_atoms_in_box_parallel(PeriodicityMode::Periodic3D, &cell, &mut parallel, workers);
            assert_eq!(parallel, serial);
        }
    }

    #[test]
    fn triclinic_unitcell_contains_atoms() {
        let mut rng = StdRng::seed_from_u64(25);
        let cell = skewed_cell();
        for center in [CenterMode::Triclinic, CenterMode::Rectangular, CenterMode::Zero] {
            let box_center = calc_box_center(center, &cell);
            let mut x = random_atoms(&mut rng, 300, 20.0);
            put_atoms_in_triclinic_unitcell(center, &cell, &mut x);
            for atom in &x {
                let f = fractional(&cell, &(atom - box_center));
                for m in 0..DIM {
                    assert!(f[m] >= -0.5 - 1e-4 && f[m] < 0.5 + 1e-4, "{center:?} {f:?}");
                }
            }
        }
    }

    #[test]
    fn compact_unitcell_is_closest_to_center() {
        let mut rng = StdRng::seed_from_u64(26);
        let cell = skewed_cell();
        let box_center = calc_box_center(CenterMode::Triclinic, &cell);
        let original = random_atoms(&mut rng, 200, 15.0);
        let mut x = original.clone();
        put_atoms_in_compact_unitcell(PeriodicityMode::Periodic3D, CenterMode::Triclinic, &cell, &mut x)
            .expect("box is supported");
        let geometry = BoxGeometry::new(None, &cell);
        for (compact, start) in x.iter().zip(&original) {
            assert!(geometry.pbc_dx(compact, start).norm() < 1e-3);
            let d2 = (compact - box_center).norm_squared();
            for shift in crate::pbc::shifts::calc_shifts(&cell).vectors() {
                assert!(d2 <= (compact + shift - box_center).norm_squared() + 1e-3);
            }
        }
    }

    #[test]
    fn compact_unitcell_rejects_unsupported_box() {
        let cell = CellMatrix::from_vectors(
            RVec::new(4.0, 0.0, 0.0),
            RVec::new(3.0, 4.0, 0.0),
            RVec::new(0.0, 0.0, 4.0),
        );
        let mut x = vec![RVec::new(1.0, 1.0, 1.0)];
        let result =
            put_atoms_in_compact_unitcell(PeriodicityMode::Periodic3D, CenterMode::Zero, &cell, &mut x);
        assert!(matches!(result, Err(PbcError::UnsupportedBox(_))));
    }
}
