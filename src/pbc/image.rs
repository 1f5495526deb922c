/*
Image checks on integer grid coordinates for the neighbour-search grid.

The grid builder works on cell indices, not on positions: two grid cells
`xi` and `xj` can only contain a pair within the cut-off if the closest
image of their difference is within it. Lengths and `rlong2` are in grid
units.
*/

use crate::constants::{Real, DIM, ZZ};
use crate::pbc::cell::{IMatrix, IVec};
use crate::pbc::shifts::ShiftIndex;
use itertools::iproduct;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageHit {
    /// r2 < rlong2
    pub within: bool,
    pub shift: ShiftIndex,
    pub r2: Real,
}

fn grid_norm2(dx: &IVec, dims: usize) -> Real {
    (0..dims).map(|m| (dx[m] as Real) * (dx[m] as Real)).sum()
}

// Per-dimension wrap with integer half box, counting r2 over the first `dims` dimensions
fn image_rectangular(xi: &IVec, xj: &IVec, box_size: &IVec, rlong2: Real, dims: usize) -> ImageHit {
    let mut dx = xi - xj;
    let mut offsets = IVec::zeros();
    for m in 0..DIM {
        let b = box_size[m];
        let b_2 = b / 2;
        if dx[m] < -b_2 {
            dx[m] += b;
            offsets[m] = 1;
        } else if dx[m] > b_2 {
            dx[m] -= b;
            offsets[m] = -1;
        }
    }
    let r2 = grid_norm2(&dx, dims);
    ImageHit {
        within: r2 < rlong2,
        shift: ShiftIndex::from_ivec(&offsets),
        r2,
    }
}

/// Closest image of two cells of a rectangular grid with `box_size` cells
/// along each dimension.
pub fn image_rect(xi: &IVec, xj: &IVec, box_size: &IVec, rlong2: Real) -> ImageHit {
    image_rectangular(xi, xj, box_size, rlong2, DIM)
}

/// As [`image_rect`], but only the x and y components count towards the
/// distance, for a cylindrical cut-off along z.
pub fn image_cylindric(xi: &IVec, xj: &IVec, box_size: &IVec, rlong2: Real) -> ImageHit {
    image_rectangular(xi, xj, box_size, rlong2, ZZ)
}

/// Closest image on a triclinic grid. Row m of `grid_box` is box vector m
/// in grid units.
///
/// After the per-dimension wrap the result can still be off by one
/// triclinic shift, so when it is not within the cut-off all neighbouring
/// single shifts are tried as well.
pub fn image_tri(xi: &IVec, xj: &IVec, grid_box: &IMatrix, rlong2: Real) -> ImageHit {
    let mut dx = xi - xj;
    let mut offsets = IVec::zeros();

    for m in (0..DIM).rev() {
        let b = grid_box[(m, m)];
        if b <= 0 {
            continue;
        }
        let b_2 = b / 2;
        if dx[m] < -b_2 {
            for d in 0..=m {
                dx[d] += grid_box[(m, d)];
            }
            offsets[m] += 1;
        } else if dx[m] > b_2 {
            for d in 0..=m {
                dx[d] -= grid_box[(m, d)];
            }
            offsets[m] -= 1;
        }
    }

    let r2 = grid_norm2(&dx, DIM);
    if r2 < rlong2 {
        return ImageHit {
            within: true,
            shift: ShiftIndex::from_ivec(&offsets),
            r2,
        };
    }

    // Offsets are visited in increasing shift index, so the lowest wins ties
    let mut best = (Real::INFINITY, offsets);
    for (i, j, k) in iproduct!(-1..=1, -1..=1, -1..=1) {
        let step = IVec::new(i, j, k);
        let total = offsets + step;
        if total.iter().any(|t| t.abs() > 1) {
            continue;
        }
        let trial = dx + grid_box.transpose() * step;
        let trial_r2 = grid_norm2(&trial, DIM);
        if trial_r2 < best.0 {
            best = (trial_r2, total);
        }
    }

    ImageHit {
        within: best.0 < rlong2,
        shift: ShiftIndex::from_ivec(&best.1),
        r2: best.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CENTRAL_SHIFT;

    #[test]
    fn rect_wraps_to_the_closest_cell() {
        let size = IVec::new(10, 10, 10);
        let hit = image_rect(&IVec::new(1, 1, 1), &IVec::new(9, 9, 9), &size, 16.0);
        // dx = -8 wraps to +2 with a shift of +1 along every dimension
        assert_eq!(hit.r2, 12.0);
        assert!(hit.within);
        assert_eq!(hit.shift, ShiftIndex::from_offsets(1, 1, 1));

        let hit = image_rect(&IVec::new(5, 0, 0), &IVec::new(0, 0, 0), &size, 16.0);
        assert_eq!(hit.shift.index(), CENTRAL_SHIFT);
        assert_eq!(hit.r2, 25.0);
        assert!(!hit.within);
    }

    #[test]
    fn cutoff_is_exclusive() {
        let size = IVec::new(10, 10, 10);
        let hit = image_rect(&IVec::new(2, 0, 0), &IVec::new(0, 0, 0), &size, 4.0);
        assert!(!hit.within);
    }

    #[test]
    fn cylindric_ignores_z() {
        let size = IVec::new(10, 10, 10);
        let hit = image_cylindric(&IVec::new(1, 1, 4), &IVec::new(9, 0, 0), &size, 9.0);
        assert_eq!(hit.r2, 5.0);
        assert!(hit.within);
        assert_eq!(hit.shift, ShiftIndex::from_offsets(1, 0, 0));
    }

    #[test]
    fn tri_matches_rect_for_a_diagonal_grid() {
        let size = IVec::new(8, 6, 10);
        let grid_box = IMatrix::from_diagonal(&size);
        for (a, b) in iproduct!(0..8, 0..6) {
            let xi = IVec::new(a, b, 3);
            let xj = IVec::new(7 - a, 0, 9);
            let rect = image_rect(&xi, &xj, &size, 1000.0);
            let tri = image_tri(&xi, &xj, &grid_box, 1000.0);
            assert_eq!(rect.r2, tri.r2);
        }
    }

    #[test]
    fn tri_keeps_the_lower_shift_on_a_tie() {
        let grid_box = IMatrix::new(10, 0, 0, 5, 10, 0, 0, 0, 10);
        let xi = IVec::new(5, 2, 0);
        let xj = IVec::new(0, 0, 0);
        // (5, 2, 0) and (5, 2, 0) - a are both 29 away
        let central = image_tri(&xi, &xj, &grid_box, 100.0);
        assert!(central.shift.is_central());
        let hit = image_tri(&xi, &xj, &grid_box, 16.0);
        assert_eq!(hit.r2, 29.0);
        assert_eq!(hit.r2, central.r2);
        assert_eq!(hit.shift, ShiftIndex::from_offsets(-1, 0, 0));
        assert!(hit.shift.index() < CENTRAL_SHIFT);
    }

    #[test]
    fn tri_tries_skewed_neighbours() {
        let grid_box = IMatrix::new(10, 0, 0, 5, 10, 0, 0, 0, 10);
        let xi = IVec::new(0, 6, 0);
        let xj = IVec::new(0, 0, 0);
        // the wrap along y gives (-5, -4, 0), the unshifted difference is shorter
        let hit = image_tri(&xi, &xj, &grid_box, 16.0);
        assert_eq!(hit.r2, 36.0);
        assert!(hit.shift.is_central());
        assert!(!hit.within);
        for (i, j, k) in iproduct!(-1..=1, -1..=1, -1..=1) {
            let other = xi - xj + grid_box.transpose() * IVec::new(i, j, k);
            assert!(hit.r2 <= grid_norm2(&other, DIM));
        }
    }
}
