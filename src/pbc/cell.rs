/*
The simulation cell.

Row i of the matrix is lattice vector i (a, b, c); entry (i, d) is
component d of that vector. Only the lower triangle may be non-zero: a lies
along x, b lies in the xy-plane.
*/

use crate::constants::{Real, DIAGONAL_TOLERANCE, DIM};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

pub type RVec = Vector3<Real>;
pub type DVec = Vector3<f64>;
pub type IVec = Vector3<i32>;
pub type IMatrix = Matrix3<i32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; DIM] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Axis> {
        Axis::ALL.get(index).copied()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellMatrix {
    matrix: Matrix3<Real>,
}

impl CellMatrix {
    pub fn new(matrix: Matrix3<Real>) -> Self {
        Self { matrix }
    }

    /// Build a cell from its three lattice vectors.
    pub fn from_vectors(a: RVec, b: RVec, c: RVec) -> Self {
        Self {
            matrix: Matrix3::from_rows(&[a.transpose(), b.transpose(), c.transpose()]),
        }
    }

    /// Build a cell from nine numbers, row by row (a, then b, then c).
    pub fn from_row_slice(values: &[Real; 9]) -> Self {
        Self {
            matrix: Matrix3::from_row_slice(values),
        }
    }

    pub fn rectangular(lx: Real, ly: Real, lz: Real) -> Self {
        Self {
            matrix: Matrix3::from_diagonal(&RVec::new(lx, ly, lz)),
        }
    }

    pub fn zeros() -> Self {
        Self {
            matrix: Matrix3::zeros(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<Real> {
        &self.matrix
    }

    /// Lattice vector `i` (0 = a, 1 = b, 2 = c).
    pub fn vector(&self, i: usize) -> RVec {
        self.matrix.row(i).transpose()
    }

    pub fn diagonal(&self) -> RVec {
        self.matrix.diagonal()
    }

    pub fn has_length(&self, axis: usize) -> bool {
        self.matrix[(axis, axis)] > DIAGONAL_TOLERANCE
    }

    pub fn volume(&self) -> Real {
        self.matrix.determinant().abs()
    }

    /// True when any of b_x, c_x, c_y is non-zero.
    pub fn is_triclinic(&self) -> bool {
        self.matrix[(1, 0)] != 0.0 || self.matrix[(2, 0)] != 0.0 || self.matrix[(2, 1)] != 0.0
    }

    /// Add `n` times lattice vector `d` to lattice vector `v`.
    pub fn add_vector(&mut self, v: usize, d: usize, n: Real) {
        let shift = self.vector(d) * n;
        for k in 0..DIM {
            self.matrix[(v, k)] += shift[k];
        }
    }

    /// Integer combination `n[0] a + n[1] b + n[2] c`.
    pub fn lattice_translation(&self, n: &IVec) -> RVec {
        self.vector(0) * n[0] as Real + self.vector(1) * n[1] as Real + self.vector(2) * n[2] as Real
    }
}

impl Index<(usize, usize)> for CellMatrix {
    type Output = Real;

    fn index(&self, index: (usize, usize)) -> &Real {
        &self.matrix[index]
    }
}

impl From<Matrix3<Real>> for CellMatrix {
    fn from(matrix: Matrix3<Real>) -> Self {
        Self::new(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vectors_are_rows() {
        let cell = CellMatrix::from_vectors(
            RVec::new(4.0, 0.0, 0.0),
            RVec::new(1.0, 5.0, 0.0),
            RVec::new(-1.0, 2.0, 6.0),
        );
        assert_eq!(cell.vector(1), RVec::new(1.0, 5.0, 0.0));
        assert_eq!(cell[(2, 1)], 2.0);
        assert!(cell.is_triclinic());
        assert_relative_eq!(cell.volume(), 120.0, epsilon = 1e-4);
    }

    #[test]
    fn add_vector_keeps_volume() {
        let mut cell = CellMatrix::from_vectors(
            RVec::new(4.0, 0.0, 0.0),
            RVec::new(3.0, 5.0, 0.0),
            RVec::new(0.0, 0.0, 6.0),
        );
        cell.add_vector(1, 0, -1.0);
        assert_eq!(cell.vector(1), RVec::new(-1.0, 5.0, 0.0));
        assert_relative_eq!(cell.volume(), 120.0, epsilon = 1e-4);
    }

    #[test]
    fn axis_round_trips_through_index() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(3), None);
        assert_eq!(Axis::Z.to_string(), "z");
    }
}
