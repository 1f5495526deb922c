/*
Shift vectors used by the neighbour search and the virial.

All combinations of single box-vector shifts {-1, 0, 1} along a, b and c,
27 in total. The offset (i, j, k), meaning i a + j b + k c, lives at index
(i + 1) * 9 + (j + 1) * 3 + (k + 1), so the zero shift sits in the middle
of the table at index 13.
*/

use crate::constants::{Real, CENTRAL_SHIFT, SHIFTS};
use crate::pbc::cell::{CellMatrix, IVec, RVec};
use itertools::iproduct;
use serde::Serialize;
use std::ops::Index;

/// Position in the shift table. The zero shift is index 13
/// ([`ShiftIndex::CENTRAL`]), not 0; index 0 is (-1, -1, -1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShiftIndex(u8);

impl ShiftIndex {
    pub const CENTRAL: ShiftIndex = ShiftIndex(CENTRAL_SHIFT as u8);

    /// Index of the shift `i a + j b + k c`. Each offset must be -1, 0 or 1.
    pub fn from_offsets(i: i32, j: i32, k: i32) -> ShiftIndex {
        debug_assert!(
            [i, j, k].iter().all(|n| n.abs() <= 1),
            "shift ({i}, {j}, {k}) is not in the table"
        );
        let code = (i + 1) * 9 + (j + 1) * 3 + (k + 1);
        ShiftIndex(code as u8)
    }

    pub fn from_ivec(offsets: &IVec) -> ShiftIndex {
        ShiftIndex::from_offsets(offsets[0], offsets[1], offsets[2])
    }

    pub fn from_index(index: usize) -> Option<ShiftIndex> {
        if index < SHIFTS {
            Some(ShiftIndex(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Lattice offsets (coefficients of a, b, c) of this shift.
    pub fn offsets(self) -> IVec {
        let code = self.0 as i32;
        IVec::new(code / 9 - 1, (code / 3) % 3 - 1, code % 3 - 1)
    }

    pub fn is_central(self) -> bool {
        self == ShiftIndex::CENTRAL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftVectorTable {
    vectors: [RVec; SHIFTS],
}

impl ShiftVectorTable {
    /// Compute the shift vectors of `cell`.
    pub fn new(cell: &CellMatrix) -> Self {
        let mut vectors = [RVec::zeros(); SHIFTS];
        let (a, b, c) = (cell.vector(0), cell.vector(1), cell.vector(2));
        for (n, (i, j, k)) in iproduct!(-1..=1, -1..=1, -1..=1).enumerate() {
            vectors[n] = a * i as Real + b * j as Real + c * k as Real;
        }
        Self { vectors }
    }

    pub fn get(&self, shift: ShiftIndex) -> &RVec {
        &self.vectors[shift.index()]
    }

    pub fn vectors(&self) -> &[RVec; SHIFTS] {
        &self.vectors
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShiftIndex, &RVec)> {
        self.vectors
            .iter()
            .enumerate()
            .map(|(n, vector)| (ShiftIndex(n as u8), vector))
    }
}

impl Index<ShiftIndex> for ShiftVectorTable {
    type Output = RVec;

    fn index(&self, shift: ShiftIndex) -> &RVec {
        self.get(shift)
    }
}

/// Shift vectors for the neighbour search, see [`ShiftVectorTable::new`].
pub fn calc_shifts(cell: &CellMatrix) -> ShiftVectorTable {
    ShiftVectorTable::new(cell)
}
