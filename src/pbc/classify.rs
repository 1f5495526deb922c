/*
Classification and validation of the simulation cell.

Nothing in here fails hard: a cell that does not look periodic along an
axis is simply treated as non-periodic along it, and shape problems come
back as a `PbcError` for the caller to judge.
*/

use crate::constants::{Real, BOX_MARGIN, DIM, XX, YY, ZZ};
use crate::error::PbcError;
use crate::pbc::cell::{Axis, CellMatrix, IVec};
use itertools::iproduct;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodicityMode {
    #[serde(rename = "none")]
    NonPeriodic,
    #[serde(rename = "1d")]
    Periodic1D(Axis),
    #[serde(rename = "2d")]
    Periodic2D(Axis, Axis),
    #[serde(rename = "xyz")]
    Periodic3D,
    #[serde(rename = "screw")]
    Screw3D,
}

impl PeriodicityMode {
    /// Number of dimensions with periodic boundaries.
    pub fn npbcdim(&self) -> usize {
        match self {
            PeriodicityMode::NonPeriodic => 0,
            PeriodicityMode::Periodic1D(_) => 1,
            PeriodicityMode::Periodic2D(first, second) => {
                if first == second {
                    1
                } else {
                    2
                }
            }
            PeriodicityMode::Periodic3D | PeriodicityMode::Screw3D => 3,
        }
    }

    pub fn is_periodic(&self, axis: Axis) -> bool {
        match self {
            PeriodicityMode::NonPeriodic => false,
            PeriodicityMode::Periodic1D(periodic) => *periodic == axis,
            PeriodicityMode::Periodic2D(first, second) => *first == axis || *second == axis,
            PeriodicityMode::Periodic3D | PeriodicityMode::Screw3D => true,
        }
    }

    pub fn periodic_mask(&self) -> [bool; DIM] {
        Axis::ALL.map(|axis| self.is_periodic(axis))
    }

    pub fn is_screw(&self) -> bool {
        matches!(self, PeriodicityMode::Screw3D)
    }

    /// Number of dimensions in which particle coordinates are bounded.
    /// Two walls close off the open z direction of an xy-periodic system.
    pub fn bounded_dims(&self, n_walls: usize) -> usize {
        match self {
            PeriodicityMode::Periodic2D(_, _) if n_walls >= 2 => DIM,
            _ => self.npbcdim(),
        }
    }

    /// Degrees of freedom removed by center of mass motion removal.
    pub fn com_degrees_of_freedom(&self, n_walls: usize) -> usize {
        match self {
            PeriodicityMode::NonPeriodic | PeriodicityMode::Periodic3D => 3,
            PeriodicityMode::Periodic1D(_) | PeriodicityMode::Periodic2D(_, _) => {
                if n_walls == 0 {
                    3
                } else {
                    2
                }
            }
            PeriodicityMode::Screw3D => 1,
        }
    }

    pub(crate) fn from_mask(mask: [bool; DIM]) -> PeriodicityMode {
        let periodic: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|axis| mask[axis.index()])
            .collect();
        match periodic.as_slice() {
            [] => PeriodicityMode::NonPeriodic,
            [axis] => PeriodicityMode::Periodic1D(*axis),
            [first, second] => PeriodicityMode::Periodic2D(*first, *second),
            _ => PeriodicityMode::Periodic3D,
        }
    }
}

impl fmt::Display for PeriodicityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodicityMode::NonPeriodic => write!(f, "no"),
            PeriodicityMode::Periodic1D(axis) => write!(f, "{axis}"),
            PeriodicityMode::Periodic2D(first, second) => write!(f, "{first}{second}"),
            PeriodicityMode::Periodic3D => write!(f, "xyz"),
            PeriodicityMode::Screw3D => write!(f, "screw"),
        }
    }
}

impl FromStr for PeriodicityMode {
    type Err = PbcError;

    /// Parse the names used on the command line: "xyz", "no", "xy", "screw", ...
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "no" | "none" => Ok(PeriodicityMode::NonPeriodic),
            "xyz" => Ok(PeriodicityMode::Periodic3D),
            "screw" => Ok(PeriodicityMode::Screw3D),
            "x" => Ok(PeriodicityMode::Periodic1D(Axis::X)),
            "y" => Ok(PeriodicityMode::Periodic1D(Axis::Y)),
            "z" => Ok(PeriodicityMode::Periodic1D(Axis::Z)),
            "xy" => Ok(PeriodicityMode::Periodic2D(Axis::X, Axis::Y)),
            "xz" => Ok(PeriodicityMode::Periodic2D(Axis::X, Axis::Z)),
            "yz" => Ok(PeriodicityMode::Periodic2D(Axis::Y, Axis::Z)),
            _ => Err(PbcError::UnknownPbc(name.to_string())),
        }
    }
}

/// Guess the periodicity from which diagonal elements of the cell are set.
pub fn guess_periodicity(cell: &CellMatrix) -> PeriodicityMode {
    let mask = Axis::ALL.map(|axis| cell.has_length(axis.index()));
    let mode = PeriodicityMode::from_mask(mask);

    // xy with an open z is the common slab geometry, anything else partial is unusual
    if !matches!(
        mode,
        PeriodicityMode::NonPeriodic
            | PeriodicityMode::Periodic3D
            | PeriodicityMode::Periodic2D(Axis::X, Axis::Y)
    ) {
        let diagonal = cell.diagonal();
        warn!(
            "unusual box diagonal {} {} {}, using {} pbc",
            diagonal[XX], diagonal[YY], diagonal[ZZ], mode
        );
    }
    mode
}

/// Check the box for consistency. `None` as mode guesses it from the box.
///
/// Returns `Ok(())` when the box is supported, otherwise the first problem found.
pub fn check_box(mode: Option<PeriodicityMode>, cell: &CellMatrix) -> Result<(), PbcError> {
    let mode = mode.unwrap_or_else(|| guess_periodicity(cell));
    if mode == PeriodicityMode::NonPeriodic {
        return Ok(());
    }

    if cell[(XX, YY)] != 0.0 || cell[(XX, ZZ)] != 0.0 || cell[(YY, ZZ)] != 0.0 {
        return Err(PbcError::NotLowerTriangular);
    }
    if mode.is_screw() && (cell[(YY, XX)] != 0.0 || cell[(ZZ, XX)] != 0.0) {
        return Err(PbcError::ScrewOffDiagonal);
    }

    // |box[row][col]| <= 0.5 box[col][col] for col below row, when both axes repeat
    for (row, col) in [(YY, XX), (ZZ, XX), (ZZ, YY)] {
        let both_periodic = mode.is_periodic(Axis::ALL[row]) && mode.is_periodic(Axis::ALL[col]);
        if !both_periodic {
            continue;
        }
        let limit = BOX_MARGIN * 0.5 * cell[(col, col)];
        let value = cell[(row, col)];
        if value.abs() > limit {
            return Err(PbcError::TooSkewed {
                row: Axis::ALL[row],
                col: Axis::ALL[col],
                value,
                limit,
            });
        }
    }
    Ok(())
}

/// Square of the maximum cut-off allowed for the box, taking into account
/// that the grid search and `pbc_dx` only check combinations of single
/// box-vector shifts.
///
/// A distance shorter than this is always the minimum image.
pub fn max_cutoff2(mode: PeriodicityMode, cell: &CellMatrix) -> Real {
    let mask = mode.periodic_mask();
    let one_fourth: Real = 0.25;

    // Physical limitation: half the length of the shortest box vector
    let min_hv2 = (0..DIM)
        .filter(|&d| mask[d])
        .map(|d| one_fourth * cell.vector(d).norm_squared())
        .fold(Real::INFINITY, Real::min);

    // Only single box-vector combinations are checked, which is correct
    // as long as the cut-off is below the smallest (skew-reduced) diagonal
    let min_ss = (0..DIM)
        .filter(|&d| mask[d])
        .map(|d| {
            if d == YY && mask[ZZ] {
                cell[(YY, YY)] - cell[(ZZ, YY)].abs()
            } else {
                cell[(d, d)]
            }
        })
        .fold(Real::INFINITY, Real::min);

    if min_hv2.is_infinite() {
        return 0.0;
    }

    // In a skewed cell a combination of box vectors can be shorter than
    // any single one; an image is only guaranteed to be the closest when
    // it is within half of the shortest translation
    let min_lattice2 = iproduct!(-3..=3, -3..=3, -3..=3)
        .map(|(i, j, k)| IVec::new(i, j, k))
        .filter(|shift| *shift != IVec::zeros() && (0..DIM).all(|d| mask[d] || shift[d] == 0))
        .map(|shift| {
            let v = cell.lattice_translation(&shift);
            one_fourth * (0..DIM).filter(|&d| mask[d]).map(|d| v[d] * v[d]).sum::<Real>()
        })
        .fold(Real::INFINITY, Real::min);

    min_hv2.min(min_ss * min_ss).min(min_lattice2)
}
