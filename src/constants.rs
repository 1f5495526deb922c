/*
Numeric constants shared by the periodic boundary code.

The working precision follows the simulation build: mixed precision keeps
coordinates in f32, the `double` feature switches everything to f64.
*/

#[cfg(not(feature = "double"))]
pub type Real = f32;
#[cfg(feature = "double")]
pub type Real = f64;

pub const DIM: usize = 3;
pub const XX: usize = 0;
pub const YY: usize = 1;
pub const ZZ: usize = 2;

// Margin on the unit-cell restriction when checking a box
pub const BOX_MARGIN: Real = 1.0010;
// Correction only kicks in above this, so a corrected box always passes the check
pub const BOX_MARGIN_CORRECT: Real = 1.0005;

// Diagonal elements at or below this are treated as a missing (non-periodic) axis
pub const DIAGONAL_TOLERANCE: Real = 1e-6;

/// Maximum number of combinations of single triclinic box vectors required
/// to shift atoms that are within a brick of the size of the diagonal of the
/// box to within the maximum cut-off distance.
pub const MAX_NTRICVEC: usize = 12;

// 3 x 3 x 3 combinations of single box-vector shifts
pub const SHIFTS: usize = 27;
pub const CENTRAL_SHIFT: usize = SHIFTS / 2;

pub const NTRICIMG: usize = 14; // images around a triclinic unit cell
pub const NCUCVERT: usize = 24; // vertices of the compact unit cell
pub const NCUCEDGE: usize = 36; // edges of the compact unit cell
