/*

=========================================================
 Periodic Boundary Geometry for Molecular Dynamics (Rust)
 Based on:
 "Computer Simulation of Liquids", Allen & Tildesley, ch. 1.5
=========================================================

📦 Simulation Box
-----------------
- Three box vectors a, b, c stored as the rows of a lower-triangular matrix:
    a = (ax,  0,  0)
    b = (bx, by,  0)
    c = (cx, cy, cz)
- Unit-cell restriction, needed for single-shift distance corrections:
    |b_x| <= a_x / 2,  |c_x| <= a_x / 2,  |c_y| <= b_y / 2
- Any axis with a zero diagonal element is not periodic.

🌍 Periodic Boundary Conditions (PBC)
-------------------------------------
- none, 1D, 2D (slab), xyz, or screw (a shift along x rotates the image
  by 180 degrees around the x-axis).
- Minimum image: dx = x1 - x2 corrected by box vectors so |dx| is minimal.
- Triclinic boxes: correct along z, y, x in turn, then try up to 12 extra
  shift vectors when the distance is beyond the safe cut-off.

🔁 Shift Vectors
----------------
- 27 combinations of {-1, 0, 1} box vectors, index 13 is no shift.
- Used by the neighbour search grid and for the virial.

🧊 Folding
----------
- Put atoms in the rectangular brick, the triclinic unit cell or the
  compact unit cell closest to the box center.

=========================================================

📌 Next Implementation Steps
----------------------------
- [x] Triclinic minimum image with auxiliary shift vectors
- [x] Box correction under pressure coupling
- [ ] Cell subdivision (linked lists) on top of the grid image checks

*/
pub mod config;
pub mod constants;
pub mod error;
pub mod pbc;

pub use config::{GeometryConfig, PbcSelector};
pub use constants::Real;
pub use error::{PbcError, Result};
pub use pbc::{BoxGeometry, CellMatrix, PeriodicityMode, RVec};
