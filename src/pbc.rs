/*
Periodic boundary conditions.

How do we handle periodic boundaries and the minimum image convention for
any box a simulation can use: rectangular, triclinic, periodic along only
some dimensions, or with screw symmetry along x?

The box is classified and checked once (classify), repaired when pressure
coupling has skewed it too far (correct), turned into a precomputed
geometry (geometry) and then used read-only for distances (distance),
shift bookkeeping (shifts, image) and putting atoms back in the box
(fold, unitcell).
*/

pub mod cell;
pub mod classify;
pub mod correct;
pub mod distance;
pub mod fold;
pub mod geometry;
pub mod image;
pub mod shared;
pub mod shifts;
pub mod unitcell;

pub use cell::{Axis, CellMatrix, DVec, IMatrix, IVec, RVec};
pub use classify::{check_box, guess_periodicity, max_cutoff2, PeriodicityMode};
pub use correct::{correct_box, ShiftGraph};
pub use fold::{
    put_atoms_in_box, put_atoms_in_box_parallel, put_atoms_in_compact_unitcell,
    put_atoms_in_triclinic_unitcell,
};
pub use geometry::{BoxGeometry, DistanceKind, DomainDecomposition};
pub use image::{image_cylindric, image_rect, image_tri, ImageHit};
pub use shared::SharedGeometry;
pub use shifts::{calc_shifts, ShiftIndex, ShiftVectorTable};
pub use unitcell::{
    calc_box_center, calc_compact_unitcell_vertices, calc_triclinic_images,
    compact_unitcell_edges, CenterMode,
};
