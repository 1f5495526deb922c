/*
Geometry of the unit cell for output and visualisation: where the center
is, the images surrounding a triclinic cell and the vertices and edges of
the compact (Wigner-Seitz like) unit cell.
*/

use crate::constants::{Real, DIM, NCUCEDGE, NCUCVERT, NTRICIMG};
use crate::pbc::cell::{CellMatrix, RVec};
use serde::{Deserialize, Serialize};

/// Where the center of the unit cell is put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterMode {
    /// Half the sum of the box vectors
    #[default]
    Triclinic,
    /// Half the diagonal of the box
    Rectangular,
    /// The origin
    Zero,
}

pub fn calc_box_center(center: CenterMode, cell: &CellMatrix) -> RVec {
    match center {
        CenterMode::Triclinic => (0..DIM).map(|d| cell.vector(d)).sum::<RVec>() * 0.5,
        CenterMode::Rectangular => cell.diagonal() * 0.5,
        CenterMode::Zero => RVec::zeros(),
    }
}

/// The 14 images of the unit cell that share a face with it: six in the
/// xy-plane, four above and four below.
pub fn calc_triclinic_images(cell: &CellMatrix) -> [RVec; NTRICIMG] {
    let mut img = [RVec::zeros(); NTRICIMG];

    // Three adjacent images in the xy-plane
    img[0] = cell.vector(0);
    img[1] = cell.vector(1);
    if img[1].x < 0.0 {
        img[1] = -img[1];
    }
    img[2] = img[1] - img[0];

    // The next three in the xy-plane are mirror images
    for i in 0..3 {
        img[3 + i] = -img[i];
    }

    // The first four images out of the xy-plane
    img[6] = cell.vector(2);
    if img[6].x < 0.0 {
        img[6] = -img[6];
    }
    for i in 0..3 {
        img[7 + i] = img[6] + img[i + 1];
    }

    // Mirror the previous four in opposite rotation
    for i in 0..4 {
        img[10 + i] = -img[6 + (2 + i) % 4];
    }

    img
}

/// Vertices of the compact unit cell around the box center, four per
/// square face.
pub fn calc_compact_unitcell_vertices(center: CenterMode, cell: &CellMatrix) -> [RVec; NCUCVERT] {
    let img = calc_triclinic_images(cell);
    let mut vert = [RVec::zeros(); NCUCVERT];
    let mut n = 0;

    let mut push_face = |i: usize, tmp: [usize; 4]| {
        for j in 0..4 {
            vert[n] = img[i] + img[tmp[j]] + img[tmp[(j + 1) % 4]];
            n += 1;
        }
    };

    for i in [2, 5] {
        let second = if i == 2 { 8 } else { 6 };
        push_face(i, [i - 1, second, (i + 1) % 6, second + 4]);
    }
    for i in [7, 13] {
        let first = (i - 7) / 2;
        push_face(i, [first, first + 1, if i == 7 { 8 } else { 10 }, i - 1]);
    }
    for i in [9, 11] {
        let first = if i == 9 { 3 } else { 0 };
        push_face(i, [first, first + 1, if i == 9 { 6 } else { 12 }, i - 1]);
    }

    let box_center = calc_box_center(center, cell);
    let one_fourth: Real = 0.25;
    vert.map(|v| v * one_fourth + box_center)
}

// Pairs of vertices on different square faces that are connected
const HEXCON: [usize; 24] = [
    0, 9, 1, 19, 2, 15, 3, 21, 4, 17, 5, 11, 6, 23, 7, 13, 8, 20, 10, 18, 12, 16, 14, 22,
];

/// Edges of the compact unit cell as pairs of indices into the vertices of
/// [`calc_compact_unitcell_vertices`].
pub fn compact_unitcell_edges() -> [[usize; 2]; NCUCEDGE] {
    let mut edges = [[0; 2]; NCUCEDGE];
    let mut e = 0;
    for i in 0..6 {
        for j in 0..4 {
            edges[e] = [4 * i + j, 4 * i + (j + 1) % 4];
            e += 1;
        }
    }
    for pair in HEXCON.chunks(2) {
        edges[e] = [pair[0], pair[1]];
        e += 1;
    }
    edges
}
