/*
Precomputed box geometry for the distance routines.

A `BoxGeometry` is rebuilt whenever the box changes (every step under
pressure coupling, once for a fixed box) and is read-only afterwards, so
any number of threads can compute distances from one shared value.

For triclinic boxes the closest image along each Cartesian dimension is
taken first. When the resulting distance^2 is larger than max_cutoff2, the
`ntric_vec` extra triclinic shift vectors are tried, each in both
directions. Because of the restrictions on the unit cell there are never
more than MAX_NTRICVEC.
*/

use crate::constants::{Real, DIM, MAX_NTRICVEC, XX, YY, ZZ};
use crate::pbc::cell::{CellMatrix, IVec, RVec};
use crate::pbc::classify::{check_box, guess_periodicity, max_cutoff2, PeriodicityMode};
use itertools::{iproduct, Itertools};
use log::{debug, warn};
use nalgebra::Matrix3;
use serde::Serialize;
use std::fmt;

/// Box-vector multiples tried for the triclinic corrections, in search order.
const SHIFT_ORDER: [i32; 7] = [0, -1, 1, -2, 2, -3, 3];

/// Near-ties in length do not make a Voronoi face.
const RELEVANT_TOLERANCE: Real = 1e-4;

/// Overlaps thinner than this fraction of the half-box diagonal are ignored.
const OVERLAP_TOLERANCE: Real = 1e-5;

const SINGULAR_LIMIT: Real = 1e-6;

/// How distance vectors are computed, depending on the pbc type, the
/// dimensions handled by domain decomposition and the box angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistanceKind {
    NoPbc,
    Rectangular,
    Triclinic,
    ScrewRectangular,
    /// The box violates the unit-cell restrictions; no correction is applied.
    Unsupported,
}

/// Layout of the domain decomposition: ranks along each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainDecomposition {
    pub cells: [usize; DIM],
    /// Communication only happens in one direction along each dimension.
    pub single_direction: bool,
}

impl DomainDecomposition {
    pub fn new(cells: [usize; DIM], single_direction: bool) -> Self {
        Self {
            cells,
            single_direction,
        }
    }

    /// True when the decomposition already brings periodic images in along `dim`.
    pub fn resolves(&self, dim: usize) -> bool {
        let threshold = if self.single_direction { 1 } else { 2 };
        self.cells[dim] > threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGeometry {
    pub(crate) mode: PeriodicityMode,
    pub(crate) kind: DistanceKind,
    pub(crate) periodic: [bool; DIM],
    pub(crate) cell: CellMatrix,
    pub(crate) fbox_diag: RVec,
    pub(crate) hbox_diag: RVec,
    pub(crate) mhbox_diag: RVec,
    pub(crate) max_cutoff2: Real,
    pub(crate) ntric_vec: usize,
    pub(crate) tric_shift: [IVec; MAX_NTRICVEC],
    pub(crate) tric_vec: [RVec; MAX_NTRICVEC],
    pub(crate) single_shift: bool,
}

impl BoxGeometry {
    /// Set up the pbc algorithms for `cell`. With `None` the periodicity is
    /// guessed from the box.
    ///
    /// Distances are not corrected along axes whose diagonal element is zero.
    pub fn new(mode: Option<PeriodicityMode>, cell: &CellMatrix) -> Self {
        let mode = mode.unwrap_or_else(|| guess_periodicity(cell));
        Self::build(mode, cell, [false; DIM])
    }

    /// As [`BoxGeometry::new`], but additionally guarantees that correct
    /// distances are obtained with single box-vector shifts, as required by
    /// `pbc_dx_aiuc`. Dimensions that the decomposition handles through
    /// communication do not use pbc.
    ///
    /// Returns `None` when no dimension needs pbc at all.
    pub fn with_domain_decomposition(
        mode: Option<PeriodicityMode>,
        dd: Option<&DomainDecomposition>,
        cell: &CellMatrix,
    ) -> Option<Self> {
        let mut mode = mode.unwrap_or_else(|| guess_periodicity(cell));
        let mut resolved = [false; DIM];

        if let Some(dd) = dd {
            resolved = [XX, YY, ZZ].map(|dim| dd.resolves(dim));
            if mode.is_screw() && resolved.iter().any(|&r| r) {
                // The rotation is applied during coordinate communication
                mode = PeriodicityMode::Periodic3D;
            }
        }

        let npbcdim = (0..DIM)
            .filter(|&d| mode.periodic_mask()[d] && !resolved[d])
            .count();
        if npbcdim == 0 {
            return None;
        }

        let mut geometry = Self::build(mode, cell, resolved);
        geometry.single_shift = true;
        Some(geometry)
    }

    fn build(mode: PeriodicityMode, cell: &CellMatrix, resolved: [bool; DIM]) -> Self {
        let fbox_diag = cell.diagonal();
        let hbox_diag = fbox_diag * 0.5;
        let mhbox_diag = -hbox_diag;

        let mode_mask = mode.periodic_mask();
        let periodic = [XX, YY, ZZ].map(|d| mode_mask[d] && !resolved[d] && cell.has_length(d));

        for d in 0..DIM {
            if mode_mask[d] && !cell.has_length(d) {
                warn!(
                    "box diagonal along dimension {} is {}, not using pbc in that direction",
                    d, fbox_diag[d]
                );
            }
        }

        let mut geometry = Self {
            mode,
            kind: DistanceKind::NoPbc,
            periodic,
            cell: *cell,
            fbox_diag,
            hbox_diag,
            mhbox_diag,
            max_cutoff2: 0.0,
            ntric_vec: 0,
            tric_shift: [IVec::zeros(); MAX_NTRICVEC],
            tric_vec: [RVec::zeros(); MAX_NTRICVEC],
            single_shift: false,
        };

        if !periodic.iter().any(|&p| p) {
            return geometry;
        }

        if let Err(problem) = check_box(Some(mode), cell) {
            warn!("{problem}; can not fix pbc, distances will not be corrected");
            geometry.kind = DistanceKind::Unsupported;
            return geometry;
        }

        let triclinic = (0..DIM).any(|i| periodic[i] && (0..i).any(|j| cell[(i, j)] != 0.0));
        geometry.kind = if mode.is_screw() {
            if cell[(ZZ, YY)] != 0.0 {
                warn!("screw pbc is not implemented for triclinic boxes, can not fix pbc");
                DistanceKind::Unsupported
            } else if periodic[XX] {
                DistanceKind::ScrewRectangular
            } else {
                DistanceKind::Rectangular
            }
        } else if triclinic {
            DistanceKind::Triclinic
        } else {
            DistanceKind::Rectangular
        };

        let effective = PeriodicityMode::from_mask(periodic);
        geometry.max_cutoff2 = max_cutoff2(effective, cell);

        if geometry.kind == DistanceKind::Triclinic && effective.npbcdim() >= 2 {
            debug!("max cutoff {:.3}", geometry.max_cutoff2.sqrt());
            geometry.set_triclinic_vectors();
        }

        geometry
    }

    /// Lattice translation of `shift` without its non-periodic components.
    fn periodic_translation(&self, shift: &IVec) -> RVec {
        let mut v = self.cell.lattice_translation(shift);
        for d in 0..DIM {
            if !self.periodic[d] {
                v[d] = 0.0;
            }
        }
        v
    }

    /// All shifts of the periodic box vectors in the search window, in
    /// search order: c outermost, up to two a's and three b's or c's.
    fn shift_window(&self) -> Vec<(IVec, RVec)> {
        iproduct!(SHIFT_ORDER, SHIFT_ORDER, SHIFT_ORDER.into_iter().take(5))
            .map(|(k, j, i)| IVec::new(i, j, k))
            .filter(|shift| (0..DIM).all(|d| self.periodic[d] || shift[d] == 0))
            .map(|shift| (shift, self.periodic_translation(&shift)))
            .collect()
    }

    /// Corners of the Voronoi cell around the origin, flat in the
    /// non-periodic dimensions. `relevant` are the face normals.
    fn voronoi_corners(&self, relevant: &[RVec], tolerance: Real) -> Vec<RVec> {
        let mut planes: Vec<(RVec, Real)> = relevant
            .iter()
            .map(|v| {
                let length = v.norm();
                (v / length, 0.5 * length)
            })
            .collect();
        for d in 0..DIM {
            if !self.periodic[d] {
                let mut normal = RVec::zeros();
                normal[d] = 1.0;
                planes.push((normal, 0.0));
                planes.push((-normal, 0.0));
            }
        }

        planes
            .iter()
            .tuple_combinations()
            .filter_map(|(p, q, r)| {
                let normals = Matrix3::from_rows(&[p.0.transpose(), q.0.transpose(), r.0.transpose()]);
                if normals.determinant().abs() < SINGULAR_LIMIT {
                    return None;
                }
                normals
                    .try_inverse()
                    .map(|inverse| inverse * RVec::new(p.1, q.1, r.1))
            })
            .filter(|corner| {
                planes
                    .iter()
                    .all(|(normal, offset)| normal.dot(corner) <= offset + tolerance)
            })
            .collect()
    }

    /// Find the combinations of box vectors that can make a distance
    /// shorter after the per-dimension correction.
    ///
    /// A wrapped distance lies in the brick around 0,0,0 and its closest
    /// image is dx + L when dx is in the Voronoi cell around -L. So L is
    /// needed exactly when that cell overlaps the brick. Both shapes are
    /// convex, so they overlap unless they are separated along one of
    /// their face normals or the cross product of two of their edges.
    ///
    /// The brick is symmetric: only one of L and -L is stored and the
    /// distance routines try both.
    fn set_triclinic_vectors(&mut self) {
        let window = self.shift_window();

        // v is a face normal of the Voronoi cell when v and -v are the
        // only shortest vectors in v + 2 * lattice
        let relevant: Vec<RVec> = window
            .iter()
            .filter(|&&(shift, v)| {
                if shift == IVec::zeros() {
                    return false;
                }
                let limit = v.norm_squared() * (1.0 + RELEVANT_TOLERANCE);
                window
                    .iter()
                    .all(|&(t, u)| t == IVec::zeros() || t == -shift || (v + u * 2.0).norm_squared() > limit)
            })
            .map(|&(_, v)| v)
            .collect();

        let half = RVec::from_fn(|d, _| if self.periodic[d] { self.hbox_diag[d] } else { 0.0 });
        let tolerance = OVERLAP_TOLERANCE * half.norm();
        let corners = self.voronoi_corners(&relevant, tolerance);
        if corners.is_empty() {
            warn!("could not construct the Voronoi cell of the box, no triclinic correction vectors");
        }

        let units = [XX, YY, ZZ].map(|d| {
            let mut unit = RVec::zeros();
            unit[d] = 1.0;
            unit
        });
        let mut axes: Vec<RVec> = units.iter().chain(&relevant).copied().collect();
        for (u, v) in relevant.iter().tuple_combinations() {
            let edge = u.cross(v);
            axes.extend(units.iter().map(|unit| unit.cross(&edge)));
        }

        // Along each axis the brick and a Voronoi cell overlap when their
        // centers are closer than their summed half-widths
        let reach: Vec<(RVec, Real)> = axes
            .into_iter()
            .filter_map(|axis| {
                let mut axis = axis;
                for d in 0..DIM {
                    if !self.periodic[d] {
                        axis[d] = 0.0;
                    }
                }
                let length = axis.norm();
                if length <= Real::EPSILON {
                    return None;
                }
                let axis = axis / length;
                let brick: Real = (0..DIM).map(|d| half[d] * axis[d].abs()).sum();
                let voronoi = corners.iter().map(|c| axis.dot(c)).fold(0.0, Real::max);
                Some((axis, brick + voronoi - tolerance))
            })
            .collect();

        let mut found: Vec<(Real, IVec, RVec)> = Vec::new();
        for &(shift, trial) in &window {
            // A shift is only useful when it is triclinic
            if shift[YY] == 0 && shift[ZZ] == 0 {
                continue;
            }
            if found.iter().any(|(_, kept, _)| *kept == -shift) {
                continue;
            }
            if reach.iter().all(|(axis, r)| axis.dot(&trial).abs() < *r) {
                found.push((trial.norm_squared(), shift, trial));
            }
        }

        // Shortest corrections first; the sort is stable so equal lengths keep search order
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        if found.len() > MAX_NTRICVEC {
            warn!(
                "found {} triclinic correction vectors, ignoring all but {}; \
                 there is probably something wrong with the box",
                found.len(),
                MAX_NTRICVEC
            );
        }
        self.ntric_vec = found.len().min(MAX_NTRICVEC);
        for (n, (_, shift, trial)) in found.into_iter().take(MAX_NTRICVEC).enumerate() {
            self.tric_shift[n] = shift;
            self.tric_vec[n] = trial;
        }
    }

    pub fn mode(&self) -> PeriodicityMode {
        self.mode
    }

    pub fn kind(&self) -> DistanceKind {
        self.kind
    }

    pub fn cell(&self) -> &CellMatrix {
        &self.cell
    }

    pub fn is_periodic(&self, dim: usize) -> bool {
        self.periodic[dim]
    }

    pub fn fbox_diag(&self) -> &RVec {
        &self.fbox_diag
    }

    pub fn hbox_diag(&self) -> &RVec {
        &self.hbox_diag
    }

    pub fn mhbox_diag(&self) -> &RVec {
        &self.mhbox_diag
    }

    pub fn max_cutoff2(&self) -> Real {
        self.max_cutoff2
    }

    pub fn triclinic_vectors(&self) -> &[RVec] {
        &self.tric_vec[..self.ntric_vec]
    }

    pub fn triclinic_shifts(&self) -> &[IVec] {
        &self.tric_shift[..self.ntric_vec]
    }

    /// Set only through [`BoxGeometry::with_domain_decomposition`].
    pub fn single_shift(&self) -> bool {
        self.single_shift
    }

    /// Human readable dump of the geometry, also sent to the debug log.
    pub fn dump(&self) -> String {
        let text = self.to_string();
        debug!("{text}");
        text
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for BoxGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode         = {}", self.mode)?;
        writeln!(f, "distance     = {:?}", self.kind)?;
        for d in 0..DIM {
            let v = self.cell.vector(d);
            writeln!(f, "box[{}]       = {{{:10.5}, {:10.5}, {:10.5}}}", d, v[XX], v[YY], v[ZZ])?;
        }
        let vectors = [
            ("fbox_diag", &self.fbox_diag),
            ("hbox_diag", &self.hbox_diag),
            ("mhbox_diag", &self.mhbox_diag),
        ];
        for (name, v) in vectors {
            writeln!(f, "{name:<12} = {{{:10.5}, {:10.5}, {:10.5}}}", v[XX], v[YY], v[ZZ])?;
        }
        writeln!(f, "periodic     = {:?}", self.periodic)?;
        writeln!(f, "max_cutoff2  = {:10.5}", self.max_cutoff2)?;
        writeln!(f, "single_shift = {}", self.single_shift)?;
        writeln!(f, "ntric_vec    = {}", self.ntric_vec)?;
        for n in 0..self.ntric_vec {
            let s = &self.tric_shift[n];
            let v = &self.tric_vec[n];
            writeln!(
                f,
                "tric_vec[{n:2}] = ({:2} {:2} {:2}) {{{:10.5}, {:10.5}, {:10.5}}}",
                s[XX], s[YY], s[ZZ], v[XX], v[YY], v[ZZ]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbc::cell::Axis;
    use approx::assert_relative_eq;

    fn dodecahedron(d: Real) -> CellMatrix {
        CellMatrix::from_vectors(
            RVec::new(d, 0.0, 0.0),
            RVec::new(0.0, d, 0.0),
            RVec::new(0.5 * d, 0.5 * d, (0.5 as Real).sqrt() * d),
        )
    }

    #[test]
    fn rectangular_box() {
        let geometry = BoxGeometry::new(None, &CellMatrix::rectangular(4.0, 6.0, 8.0));
        assert_eq!(geometry.kind(), DistanceKind::Rectangular);
        assert_eq!(geometry.mode(), PeriodicityMode::Periodic3D);
        assert_eq!(*geometry.hbox_diag(), RVec::new(2.0, 3.0, 4.0));
        assert_eq!(*geometry.mhbox_diag(), RVec::new(-2.0, -3.0, -4.0));
        assert_relative_eq!(geometry.max_cutoff2(), 4.0);
        assert!(geometry.triclinic_vectors().is_empty());
        assert!(!geometry.single_shift());
    }

    #[test]
    fn no_pbc_for_empty_box() {
        let geometry = BoxGeometry::new(None, &CellMatrix::zeros());
        assert_eq!(geometry.kind(), DistanceKind::NoPbc);
        assert_eq!(geometry.mode(), PeriodicityMode::NonPeriodic);
    }

    #[test]
    fn degenerate_axis_is_not_periodic() {
        let geometry = BoxGeometry::new(
            Some(PeriodicityMode::Periodic3D),
            &CellMatrix::rectangular(5.0, 5.0, 0.0),
        );
        assert!(geometry.is_periodic(XX));
        assert!(!geometry.is_periodic(ZZ));
        assert_eq!(geometry.kind(), DistanceKind::Rectangular);
    }

    #[test]
    fn too_skewed_box_is_unsupported() {
        let cell = CellMatrix::from_vectors(
            RVec::new(4.0, 0.0, 0.0),
            RVec::new(3.0, 4.0, 0.0),
            RVec::new(0.0, 0.0, 4.0),
        );
        assert_eq!(BoxGeometry::new(None, &cell).kind(), DistanceKind::Unsupported);
    }

    #[test]
    fn triclinic_vectors_are_sorted_and_bounded() {
        let geometry = BoxGeometry::new(None, &dodecahedron(3.0));
        assert_eq!(geometry.kind(), DistanceKind::Triclinic);
        let vectors = geometry.triclinic_vectors();
        assert!(!vectors.is_empty());
        assert!(vectors.len() <= MAX_NTRICVEC);
        for pair in vectors.windows(2) {
            assert!(pair[0].norm_squared() <= pair[1].norm_squared());
        }
        let cell = dodecahedron(3.0);
        for (shift, vector) in geometry.triclinic_shifts().iter().zip(vectors) {
            assert!(shift[YY] != 0 || shift[ZZ] != 0);
            assert!((cell.lattice_translation(shift) - vector).norm() < 1e-5);
        }
    }

    #[test]
    fn each_correction_is_stored_once() {
        // short c: the brick reaches the cell around -(a + b)
        let cell = CellMatrix::from_vectors(
            RVec::new(5.527, 0.0, 0.0),
            RVec::new(-1.105, 5.695, 0.0),
            RVec::new(1.105, -1.139, 2.146),
        );
        let geometry = BoxGeometry::new(None, &cell);
        let shifts = geometry.triclinic_shifts();
        for (n, s) in shifts.iter().enumerate() {
            for t in &shifts[n + 1..] {
                assert!(t != s && *t != -s, "{s:?} stored twice");
            }
        }
        assert!(shifts
            .iter()
            .any(|s| *s == IVec::new(1, 1, 0) || *s == IVec::new(-1, -1, 0)));
    }

    #[test]
    fn domain_decomposition_disables_resolved_dimensions() {
        let cell = CellMatrix::rectangular(4.0, 4.0, 4.0);
        let dd = DomainDecomposition::new([4, 1, 1], true);
        let geometry = BoxGeometry::with_domain_decomposition(None, Some(&dd), &cell)
            .expect("y and z still need pbc");
        assert!(!geometry.is_periodic(XX));
        assert!(geometry.is_periodic(YY));
        assert!(geometry.single_shift());

        // two ranks only count when communication is one-directional
        let two_way = DomainDecomposition::new([2, 1, 1], false);
        let geometry = BoxGeometry::with_domain_decomposition(None, Some(&two_way), &cell)
            .expect("pbc in all dimensions");
        assert!(geometry.is_periodic(XX));

        let everywhere = DomainDecomposition::new([3, 3, 3], true);
        assert!(BoxGeometry::with_domain_decomposition(None, Some(&everywhere), &cell).is_none());
    }

    #[test]
    fn screw_with_decomposition_becomes_xyz() {
        let cell = CellMatrix::rectangular(4.0, 4.0, 4.0);
        let dd = DomainDecomposition::new([2, 1, 1], true);
        let geometry =
            BoxGeometry::with_domain_decomposition(Some(PeriodicityMode::Screw3D), Some(&dd), &cell)
                .expect("y and z need pbc");
        assert_eq!(geometry.mode(), PeriodicityMode::Periodic3D);
        assert_eq!(geometry.kind(), DistanceKind::Rectangular);
    }

    #[test]
    fn dump_lists_the_geometry() {
        let slab = PeriodicityMode::Periodic2D(Axis::X, Axis::Y);
        let geometry = BoxGeometry::new(Some(slab), &CellMatrix::rectangular(4.0, 4.0, 0.0));
        let text = geometry.dump();
        assert!(text.contains("mode         = xy"));
        assert!(text.contains("ntric_vec    = 0"));
        let json = geometry.to_json().expect("geometry serializes");
        assert!(json.contains("\"max_cutoff2\""));
    }
}
