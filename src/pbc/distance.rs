/*
Minimum image distance vectors.

This is the innermost loop of every pair interaction, so nothing here
allocates, checks preconditions or loops more than a fixed number of times.
`BoxGeometry::new` (or `with_domain_decomposition` for `pbc_dx_aiuc`) must
have been called for the current box; with a stale geometry the results are
simply wrong, not an error.

Note that for triclinic boxes that do not obey the unit-cell restrictions
no correction is applied at all and the plain difference comes back.
*/

use crate::constants::{Real, DIM, XX, YY, ZZ};
use crate::pbc::cell::{DVec, IVec, RVec};
use crate::pbc::geometry::{BoxGeometry, DistanceKind};
use crate::pbc::shifts::ShiftIndex;
use nalgebra::{RealField, Vector3};

/// Number of box lengths to subtract from `d` to bring it into (-half, half].
#[inline]
fn wrap_count<T: RealField + Copy>(d: T, half: T, full: T) -> T {
    if d > half || d <= -half {
        ((d - half) / full).ceil()
    } else {
        T::zero()
    }
}

#[inline]
fn is_odd<T: RealField + Copy>(n: T) -> bool {
    (n * nalgebra::convert::<f64, T>(0.5)).fract() != T::zero()
}

impl BoxGeometry {
    /// Distance vector from `x2` to `x1`, `x1 - x2` taken at the closest periodic image.
    pub fn pbc_dx(&self, x1: &RVec, x2: &RVec) -> RVec {
        self.minimum_image(x1, x2)
    }

    /// As [`BoxGeometry::pbc_dx`] for double precision coordinates.
    pub fn pbc_dx_d(&self, x1: &DVec, x2: &DVec) -> DVec {
        self.minimum_image(x1, x2)
    }

    fn periodic_norm2<T: RealField + Copy>(&self, v: &Vector3<T>) -> T {
        let mut d2 = T::zero();
        for d in 0..DIM {
            if self.periodic[d] {
                d2 += v[d] * v[d];
            }
        }
        d2
    }

    fn minimum_image<T>(&self, x1: &Vector3<T>, x2: &Vector3<T>) -> Vector3<T>
    where
        T: RealField + Copy + From<Real>,
    {
        let mut dx = x1 - x2;
        let cell = &self.cell;
        let box_at = |i: usize, j: usize| -> T { T::from(cell[(i, j)]) };

        match self.kind {
            DistanceKind::Rectangular => {
                for i in 0..DIM {
                    if !self.periodic[i] {
                        continue;
                    }
                    let n = wrap_count(dx[i], T::from(self.hbox_diag[i]), T::from(self.fbox_diag[i]));
                    dx[i] -= n * T::from(self.fbox_diag[i]);
                }
            }
            DistanceKind::Triclinic => {
                // Wrap z first: the shift along c also moves y and x
                for i in (0..DIM).rev() {
                    if !self.periodic[i] {
                        continue;
                    }
                    let n = wrap_count(dx[i], T::from(self.hbox_diag[i]), T::from(self.fbox_diag[i]));
                    if n != T::zero() {
                        for j in 0..=i {
                            dx[j] -= n * box_at(i, j);
                        }
                    }
                }

                // dx is now the distance in a rectangular brick; when it is
                // within max_cutoff it must be the shortest possible distance
                let mut d2min = self.periodic_norm2(&dx);
                if d2min > T::from(self.max_cutoff2) {
                    let start = dx;
                    for tric in &self.tric_vec[..self.ntric_vec] {
                        let tric = tric.map(T::from);
                        for trial in [start + tric, start - tric] {
                            let d2trial = self.periodic_norm2(&trial);
                            // strict: the lowest index wins on ties, + before -
                            if d2trial < d2min {
                                dx = trial;
                                d2min = d2trial;
                            }
                        }
                    }
                }
            }
            DistanceKind::ScrewRectangular => {
                // The shift definition requires x first
                let n = wrap_count(dx[XX], T::from(self.hbox_diag[XX]), T::from(self.fbox_diag[XX]));
                dx[XX] -= n * T::from(self.fbox_diag[XX]);
                if is_odd(n) {
                    // Rotate around the x-axis in the middle of the box
                    dx[YY] = T::from(self.fbox_diag[YY]) - x1[YY] - x2[YY];
                    dx[ZZ] = T::from(self.fbox_diag[ZZ]) - x1[ZZ] - x2[ZZ];
                }
                for i in YY..=ZZ {
                    if !self.periodic[i] {
                        continue;
                    }
                    let n = wrap_count(dx[i], T::from(self.hbox_diag[i]), T::from(self.fbox_diag[i]));
                    dx[i] -= n * T::from(self.fbox_diag[i]);
                }
            }
            DistanceKind::NoPbc | DistanceKind::Unsupported => {}
        }
        dx
    }

    /// Distance vector for atoms that are all in the (rectangular or
    /// triclinic) unit cell, applying at most a single box vector shift
    /// per dimension.
    ///
    /// Also returns the shift index such that
    /// `x1 - x2 + shift_vec[index] == dx`, see [`ShiftVectorTable`].
    /// Only valid on a geometry from [`BoxGeometry::with_domain_decomposition`]
    /// and with folded coordinates; otherwise the result is unspecified.
    /// Triclinic corrections that would take the shift out of the table are
    /// not tried.
    ///
    /// [`ShiftVectorTable`]: crate::pbc::shifts::ShiftVectorTable
    pub fn pbc_dx_aiuc(&self, x1: &RVec, x2: &RVec) -> (RVec, ShiftIndex) {
        let mut dx = x1 - x2;
        let mut ishift = IVec::zeros();

        match self.kind {
            DistanceKind::Rectangular => {
                for i in 0..DIM {
                    if !self.periodic[i] {
                        continue;
                    }
                    if dx[i] > self.hbox_diag[i] {
                        dx[i] -= self.fbox_diag[i];
                        ishift[i] -= 1;
                    } else if dx[i] <= self.mhbox_diag[i] {
                        dx[i] += self.fbox_diag[i];
                        ishift[i] += 1;
                    }
                }
            }
            DistanceKind::Triclinic => {
                for i in (0..DIM).rev() {
                    if !self.periodic[i] {
                        continue;
                    }
                    if dx[i] > self.hbox_diag[i] {
                        for j in 0..=i {
                            dx[j] -= self.cell[(i, j)];
                        }
                        ishift[i] -= 1;
                    } else if dx[i] <= self.mhbox_diag[i] {
                        for j in 0..=i {
                            dx[j] += self.cell[(i, j)];
                        }
                        ishift[i] += 1;
                    }
                }

                let mut d2min = self.periodic_norm2(&dx);
                if d2min > self.max_cutoff2 {
                    let start = dx;
                    let ishift_start = ishift;
                    for n in 0..self.ntric_vec {
                        for sign in [1, -1] {
                            // The total shift has to stay in the table
                            let total = ishift_start + self.tric_shift[n] * sign;
                            if total.iter().any(|s| s.abs() > 1) {
                                continue;
                            }
                            let trial = start + self.tric_vec[n] * sign as Real;
                            let d2trial = self.periodic_norm2(&trial);
                            if d2trial < d2min {
                                dx = trial;
                                ishift = total;
                                d2min = d2trial;
                            }
                        }
                    }
                }
            }
            DistanceKind::ScrewRectangular => {
                if dx[XX] > self.hbox_diag[XX] {
                    dx[XX] -= self.fbox_diag[XX];
                    ishift[XX] -= 1;
                } else if dx[XX] <= self.mhbox_diag[XX] {
                    dx[XX] += self.fbox_diag[XX];
                    ishift[XX] += 1;
                }
                if ishift[XX] != 0 {
                    dx[YY] = self.fbox_diag[YY] - x1[YY] - x2[YY];
                    dx[ZZ] = self.fbox_diag[ZZ] - x1[ZZ] - x2[ZZ];
                }
                for i in YY..=ZZ {
                    if !self.periodic[i] {
                        continue;
                    }
                    if dx[i] > self.hbox_diag[i] {
                        dx[i] -= self.fbox_diag[i];
                        ishift[i] -= 1;
                    } else if dx[i] <= self.mhbox_diag[i] {
                        dx[i] += self.fbox_diag[i];
                        ishift[i] += 1;
                    }
                }
            }
            DistanceKind::NoPbc | DistanceKind::Unsupported => {}
        }

        (dx, ShiftIndex::from_ivec(&ishift))
    }
}
