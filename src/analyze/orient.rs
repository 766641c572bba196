//! Per-atom orientation solving for FCC neighborhoods.
//!
//! The solver turns the relative positions of an atom's 12 nearest
//! neighbors into a crystal orientation: antiparallel `<110>` neighbor
//! pairs are merged, perpendicular pairs yield the three `<100>` axes via
//! cross products, and the closest proper rotation is extracted from the
//! resulting (noisy) matrix through the eigendecomposition of Itzhack's
//! 4×4 key matrix. Atoms whose neighborhood does not support the
//! reconstruction (grain boundary atoms, surface atoms) simply stay
//! without orientation.

use nalgebra::{Matrix3, Matrix4, SymmetricEigen};

use crate::model::atom::OriId;
use crate::model::orientation::Orientation;
use crate::model::symmetry::canonicalize;

/// `1 - cos(5°)`: tolerance for treating two unit vectors as antiparallel.
const ANTIPARALLEL_COS_PRECISION: f64 = 3.805_301_908_254_467_7e-3;

/// Perpendicularity tolerance on the dot product of unit vectors, roughly
/// sin(11.5°).
const PERPENDICULAR_DOT_THRESHOLD: f64 = 0.2;

/// Append-only store of the orientations solved in one snapshot.
///
/// Entries are never deduplicated; atoms with numerically equal
/// orientations hold distinct ids.
#[derive(Debug, Default)]
pub struct OrientationTable {
    orientations: Vec<Orientation>,
}

impl OrientationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            orientations: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, q: [f64; 4]) -> OriId {
        self.orientations.push(Orientation::from_quaternion(q));
        (self.orientations.len() - 1) as OriId
    }

    pub fn len(&self) -> usize {
        self.orientations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orientations.is_empty()
    }

    #[inline]
    pub fn get(&self, id: OriId) -> &Orientation {
        &self.orientations[id as usize]
    }

    #[inline]
    pub fn quaternion(&self, id: OriId) -> &[f64; 4] {
        self.orientations[id as usize].quaternion()
    }
}

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Merges antiparallel vector pairs into their half-difference; unpaired
/// vectors pass through. A pair of opposite `<110>` neighbors reduces to
/// one clean direction even when both ends are displaced the same way.
fn reduce_antiparallel(vects: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let n = vects.len();
    let mut paired = vec![false; n];
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if !paired[i] && !paired[j] {
                if (dot(&vects[i], &vects[j]).abs() - 1.0).abs() < ANTIPARALLEL_COS_PRECISION {
                    paired[i] = true;
                    paired[j] = true;
                    out.push([
                        0.5 * (vects[i][0] - vects[j][0]),
                        0.5 * (vects[i][1] - vects[j][1]),
                        0.5 * (vects[i][2] - vects[j][2]),
                    ]);
                }
            }
        }
        if !paired[i] {
            out.push(vects[i]);
        }
    }
    out
}

/// Itzhack's method ("New Method for Extracting the Quaternion from a
/// Rotation Matrix", 2000): the quaternion of the proper rotation closest
/// to `m` is the eigenvector of the largest eigenvalue of the key matrix.
fn closest_quaternion(m: &Matrix3<f64>) -> Option<[f64; 4]> {
    let third = 1.0 / 3.0;
    let k = Matrix4::new(
        third * (m[(0, 0)] - m[(1, 1)] - m[(2, 2)]),
        third * (m[(1, 0)] + m[(0, 1)]),
        third * (m[(2, 0)] + m[(0, 2)]),
        third * (m[(1, 2)] - m[(2, 1)]),
        //
        third * (m[(1, 0)] + m[(0, 1)]),
        third * (m[(1, 1)] - m[(0, 0)] - m[(2, 2)]),
        third * (m[(2, 1)] + m[(1, 2)]),
        third * (m[(2, 0)] - m[(0, 2)]),
        //
        third * (m[(2, 0)] + m[(0, 2)]),
        third * (m[(2, 1)] + m[(1, 2)]),
        third * (m[(2, 2)] - m[(0, 0)] - m[(1, 1)]),
        third * (m[(0, 1)] - m[(1, 0)]),
        //
        third * (m[(1, 2)] - m[(2, 1)]),
        third * (m[(2, 0)] - m[(0, 2)]),
        third * (m[(0, 1)] - m[(1, 0)]),
        third * (m[(0, 0)] + m[(1, 1)] + m[(2, 2)]),
    );
    let eigen = SymmetricEigen::new(k);
    let mut largest = 0;
    for i in 1..4 {
        if eigen.eigenvalues[i] > eigen.eigenvalues[largest] {
            largest = i;
        }
    }
    let v = eigen.eigenvectors.column(largest);
    let q = [v[3], v[0], v[1], v[2]];
    if q.iter().any(|c| !c.is_finite()) {
        return None;
    }
    Some(q)
}

/// Solves the crystal orientation of an FCC atom from the relative
/// positions of its nearest neighbors (up to 12).
///
/// Returns `None` when the neighborhood does not describe a clean FCC
/// environment: fewer than 6 reduced directions, fewer than 3 usable
/// perpendicular pairs, or a degenerate direction matrix. The returned
/// quaternion is canonical under cubic symmetry.
pub fn solve_fcc(neighbor_positions: &[[f64; 3]]) -> Option<[f64; 4]> {
    if neighbor_positions.len() > 12 {
        return None;
    }
    let mut unit: Vec<[f64; 3]> = Vec::with_capacity(neighbor_positions.len());
    for v in neighbor_positions {
        let len = dot(v, v).sqrt();
        if len > 0.0 {
            unit.push([v[0] / len, v[1] / len, v[2] / len]);
        }
    }
    let reduced = reduce_antiparallel(&unit);
    if reduced.len() < 6 {
        return None;
    }

    // Two perpendicular <110> directions span a {100} plane; their cross
    // product is a <100> axis. Three such axes fix the orientation.
    let mut axes: Vec<[f64; 3]> = Vec::with_capacity(3);
    'outer: for i in 0..reduced.len() {
        for j in (i + 1)..reduced.len() {
            if dot(&reduced[i], &reduced[j]).abs() < PERPENDICULAR_DOT_THRESHOLD {
                axes.push(cross(&reduced[i], &reduced[j]));
                if axes.len() == 3 {
                    break 'outer;
                }
            }
        }
    }
    if axes.len() < 3 {
        return None;
    }

    let mut m = Matrix3::new(
        axes[0][0], axes[0][1], axes[0][2], //
        axes[1][0], axes[1][1], axes[1][2], //
        axes[2][0], axes[2][1], axes[2][2],
    );
    // A negative determinant means a left-handed axis triple; flipping one
    // axis restores a rotation.
    if m.determinant() < 0.0 {
        for c in 0..3 {
            m[(0, c)] = -m[(0, c)];
        }
    }
    if m.determinant() < 0.0 {
        return None;
    }
    let q = closest_quaternion(&m)?;
    Some(canonicalize(&q))
}
