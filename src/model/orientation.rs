//! Crystal orientations as unit quaternions.
//!
//! All internal computations run on unit quaternions `[q0, q1, q2, q3]`
//! (scalar first). Bunge-Euler angles (ZXZ convention) are supported as a
//! derived representation for export only; the conversion follows Diebel's
//! (3,1,3) case with the gimbal-lock handling of Melcher et al.

/// `1 / √2`, the cosine of 45°.
pub const HALF_SQRT2: f64 = std::f64::consts::FRAC_1_SQRT_2;

const QUAT_TO_EULER_ETA: f64 = 1e-20;

/// Converts a half-angle cosine to the full rotation angle in radians.
///
/// Values at or beyond ±1 collapse to a zero rotation; they arise from
/// floating-point drift in the symmetry reduction.
pub fn rad_from_cos_half(cos_half: f64) -> f64 {
    if cos_half.abs() >= 1.0 {
        return 0.0;
    }
    2.0 * cos_half.acos()
}

/// Converts a rotation angle in radians to its half-angle cosine.
pub fn cos_half_from_rad(angle: f64) -> f64 {
    (0.5 * angle).cos()
}

/// Half-angle cosine of the misorientation between two unit quaternions.
///
/// Larger is closer: `1.0` means identical orientation. This is the plain
/// (symmetry-unaware) measure; see
/// [`cubic_cos_half_misorientation`](crate::model::symmetry::cubic_cos_half_misorientation)
/// for the cubic-aware variant.
#[inline]
pub fn cos_half_misorientation(q1: &[f64; 4], q2: &[f64; 4]) -> f64 {
    (q1[0] * q2[0] + q1[1] * q2[1] + q1[2] * q2[2] + q1[3] * q2[3]).abs()
}

/// Misorientation angle in radians (symmetry-unaware).
pub fn misorientation(q1: &[f64; 4], q2: &[f64; 4]) -> f64 {
    rad_from_cos_half(cos_half_misorientation(q1, q2))
}

/// Whether two orientations lie within the threshold, given as a half-angle
/// cosine (larger cosine = smaller angle).
#[inline]
pub fn have_close_orientations(q1: &[f64; 4], q2: &[f64; 4], cos_half_threshold: f64) -> bool {
    cos_half_misorientation(q1, q2) > cos_half_threshold
}

/// Relative rotation `q1 * q2⁻¹` between two unit quaternions.
pub fn misorientation_quaternion(q1: &[f64; 4], q2: &[f64; 4]) -> [f64; 4] {
    [
        q1[0] * q2[0] + q1[1] * q2[1] + q1[2] * q2[2] + q1[3] * q2[3],
        q1[1] * q2[0] - q1[0] * q2[1] + q1[3] * q2[2] - q1[2] * q2[3],
        q1[2] * q2[0] - q1[0] * q2[2] + q1[1] * q2[3] - q1[3] * q2[1],
        q1[2] * q2[1] - q1[1] * q2[2] + q1[3] * q2[0] - q1[0] * q2[3],
    ]
}

/// Converts Bunge-Euler angles `(φ1, Φ, φ2)` in radians to a unit quaternion.
pub fn bunge_to_quaternion(euler: &[f64; 3]) -> [f64; 4] {
    let p1 = euler[0];
    let t = euler[1];
    let p2 = euler[2];

    let ct = (t / 2.0).cos();
    let st = (t / 2.0).sin();

    [
        ct * ((p1 + p2) / 2.0).cos(),
        st * ((p1 - p2) / 2.0).cos(),
        st * ((p1 - p2) / 2.0).sin(),
        ct * ((p1 + p2) / 2.0).sin(),
    ]
}

/// Converts a unit quaternion to Bunge-Euler angles `(φ1, Φ, φ2)` in radians.
///
/// A quaternion does not define Bunge angles uniquely at `Φ = 0`; in that
/// case `φ2` is set to zero and the whole rotation goes into `φ1`.
pub fn quaternion_to_bunge(q: &[f64; 4]) -> [f64; 3] {
    let (q0, q1, q2, q3) = (q[0], q[1], q[2], q[3]);

    let mut cos_phi = q3 * q3 - q2 * q2 - q1 * q1 + q0 * q0;

    let y0 = 2.0 * q1 * q3 - 2.0 * q0 * q2;
    let x0 = 2.0 * q2 * q3 + 2.0 * q0 * q1;
    let y1 = 2.0 * q1 * q3 + 2.0 * q0 * q2;
    let x1 = -2.0 * q2 * q3 + 2.0 * q0 * q1;

    if cos_phi > 1.0 {
        cos_phi = 1.0;
    }

    let phi = if (1.0 - cos_phi).powi(2) <= QUAT_TO_EULER_ETA {
        0.0
    } else {
        cos_phi.acos()
    };

    let sin_phi = phi.sin();
    let (mut phi1, mut phi2);
    if sin_phi != 0.0 {
        phi2 = (y0 / sin_phi).atan2(x0 / sin_phi);
        phi1 = (y1 / sin_phi).atan2(x1 / sin_phi);
    } else {
        phi1 = (2.0 * q1 * q2 + 2.0 * q0 * q3).atan2(q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3);
        phi2 = 0.0;
    }

    if phi1 < 0.0 {
        phi1 += 2.0 * std::f64::consts::PI;
    }
    if phi2 < 0.0 {
        phi2 += 2.0 * std::f64::consts::PI;
    }

    [phi1, phi, phi2]
}

/// A single crystal orientation, stored as a unit quaternion.
///
/// Orientation records are append-only per snapshot: geometrically identical
/// atoms receive distinct table entries with numerically equal quaternions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    q: [f64; 4],
}

impl Orientation {
    pub fn from_quaternion(q: [f64; 4]) -> Self {
        Self { q }
    }

    pub fn from_bunge(euler: &[f64; 3]) -> Self {
        Self {
            q: bunge_to_quaternion(euler),
        }
    }

    #[inline]
    pub fn quaternion(&self) -> &[f64; 4] {
        &self.q
    }

    /// Bunge angles in radians. Rotations with `Φ` below 0.2° are folded
    /// into `φ1` so near-degenerate orientations export stably.
    pub fn bunge_angles(&self) -> [f64; 3] {
        let mut b = quaternion_to_bunge(&self.q);
        let limit = 0.2_f64.to_radians();
        if b[1] * b[1] < limit * limit {
            b[0] += b[2];
            b[2] = 0.0;
        }
        b
    }
}

/// Incremental mean of a set of orientations.
///
/// Keeps the component-wise quaternion sum and normalizes on demand; see
/// Cho, Rollett & Oh, "Determination of a Mean Orientation in Electron
/// Backscatter Diffraction Measurements". Valid for the small spreads found
/// within one grain, where all summed quaternions lie in the same
/// hemisphere after cubic canonicalization.
#[derive(Debug, Clone, Default)]
pub struct MeanOrientation {
    q_sum: [f64; 4],
    q: [f64; 4],
}

impl MeanOrientation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, q: &[f64; 4]) {
        self.q_sum[0] += q[0];
        self.q_sum[1] += q[1];
        self.q_sum[2] += q[2];
        self.q_sum[3] += q[3];
    }

    /// Renormalizes the running sum into the current mean quaternion.
    pub fn refresh(&mut self) {
        let len = (self.q_sum[0] * self.q_sum[0]
            + self.q_sum[1] * self.q_sum[1]
            + self.q_sum[2] * self.q_sum[2]
            + self.q_sum[3] * self.q_sum[3])
            .sqrt();
        if len == 0.0 {
            return;
        }
        let inv = 1.0 / len;
        self.q = [
            self.q_sum[0] * inv,
            self.q_sum[1] * inv,
            self.q_sum[2] * inv,
            self.q_sum[3] * inv,
        ];
    }

    #[inline]
    pub fn quaternion(&self) -> &[f64; 4] {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn misorientation_of_identical_quaternions_is_zero() {
        let q = bunge_to_quaternion(&[0.3, 0.7, 1.1]);
        assert!((cos_half_misorientation(&q, &q) - 1.0).abs() < EPS);
        // acos amplifies the rounding of |q|^2 near 1, so allow for the
        // resulting angle of a few 1e-8 radians
        assert!(misorientation(&q, &q).abs() < 1e-7);
    }

    #[test]
    fn misorientation_is_sign_invariant() {
        let q = bunge_to_quaternion(&[0.3, 0.7, 1.1]);
        let neg = [-q[0], -q[1], -q[2], -q[3]];
        assert!((cos_half_misorientation(&q, &neg) - 1.0).abs() < EPS);
    }

    #[test]
    fn known_rotation_angle_recovered() {
        // 10 degree rotation about z.
        let angle = 10.0_f64.to_radians();
        let q1 = [1.0, 0.0, 0.0, 0.0];
        let q2 = [(angle / 2.0).cos(), 0.0, 0.0, (angle / 2.0).sin()];
        assert!((misorientation(&q1, &q2) - angle).abs() < 1e-10);
    }

    #[test]
    fn bunge_round_trip() {
        let euler = [0.4, 0.9, 2.1];
        let q = bunge_to_quaternion(&euler);
        let back = quaternion_to_bunge(&q);
        for i in 0..3 {
            assert!((euler[i] - back[i]).abs() < 1e-10, "component {i}");
        }
    }

    #[test]
    fn gimbal_lock_folds_into_phi1() {
        let ori = Orientation::from_bunge(&[0.5, 0.0, 0.25]);
        let b = ori.bunge_angles();
        assert!((b[0] - 0.75).abs() < 1e-10);
        assert!(b[1].abs() < EPS);
        assert!(b[2].abs() < EPS);
    }

    #[test]
    fn relative_quaternion_of_equal_orientations_is_identity() {
        let q = bunge_to_quaternion(&[1.0, 0.5, 0.2]);
        let rel = misorientation_quaternion(&q, &q);
        assert!((rel[0] - 1.0).abs() < EPS);
        assert!(rel[1].abs() < EPS && rel[2].abs() < EPS && rel[3].abs() < EPS);
    }

    #[test]
    fn mean_orientation_of_one_sample_is_that_sample() {
        let q = bunge_to_quaternion(&[0.1, 0.2, 0.3]);
        let mut mean = MeanOrientation::new();
        mean.add(&q);
        mean.refresh();
        for i in 0..4 {
            assert!((mean.quaternion()[i] - q[i]).abs() < EPS);
        }
    }
}
