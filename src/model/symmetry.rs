//! The 24 rotational symmetry operators of the cubic crystal system.
//!
//! Every orientation of a cubic crystal has 24 equivalent quaternion
//! representations, one per proper rotation of the cube: the identity,
//! three 180° rotations about `<100>`, six 180° rotations about `<110>`,
//! eight ±120° rotations about `<111>`, and six ±90° rotations about
//! `<100>`. Each operator is a pure function from quaternion to
//! quaternion (right-multiplication by the operator's own quaternion),
//! which makes the reduction a data-driven scan over [`CubicOp::ALL`].

use super::orientation::{misorientation_quaternion, HALF_SQRT2};

/// One proper rotation of the cube, identified by axis and turn.
///
/// Naming: `Fourfold*` are 90° turns (`Inv` = 270°), `Threefold*` are 120°
/// turns about the `<111>` axis whose component signs follow the variant
/// name (`Pmp` = axis `(+1, -1, +1)`), `Twofold*` are 180° turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubicOp {
    Identity,
    TwofoldX,
    TwofoldY,
    TwofoldZ,
    ThreefoldPpp,
    ThreefoldPppInv,
    ThreefoldPmp,
    ThreefoldPmpInv,
    ThreefoldMpp,
    ThreefoldMppInv,
    ThreefoldPpmInv,
    ThreefoldPpm,
    FourfoldX,
    FourfoldY,
    FourfoldZ,
    TwofoldXy,
    TwofoldYz,
    TwofoldXz,
    FourfoldXInv,
    FourfoldYInv,
    FourfoldZInv,
    TwofoldXmy,
    TwofoldYmz,
    TwofoldXmz,
}

impl CubicOp {
    /// All 24 operators, identity first.
    pub const ALL: [CubicOp; 24] = [
        CubicOp::Identity,
        CubicOp::TwofoldX,
        CubicOp::TwofoldY,
        CubicOp::TwofoldZ,
        CubicOp::ThreefoldPpp,
        CubicOp::ThreefoldPppInv,
        CubicOp::ThreefoldPmp,
        CubicOp::ThreefoldPmpInv,
        CubicOp::ThreefoldMpp,
        CubicOp::ThreefoldMppInv,
        CubicOp::ThreefoldPpmInv,
        CubicOp::ThreefoldPpm,
        CubicOp::FourfoldX,
        CubicOp::FourfoldY,
        CubicOp::FourfoldZ,
        CubicOp::TwofoldXy,
        CubicOp::TwofoldYz,
        CubicOp::TwofoldXz,
        CubicOp::FourfoldXInv,
        CubicOp::FourfoldYInv,
        CubicOp::FourfoldZInv,
        CubicOp::TwofoldXmy,
        CubicOp::TwofoldYmz,
        CubicOp::TwofoldXmz,
    ];

    /// The operator's own unit quaternion.
    fn quaternion(self) -> [f64; 4] {
        const H: f64 = 0.5;
        const S: f64 = HALF_SQRT2;
        match self {
            CubicOp::Identity => [1.0, 0.0, 0.0, 0.0],
            CubicOp::TwofoldX => [0.0, 1.0, 0.0, 0.0],
            CubicOp::TwofoldY => [0.0, 0.0, 1.0, 0.0],
            CubicOp::TwofoldZ => [0.0, 0.0, 0.0, 1.0],
            CubicOp::ThreefoldPpp => [H, H, H, H],
            CubicOp::ThreefoldPppInv => [H, -H, -H, -H],
            CubicOp::ThreefoldPmp => [H, H, -H, H],
            CubicOp::ThreefoldPmpInv => [H, -H, H, -H],
            CubicOp::ThreefoldMpp => [H, -H, H, H],
            CubicOp::ThreefoldMppInv => [H, H, -H, -H],
            CubicOp::ThreefoldPpmInv => [H, -H, -H, H],
            CubicOp::ThreefoldPpm => [H, H, H, -H],
            CubicOp::FourfoldX => [S, S, 0.0, 0.0],
            CubicOp::FourfoldY => [S, 0.0, S, 0.0],
            CubicOp::FourfoldZ => [S, 0.0, 0.0, S],
            CubicOp::TwofoldXy => [0.0, S, S, 0.0],
            CubicOp::TwofoldYz => [0.0, 0.0, S, S],
            CubicOp::TwofoldXz => [0.0, S, 0.0, S],
            CubicOp::FourfoldXInv => [S, -S, 0.0, 0.0],
            CubicOp::FourfoldYInv => [S, 0.0, -S, 0.0],
            CubicOp::FourfoldZInv => [S, 0.0, 0.0, -S],
            CubicOp::TwofoldXmy => [0.0, S, -S, 0.0],
            CubicOp::TwofoldYmz => [0.0, 0.0, S, -S],
            CubicOp::TwofoldXmz => [0.0, S, 0.0, -S],
        }
    }

    /// The symmetry-equivalent representation `q ⊗ r` of `q` under this
    /// operator. The result is a unit quaternion whose scalar part may be
    /// negative; callers canonicalizing must fix the sign afterwards.
    pub fn apply(self, q: &[f64; 4]) -> [f64; 4] {
        let r = self.quaternion();
        [
            q[0] * r[0] - q[1] * r[1] - q[2] * r[2] - q[3] * r[3],
            q[0] * r[1] + r[0] * q[1] + q[2] * r[3] - q[3] * r[2],
            q[0] * r[2] + r[0] * q[2] + q[3] * r[1] - q[1] * r[3],
            q[0] * r[3] + r[0] * q[3] + q[1] * r[2] - q[2] * r[1],
        ]
    }

    /// Scalar component of `q ⊗ r`, i.e. the half-angle cosine this
    /// equivalent representation would contribute (before taking `abs`).
    #[inline]
    pub fn scalar(self, q: &[f64; 4]) -> f64 {
        let r = self.quaternion();
        q[0] * r[0] - q[1] * r[1] - q[2] * r[2] - q[3] * r[3]
    }
}

/// Reduces a quaternion to its canonical cubic representative: the
/// symmetry-equivalent representation maximizing the absolute scalar
/// component, sign-fixed so the scalar is non-negative.
///
/// Idempotent up to floating-point noise: the canonical representative of
/// a canonical representative is itself.
pub fn canonicalize(q: &[f64; 4]) -> [f64; 4] {
    let mut best = CubicOp::Identity;
    let mut best_cos = 0.0;
    for op in CubicOp::ALL {
        let c = op.scalar(q).abs();
        if c > best_cos {
            best_cos = c;
            best = op;
        }
    }
    let mut out = best.apply(q);
    if out[0] < 0.0 {
        out = [-out[0], -out[1], -out[2], -out[3]];
    }
    out
}

/// Cubic-symmetry-aware half-angle cosine of the misorientation between two
/// orientations: the maximum plain measure over all 24 equivalent
/// representations of the relative rotation.
///
/// Used for grain-to-grain comparison; the per-atom growth test uses the
/// plain [`cos_half_misorientation`](super::orientation::cos_half_misorientation),
/// which suffices for small angles and is much cheaper.
pub fn cubic_cos_half_misorientation(q1: &[f64; 4], q2: &[f64; 4]) -> f64 {
    let rel = misorientation_quaternion(q1, q2);
    let mut max_cos: f64 = 0.0;
    for op in CubicOp::ALL {
        let c = op.scalar(&rel).abs();
        if c > max_cos {
            max_cos = c;
        }
    }
    max_cos
}

/// Cubic-symmetry-aware misorientation angle in radians.
pub fn cubic_misorientation(q1: &[f64; 4], q2: &[f64; 4]) -> f64 {
    super::orientation::rad_from_cos_half(cubic_cos_half_misorientation(q1, q2))
}
