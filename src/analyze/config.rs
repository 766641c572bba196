use crate::model::lattice::CubicLattice;

use super::error::DetectError;

/// Parameters of the per-snapshot grain detection pipeline.
///
/// The angular threshold is the maximum misorientation (radians) between an
/// accepted atom and its growth parent; the mean-orientation test of large
/// grains runs at three times this angle.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    /// Growth misorientation threshold in radians.
    pub angular_threshold: f64,
    /// Whether the simulation box is periodic in all three dimensions.
    pub periodic: bool,
    /// Number of orphan-adoption passes; 0 iterates until no atom is
    /// adopted anymore.
    pub orphan_depth: u32,
    /// Neighbor count for both the growth shell search and the orphan
    /// majority vote: the 12 nearest neighbors of an FCC site.
    pub max_neighbors: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            angular_threshold: 1.0_f64.to_radians(),
            periodic: true,
            orphan_depth: 0,
            max_neighbors: 12,
        }
    }
}

impl DetectConfig {
    pub fn validate(&self, lattice: &CubicLattice) -> Result<(), DetectError> {
        if lattice.lattice_parameter() <= 0.0 {
            return Err(DetectError::InvalidLatticeParameter(
                lattice.lattice_parameter(),
            ));
        }
        if self.angular_threshold <= 0.0 || self.angular_threshold >= std::f64::consts::PI {
            return Err(DetectError::InvalidAngularThreshold(self.angular_threshold));
        }
        Ok(())
    }
}
