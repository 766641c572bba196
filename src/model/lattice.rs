//! Cubic lattice geometry and the derived neighbor-search parameters.

use thiserror::Error;

/// Default unit for exported grain volumes.
pub const DEFAULT_VOLUME_UNIT: &str = "1000nm^3";

/// Errors from parsing a volume-unit string.
#[derive(Debug, Error, PartialEq)]
pub enum VolumeUnitError {
    /// The string does not end in `^3`.
    #[error("volume unit '{0}' is not cubic (expected '[number]unit^3')")]
    NotCubic(String),
    /// The length unit is not one of `A`, `nm`, `um`, `mm`, `m`.
    #[error("unsupported length unit in '{0}' (expected A, nm, um, mm or m)")]
    UnsupportedLength(String),
    /// The leading scale number does not parse.
    #[error("invalid scale number in volume unit '{0}'")]
    BadScale(String),
}

/// A volume unit of the form `[number]unit^3`, e.g. `A^3`, `nm^3` or
/// `1000nm^3`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeUnit {
    label: String,
    per_cubic_angstrom: f64,
}

impl VolumeUnit {
    /// Unit label as given, e.g. `1000nm^3`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Conversion factor from Å³ into this unit.
    pub fn per_cubic_angstrom(&self) -> f64 {
        self.per_cubic_angstrom
    }
}

impl Default for VolumeUnit {
    /// Cubic Ångström.
    fn default() -> Self {
        Self {
            label: "A^3".to_string(),
            per_cubic_angstrom: 1.0,
        }
    }
}

impl std::str::FromStr for VolumeUnit {
    type Err = VolumeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ANGSTROM: f64 = 1e-10;
        let length = s
            .strip_suffix("^3")
            .ok_or_else(|| VolumeUnitError::NotCubic(s.to_string()))?;
        let name_start = length
            .rfind(|c: char| c.is_ascii_digit() || c == '.')
            .map_or(0, |i| i + 1);
        let (number, name) = length.split_at(name_start);
        let scale = if number.is_empty() {
            1.0
        } else {
            number
                .parse::<f64>()
                .map_err(|_| VolumeUnitError::BadScale(s.to_string()))?
        };
        let meters = match name {
            "A" => ANGSTROM,
            "nm" => 1e-9,
            "um" => 1e-6,
            "mm" => 1e-3,
            "m" => 1.0,
            _ => return Err(VolumeUnitError::UnsupportedLength(s.to_string())),
        };
        Ok(Self {
            label: s.to_string(),
            per_cubic_angstrom: (ANGSTROM / meters).powi(3) / scale,
        })
    }
}

/// A cubic crystal lattice, described by its lattice parameter in Å and the
/// number of atoms per elementary cell.
///
/// All geometry downstream derives from the lattice: the nearest-neighbor
/// distance fixes the radial shell for neighbor searches and, through it,
/// the grid cell edge of the spatial index.
#[derive(Debug, Clone)]
pub struct CubicLattice {
    lattice_parameter: f64,
    atoms_per_cell: u8,
    name: String,
    volume_unit: VolumeUnit,
    volume_per_atom: f64,
}

impl CubicLattice {
    pub fn new(
        lattice_parameter: f64,
        atoms_per_cell: u8,
        volume_unit: VolumeUnit,
        name: impl Into<String>,
    ) -> Self {
        Self {
            lattice_parameter,
            atoms_per_cell,
            name: name.into(),
            volume_unit,
            volume_per_atom: lattice_parameter.powi(3) / atoms_per_cell as f64,
        }
    }

    /// Face-centered cubic lattice (4 atoms per elementary cell).
    pub fn fcc(lattice_parameter: f64, volume_unit: VolumeUnit, name: impl Into<String>) -> Self {
        Self::new(lattice_parameter, 4, volume_unit, name)
    }

    pub fn lattice_parameter(&self) -> f64 {
        self.lattice_parameter
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume_unit(&self) -> &VolumeUnit {
        &self.volume_unit
    }

    /// Volume per atom in Å³.
    pub fn volume_per_atom(&self) -> f64 {
        self.volume_per_atom
    }

    /// Volume per atom in the configured volume unit.
    pub fn volume_per_atom_in_unit(&self) -> f64 {
        self.volume_per_atom * self.volume_unit.per_cubic_angstrom()
    }

    /// Distance between nearest neighbors, `a / √2` for FCC.
    pub fn nearest_neighbor_distance(&self) -> f64 {
        self.lattice_parameter * std::f64::consts::FRAC_1_SQRT_2
    }

    /// Squared radial shell `(0.9 d)² .. (1.1 d)²` around the
    /// nearest-neighbor distance `d`, exclusive on both ends.
    pub fn neighbor_shell_sqr(&self) -> (f64, f64) {
        let d = self.nearest_neighbor_distance();
        ((0.9 * d) * (0.9 * d), (1.1 * d) * (1.1 * d))
    }

    /// Preferred grid cell edge of the spatial index: 10% above the outer
    /// shell radius, so one cell layer always covers the search shell.
    pub fn preferred_cell_edge(&self) -> f64 {
        let (_, max_sqr) = self.neighbor_shell_sqr();
        1.1 * max_sqr.sqrt()
    }
}
