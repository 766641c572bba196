use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::io::error::Error;
use crate::model::lattice::CubicLattice;
use crate::model::summary::{FrameSummary, GrainSummary};

use super::{COLUMNS, EXTRA_COLUMNS, PERIODIC_FLAG, SEPARATOR};

const RAD_TO_DEG: f64 = 57.295_779_513_082_32;

pub fn write_file(path: &Path, frame: &FrameSummary, lattice: &CubicLattice) -> Result<(), Error> {
    write(BufWriter::new(File::create(path)?), frame, lattice)
}

pub fn write<W: Write>(
    mut w: W,
    frame: &FrameSummary,
    lattice: &CubicLattice,
) -> Result<(), Error> {
    writeln!(
        w,
        "polygrain v{} grain data CSV file",
        env!("CARGO_PKG_VERSION")
    )?;
    let flag = if frame.is_periodic() { PERIODIC_FLAG } else { "" };
    writeln!(
        w,
        "{};{};{};{};{};{};{}",
        frame.size()[0],
        frame.size()[1],
        frame.size()[2],
        flag,
        frame.origin()[0],
        frame.origin()[1],
        frame.origin()[2],
    )?;

    let mut columns: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(EXTRA_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(frame.property_names().iter().map(|n| format!("avg_{n}")));
    writeln!(w, "{}", columns.join(&SEPARATOR.to_string()))?;

    let mut sorted: Vec<&GrainSummary> = frame.grains().iter().collect();
    sorted.sort_by_key(|g| g.assigned_id);
    for grain in sorted {
        let id = match grain.assigned_id {
            Some(id) => id as i64,
            None => -1,
        };
        let center = frame.reduced_point(&grain.center);
        let euler = grain.orientation().bunge_angles();
        let q = &grain.quaternion;
        let mut fields = vec![
            id.to_string(),
            grain.num_atoms.to_string(),
            grain.num_regular_atoms.to_string(),
            grain.num_orphan_atoms.to_string(),
            center[0].to_string(),
            center[1].to_string(),
            center[2].to_string(),
            (euler[0] * RAD_TO_DEG).to_string(),
            (euler[1] * RAD_TO_DEG).to_string(),
            (euler[2] * RAD_TO_DEG).to_string(),
            (grain.orientation_spread * RAD_TO_DEG).to_string(),
            q[0].to_string(),
            q[1].to_string(),
            q[2].to_string(),
            q[3].to_string(),
            grain.volume_in_unit(lattice).to_string(),
            (grain.misorientation_to_initial * RAD_TO_DEG).to_string(),
            (grain.reduced_misorientation_to_initial * RAD_TO_DEG).to_string(),
            grain.distance_to_initial.to_string(),
        ];
        fields.extend(grain.mean_properties.iter().map(|v| v.to_string()));
        writeln!(w, "{}", fields.join(&SEPARATOR.to_string()))?;
    }
    w.flush()?;
    Ok(())
}
