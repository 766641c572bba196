use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::io::{error::Error, Format};
use crate::model::summary::{FrameSummary, GrainSummary};

use super::{COLUMNS, PERIODIC_FLAG, SEPARATOR};

const DEG_TO_RAD: f64 = 1.0 / 57.295_779_513_082_32;

pub fn read_file(path: &Path) -> Result<FrameSummary, Error> {
    read(BufReader::new(File::open(path)?))
}

/// Reads a grain table back into a [`FrameSummary`].
///
/// Only the fixed columns are consumed; derived and mean-property columns
/// are ignored. Row ids below zero read back as unassigned.
pub fn read<R: BufRead>(reader: R) -> Result<FrameSummary, Error> {
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    // title line is free-form but must exist
    next_line(&mut lines, &mut line_no)?;

    let geometry = next_line(&mut lines, &mut line_no)?;
    let fields: Vec<&str> = geometry.split(SEPARATOR).collect();
    if fields.len() < 7 {
        return Err(Error::parse(
            Format::GrainTable,
            line_no,
            "geometry line needs size, periodic flag and origin",
        ));
    }
    let mut size = [0.0; 3];
    let mut origin = [0.0; 3];
    for dim in 0..3 {
        size[dim] = parse_f64(fields[dim], line_no)?;
        if size[dim] <= 0.0 {
            return Err(Error::parse(
                Format::GrainTable,
                line_no,
                format!("box size must be positive, got {}", size[dim]),
            ));
        }
        origin[dim] = parse_f64(fields[4 + dim], line_no)?;
        if origin[dim].abs() > size[dim] {
            return Err(Error::parse(
                Format::GrainTable,
                line_no,
                format!("origin {} outside the box", origin[dim]),
            ));
        }
    }
    let periodic = match fields[3] {
        PERIODIC_FLAG => true,
        "" => false,
        other => {
            return Err(Error::parse(
                Format::GrainTable,
                line_no,
                format!("unknown periodic flag '{other}'"),
            ))
        }
    };

    let title = next_line(&mut lines, &mut line_no)?;
    let names: Vec<&str> = title.split(SEPARATOR).collect();
    if names.len() < COLUMNS.len() || names[..COLUMNS.len()] != COLUMNS {
        return Err(Error::parse(
            Format::GrainTable,
            line_no,
            "unexpected column layout",
        ));
    }

    let mut frame = FrameSummary::new(origin, size, periodic);
    for line in lines {
        let row = line?;
        line_no += 1;
        if row.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = row.split(SEPARATOR).collect();
        if fields.len() < COLUMNS.len() {
            return Err(Error::parse(
                Format::GrainTable,
                line_no,
                "truncated grain row",
            ));
        }
        frame.add_grain(parse_grain(&fields, line_no)?);
    }
    Ok(frame)
}

fn parse_grain(fields: &[&str], line_no: usize) -> Result<GrainSummary, Error> {
    let id = fields[0]
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::parse(Format::GrainTable, line_no, "bad grain id"))?;
    let mut counts = [0u64; 3];
    for (slot, field) in counts.iter_mut().zip(&fields[1..4]) {
        *slot = field
            .trim()
            .parse()
            .map_err(|_| Error::parse(Format::GrainTable, line_no, "bad atom count"))?;
    }
    let mut center = [0.0; 3];
    for (slot, field) in center.iter_mut().zip(&fields[4..7]) {
        *slot = parse_f64(field, line_no)?;
    }
    // Bunge angles (fields 7..10) are redundant with the quaternion
    let spread = parse_f64(fields[10], line_no)? * DEG_TO_RAD;
    let mut q = [0.0; 4];
    for (slot, field) in q.iter_mut().zip(&fields[11..15]) {
        *slot = parse_f64(field, line_no)?;
    }
    Ok(GrainSummary {
        center,
        quaternion: q,
        num_atoms: counts[0],
        num_regular_atoms: counts[1],
        num_orphan_atoms: counts[2],
        orientation_spread: spread,
        assigned_id: (id >= 0).then_some(id as u32),
        mean_properties: vec![],
        misorientation_to_initial: 0.0,
        reduced_misorientation_to_initial: 0.0,
        distance_to_initial: 0.0,
    })
}

fn next_line<R: BufRead>(
    lines: &mut std::io::Lines<R>,
    line_no: &mut usize,
) -> Result<String, Error> {
    *line_no += 1;
    match lines.next() {
        Some(l) => Ok(l?),
        None => Err(Error::WrongFormat(Format::GrainTable)),
    }
}

fn parse_f64(field: &str, line_no: usize) -> Result<f64, Error> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::parse(Format::GrainTable, line_no, format!("bad number '{field}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::table::writer;
    use crate::model::lattice::{CubicLattice, VolumeUnit};
    use std::io::Cursor;

    fn lattice() -> CubicLattice {
        CubicLattice::fcc(4.05, VolumeUnit::default(), "Al")
    }

    fn sample_frame() -> FrameSummary {
        let mut frame = FrameSummary::new([0.0; 3], [100.0; 3], true);
        frame.set_property_names(vec!["pe".into()]);
        frame.add_grain(GrainSummary {
            center: [10.0, 20.0, 30.0],
            quaternion: [1.0, 0.0, 0.0, 0.0],
            num_atoms: 4000,
            num_regular_atoms: 3900,
            num_orphan_atoms: 100,
            orientation_spread: 0.002,
            assigned_id: Some(1),
            mean_properties: vec![-3.35],
            misorientation_to_initial: 0.0,
            reduced_misorientation_to_initial: 0.0,
            distance_to_initial: 0.0,
        });
        frame.add_grain(GrainSummary {
            center: [70.0, 70.0, 70.0],
            quaternion: [0.923_879_532_511_286_7, 0.0, 0.0, 0.382_683_432_365_089_8],
            num_atoms: 2000,
            num_regular_atoms: 2000,
            num_orphan_atoms: 0,
            orientation_spread: 0.01,
            assigned_id: Some(0),
            mean_properties: vec![-3.30],
            misorientation_to_initial: 0.0,
            reduced_misorientation_to_initial: 0.0,
            distance_to_initial: 0.0,
        });
        frame
    }

    #[test]
    fn tables_round_trip() {
        let frame = sample_frame();
        let mut buf = Vec::new();
        writer::write(&mut buf, &frame, &lattice()).unwrap();
        let back = read(Cursor::new(buf)).unwrap();

        assert_eq!(back.num_grains(), 2);
        assert!(back.is_periodic());
        assert_eq!(*back.size(), [100.0; 3]);
        // rows come back sorted by assigned id
        assert_eq!(back.grain(0).unwrap().assigned_id, Some(0));
        assert_eq!(back.grain(1).unwrap().assigned_id, Some(1));
        let g = back.grain(1).unwrap();
        assert_eq!(g.num_atoms, 4000);
        assert_eq!(g.num_orphan_atoms, 100);
        for dim in 0..3 {
            assert!((g.center[dim] - [10.0, 20.0, 30.0][dim]).abs() < 1e-9);
        }
        assert!((g.orientation_spread - 0.002).abs() < 1e-12);
    }

    #[test]
    fn wrong_column_layout_is_rejected() {
        let input = "title\n10;10;10;p;0;0;0\nGrain ID;Wrong;Columns\n";
        assert!(matches!(read(Cursor::new(input)), Err(Error::Parse { .. })));
    }

    #[test]
    fn negative_box_size_is_rejected() {
        let input = "title\n-10;10;10;p;0;0;0\nGrain ID\n";
        assert!(matches!(read(Cursor::new(input)), Err(Error::Parse { .. })));
    }

    #[test]
    fn truncated_file_is_wrong_format() {
        let input = "title only\n";
        assert!(matches!(
            read(Cursor::new(input)),
            Err(Error::WrongFormat(Format::GrainTable))
        ));
    }

    #[test]
    fn nonperiodic_flag_field_may_be_empty() {
        let frame = FrameSummary::new([0.0; 3], [50.0; 3], false);
        let mut buf = Vec::new();
        writer::write(&mut buf, &frame, &lattice()).unwrap();
        let back = read(Cursor::new(buf)).unwrap();
        assert!(!back.is_periodic());
        assert_eq!(back.num_grains(), 0);
    }
}
