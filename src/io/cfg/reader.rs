//! CFG parsing: header key/value pairs, then fractional atom lines.
//!
//! Fractional coordinates are mapped to absolute Å through the transposed
//! product of the `Transform` and `H0` matrices, as simulation viewers do
//! it. Extended-format type blocks (a lone mass line followed by an
//! element name) may appear between atom lines and apply to the atoms
//! that follow.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{Matrix3, Vector3};

use crate::io::{error::Error, Format};

use super::{CfgAtom, CfgContent, DEFAULT_ATOM_MASS, DEFAULT_ELEMENT};

struct Header {
    num_particles: Option<usize>,
    unit_multiplier: f64,
    h0: Matrix3<f64>,
    transform: Matrix3<f64>,
    entry_count: Option<usize>,
    extended: bool,
    aux_fields: Vec<String>,
}

impl Header {
    fn new() -> Self {
        Self {
            num_particles: None,
            unit_multiplier: 1.0,
            h0: Matrix3::identity(),
            transform: Matrix3::identity(),
            entry_count: None,
            extended: false,
            // standard CFG carries velocities unless .NO_VELOCITY. says so
            aux_fields: vec!["v_x".into(), "v_y".into(), "v_z".into()],
        }
    }

    fn apply(&mut self, key: &str, value: &str, line: usize) -> Result<(), Error> {
        let parse_f64 = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| Error::parse(Format::Cfg, line, format!("bad number '{v}'")))
        };
        if key == "Number of particles" {
            let n = value
                .parse::<i64>()
                .map_err(|_| Error::parse(Format::Cfg, line, format!("bad particle count '{value}'")))?;
            if !(0..=1_000_000_000).contains(&n) {
                return Err(Error::parse(
                    Format::Cfg,
                    line,
                    format!("invalid number of atoms: {n}"),
                ));
            }
            self.num_particles = Some(n as usize);
        } else if key == "A" {
            self.unit_multiplier = parse_f64(value)?;
        } else if let Some(idx) = matrix_index(key, "H0") {
            self.h0[idx] = parse_f64(value)? * self.unit_multiplier;
        } else if let Some(idx) = matrix_index(key, "Transform") {
            self.transform[idx] = parse_f64(value)?;
        } else if matrix_index(key, "eta").is_some() || key == "R" {
            // strain and rate scale are not used
        } else if key == "entry_count" {
            self.entry_count = Some(
                value
                    .parse()
                    .map_err(|_| Error::parse(Format::Cfg, line, format!("bad entry count '{value}'")))?,
            );
            self.extended = true;
        } else if key.starts_with("auxiliary[") {
            self.extended = true;
            let name = value.split_whitespace().next().unwrap_or_default();
            self.aux_fields.push(name.to_string());
        } else {
            return Err(Error::parse(
                Format::Cfg,
                line,
                format!("unknown header key '{key}'"),
            ));
        }
        Ok(())
    }
}

/// Parses `"<name>(i,j)"` into a zero-based matrix index.
fn matrix_index(key: &str, name: &str) -> Option<(usize, usize)> {
    let rest = key.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')?;
    let (i, j) = rest.split_once(',')?;
    let i = i.trim().parse::<usize>().ok()?;
    let j = j.trim().parse::<usize>().ok()?;
    if (1..=3).contains(&i) && (1..=3).contains(&j) {
        Some((i - 1, j - 1))
    } else {
        None
    }
}

pub fn read_file(path: &Path) -> Result<CfgContent, Error> {
    read(BufReader::new(File::open(path)?))
}

pub fn read<R: BufRead>(reader: R) -> Result<CfgContent, Error> {
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut header = Header::new();

    // header section; the first line that is neither key=value nor a flag
    // is the first data line
    let mut first_data: Option<String> = None;
    for line in &mut lines {
        let raw = line?;
        line_no += 1;
        let text = strip_comment(&raw);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Some((key, value)) = text.split_once('=') {
            header.apply(key.trim(), value.trim(), line_no)?;
        } else if text.starts_with(".NO_VELOCITY.") {
            header.aux_fields.drain(..3);
        } else {
            first_data = Some(raw);
            break;
        }
    }
    let Some(num_particles) = header.num_particles else {
        return Err(Error::WrongFormat(Format::Cfg));
    };

    // absolute position = ((Transform * H0)^T) * fractional
    let transform = (header.transform * header.h0).transpose();
    let basis = [
        transform * Vector3::new(1.0, 0.0, 0.0),
        transform * Vector3::new(0.0, 1.0, 0.0),
        transform * Vector3::new(0.0, 0.0, 1.0),
    ];
    let mut size = [0.0; 3];
    for dim in 0..3 {
        let max = basis.iter().map(|v| v[dim]).fold(f64::NEG_INFINITY, f64::max);
        let min = basis.iter().map(|v| v[dim]).fold(f64::INFINITY, f64::min);
        size[dim] = max - min;
    }

    let expected = header.entry_count.unwrap_or(3 + header.aux_fields.len());
    let mut atoms = Vec::with_capacity(num_particles);
    let mut skipped_lines = 0u64;
    let mut element = DEFAULT_ELEMENT.to_string();
    let mut mass = DEFAULT_ATOM_MASS;

    let mut pending = first_data;
    while atoms.len() < num_particles {
        let raw = match pending.take() {
            Some(l) => l,
            None => match lines.next() {
                Some(l) => {
                    line_no += 1;
                    l?
                }
                None => break,
            },
        };
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        // a lone number introduces a new atom type: mass, then element name
        if header.extended && tokens.len() == 1 {
            if let Ok(m) = tokens[0].parse::<f64>() {
                mass = m;
            }
            if let Some(name) = lines.next() {
                line_no += 1;
                element = name?.trim().to_string();
            }
            continue;
        }
        if tokens.len() != expected {
            skipped_lines += 1;
            continue;
        }
        match parse_atom(&tokens, &transform) {
            Some(atom) => atoms.push(atom),
            None => skipped_lines += 1,
        }
    }

    Ok(CfgContent {
        size,
        property_names: header.aux_fields,
        element,
        mass,
        atoms,
        skipped_lines,
    })
}

fn parse_atom(tokens: &[&str], transform: &Matrix3<f64>) -> Option<CfgAtom> {
    let mut frac = Vector3::zeros();
    for dim in 0..3 {
        frac[dim] = tokens[dim].parse().ok()?;
    }
    let pos = transform * frac;
    let mut properties = Vec::with_capacity(tokens.len() - 3);
    for token in &tokens[3..] {
        properties.push(token.parse().ok()?);
    }
    Some(CfgAtom {
        position: [pos[0], pos[1], pos[2]],
        properties,
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
Number of particles = 3
H0(1,1) = 40.0
H0(1,2) = 0
H0(1,3) = 0
H0(2,1) = 0
H0(2,2) = 20.0
H0(2,3) = 0
H0(3,1) = 0
H0(3,2) = 0
H0(3,3) = 10.0
.NO_VELOCITY.
entry_count = 4
auxiliary[0] = pe
26.9815385
Al
0.5 0.5 0.5 -3.36
0.25 0.5 0.5 -3.35
0.1 0.2 0.3 -3.30
";

    #[test]
    fn parses_extended_format() {
        let content = read(Cursor::new(SAMPLE)).unwrap();
        assert_eq!(content.atoms.len(), 3);
        assert_eq!(content.size, [40.0, 20.0, 10.0]);
        assert_eq!(content.property_names, vec!["pe".to_string()]);
        assert_eq!(content.element, "Al");
        assert_eq!(content.skipped_lines, 0);

        let a = &content.atoms[0];
        assert!((a.position[0] - 20.0).abs() < 1e-12);
        assert!((a.position[1] - 10.0).abs() < 1e-12);
        assert!((a.position[2] - 5.0).abs() < 1e-12);
        assert!((a.properties[0] + 3.36).abs() < 1e-12);
    }

    #[test]
    fn velocity_columns_remain_without_no_velocity_flag() {
        let input = "\
Number of particles = 1
H0(1,1) = 10.0
H0(2,2) = 10.0
H0(3,3) = 10.0
entry_count = 7
auxiliary[0] = pe
26.9815385
Al
0.5 0.5 0.5 0.1 0.2 0.3 -3.3
";
        let content = read(Cursor::new(input)).unwrap();
        assert_eq!(
            content.property_names,
            vec!["v_x".to_string(), "v_y".into(), "v_z".into(), "pe".into()]
        );
        assert_eq!(content.atoms[0].properties.len(), 4);
    }

    #[test]
    fn malformed_atom_lines_are_skipped_and_counted() {
        let input = "\
Number of particles = 3
H0(1,1) = 10.0
H0(2,2) = 10.0
H0(3,3) = 10.0
.NO_VELOCITY.
entry_count = 3
26.9815385
Al
0.1 0.1 0.1
0.2 0.2
0.3 oops 0.3
";
        let content = read(Cursor::new(input)).unwrap();
        assert_eq!(content.atoms.len(), 1);
        assert_eq!(content.skipped_lines, 2);
    }

    #[test]
    fn missing_particle_count_is_not_a_cfg_file() {
        let input = "H0(1,1) = 10.0\nsomething else\n";
        assert!(matches!(
            read(Cursor::new(input)),
            Err(Error::WrongFormat(Format::Cfg))
        ));
    }

    #[test]
    fn unknown_header_key_is_an_error() {
        let input = "Number of particles = 1\nbogus_key = 1\n";
        assert!(matches!(
            read(Cursor::new(input)),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn unit_multiplier_scales_the_cell() {
        let input = "\
Number of particles = 1
A = 2.0
H0(1,1) = 10.0
H0(2,2) = 10.0
H0(3,3) = 10.0
.NO_VELOCITY.
entry_count = 3
26.9815385
Al
0.5 0.5 0.5
";
        let content = read(Cursor::new(input)).unwrap();
        assert_eq!(content.size, [20.0, 20.0, 20.0]);
        assert!((content.atoms[0].position[0] - 10.0).abs() < 1e-12);
    }
}
