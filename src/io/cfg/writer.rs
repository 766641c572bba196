//! CFG output: diagonal cell, `.NO_VELOCITY.`, one type block.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::io::error::Error;

use super::CfgContent;

pub fn write_file(path: &Path, content: &CfgContent) -> Result<(), Error> {
    write(BufWriter::new(File::create(path)?), content)
}

pub fn write<W: Write>(mut w: W, content: &CfgContent) -> Result<(), Error> {
    writeln!(w, "Number of particles = {}\n", content.atoms.len())?;
    writeln!(w, "H0(1,1) = {:.6}\nH0(1,2) = 0\nH0(1,3) = 0\n", content.size[0])?;
    writeln!(w, "H0(2,1) = 0\nH0(2,2) = {:.6}\nH0(2,3) = 0\n", content.size[1])?;
    writeln!(w, "H0(3,1) = 0\nH0(3,2) = 0\nH0(3,3) = {:.6}\n", content.size[2])?;
    writeln!(w, ".NO_VELOCITY.")?;
    writeln!(w, "entry_count = {}", 3 + content.property_names.len())?;
    for (i, name) in content.property_names.iter().enumerate() {
        writeln!(w, "auxiliary[{i}] = {name}")?;
    }
    writeln!(w, "{}\n{}", content.mass, content.element)?;

    for atom in &content.atoms {
        write!(
            w,
            "{:.16e} {:.16e} {:.16e}",
            atom.position[0] / content.size[0],
            atom.position[1] / content.size[1],
            atom.position[2] / content.size[2],
        )?;
        for value in &atom.properties {
            write!(w, " {value:.6}")?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cfg::{reader, CfgAtom};
    use std::io::Cursor;

    #[test]
    fn written_files_read_back() {
        let content = CfgContent {
            size: [40.0, 20.0, 10.0],
            property_names: vec!["pe".into(), "grainId".into()],
            element: "Al".into(),
            mass: 26.981_538_5,
            atoms: vec![
                CfgAtom {
                    position: [20.0, 10.0, 5.0],
                    properties: vec![-3.36, 0.0],
                },
                CfgAtom {
                    position: [4.0, 2.0, 1.0],
                    properties: vec![-3.35, 1.0],
                },
            ],
            skipped_lines: 0,
        };

        let mut buf = Vec::new();
        write(&mut buf, &content).unwrap();
        let back = reader::read(Cursor::new(buf)).unwrap();

        assert_eq!(back.atoms.len(), 2);
        assert_eq!(back.size, content.size);
        assert_eq!(back.property_names, content.property_names);
        assert_eq!(back.element, "Al");
        for (a, b) in back.atoms.iter().zip(&content.atoms) {
            for dim in 0..3 {
                assert!((a.position[dim] - b.position[dim]).abs() < 1e-9);
            }
            assert_eq!(a.properties, b.properties);
        }
    }
}
