//! Layered point cloud CSV support
//!
//! One point per row as `layer,x_mm,y_mm,z_mm`. Layers with no points have no
//! rows, so they do not survive a write and read.

use crate::scan_csv::Delimiter;
use helixscan_core::{Error, LayerCloud, Point3d, Result, ScanCloud};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

const HEADER: &str = "layer,x_mm,y_mm,z_mm";

/// Writer for cloud CSV files
pub struct CloudCsvWriter;

impl CloudCsvWriter {
    /// Write a cloud layer by layer, points in ring order
    pub fn write_cloud<P: AsRef<Path>>(cloud: &ScanCloud, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(cloud, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(cloud: &ScanCloud, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", HEADER)?;
        for ring in cloud {
            for p in ring {
                writeln!(writer, "{},{},{},{}", ring.layer, p.x, p.y, p.z)?;
            }
        }
        Ok(())
    }
}

/// Reader for cloud CSV files
pub struct CloudCsvReader;

impl CloudCsvReader {
    /// Read a cloud file
    ///
    /// Rows are grouped by layer and layers come out ascending; within a layer
    /// points keep their file order.
    pub fn read_cloud<P: AsRef<Path>>(path: P) -> Result<ScanCloud> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<ScanCloud> {
        let mut lines = reader.lines().enumerate().filter(|(_, line)| {
            line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true)
        });

        let header = match lines.next() {
            Some((_, line)) => line?,
            None => return Err(Error::Parse { line: 1, message: "missing header".to_string() }),
        };
        let delimiter = Delimiter::detect_from_line(&header).ok_or_else(|| Error::Parse {
            line: 1,
            message: "could not detect delimiter".to_string(),
        })?;

        let mut layers: BTreeMap<u32, Vec<Point3d>> = BTreeMap::new();
        for (index, line) in lines {
            let line = line?;
            let line_no = index + 1;
            let cells = delimiter.split(&line);
            if cells.len() < 4 {
                return Err(Error::Parse {
                    line: line_no,
                    message: format!("expected 4 values, found {}", cells.len()),
                });
            }

            let layer = cells[0].parse::<u32>().map_err(|_| Error::Parse {
                line: line_no,
                message: format!("invalid layer '{}'", cells[0]),
            })?;
            let mut coords = [0.0; 3];
            for (coord, text) in coords.iter_mut().zip(&cells[1..4]) {
                *coord = text.parse::<f64>().map_err(|_| Error::Parse {
                    line: line_no,
                    message: format!("invalid coordinate '{}'", text),
                })?;
            }
            layers
                .entry(layer)
                .or_default()
                .push(Point3d::new(coords[0], coords[1], coords[2]));
        }

        let cloud: ScanCloud = layers
            .into_iter()
            .map(|(layer, points)| LayerCloud::from_points(layer, points))
            .collect();
        debug!(layers = cloud.layer_count(), points = cloud.point_count(), "Read cloud CSV");
        Ok(cloud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn test_write_then_read_file() {
        let path = std::env::temp_dir().join("helixscan_cloud_csv_roundtrip.csv");
        let cloud = ScanCloud::from_layers(vec![
            LayerCloud::from_points(0, vec![Point3d::new(50.0, 0.0, 0.0), Point3d::new(0.0, 50.0, 0.0)]),
            LayerCloud::from_points(3, vec![Point3d::new(-49.75, 0.125, 30.0)]),
        ]);
        CloudCsvWriter::write_cloud(&cloud, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("layer,x_mm,y_mm,z_mm\n0,50,0,0\n"));

        let back = CloudCsvReader::read_cloud(&path).unwrap();
        assert_eq!(back, cloud);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_regroups_interleaved_layers() {
        let content = "layer;x_mm;y_mm;z_mm\n2;1;0;10\n0;5;0;0\n2;0;1;10\n\n0;0;5;0\n";
        let cloud = CloudCsvReader::read_from(Cursor::new(content)).unwrap();
        assert_eq!(cloud.layer_count(), 2);
        assert_eq!(cloud[0].layer, 0);
        assert_eq!(cloud[0].points, vec![Point3d::new(5.0, 0.0, 0.0), Point3d::new(0.0, 5.0, 0.0)]);
        assert_eq!(cloud[1].points[1], Point3d::new(0.0, 1.0, 10.0));
    }

    #[test]
    fn test_bad_rows() {
        let short = "layer,x_mm,y_mm,z_mm\n0,1,2\n";
        assert!(matches!(CloudCsvReader::read_from(Cursor::new(short)), Err(Error::Parse { line: 2, .. })));

        let bad = "layer,x_mm,y_mm,z_mm\n0,1,2,3\n0,1,two,3\n";
        assert!(matches!(CloudCsvReader::read_from(Cursor::new(bad)), Err(Error::Parse { line: 3, .. })));
    }
}
