//! Scan CSV format support
//!
//! A scan file holds one reading per row with a header naming the columns.
//! Columns are matched by name, so their order is free and extra columns are
//! ignored. Both English and the collector's Portuguese column names are
//! accepted. The delimiter is detected from the header line.
//!
//! Distance cells that are empty, `nan`, `none`, `timeout` or otherwise not a
//! number are read as missing readings rather than errors, since the sensor
//! reports dropouts that way.

use helixscan_core::{Error, Result, ScanSample};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Supported delimiters for scan and cloud CSV files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Space,
    Tab,
    Semicolon,
}

impl Delimiter {
    /// Get the character representation of the delimiter
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Space => ' ',
            Delimiter::Tab => '\t',
            Delimiter::Semicolon => ';',
        }
    }

    /// Detect delimiter from a line of text
    pub fn detect_from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        // ties go to the later entry, so padded "a, b" lines stay comma separated
        let counts = [
            (line.matches(' ').count(), Delimiter::Space),
            (line.matches('\t').count(), Delimiter::Tab),
            (line.matches(',').count(), Delimiter::Comma),
            (line.matches(';').count(), Delimiter::Semicolon),
        ];

        counts
            .iter()
            .max_by_key(|(count, _)| count)
            .filter(|(count, _)| *count > 0)
            .map(|(_, delimiter)| *delimiter)
    }

    /// Split a line into trimmed cells
    ///
    /// Runs of spaces count as one separator when splitting on spaces.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let cells = line.trim().split(self.as_char()).map(str::trim);
        match self {
            Delimiter::Space => cells.filter(|c| !c.is_empty()).collect(),
            _ => cells.collect(),
        }
    }
}

/// Columns understood in a scan file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanColumn {
    Layer,
    PointIndex,
    Angle,
    Distance,
    Unknown,
}

impl ScanColumn {
    /// Parse column type from header name
    pub fn from_header(header: &str) -> Self {
        match header.trim().to_lowercase().as_str() {
            "layer" | "camada" => ScanColumn::Layer,
            "point_index" | "step" | "passo" => ScanColumn::PointIndex,
            "angle_rad" | "angulo_rad" => ScanColumn::Angle,
            "distance_mm" | "distancia_mm" => ScanColumn::Distance,
            _ => ScanColumn::Unknown,
        }
    }
}

/// Column positions of a scan file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCsvSchema {
    pub delimiter: Delimiter,
    pub layer: usize,
    pub point_index: usize,
    /// Absent in step-only files, where angles come from the step index
    pub angle: Option<usize>,
    pub distance: usize,
}

impl ScanCsvSchema {
    /// Build the schema from a header line
    pub fn from_header(line: &str) -> Result<Self> {
        let delimiter = Delimiter::detect_from_line(line).ok_or_else(|| Error::Parse {
            line: 1,
            message: "could not detect delimiter".to_string(),
        })?;
        let columns: Vec<ScanColumn> = delimiter
            .split(line)
            .into_iter()
            .map(ScanColumn::from_header)
            .collect();

        let find = |wanted: ScanColumn| columns.iter().position(|&c| c == wanted);
        let require = |wanted: ScanColumn, name: &str| {
            find(wanted).ok_or_else(|| Error::Parse {
                line: 1,
                message: format!("missing required column '{}'", name),
            })
        };

        Ok(Self {
            delimiter,
            layer: require(ScanColumn::Layer, "layer")?,
            point_index: require(ScanColumn::PointIndex, "point_index")?,
            angle: find(ScanColumn::Angle),
            distance: require(ScanColumn::Distance, "distance_mm")?,
        })
    }
}

/// Reader for scan CSV files
pub struct ScanCsvReader;

impl ScanCsvReader {
    /// Read a scan file; the angle column is required
    pub fn read_scan<P: AsRef<Path>>(path: P) -> Result<Vec<ScanSample>> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file), None)
    }

    /// Read a scan file, deriving angles from step indices when the file has
    /// no angle column
    pub fn read_scan_with_steps<P: AsRef<Path>>(path: P, points_per_layer: u32) -> Result<Vec<ScanSample>> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file), Some(points_per_layer))
    }

    /// Read scan samples from any buffered source
    pub fn read_from<R: BufRead>(reader: R, points_per_layer: Option<u32>) -> Result<Vec<ScanSample>> {
        let mut lines = reader.lines().enumerate();

        let schema = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break ScanCsvSchema::from_header(&line)?;
                    }
                }
                None => return Err(Error::Parse { line: 1, message: "missing header".to_string() }),
            }
        };

        let steps = match (schema.angle, points_per_layer) {
            (Some(_), _) => None,
            (None, Some(n)) if n > 0 => Some(n),
            (None, _) => {
                return Err(Error::Parse {
                    line: 1,
                    message: "missing required column 'angle_rad'".to_string(),
                })
            }
        };

        let mut samples = Vec::new();
        for (index, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            samples.push(Self::parse_line(&line, index + 1, &schema, steps)?);
        }

        debug!(
            samples = samples.len(),
            missing = samples.iter().filter(|s| !s.is_valid()).count(),
            delimiter = ?schema.delimiter,
            "Read scan CSV"
        );
        Ok(samples)
    }

    fn parse_line(line: &str, line_no: usize, schema: &ScanCsvSchema, steps: Option<u32>) -> Result<ScanSample> {
        let cells = schema.delimiter.split(line);
        let cell = |column: usize, name: &str| {
            cells.get(column).copied().ok_or_else(|| Error::Parse {
                line: line_no,
                message: format!("missing value for '{}'", name),
            })
        };
        let parse_index = |column: usize, name: &str| -> Result<u32> {
            let text = cell(column, name)?;
            text.parse::<u32>().map_err(|_| Error::Parse {
                line: line_no,
                message: format!("invalid {} '{}'", name, text),
            })
        };

        let layer = parse_index(schema.layer, "layer")?;
        let point_index = parse_index(schema.point_index, "point_index")?;
        // dropouts may also shorten the row
        let distance = cells.get(schema.distance).copied().and_then(parse_distance);

        match (schema.angle, steps) {
            (Some(column), _) => {
                let text = cell(column, "angle_rad")?;
                let angle = text
                    .parse::<f64>()
                    .ok()
                    .filter(|a| a.is_finite())
                    .ok_or_else(|| Error::Parse {
                        line: line_no,
                        message: format!("invalid angle_rad '{}'", text),
                    })?;
                Ok(ScanSample::new(layer, point_index, angle, distance))
            }
            (None, Some(n)) => Ok(ScanSample::at_step(layer, point_index, n, distance)),
            (None, None) => Err(Error::Parse {
                line: line_no,
                message: "no angle available".to_string(),
            }),
        }
    }
}

/// Parse a distance cell, `None` for dropouts
pub fn parse_distance(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    match cell.to_lowercase().as_str() {
        "" | "nan" | "none" | "timeout" => None,
        _ => cell.parse::<f64>().ok().filter(|d| d.is_finite()),
    }
}

/// Writer for scan CSV files
pub struct ScanCsvWriter;

impl ScanCsvWriter {
    /// Write samples with an English header; missing readings are empty cells
    pub fn write_scan<P: AsRef<Path>>(samples: &[ScanSample], path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(samples, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(samples: &[ScanSample], writer: &mut W) -> Result<()> {
        writeln!(writer, "layer,point_index,angle_rad,distance_mm")?;
        for sample in samples {
            let distance = sample.distance_mm.map(|d| d.to_string()).unwrap_or_default();
            writeln!(
                writer,
                "{},{},{},{}",
                sample.layer, sample.point_index, sample.angle_rad, distance
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::fs;
    use std::io::Cursor;

    fn read(content: &str) -> Result<Vec<ScanSample>> {
        ScanCsvReader::read_from(Cursor::new(content), None)
    }

    #[test]
    fn test_delimiter_detection() {
        assert_eq!(Delimiter::detect_from_line("layer,step,angle_rad,distance_mm"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::detect_from_line("camada;passo;angulo_rad;distancia_mm"), Some(Delimiter::Semicolon));
        assert_eq!(Delimiter::detect_from_line("a\tb\tc"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::detect_from_line("a  b c\n"), Some(Delimiter::Space));
        assert_eq!(Delimiter::detect_from_line("layer, step, distance_mm"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::detect_from_line("layer"), None);
    }

    #[test]
    fn test_column_aliases() {
        assert_eq!(ScanColumn::from_header("Camada"), ScanColumn::Layer);
        assert_eq!(ScanColumn::from_header(" STEP "), ScanColumn::PointIndex);
        assert_eq!(ScanColumn::from_header("passo"), ScanColumn::PointIndex);
        assert_eq!(ScanColumn::from_header("angulo_rad"), ScanColumn::Angle);
        assert_eq!(ScanColumn::from_header("distancia_mm"), ScanColumn::Distance);
        assert_eq!(ScanColumn::from_header("timestamp"), ScanColumn::Unknown);
    }

    #[test]
    fn test_reads_missing_cells() {
        let content = "layer,point_index,angle_rad,distance_mm\n\
                       0,0,0.0,50.5\n\
                       0,1,0.1,\n\
                       0,2,0.2,nan\n\
                       0,3,0.3,None\n\
                       0,4,0.4,TIMEOUT\n\
                       0,5,0.5,garbage\n\
                       0,6,0.6,inf\n\
                       0,7,0.7\n";
        let samples = read(content).unwrap();
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[0].distance_mm, Some(50.5));
        assert!(samples[1..].iter().all(|s| s.distance_mm.is_none()));
        assert_eq!(samples[7].point_index, 7);
    }

    #[test]
    fn test_portuguese_header_with_semicolons() {
        let content = "passo;camada;distancia_mm;angulo_rad;tempo\n3;1;120.25;1.5707963267948966;12:00\n";
        let samples = read(content).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].layer, 1);
        assert_eq!(samples[0].point_index, 3);
        assert_eq!(samples[0].distance_mm, Some(120.25));
        assert_relative_eq!(samples[0].angle_rad, FRAC_PI_2);
    }

    #[test]
    fn test_angles_from_steps() {
        let content = "layer step distance_mm\n0 0 50\n0   2 51\n";
        assert!(read(content).is_err());

        let samples = ScanCsvReader::read_from(Cursor::new(content), Some(4)).unwrap();
        assert_relative_eq!(samples[1].angle_rad, std::f64::consts::PI);
        assert_eq!(samples[1].distance_mm, Some(51.0));
    }

    #[test]
    fn test_structural_errors() {
        let missing_column = "layer,angle_rad,distance_mm\n0,0.0,50\n";
        assert!(matches!(read(missing_column), Err(Error::Parse { line: 1, .. })));

        let bad_layer = "layer,point_index,angle_rad,distance_mm\n0,0,0.0,50\n\nx,1,0.1,50\n";
        assert!(matches!(read(bad_layer), Err(Error::Parse { line: 4, .. })));

        let bad_angle = "layer,point_index,angle_rad,distance_mm\n0,0,abc,50\n";
        assert!(matches!(read(bad_angle), Err(Error::Parse { line: 2, .. })));

        assert!(matches!(read(""), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_write_then_read_file() {
        let path = std::env::temp_dir().join("helixscan_scan_csv_roundtrip.csv");
        let samples = vec![
            ScanSample::at_step(0, 0, 128, Some(101.5)),
            ScanSample::at_step(0, 1, 128, None),
            ScanSample::at_step(1, 0, 128, Some(99.0)),
        ];
        ScanCsvWriter::write_scan(&samples, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("layer,point_index,angle_rad,distance_mm"));
        assert!(lines.nth(1).unwrap().ends_with(','));

        let back = ScanCsvReader::read_scan(&path).unwrap();
        assert_eq!(back, samples);

        let _ = fs::remove_file(&path);
    }
}
