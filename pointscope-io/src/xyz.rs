//! XYZ/CSV text point cloud support
//!
//! One point per line with at least x, y and z columns. The delimiter
//! (comma, semicolon or whitespace) is detected from the first data line. A
//! header row naming the columns is optional; without one the columns are
//! taken as `x y z [intensity | r g b | intensity r g b]` by count.
//! Lines starting with `#` or `//` are comments.

use crate::ply::normalize_intensities;
use crate::{finite_point, PointBudget, PointData, PointSampler};
use log::debug;
use pointscope_core::{Error, Point3d, ProgressReporter, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Supported delimiters for XYZ/CSV files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    /// Any run of spaces or tabs
    Whitespace,
}

impl Delimiter {
    /// Detect delimiter from a line of text
    pub fn detect_from_line(line: &str) -> Self {
        if line.contains(',') {
            Delimiter::Comma
        } else if line.contains(';') {
            Delimiter::Semicolon
        } else {
            Delimiter::Whitespace
        }
    }

    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
            Delimiter::Semicolon => line.split(';').map(str::trim).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

/// Column types that can be parsed from XYZ/CSV files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    X,
    Y,
    Z,
    Intensity,
    Red,
    Green,
    Blue,
    Unknown,
}

impl ColumnType {
    /// Parse column type from header name
    pub fn from_header(header: &str) -> Self {
        match header.trim().to_lowercase().as_str() {
            "x" | "px" | "pos_x" | "position_x" | "easting" => ColumnType::X,
            "y" | "py" | "pos_y" | "position_y" | "northing" => ColumnType::Y,
            "z" | "pz" | "pos_z" | "position_z" | "elevation" => ColumnType::Z,
            "i" | "intensity" | "int" => ColumnType::Intensity,
            "r" | "red" | "color_r" => ColumnType::Red,
            "g" | "green" | "color_g" => ColumnType::Green,
            "b" | "blue" | "color_b" => ColumnType::Blue,
            _ => ColumnType::Unknown,
        }
    }
}

/// Schema definition for parsing XYZ/CSV files
#[derive(Debug, Clone, PartialEq)]
pub struct XyzSchema {
    pub columns: Vec<ColumnType>,
    pub has_header: bool,
    pub delimiter: Delimiter,
}

impl XyzSchema {
    /// Infer the schema from the first non-comment line
    pub fn detect_from_line(line: &str) -> Result<Self> {
        let delimiter = Delimiter::detect_from_line(line);
        let parts = delimiter.split(line);
        if parts.len() < 3 {
            return Err(Error::InvalidData(
                "XYZ/CSV lines need at least 3 columns (x, y, z)".to_string(),
            ));
        }

        let has_header = parts.iter().any(|p| p.parse::<f64>().is_err());
        let columns = if has_header {
            let columns: Vec<ColumnType> = parts.iter().map(|h| ColumnType::from_header(h)).collect();
            for required in [ColumnType::X, ColumnType::Y, ColumnType::Z] {
                if !columns.contains(&required) {
                    return Err(Error::InvalidData(
                        "XYZ/CSV header must name x, y and z columns".to_string(),
                    ));
                }
            }
            columns
        } else {
            use ColumnType::*;
            match parts.len() {
                3 => vec![X, Y, Z],
                4 => vec![X, Y, Z, Intensity],
                6 => vec![X, Y, Z, Red, Green, Blue],
                n if n >= 7 => {
                    let mut cols = vec![X, Y, Z, Intensity, Red, Green, Blue];
                    cols.resize(n, Unknown);
                    cols
                }
                n => {
                    let mut cols = vec![X, Y, Z];
                    cols.resize(n, Unknown);
                    cols
                }
            }
        };

        Ok(Self {
            columns,
            has_header,
            delimiter,
        })
    }

    fn index_of(&self, column: ColumnType) -> Option<usize> {
        self.columns.iter().position(|&c| c == column)
    }

    fn has_color(&self) -> bool {
        [ColumnType::Red, ColumnType::Green, ColumnType::Blue]
            .iter()
            .all(|c| self.columns.contains(c))
    }
}

fn is_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('#') || t.starts_with("//")
}

fn parse_field(parts: &[&str], idx: usize, line_no: usize) -> Result<f64> {
    parts
        .get(idx)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::InvalidData(format!("Invalid number in column {} on line {}", idx + 1, line_no)))
}

/// Read an XYZ/CSV file, detecting its schema and keeping at most
/// `budget.max_points` records
pub fn read_points<P: AsRef<Path>>(
    path: P,
    budget: &PointBudget,
    progress: &mut ProgressReporter,
) -> Result<PointData> {
    let path = path.as_ref();
    progress.step(format!("Reading {}", path.display()));

    let file = File::open(path)?;
    let total_bytes = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let reader = BufReader::new(file);

    let mut schema: Option<XyzSchema> = None;
    let mut sampler: Option<PointSampler> = None;
    let mut indices = (0, 0, 0);
    let mut intensity_idx = None;
    let mut color_idx = None;
    let mut bytes_read = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        bytes_read += line.len() + 1;
        if is_comment(&line) {
            continue;
        }

        let schema = match schema.as_ref() {
            Some(schema) => schema,
            None => {
                let detected = XyzSchema::detect_from_line(&line)?;
                debug!("Detected XYZ schema {:?}", detected);
                let idx = |c| detected.index_of(c).unwrap_or(0);
                indices = (idx(ColumnType::X), idx(ColumnType::Y), idx(ColumnType::Z));
                intensity_idx = detected.index_of(ColumnType::Intensity);
                if detected.has_color() {
                    color_idx = Some((
                        idx(ColumnType::Red),
                        idx(ColumnType::Green),
                        idx(ColumnType::Blue),
                    ));
                }
                sampler = Some(PointSampler::new(
                    *budget,
                    color_idx.is_some(),
                    intensity_idx.is_some(),
                    0,
                ));
                let skip = detected.has_header;
                let schema = schema.insert(detected);
                if skip {
                    continue;
                }
                schema
            }
        };
        let Some(sampler) = sampler.as_mut() else {
            continue;
        };

        let parts = schema.delimiter.split(&line);
        let line_no = line_no + 1;
        let position = finite_point(
            parse_field(&parts, indices.0, line_no)?,
            parse_field(&parts, indices.1, line_no)?,
            parse_field(&parts, indices.2, line_no)?,
            || format!("on line {}", line_no),
        )?;
        let intensity = match intensity_idx {
            Some(idx) => parse_field(&parts, idx, line_no)? as f32,
            None => 1.0,
        };
        let color = match color_idx {
            Some((r, g, b)) => [
                parse_field(&parts, r, line_no)? as f32,
                parse_field(&parts, g, line_no)? as f32,
                parse_field(&parts, b, line_no)? as f32,
            ],
            None => [1.0; 3],
        };
        sampler.push(position, color, intensity);

        if sampler.seen() % 65_536 == 0 {
            progress.fraction(bytes_read.min(total_bytes), total_bytes);
        }
    }
    progress.percent(100.0);

    let mut data = sampler.map(PointSampler::finish).unwrap_or_default();
    if let Some(colors) = data.colors.as_mut() {
        // 8 bit colour if anything exceeds 1
        let max = colors.iter().flatten().copied().fold(0.0f32, f32::max);
        let scale = if max > 1.0 { 1.0 / 255.0 } else { 1.0 };
        for c in colors.iter_mut() {
            for channel in c.iter_mut() {
                *channel = (*channel * scale).clamp(0.0, 1.0);
            }
        }
    }
    if let Some(intensities) = data.intensities.as_mut() {
        normalize_intensities(intensities);
    }

    if data.source_point_count == 0 {
        return Err(Error::InvalidData(format!("No points found in {}", path.display())));
    }
    if data.len() < data.source_point_count {
        debug!("Kept {} of {} XYZ records", data.len(), data.source_point_count);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pointscope_xyz_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_delimiter_detection() {
        assert_eq!(Delimiter::detect_from_line("1,2,3"), Delimiter::Comma);
        assert_eq!(Delimiter::detect_from_line("1;2;3"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect_from_line("1 \t2  3"), Delimiter::Whitespace);
        assert_eq!(Delimiter::Whitespace.split("1 \t2  3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_schema_by_column_count() {
        let schema = XyzSchema::detect_from_line("1 2 3 255 128 0").unwrap();
        assert!(!schema.has_header);
        assert!(schema.has_color());
        assert!(XyzSchema::detect_from_line("1 2").is_err());
    }

    #[test]
    fn test_header_csv_with_color() {
        let path = temp_path("header.csv");
        fs::write(
            &path,
            "# survey export\nx,y,z,red,green,blue\n10.5,20.5,1.0,255,0,0\n11.5,21.5,2.0,0,255,0\n",
        )
        .unwrap();
        let data = read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.positions[1], Point3d::new(11.5, 21.5, 2.0));
        let colors = data.colors.unwrap();
        assert_relative_eq!(colors[0][0], 1.0);
        assert_relative_eq!(colors[1][1], 1.0);
        assert!(data.intensities.is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_plain_xyz_with_intensity() {
        let path = temp_path("plain.xyz");
        fs::write(&path, "1 2 3 50\n4 5 6 100\n\n7 8 9 25\n").unwrap();
        let data = read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).unwrap();
        assert_eq!(data.len(), 3);
        let intensities = data.intensities.unwrap();
        assert_relative_eq!(intensities[1], 1.0);
        assert_relative_eq!(intensities[2], 0.25);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_line_errors() {
        let path = temp_path("bad.xyz");
        fs::write(&path, "1 2 3\n4 five 6\n").unwrap();
        assert!(read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_empty_file_errors() {
        let path = temp_path("empty.xyz");
        fs::write(&path, "# nothing here\n").unwrap();
        assert!(read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let path = temp_path("inf.xyz");
        fs::write(&path, "1 2 3\ninf 0 0\n4 5 6\n").unwrap();
        let err = read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(ref msg) if msg.contains("line 2")));

        fs::write(&path, "x,y,z\n1,2,NaN\n").unwrap();
        assert!(read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_large_file_held_within_budget() {
        let path = temp_path("large.xyz");
        let text: String = (0..40_000).map(|i| format!("{} {} 0 {}\n", i % 200, i / 200, i % 7)).collect();
        fs::write(&path, text).unwrap();

        let data = read_points(&path, &PointBudget::new(100, 11), &mut ProgressReporter::silent()).unwrap();
        assert_eq!(data.len(), 100);
        assert_eq!(data.source_point_count, 40_000);
        assert!(data.positions.capacity() <= 200);
        assert!(data.intensities.as_ref().unwrap().capacity() <= 200);
        assert!(data.positions.iter().any(|p| p.y >= 100.0));
        let _ = fs::remove_file(&path);
    }
}
