//! LAS/LAZ support via the `las` crate

use crate::ply::normalize_intensities;
use crate::{finite_point, PointBudget, PointData, PointSampler};
use log::{debug, warn};
use pointscope_core::{Error, ProgressReporter, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn las_error(e: las::Error) -> Error {
    Error::InvalidData(format!("LAS error: {}", e))
}

/// Read the point records of a LAS or LAZ file, keeping at most
/// `budget.max_points` of them.
///
/// Colours are present only if the point format carries RGB; 16 bit channels
/// are scaled to `0..=1`. Intensities are normalised by their maximum.
pub fn read_points<P: AsRef<Path>>(
    path: P,
    budget: &PointBudget,
    progress: &mut ProgressReporter,
) -> Result<PointData> {
    let path = path.as_ref();
    progress.step(format!("Reading {}", path.display()));

    let file = File::open(path)?;
    let mut reader = las::Reader::new(BufReader::new(file)).map_err(las_error)?;
    let total = reader.header().number_of_points() as usize;
    let has_color = reader.header().point_format().has_color;
    debug!("LAS header declares {} points (color: {})", total, has_color);

    let mut sampler = PointSampler::new(*budget, has_color, true, total);
    let mut any_intensity = false;
    for (idx, point) in reader.points().enumerate() {
        let point = point.map_err(las_error)?;
        let position = finite_point(point.x, point.y, point.z, || format!("in LAS record {}", idx))?;
        let color = point.color.map_or([1.0; 3], |c| {
            [
                c.red as f32 / 65535.0,
                c.green as f32 / 65535.0,
                c.blue as f32 / 65535.0,
            ]
        });
        any_intensity |= point.intensity != 0;
        sampler.push(position, color, point.intensity as f32);
        if idx % 50_000 == 0 {
            progress.fraction(idx, total);
        }
    }
    progress.percent(100.0);

    let mut data = sampler.finish();
    if data.source_point_count != total {
        warn!("LAS header declared {} points but {} were read", total, data.source_point_count);
    }
    if !any_intensity {
        data.intensities = None;
    } else if let Some(intensities) = data.intensities.as_mut() {
        normalize_intensities(intensities);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_points("/nonexistent/cloud.las", &PointBudget::unlimited(), &mut ProgressReporter::silent());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let path = std::env::temp_dir().join(format!("pointscope_las_{}_truncated.las", std::process::id()));
        fs::write(&path, b"LASF\0\0\0\0").unwrap();
        assert!(matches!(
            read_points(&path, &PointBudget::unlimited(), &mut ProgressReporter::silent()),
            Err(Error::InvalidData(_))
        ));
        let _ = fs::remove_file(&path);
    }
}
