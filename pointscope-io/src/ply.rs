//! PLY format support

use crate::{finite_point, MeshData, PointBudget, PointData, PointSampler};
use log::debug;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, ElementDef, Encoding, Ply, Property};
use pointscope_core::{Error, Point3d, ProgressReporter, Result, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn parse(path: &Path, progress: &mut ProgressReporter) -> Result<Ply<DefaultElement>> {
    progress.step(format!("Reading {}", path.display()));
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| Error::InvalidData(format!("PLY parse error: {}", e)))?;
    progress.percent(100.0);
    Ok(ply)
}

/// Number of faces declared in the PLY header, zero if none
pub fn face_count<P: AsRef<Path>>(path: P) -> Result<usize> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| Error::InvalidData(format!("PLY header error: {}", e)))?;
    Ok(header.elements.get("face").map(|face| face.count).unwrap_or(0))
}

/// Read one element record in the file's encoding
fn read_element<R: BufRead>(
    parser: &Parser<DefaultElement>,
    reader: &mut R,
    encoding: &Encoding,
    def: &ElementDef,
    line: &mut String,
) -> Result<DefaultElement> {
    let element = match encoding {
        Encoding::Ascii => {
            line.clear();
            if reader.read_line(line)? == 0 {
                return Err(Error::InvalidData(format!("PLY data ends inside element '{}'", def.name)));
            }
            parser.read_ascii_element(line, def)
        }
        Encoding::BinaryBigEndian => parser.read_big_endian_element(reader, def),
        Encoding::BinaryLittleEndian => parser.read_little_endian_element(reader, def),
    };
    element.map_err(|e| Error::InvalidData(format!("PLY parse error in '{}': {}", def.name, e)))
}

/// Stream the `vertex` element as point records, keeping at most
/// `budget.max_points` of them. Elements after `vertex` are not read.
pub fn read_points<P: AsRef<Path>>(
    path: P,
    budget: &PointBudget,
    progress: &mut ProgressReporter,
) -> Result<PointData> {
    let path = path.as_ref();
    progress.step(format!("Reading {}", path.display()));
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| Error::InvalidData(format!("PLY header error: {}", e)))?;

    let vertex_def = header
        .elements
        .get("vertex")
        .ok_or_else(|| Error::InvalidData("PLY file has no vertex element".to_string()))?;
    let has = |name: &str| vertex_def.properties.contains_key(name);
    let has_color = has("red") && has("green") && has("blue");
    let has_intensity = has("intensity");
    let total = vertex_def.count;

    let mut sampler = PointSampler::new(*budget, has_color, has_intensity, total);
    let mut line = String::new();
    for (name, def) in header.elements.iter() {
        if name != "vertex" {
            // Elements ahead of the vertices still have to be consumed
            for _ in 0..def.count {
                read_element(&parser, &mut reader, &header.encoding, def, &mut line)?;
            }
            continue;
        }
        for i in 0..def.count {
            let vertex = read_element(&parser, &mut reader, &header.encoding, def, &mut line)?;
            let position = extract_position(&vertex)?;
            let color = if has_color {
                [
                    extract_color_channel(&vertex, "red")?,
                    extract_color_channel(&vertex, "green")?,
                    extract_color_channel(&vertex, "blue")?,
                ]
            } else {
                [1.0; 3]
            };
            let intensity = if has_intensity {
                extract_scalar(&vertex, "intensity")? as f32
            } else {
                1.0
            };
            sampler.push(position, color, intensity);
            if i % 65_536 == 0 {
                progress.fraction(i, total);
            }
        }
        break;
    }
    progress.percent(100.0);

    let mut data = sampler.finish();
    if let Some(intensities) = data.intensities.as_mut() {
        normalize_intensities(intensities);
    }
    debug!(
        "Read {} of {} PLY vertices (color: {}, intensity: {})",
        data.len(),
        data.source_point_count,
        has_color,
        has_intensity
    );
    Ok(data)
}

/// Read vertices, optional normals and faces; polygons are fan triangulated
pub fn read_mesh<P: AsRef<Path>>(path: P, progress: &mut ProgressReporter) -> Result<MeshData> {
    let ply = parse(path.as_ref(), progress)?;

    progress.step("Converting mesh");
    let mut mesh = MeshData::default();
    if let Some(vertices) = ply.payload.get("vertex") {
        mesh.positions = vertices
            .iter()
            .map(extract_position)
            .collect::<Result<Vec<_>>>()?;

        let normals: Option<Vec<Vector3f>> = vertices
            .iter()
            .map(|v| {
                Some(Vector3f::new(
                    extract_scalar(v, "nx").ok()? as f32,
                    extract_scalar(v, "ny").ok()? as f32,
                    extract_scalar(v, "nz").ok()? as f32,
                ))
            })
            .collect();
        mesh.normals = normals.filter(|n| !n.is_empty());
    }
    progress.percent(50.0);

    if let Some(faces) = ply.payload.get("face") {
        for face in faces {
            let indices = extract_face_indices(face)?;
            for k in 1..indices.len().saturating_sub(1) {
                mesh.faces.push([indices[0], indices[k], indices[k + 1]]);
            }
        }
    }
    progress.percent(100.0);

    mesh.validate()?;
    debug!("Read PLY mesh with {} vertices and {} faces", mesh.positions.len(), mesh.faces.len());
    Ok(mesh)
}

fn extract_position(element: &DefaultElement) -> Result<Point3d> {
    finite_point(
        extract_scalar(element, "x")?,
        extract_scalar(element, "y")?,
        extract_scalar(element, "z")?,
        || "in PLY vertex".to_string(),
    )
}

/// Extract a scalar property value as f64 from a PLY element
fn extract_scalar(element: &DefaultElement, name: &str) -> Result<f64> {
    match element.get(name) {
        Some(Property::Char(val)) => Ok(*val as f64),
        Some(Property::UChar(val)) => Ok(*val as f64),
        Some(Property::Short(val)) => Ok(*val as f64),
        Some(Property::UShort(val)) => Ok(*val as f64),
        Some(Property::Int(val)) => Ok(*val as f64),
        Some(Property::UInt(val)) => Ok(*val as f64),
        Some(Property::Float(val)) => Ok(*val as f64),
        Some(Property::Double(val)) => Ok(*val),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Colour channels are stored either as bytes or as floats in `0..=1`
fn extract_color_channel(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::UChar(val)) => Ok(*val as f32 / 255.0),
        Some(Property::UShort(val)) => Ok(*val as f32 / 65535.0),
        Some(Property::Float(val)) => Ok(val.clamp(0.0, 1.0)),
        Some(Property::Double(val)) => Ok(val.clamp(0.0, 1.0) as f32),
        _ => Err(Error::InvalidData(format!("Colour property '{}' invalid", name))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<u32>> {
    let to_u32 = |v: i64| {
        u32::try_from(v).map_err(|_| Error::InvalidData(format!("Negative face index {}", v)))
    };
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices.iter().map(|&i| to_u32(i as i64)).collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.clone()),
        Some(Property::ListShort(indices)) => indices.iter().map(|&i| to_u32(i as i64)).collect(),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&i| i as u32).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&i| i as u32).collect()),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}

/// Rescale intensities to `0..=1` by their maximum
pub(crate) fn normalize_intensities(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}
