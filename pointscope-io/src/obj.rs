//! Wavefront OBJ support
//!
//! Only geometry is read: `v` positions in double precision, `vn` normals
//! when every vertex has exactly one, `f` polygons (fan triangulated) and
//! `l` polylines. Texture coordinates, groups and materials are ignored.

use crate::MeshData;
use log::{debug, warn};
use pointscope_core::{Error, Point3d, ProgressReporter, Result, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Resolve a one-based, possibly negative, OBJ index against `count` vertices
fn resolve_index(token: &str, count: usize, line_no: usize) -> Result<u32> {
    // "7", "7/2", "7//3" and "7/2/3" all refer to vertex 7
    let head = token.split('/').next().unwrap_or(token);
    let raw: i64 = head
        .parse()
        .map_err(|_| Error::InvalidData(format!("Bad vertex index '{}' on line {}", token, line_no)))?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(count as i64 + r),
    };
    match resolved {
        Some(i) if i >= 0 && (i as usize) < count => Ok(i as u32),
        _ => Err(Error::InvalidData(format!(
            "Vertex index {} out of range on line {}",
            raw, line_no
        ))),
    }
}

fn parse_coords<const N: usize>(parts: &mut std::str::SplitWhitespace<'_>, line_no: usize) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for v in out.iter_mut() {
        *v = parts
            .next()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::InvalidData(format!("Bad coordinate on line {}", line_no)))?;
    }
    Ok(out)
}

/// Read an OBJ file as a triangle mesh with optional polyline edges
pub fn read_mesh<P: AsRef<Path>>(path: P, progress: &mut ProgressReporter) -> Result<MeshData> {
    let path = path.as_ref();
    progress.step(format!("Reading {}", path.display()));

    let file = File::open(path)?;
    let total_bytes = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let reader = BufReader::new(file);

    let mut mesh = MeshData::default();
    let mut normals: Vec<Vector3f> = Vec::new();
    let mut bytes_read = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_no + 1;
        bytes_read += line.len() + 1;

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let [x, y, z] = parse_coords::<3>(&mut parts, line_no)?;
                mesh.positions.push(Point3d::new(x, y, z));
            }
            Some("vn") => {
                let [x, y, z] = parse_coords::<3>(&mut parts, line_no)?;
                normals.push(Vector3f::new(x as f32, y as f32, z as f32));
            }
            Some("f") => {
                let count = mesh.positions.len();
                let indices = parts
                    .map(|t| resolve_index(t, count, line_no))
                    .collect::<Result<Vec<u32>>>()?;
                if indices.len() < 3 {
                    warn!("Skipping degenerate face on line {}", line_no);
                    continue;
                }
                for k in 1..indices.len() - 1 {
                    mesh.faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
            Some("l") => {
                let count = mesh.positions.len();
                let indices = parts
                    .map(|t| resolve_index(t, count, line_no))
                    .collect::<Result<Vec<u32>>>()?;
                mesh.edges.extend(indices.windows(2).map(|w| [w[0], w[1]]));
            }
            _ => {}
        }

        if line_no % 100_000 == 0 {
            progress.fraction(bytes_read.min(total_bytes), total_bytes);
        }
    }
    progress.percent(100.0);

    if !normals.is_empty() {
        if normals.len() == mesh.positions.len() {
            mesh.normals = Some(normals);
        } else {
            debug!(
                "Ignoring {} OBJ normals for {} vertices",
                normals.len(),
                mesh.positions.len()
            );
        }
    }
    if mesh.positions.is_empty() {
        return Err(Error::InvalidData(format!("No vertices found in {}", path.display())));
    }
    mesh.validate()?;
    debug!(
        "Read OBJ mesh with {} vertices, {} faces and {} edges",
        mesh.positions.len(),
        mesh.faces.len(),
        mesh.edges.len()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pointscope_obj_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_index_forms() {
        assert_eq!(resolve_index("1", 4, 1).unwrap(), 0);
        assert_eq!(resolve_index("3/1", 4, 1).unwrap(), 2);
        assert_eq!(resolve_index("2//5", 4, 1).unwrap(), 1);
        assert_eq!(resolve_index("-1", 4, 1).unwrap(), 3);
        assert!(resolve_index("0", 4, 1).is_err());
        assert!(resolve_index("5", 4, 1).is_err());
        assert!(resolve_index("-5", 4, 1).is_err());
    }

    #[test]
    fn test_quad_lines_and_precision() {
        let path = temp_path("quad.obj");
        fs::write(
            &path,
            "# square\nv 500000.125 6000000.25 0\nv 500001.125 6000000.25 0\n\
             v 500001.125 6000001.25 0\nv 500000.125 6000001.25 0\n\
             vt 0 0\nf 1/1 2/1 3/1 4/1\nl 1 3 -1\n",
        )
        .unwrap();
        let mesh = read_mesh(&path, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(mesh.positions[0], Point3d::new(500000.125, 6000000.25, 0.0));
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.edges, vec![[0, 2], [2, 3]]);
        assert!(mesh.normals.is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_normals_kept_when_complete() {
        let path = temp_path("normals.obj");
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 1\nvn 0 0 1\nf 1//1 2//2 3//3\n",
        )
        .unwrap();
        let mesh = read_mesh(&path, &mut ProgressReporter::silent()).unwrap();
        assert_eq!(mesh.normals.unwrap().len(), 3);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_bad_face_index() {
        let path = temp_path("bad.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nf 1 2 3\n").unwrap();
        assert!(read_mesh(&path, &mut ProgressReporter::silent()).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let path = temp_path("inf.obj");
        fs::write(&path, "v 0 0 0\nv 1 inf 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let err = read_mesh(&path, &mut ProgressReporter::silent()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(ref m) if m.contains("line 2")));

        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn NaN 0 1\n").unwrap();
        assert!(read_mesh(&path, &mut ProgressReporter::silent()).is_err());
        let _ = fs::remove_file(&path);
    }
}
