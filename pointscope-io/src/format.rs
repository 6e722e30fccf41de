//! Source format detection
//!
//! Magic bytes win over the file extension, so a mislabelled PLY or LAS file
//! is still recognised. Text formats without a signature fall back to the
//! extension.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// File formats a geometry can be loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Ply,
    Las,
    Xyz,
    Obj,
}

impl SourceFormat {
    /// Get the format name
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Ply => "ply",
            SourceFormat::Las => "las",
            SourceFormat::Xyz => "xyz",
            SourceFormat::Obj => "obj",
        }
    }

    /// Map a file extension (case insensitive) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(SourceFormat::Ply),
            "las" | "laz" => Some(SourceFormat::Las),
            "xyz" | "txt" | "csv" | "pts" => Some(SourceFormat::Xyz),
            "obj" => Some(SourceFormat::Obj),
            _ => None,
        }
    }

    /// Whether sources of this format always carry mesh connectivity
    pub fn is_mesh(&self) -> bool {
        matches!(self, SourceFormat::Obj)
    }
}

/// Detect file format by examining the header/magic bytes
pub fn detect_by_header(path: &Path) -> Option<SourceFormat> {
    let mut file = File::open(path).ok()?;
    let mut header = [0u8; 16];
    let bytes_read = file.read(&mut header).ok()?;
    if bytes_read < 4 {
        return None;
    }
    let header = &header[..bytes_read];

    if header.starts_with(b"ply") {
        Some(SourceFormat::Ply)
    } else if header.starts_with(b"LASF") {
        Some(SourceFormat::Las)
    } else {
        None
    }
}

/// Detect the format of `path`, by signature and then by extension
pub fn detect_format(path: &Path) -> Option<SourceFormat> {
    detect_by_header(path).or_else(|| {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(SourceFormat::from_extension)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pointscope_format_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(SourceFormat::from_extension("PLY"), Some(SourceFormat::Ply));
        assert_eq!(SourceFormat::from_extension("laz"), Some(SourceFormat::Las));
        assert_eq!(SourceFormat::from_extension("csv"), Some(SourceFormat::Xyz));
        assert_eq!(SourceFormat::from_extension("obj"), Some(SourceFormat::Obj));
        assert_eq!(SourceFormat::from_extension("stl"), None);
    }

    #[test]
    fn test_names_map_back_and_only_obj_is_always_a_mesh() {
        for format in [SourceFormat::Ply, SourceFormat::Las, SourceFormat::Xyz, SourceFormat::Obj] {
            assert_eq!(SourceFormat::from_extension(format.name()), Some(format));
            assert_eq!(format.is_mesh(), format == SourceFormat::Obj);
        }
    }

    #[test]
    fn test_magic_bytes_override_extension() {
        let path = temp_path("mislabelled.xyz");
        fs::write(&path, "ply\nformat ascii 1.0\nend_header\n").unwrap();
        assert_eq!(detect_format(&path), Some(SourceFormat::Ply));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_extension_fallback_and_unknown() {
        let path = temp_path("points.xyz");
        fs::write(&path, "1 2 3\n4 5 6\n").unwrap();
        assert_eq!(detect_format(&path), Some(SourceFormat::Xyz));
        let _ = fs::remove_file(&path);

        // Nonexistent files still resolve by extension
        assert_eq!(detect_format(Path::new("missing.obj")), Some(SourceFormat::Obj));
        assert_eq!(detect_format(Path::new("model.stl")), None);
    }
}
