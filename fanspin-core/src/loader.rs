//! Mesh file loading with format detection.
//!
//! STL (binary or ASCII) and VRML (`.wrl`) are supported. The format is taken
//! from the file extension when it is recognised and sniffed from the content
//! otherwise.

use std::path::Path;

use thiserror::Error;

use crate::geometry::Mesh;
use crate::{stl, vrml};

/// Errors produced while decoding mesh data.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("{format} syntax error: {message}")]
    Syntax {
        format: &'static str,
        message: String,
    },

    #[error("Unexpected end of data in {0}")]
    Truncated(&'static str),
}

/// Errors that can occur while loading a mesh file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("VRML data is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Unknown mesh format")]
    UnknownFormat,
}

/// The mesh format that was detected and used for loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Vrml,
}

impl MeshFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "stl" => Some(Self::Stl),
            "wrl" | "vrml" => Some(Self::Vrml),
            _ => None,
        }
    }

    pub fn sniff(data: &[u8]) -> Option<Self> {
        let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
        let data = &data[start..];
        if data.starts_with(b"#VRML") {
            Some(Self::Vrml)
        } else if data.starts_with(b"solid") || data.len() >= 84 {
            Some(Self::Stl)
        } else {
            None
        }
    }
}

/// Decode mesh bytes in the given format.
pub fn parse_mesh(data: &[u8], format: MeshFormat) -> Result<Mesh, LoadError> {
    let mesh = match format {
        MeshFormat::Stl => stl::parse_stl(data)?,
        MeshFormat::Vrml => vrml::parse_vrml(std::str::from_utf8(data)?)?,
    };
    Ok(mesh)
}

/// Read and decode a mesh file.
pub fn load_mesh(path: &Path) -> Result<(Mesh, MeshFormat), LoadError> {
    let data = std::fs::read(path)?;
    let format = MeshFormat::from_extension(path)
        .or_else(|| MeshFormat::sniff(&data))
        .ok_or(LoadError::UnknownFormat)?;
    let mesh = parse_mesh(&data, format)?;
    Ok((mesh, format))
}

/// Load a mesh, substituting an empty one when the file cannot be used.
///
/// `label` names the part in log messages ("Blade", "Frame").
pub fn load_mesh_or_empty(path: &Path, label: &str) -> Mesh {
    match load_mesh(path) {
        Ok((mesh, format)) => {
            log::info!(
                "{label} successfully imported from {} ({format:?}, {} triangles)",
                path.display(),
                mesh.triangle_count()
            );
            mesh
        }
        Err(e) => {
            log::warn!(
                "Cannot open {label} input file {}: {e}; replacing it with an empty scene",
                path.display()
            );
            Mesh::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_extension(Path::new("fan blade.WRL")), Some(MeshFormat::Vrml));
        assert_eq!(MeshFormat::from_extension(Path::new("frame.stl")), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_extension(Path::new("frame.iv")), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(MeshFormat::sniff(b"\n#VRML V2.0 utf8"), Some(MeshFormat::Vrml));
        assert_eq!(MeshFormat::sniff(b"solid part"), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::sniff(&[0u8; 84]), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::sniff(b"hello"), None);
    }

    #[test]
    fn test_parse_vrml_rejects_invalid_utf8() {
        let result = parse_mesh(&[b'#', 0xff, 0xfe], MeshFormat::Vrml);
        assert!(matches!(result, Err(LoadError::Encoding(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_empty() {
        let path = PathBuf::from("definitely/not/here/blade.wrl");
        assert!(matches!(load_mesh(&path), Err(LoadError::Io(_))));
        assert!(load_mesh_or_empty(&path, "Blade").is_empty());
    }

    #[test]
    fn test_load_written_file() {
        let path = std::env::temp_dir().join(format!("fanspin-loader-{}.wrl", std::process::id()));
        std::fs::write(
            &path,
            "#VRML V2.0 utf8\nShape { geometry IndexedFaceSet { coord Coordinate { point [0 0 0, 1 0 0, 0 1 0] } coordIndex [0 1 2 -1] } }\n",
        )
        .unwrap();

        let loaded = load_mesh(&path);
        std::fs::remove_file(&path).unwrap();

        let (mesh, format) = loaded.unwrap();
        assert_eq!(format, MeshFormat::Vrml);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
