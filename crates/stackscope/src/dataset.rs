//! Loading layer stacks from disk.
//!
//! A dataset is a directory of same-sized images, one per Y-layer, ordered by
//! file name. An optional plain-text `aspect_ratio` file holds the vertical
//! stretch factor of the stack.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops;
use stackscope_core::{Result, StackscopeError, DEFAULT_ASPECT_RATIO};
use stackscope_structures::VoxelVolume;

/// Name of the sidecar file holding the vertical stretch factor.
pub const ASPECT_RATIO_FILE: &str = "aspect_ratio";

/// File extensions recognized as layer images (compared case-insensitively).
pub const LAYER_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// A decoded dataset directory.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Directory the dataset was read from.
    pub root: PathBuf,
    /// Layer files in load order.
    pub files: Vec<PathBuf>,
    /// The decoded volume.
    pub volume: VoxelVolume,
}

/// Loads a dataset, falling back to the default aspect ratio of 2.8.
pub fn load_dataset_dir(path: impl AsRef<Path>) -> Result<Dataset> {
    load_dataset_dir_with_aspect(path, DEFAULT_ASPECT_RATIO)
}

/// Loads a dataset, using `default_aspect` if the sidecar is missing or invalid.
pub fn load_dataset_dir_with_aspect(path: impl AsRef<Path>, default_aspect: f32) -> Result<Dataset> {
    let root = path.as_ref().to_path_buf();
    let files = layer_files(&root)?;

    let layers = files
        .iter()
        .map(|file| decode_layer(file))
        .collect::<Result<Vec<_>>>()?;
    let aspect = read_aspect_ratio(&root, default_aspect);
    let volume = VoxelVolume::load(layers, aspect)?;

    log::info!(
        "loaded dataset '{}': {} layers of {}x{}, aspect ratio {aspect}",
        root.display(),
        volume.layer_count(),
        volume.width(),
        volume.height()
    );
    Ok(Dataset {
        root,
        files,
        volume,
    })
}

/// Lists the layer images of a dataset directory in file-name order.
pub fn layer_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_layer_image(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_layer_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            LAYER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Decodes one layer into RGBA8, flipped so row 0 is the bottom of the image.
fn decode_layer(path: &Path) -> Result<image::RgbaImage> {
    let decoded = image::open(path).map_err(|err| StackscopeError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let mut rgba = decoded.to_rgba8();
    imageops::flip_vertical_in_place(&mut rgba);
    Ok(rgba)
}

/// Reads the aspect-ratio sidecar, warning and falling back on anything unusable.
pub fn read_aspect_ratio(dir: &Path, default_aspect: f32) -> f32 {
    let path = dir.join(ASPECT_RATIO_FILE);
    let Ok(text) = fs::read_to_string(&path) else {
        log::warn!(
            "no '{ASPECT_RATIO_FILE}' file in '{}', using aspect ratio {default_aspect}",
            dir.display()
        );
        return default_aspect;
    };

    match text.trim().parse::<f32>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => {
            log::warn!(
                "could not parse '{}' as an aspect ratio, using {default_aspect}",
                path.display()
            );
            default_aspect
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_layer_image() {
        assert!(is_layer_image(Path::new("a/001.png")));
        assert!(is_layer_image(Path::new("a/001.TIFF")));
        assert!(!is_layer_image(Path::new("a/aspect_ratio")));
        assert!(!is_layer_image(Path::new("a/notes.txt")));
    }

    #[test]
    fn test_aspect_ratio_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_aspect_ratio(dir.path(), 2.8), 2.8);

        fs::write(dir.path().join(ASPECT_RATIO_FILE), " 1.5\n").unwrap();
        assert_eq!(read_aspect_ratio(dir.path(), 2.8), 1.5);

        fs::write(dir.path().join(ASPECT_RATIO_FILE), "tall").unwrap();
        assert_eq!(read_aspect_ratio(dir.path(), 2.8), 2.8);

        fs::write(dir.path().join(ASPECT_RATIO_FILE), "-3").unwrap();
        assert_eq!(read_aspect_ratio(dir.path(), 2.0), 2.0);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_dataset_dir(dir.path()),
            Err(StackscopeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_undecodable_layer() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("000.png"), b"not a png").unwrap();
        match load_dataset_dir(dir.path()) {
            Err(StackscopeError::Decode { path, .. }) => assert!(path.ends_with("000.png")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
