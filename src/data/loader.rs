// ============================================================
// Layer 4 — Paired Image Loader
// ============================================================
// Scans a dataset root laid out as
//
//   <root>/<input_subdir>/img_001.png
//   <root>/<target_subdir>/img_001.png
//
// and pairs files by name. The input directory drives the scan:
// every input image must have a target with the same name.
// Non-image files (notes, thumbnails db, etc.) are skipped.

use anyhow::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::domain::sample::ImagePair;
use crate::domain::traits::PairSource;

/// Extensions the `image` crate is built to decode here
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset directory missing: {path}")]
    MissingDir { path: PathBuf },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no target image for input {input} (expected {expected})")]
    MissingTarget { input: PathBuf, expected: PathBuf },

    #[error("no image pairs found under {path}")]
    Empty { path: PathBuf },

    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Returns true when the path has a supported image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pairs images from two sibling directories under one root.
pub struct PairedImageSource {
    root:          PathBuf,
    input_subdir:  String,
    target_subdir: String,
}

impl PairedImageSource {
    pub fn new(
        root:          impl Into<PathBuf>,
        input_subdir:  impl Into<String>,
        target_subdir: impl Into<String>,
    ) -> Self {
        Self {
            root:          root.into(),
            input_subdir:  input_subdir.into(),
            target_subdir: target_subdir.into(),
        }
    }

    fn scan(&self) -> Result<Vec<ImagePair>, DataError> {
        let input_dir  = self.root.join(&self.input_subdir);
        let target_dir = self.root.join(&self.target_subdir);

        for dir in [&input_dir, &target_dir] {
            if !dir.is_dir() {
                return Err(DataError::MissingDir { path: dir.clone() });
            }
        }

        let entries = fs::read_dir(&input_dir).map_err(|source| DataError::Io {
            path: input_dir.clone(),
            source,
        })?;

        let mut pairs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DataError::Io {
                path: input_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || !is_image_file(&path) {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!("Skipping non UTF-8 file name: {}", path.display());
                continue;
            };

            let target = target_dir.join(name);
            if !target.is_file() {
                return Err(DataError::MissingTarget { input: path.clone(), expected: target });
            }
            check_header(&path)?;
            check_header(&target)?;
            pairs.push(ImagePair::new(name, path.clone(), target));
        }

        if pairs.is_empty() {
            return Err(DataError::Empty { path: input_dir });
        }

        // read_dir order is platform dependent; keep evaluation order stable
        pairs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pairs)
    }
}

impl PairSource for PairedImageSource {
    fn pairs(&self) -> Result<Vec<ImagePair>> {
        let pairs = self.scan()?;
        tracing::info!(
            "Found {} image pairs under '{}'",
            pairs.len(),
            self.root.display()
        );
        Ok(pairs)
    }
}

/// Read only the image header, so unreadable files fail the scan
/// rather than a loader pass.
fn check_header(path: &Path) -> Result<(), DataError> {
    image::image_dimensions(path)
        .map(|_| ())
        .map_err(|source| DataError::Image { path: path.to_path_buf(), source })
}

/// Decode an image file as 8-bit RGB.
pub fn open_rgb(path: &Path) -> Result<image::RgbImage, DataError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| DataError::Image { path: path.to_path_buf(), source })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Write a solid-colour pair named `name` into root/input and root/target.
    pub(crate) fn write_pair(root: &Path, name: &str, w: u32, h: u32, shade: u8) {
        fs::create_dir_all(root.join("input")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        let inp = RgbImage::from_fn(w, h, |x, y| Rgb([shade, (x * 7 % 255) as u8, (y * 5 % 255) as u8]));
        let tar = RgbImage::from_fn(w, h, |x, _| Rgb([shade / 2, 128, (x * 3 % 255) as u8]));
        inp.save(root.join("input").join(name)).unwrap();
        tar.save(root.join("target").join(name)).unwrap();
    }

    #[test]
    fn test_pairs_are_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        write_pair(tmp.path(), "b.png", 4, 4, 10);
        write_pair(tmp.path(), "a.png", 4, 4, 20);
        fs::write(tmp.path().join("input").join("notes.txt"), "ignore me").unwrap();

        let src   = PairedImageSource::new(tmp.path(), "input", "target");
        let pairs = src.pairs().unwrap();

        let names: Vec<&str> = pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert!(pairs[0].target.ends_with("target/a.png"));
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_pair(tmp.path(), "a.png", 4, 4, 20);
        fs::remove_file(tmp.path().join("target").join("a.png")).unwrap();

        let err = PairedImageSource::new(tmp.path(), "input", "target").scan().unwrap_err();
        assert!(matches!(err, DataError::MissingTarget { .. }));
    }

    #[test]
    fn test_undecodable_file_fails_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_pair(tmp.path(), name, 4, 4, 30);
        }
        fs::write(tmp.path().join("input").join("b.png"), b"not a png").unwrap();

        let err = PairedImageSource::new(tmp.path(), "input", "target").scan().unwrap_err();
        match err {
            DataError::Image { path, .. } => assert!(path.ends_with("input/b.png")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_dir_and_empty_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PairedImageSource::new(tmp.path(), "input", "target").scan().unwrap_err();
        assert!(matches!(err, DataError::MissingDir { .. }));

        fs::create_dir_all(tmp.path().join("input")).unwrap();
        fs::create_dir_all(tmp.path().join("target")).unwrap();
        let err = PairedImageSource::new(tmp.path(), "input", "target").scan().unwrap_err();
        assert!(matches!(err, DataError::Empty { .. }));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(is_image_file(Path::new("x.PNG")));
        assert!(is_image_file(Path::new("x.jpeg")));
        assert!(!is_image_file(Path::new("x.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
