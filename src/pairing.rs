//! Matching distorted images to their references by file name.
//!
//! A distorted file belongs to the reference whose lowercase stem is a
//! prefix of its own lowercase stem (`kodim01.png` owns
//! `kodim01_q30.jpg`). When several reference stems match, the longest wins.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Error, Result};

/// Extensions the decoder can read.
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// One reference / distorted pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub reference: PathBuf,
    pub distorted: PathBuf,
}

impl ImagePair {
    /// File name of the reference, for reports.
    #[must_use]
    pub fn reference_name(&self) -> String {
        file_name(&self.reference)
    }

    /// File name of the distorted image, for reports.
    #[must_use]
    pub fn distorted_name(&self) -> String {
        file_name(&self.distorted)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

fn stem_lower(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Sort paths by lowercase file name.
pub fn sort_case_insensitive(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| file_name(p).to_lowercase());
}

/// List the image files directly inside `dir`, sorted case-insensitively.
/// Hidden files are skipped.
///
/// # Errors
///
/// Returns [`Error::Pairing`] if `dir` is not a readable directory.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Pairing(format!("Not a directory: {}", dir.display())));
    }
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::Pairing(format!("Failed to read directory {}: {e}", dir.display())))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::Pairing(format!("Failed to read entry in {}: {e}", dir.display())))?
            .path();
        let hidden = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with('.'));
        if path.is_file() && !hidden && is_image_file(&path) {
            images.push(path);
        }
    }
    sort_case_insensitive(&mut images);
    Ok(images)
}

/// Pair every distorted file with its reference. Distorted files that match
/// no reference are skipped with a warning. The output follows the order of
/// `distorted`.
#[must_use]
pub fn pair_by_stem(references: &[PathBuf], distorted: &[PathBuf]) -> Vec<ImagePair> {
    let ref_stems: Vec<(String, &PathBuf)> = references
        .iter()
        .map(|p| (stem_lower(p), p))
        .filter(|(s, _)| !s.is_empty())
        .collect();

    let mut pairs = Vec::with_capacity(distorted.len());
    for dist in distorted {
        let stem = stem_lower(dist);
        let best = ref_stems
            .iter()
            .filter(|(r, _)| stem.starts_with(r.as_str()))
            .max_by_key(|(r, _)| r.len());
        match best {
            Some((_, reference)) => pairs.push(ImagePair {
                reference: (*reference).clone(),
                distorted: dist.clone(),
            }),
            None => warn!("no reference for {}", dist.display()),
        }
    }
    pairs
}

/// Collect and pair the images of two directories.
///
/// # Errors
///
/// Returns an error if either directory cannot be listed.
pub fn discover_pairs(reference_dir: &Path, distorted_dir: &Path) -> Result<Vec<ImagePair>> {
    let references = collect_images(reference_dir)?;
    let distorted = collect_images(distorted_dir)?;
    Ok(pair_by_stem(&references, &distorted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_prefix_pairing_is_case_insensitive() {
        let refs = paths(&["ref/Kodim01.png", "ref/kodim02.png"]);
        let dists = paths(&["d/kodim01_q30.jpg", "d/KODIM02-webp.png", "d/other.png"]);
        let pairs = pair_by_stem(&refs, &dists);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].reference, PathBuf::from("ref/Kodim01.png"));
        assert_eq!(pairs[1].reference_name(), "kodim02.png");
        assert_eq!(pairs[1].distorted_name(), "KODIM02-webp.png");
    }

    #[test]
    fn test_longest_reference_stem_wins() {
        let refs = paths(&["img.png", "img1.png"]);
        let pairs = pair_by_stem(&refs, &paths(&["img1_q50.jpg", "img_q50.jpg"]));
        assert_eq!(pairs[0].reference, PathBuf::from("img1.png"));
        assert_eq!(pairs[1].reference, PathBuf::from("img.png"));
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "A.jpg", "c.txt", ".hidden.png", "d.jpeg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.png")).unwrap();

        let found: Vec<String> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(found, vec!["A.jpg", "b.PNG", "d.jpeg"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(collect_images(&missing), Err(Error::Pairing(_))));
        assert!(discover_pairs(&missing, dir.path()).is_err());
    }
}
