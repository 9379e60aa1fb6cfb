//! Sample discovery and random subset selection.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::ConfigError;

/// One image file taking part in an evaluation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf,
    /// File name, used in log messages and per-sample reports.
    pub name: String,
}

impl Sample {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }

    /// Marker id encoded in the file name, see [`parse_expected_id`].
    pub fn expected_id(&self) -> Option<u32> {
        parse_expected_id(&self.name)
    }
}

/// Marker id encoded in a file name: the token between the last `_` and the
/// extension (`scene_012_37.png` -> 37). Without an underscore the whole stem
/// is used.
pub fn parse_expected_id(file_name: &str) -> Option<u32> {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    let token = match stem.rfind('_') {
        Some(us) => &stem[us + 1..],
        None => stem,
    };
    token.parse().ok()
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// List the files in `folder` (non-recursive) whose extension matches one of
/// `extensions`, case-insensitively. Extensions may be given with or without
/// a leading dot. The result is sorted and free of duplicates.
///
/// An extension with no matching file logs a warning; it is not an error.
pub fn discover_samples(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let read_err = |source| ConfigError::ImageFolder {
        path: folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut out = Vec::new();
    for ext in extensions.iter().map(|e| normalize_extension(e)) {
        let before = out.len();
        out.extend(
            files
                .iter()
                .filter(|p| {
                    p.extension()
                        .map(|e| e.to_string_lossy().to_ascii_lowercase() == ext)
                        .unwrap_or(false)
                })
                .cloned(),
        );
        if out.len() == before {
            log::warn!("no .{ext} files in {}", folder.display());
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Shuffle `paths` and keep the first `floor(fraction * len)`.
///
/// With a `seed` the selection is reproducible; otherwise the generator is
/// seeded from system entropy.
pub fn select_samples(mut paths: Vec<PathBuf>, fraction: f64, seed: Option<u64>) -> Vec<Sample> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    paths.shuffle(&mut rng);

    let keep = ((fraction.clamp(0.0, 1.0) * paths.len() as f64).floor() as usize).min(paths.len());
    paths.truncate(keep);
    paths.into_iter().map(Sample::from_path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn expected_id_from_file_name() {
        assert_eq!(parse_expected_id("scene_012_37.png"), Some(37));
        assert_eq!(parse_expected_id("tag_0.jpg"), Some(0));
        assert_eq!(parse_expected_id("42.png"), Some(42));
        assert_eq!(parse_expected_id("tag_a.png"), None);
        assert_eq!(parse_expected_id("tag_.png"), None);
    }

    #[test]
    fn discovery_matches_extensions_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b_1.png");
        touch(tmp.path(), "a_2.PNG");
        touch(tmp.path(), "c_3.jpg");
        touch(tmp.path(), "notes.txt");
        fs::create_dir(tmp.path().join("nested.png")).unwrap();

        let found = discover_samples(tmp.path(), &["png".into(), ".JPG".into(), "bmp".into()])
            .unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a_2.PNG", "b_1.png", "c_3.jpg"]);
    }

    #[test]
    fn repeated_extension_does_not_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "x_1.png");
        let found = discover_samples(tmp.path(), &["png".into(), "PNG".into()]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_folder_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover_samples(&tmp.path().join("nope"), &["png".into()]).unwrap_err();
        assert!(matches!(err, ConfigError::ImageFolder { .. }));
    }

    #[test]
    fn selection_takes_floor_of_fraction() {
        let paths: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("img_{i}.png"))).collect();
        assert_eq!(select_samples(paths.clone(), 0.25, Some(1)).len(), 2);
        assert_eq!(select_samples(paths.clone(), 1.0, None).len(), 10);
        assert_eq!(select_samples(paths.clone(), 0.05, Some(1)).len(), 0);
    }

    #[test]
    fn seeded_selection_is_reproducible() {
        let paths: Vec<PathBuf> = (0..50).map(|i| PathBuf::from(format!("img_{i}.png"))).collect();
        let a = select_samples(paths.clone(), 0.5, Some(7));
        let b = select_samples(paths, 0.5, Some(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 25);
    }
}
