use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::config::BundleConfig;
use crate::requirements::{self, REQUIREMENTS_FILE};
use crate::templates;
use crate::util::fs::{copy_dir, copy_file};

/// Outcome of a bundling run
#[derive(Debug, Clone)]
pub struct BundleReport {
    /// Staging directory holding the assembled bundle
    pub staging_dir: PathBuf,
    /// Zip archive written next to the staging directory
    pub archive: PathBuf,
    /// Manifest entries copied into the bundle
    pub copied: Vec<String>,
    /// Manifest entries that are absent or not a regular file or directory
    pub skipped: Vec<String>,
    /// Generated helper files, relative to the staging directory
    pub generated: Vec<String>,
    /// Archive entry names in write order
    pub archive_entries: Vec<String>,
    /// Hex SHA-256 of the archive
    pub archive_sha256: String,
}

/// Assembles the portable bundle for a working directory.
///
/// A run always resets the staging directory, copies the manifest entries
/// that exist, writes the generated helper files and zips the result. Any
/// filesystem error aborts the run and may leave partial output behind; the
/// next run starts from scratch.
#[derive(Debug)]
pub struct Bundler {
    root: PathBuf,
    config: BundleConfig,
}

impl Bundler {
    pub fn new(root: impl Into<PathBuf>, config: BundleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: root.into(),
            config,
        })
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(&self.config.staging_dir)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(&self.config.archive)
    }

    /// Run every stage in order
    pub fn run(&self) -> Result<BundleReport> {
        let staging_dir = self.staging_dir();
        let archive_path = self.archive_path();

        self.reset(&staging_dir)?;
        let (copied, skipped) = self.copy_inputs(&staging_dir)?;
        let generated = self.generate(&staging_dir)?;

        tracing::debug!(archive = ?archive_path, "compressing bundle");
        let archive_entries = archive::build_zip(&staging_dir, &archive_path)?;
        let archive_sha256 = archive::sha256_file(&archive_path)?;

        tracing::info!(
            entries = archive_entries.len(),
            sha256 = %archive_sha256,
            "bundle complete"
        );

        Ok(BundleReport {
            staging_dir,
            archive: archive_path,
            copied,
            skipped,
            generated,
            archive_entries,
            archive_sha256,
        })
    }

    /// Remove any previous staging directory and recreate it empty
    fn reset(&self, staging_dir: &Path) -> Result<()> {
        if staging_dir.exists() {
            tracing::debug!(path = ?staging_dir, "removing previous staging directory");
            fs::remove_dir_all(staging_dir)
                .with_context(|| format!("Failed to remove {:?}", staging_dir))?;
        }

        fs::create_dir_all(staging_dir)
            .with_context(|| format!("Failed to create staging directory {:?}", staging_dir))
    }

    fn copy_inputs(&self, staging_dir: &Path) -> Result<(Vec<String>, Vec<String>)> {
        let mut copied = Vec::new();
        let mut skipped = Vec::new();

        for name in &self.config.include {
            let source = self.root.join(name);
            let target = staging_dir.join(name);

            // Follows symlinks, so a linked model directory is copied as a directory.
            let metadata = match fs::metadata(&source) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(entry = %name, "not present, skipping");
                    skipped.push(name.clone());
                    continue;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to stat {:?}", source));
                }
            };

            if metadata.is_dir() {
                let files = copy_dir(&source, &target)?;
                tracing::debug!(entry = %name, files, "copied directory");
            } else if metadata.is_file() {
                copy_file(&source, &target)?;
                tracing::debug!(entry = %name, "copied file");
            } else {
                tracing::warn!(entry = %name, "not a regular file or directory, skipping");
                skipped.push(name.clone());
                continue;
            }
            copied.push(name.clone());
        }

        Ok((copied, skipped))
    }

    fn generate(&self, staging_dir: &Path) -> Result<Vec<String>> {
        let requirements_path = staging_dir.join(REQUIREMENTS_FILE);
        fs::write(
            &requirements_path,
            requirements::render(&self.config.requirements),
        )
        .with_context(|| format!("Failed to write {:?}", requirements_path))?;

        let mut generated = vec![REQUIREMENTS_FILE.to_string()];
        generated.extend(templates::write_all(staging_dir)?);
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use std::collections::BTreeSet;
    use std::fs::File;
    use tempfile::TempDir;
    use zip::ZipArchive;

    const GENERATED: [&str; 4] = [
        "PORTABLE_README.txt",
        "requirements.txt",
        "run.bat",
        "setup.bat",
    ];

    fn full_project(root: &Path) {
        fs::write(root.join("app.py"), "import cv2\n").unwrap();
        fs::write(root.join("README.md"), "# Hand Gesture Recognition\n").unwrap();
        fs::create_dir_all(root.join("utils")).unwrap();
        fs::write(root.join("utils/cvfpscalc.py"), "class CvFpsCalc: pass\n").unwrap();
        fs::create_dir_all(root.join("model/keypoint_classifier")).unwrap();
        fs::write(
            root.join("model/keypoint_classifier/keypoint_classifier_label.csv"),
            "Open\nClose\nPointer\n",
        )
        .unwrap();
    }

    fn bundler(root: &Path) -> Bundler {
        Bundler::new(root, BundleConfig::default()).unwrap()
    }

    fn top_level(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn archive_names(path: &Path) -> BTreeSet<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|index| archive.by_index(index).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_full_project_bundle() {
        let temp = TempDir::new().unwrap();
        full_project(temp.path());

        let report = bundler(temp.path()).run().unwrap();

        assert_eq!(report.copied, vec!["app.py", "utils", "model", "README.md"]);
        assert!(report.skipped.is_empty());
        assert_eq!(
            report.generated,
            vec!["requirements.txt", "setup.bat", "run.bat", "PORTABLE_README.txt"]
        );

        let staging = temp.path().join("HandGestureRecognition_Portable");
        assert_eq!(report.staging_dir, staging);
        assert!(staging.join("utils/cvfpscalc.py").is_file());
        assert!(staging
            .join("model/keypoint_classifier/keypoint_classifier_label.csv")
            .is_file());

        let names = archive_names(&temp.path().join("HandGestureRecognition_Portable.zip"));
        assert!(names.contains("utils/cvfpscalc.py"));
        assert!(names.contains("model/keypoint_classifier/keypoint_classifier_label.csv"));
        assert_eq!(names.len(), 8);
        assert_eq!(report.archive_sha256.len(), 64);
    }

    #[test]
    fn test_entry_point_and_readme_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "import cv2\n").unwrap();
        fs::write(temp.path().join("README.md"), "readme\n").unwrap();

        let report = bundler(temp.path()).run().unwrap();

        let mut expected: BTreeSet<String> = GENERATED.iter().map(|s| s.to_string()).collect();
        expected.insert("app.py".to_string());
        expected.insert("README.md".to_string());

        assert_eq!(top_level(&report.staging_dir), expected);
        assert_eq!(report.skipped, vec!["utils", "model"]);
        assert_eq!(archive_names(&report.archive), expected);
        assert_eq!(report.archive_entries.len(), 6);
    }

    #[test]
    fn test_empty_project_gets_generated_files_only() {
        let temp = TempDir::new().unwrap();

        let report = bundler(temp.path()).run().unwrap();

        let expected: BTreeSet<String> = GENERATED.iter().map(|s| s.to_string()).collect();
        assert!(report.copied.is_empty());
        assert_eq!(top_level(&report.staging_dir), expected);
        assert_eq!(archive_names(&report.archive), expected);
    }

    #[test]
    fn test_reset_removes_stale_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "import cv2\n").unwrap();
        let staging = temp.path().join("HandGestureRecognition_Portable");
        fs::create_dir_all(staging.join("old")).unwrap();
        fs::write(staging.join("stale.txt"), "left over").unwrap();
        fs::write(staging.join("old/leftover.py"), "").unwrap();

        let report = bundler(temp.path()).run().unwrap();

        assert!(!staging.join("stale.txt").exists());
        assert!(!staging.join("old").exists());
        let names = archive_names(&report.archive);
        assert!(!names.contains("stale.txt"));
        assert!(!names.contains("old/leftover.py"));
    }

    #[test]
    fn test_run_is_idempotent() {
        let temp = TempDir::new().unwrap();
        full_project(temp.path());
        let bundler = bundler(temp.path());

        let first = bundler.run().unwrap();
        let first_generated: Vec<Vec<u8>> = GENERATED
            .iter()
            .map(|name| fs::read(first.staging_dir.join(name)).unwrap())
            .collect();

        let second = bundler.run().unwrap();
        let second_generated: Vec<Vec<u8>> = GENERATED
            .iter()
            .map(|name| fs::read(second.staging_dir.join(name)).unwrap())
            .collect();

        assert_eq!(first_generated, second_generated);
        assert_eq!(first.archive_entries, second.archive_entries);
    }

    #[test]
    fn test_requirements_pins() {
        let temp = TempDir::new().unwrap();
        let report = bundler(temp.path()).run().unwrap();

        let requirements =
            fs::read_to_string(report.staging_dir.join("requirements.txt")).unwrap();
        assert!(requirements.contains("opencv-python==4.9.0.80"));
        assert!(requirements.contains("tensorflow==2.13.0"));
        assert!(requirements.contains("mediapipe==0.10.11"));
        assert!(requirements.lines().any(|line| line == "numpy"));
        assert!(requirements.lines().any(|line| line == "matplotlib"));
    }

    #[test]
    fn test_generated_files_replace_copied_inputs() {
        let temp = TempDir::new().unwrap();
        let mut config = BundleConfig::default();
        config.include.push("run.bat".to_string());
        fs::write(temp.path().join("run.bat"), "echo custom\n").unwrap();

        let report = Bundler::new(temp.path(), config).unwrap().run().unwrap();

        let run = fs::read_to_string(report.staging_dir.join("run.bat")).unwrap();
        assert!(run.contains("python app.py %*"));
    }

    #[test]
    fn test_custom_output_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "").unwrap();
        let config = BundleConfig {
            staging_dir: "Bundle".to_string(),
            archive: "bundle.zip".to_string(),
            ..BundleConfig::default()
        };

        let report = Bundler::new(temp.path(), config).unwrap().run().unwrap();

        assert_eq!(report.staging_dir, temp.path().join("Bundle"));
        assert!(temp.path().join("bundle.zip").is_file());
        assert!(!temp.path().join("HandGestureRecognition_Portable").exists());
    }

    #[test]
    fn test_invalid_config_rejected_before_touching_disk() {
        let temp = TempDir::new().unwrap();
        let config = BundleConfig {
            staging_dir: "../escape".to_string(),
            ..BundleConfig::default()
        };

        let err = Bundler::new(temp.path(), config).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    fn make_fifo(path: &Path) {
        let status = std::process::Command::new("mkfifo").arg(path).status().unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_special_file_entry_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "import cv2\n").unwrap();
        make_fifo(&temp.path().join("camera.pipe"));
        let mut config = BundleConfig::default();
        config.include.push("camera.pipe".to_string());

        let report = Bundler::new(temp.path(), config).unwrap().run().unwrap();

        assert!(report.skipped.contains(&"camera.pipe".to_string()));
        assert!(!report.copied.contains(&"camera.pipe".to_string()));
        assert!(!report.staging_dir.join("camera.pipe").exists());
        assert!(!archive_names(&report.archive).contains("camera.pipe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_special_file_inside_directory_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("utils")).unwrap();
        fs::write(temp.path().join("utils/cvfpscalc.py"), "").unwrap();
        make_fifo(&temp.path().join("utils/events.pipe"));

        let report = bundler(temp.path()).run().unwrap();

        assert!(report.copied.contains(&"utils".to_string()));
        assert!(report.staging_dir.join("utils/cvfpscalc.py").is_file());
        assert!(!report.staging_dir.join("utils/events.pipe").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_path_blocked_by_directory_fails() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("HandGestureRecognition_Portable.zip")).unwrap();

        let err = bundler(temp.path()).run().unwrap_err();
        assert!(err.to_string().contains("Failed to create archive"));
    }
}
