use crate::bundler::Bundler;
use crate::config::BundleConfig;
use crate::ui;
use anyhow::Result;
use std::path::Path;

pub fn execute(root: &Path, config: BundleConfig) -> Result<()> {
    let staging_name = config.staging_dir.clone();
    let archive_name = config.archive.clone();
    let bundler = Bundler::new(root, config)?;

    let progress = ui::Progress::new("Bundling", root.display().to_string());
    let report = match bundler.run() {
        Ok(report) => report,
        Err(err) => {
            // The full chain goes to the status line; main only reports the summary.
            progress.fail("Failed", format!("{err:#}"));
            anyhow::bail!("Failed to bundle {}", root.display());
        }
    };
    progress.success(
        "Bundled",
        Some(format!("({} files)", report.archive_entries.len())),
    );

    if !report.skipped.is_empty() {
        tracing::info!(skipped = ?report.skipped, "manifest entries not found");
    }

    ui::success(
        "Packaged",
        format!("Portable package created in: {staging_name}"),
    );
    ui::success("Archived", format!("Zip file created: {archive_name}"));
    ui::info(format!(
        "This zip file can be shared with others!\nsha256 {}",
        report.archive_sha256
    ));

    Ok(())
}
