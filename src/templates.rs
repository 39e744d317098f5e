use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Static file written into every bundle
pub struct TemplateFile {
    /// Path relative to the staging root
    pub path: &'static str,
    /// File content embedded at compile time
    pub content: &'static str,
}

/// Launchers and usage notes embedded from templates/.
///
/// To ship another helper file, add it here.
pub const TEMPLATE_FILES: &[TemplateFile] = &[
    TemplateFile {
        path: "setup.bat",
        content: include_str!("../templates/setup.bat"),
    },
    TemplateFile {
        path: "run.bat",
        content: include_str!("../templates/run.bat"),
    },
    TemplateFile {
        path: "PORTABLE_README.txt",
        content: include_str!("../templates/PORTABLE_README.txt"),
    },
];

/// Write every template into `dest`, returning the written paths (relative)
pub fn write_all(dest: &Path) -> Result<Vec<String>> {
    let mut written = Vec::with_capacity(TEMPLATE_FILES.len());

    for template in TEMPLATE_FILES {
        let file_path = dest.join(template.path);
        fs::write(&file_path, template.content)
            .with_context(|| format!("Failed to write template file {:?}", file_path))?;
        tracing::debug!(path = template.path, "wrote template");
        written.push(template.path.to_string());
    }

    Ok(written)
}
