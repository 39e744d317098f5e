use serde::{Deserialize, Serialize};
use std::fmt;

/// File name of the generated dependency manifest
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// A single pip requirement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as published on PyPI
    pub name: String,
    /// Exact pinned version (unpinned when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Requirement {
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    pub fn unpinned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}=={}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// Dependencies of the packaged app.
///
/// numpy and matplotlib are intentionally left unpinned.
pub fn default_requirements() -> Vec<Requirement> {
    vec![
        Requirement::pinned("opencv-python", "4.9.0.80"),
        Requirement::pinned("mediapipe", "0.10.11"),
        Requirement::pinned("tensorflow", "2.13.0"),
        Requirement::unpinned("numpy"),
        Requirement::unpinned("matplotlib"),
    ]
}

/// Render requirements in `requirements.txt` format, one per line
pub fn render(requirements: &[Requirement]) -> String {
    requirements
        .iter()
        .map(|requirement| format!("{requirement}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Requirement::pinned("opencv-python", "4.9.0.80"), "opencv-python==4.9.0.80")]
    #[case(Requirement::pinned("tensorflow", "2.13.0"), "tensorflow==2.13.0")]
    #[case(Requirement::unpinned("numpy"), "numpy")]
    fn test_requirement_display(#[case] requirement: Requirement, #[case] expected: &str) {
        assert_eq!(requirement.to_string(), expected);
    }

    #[test]
    fn test_render_default_requirements() {
        let rendered = render(&default_requirements());
        assert_eq!(
            rendered,
            "opencv-python==4.9.0.80\n\
             mediapipe==0.10.11\n\
             tensorflow==2.13.0\n\
             numpy\n\
             matplotlib\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_requirement_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            requirements: Vec<Requirement>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[requirements]]
            name = "mediapipe"
            version = "0.10.11"

            [[requirements]]
            name = "numpy"
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.requirements,
            vec![
                Requirement::pinned("mediapipe", "0.10.11"),
                Requirement::unpinned("numpy"),
            ]
        );
    }
}
