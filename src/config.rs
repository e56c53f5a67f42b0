//! Environment-backed settings.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. CLI flags override whatever is found here.

use std::path::PathBuf;

pub const ENV_ARTIFACT_DIR: &str = "OBESITY_ARTIFACT_DIR";
pub const ENV_DATA_URL: &str = "OBESITY_DATA_URL";
pub const ENV_OUTPUT_DIR: &str = "OBESITY_OUTPUT_DIR";

pub const DEFAULT_ARTIFACT_DIR: &str = "models";
pub const DEFAULT_OUTPUT_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where fitted artifacts are written and loaded from.
    pub artifact_dir: PathBuf,
    /// Raw atlas CSV location for `fetch`.
    pub data_url: Option<String>,
    /// Where fetched, structured and exported tables go.
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            artifact_dir: non_empty(ENV_ARTIFACT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
            data_url: non_empty(ENV_DATA_URL),
            output_dir: non_empty(ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let env: HashMap<&str, &str> = HashMap::from([(ENV_OUTPUT_DIR, "  ")]);
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.artifact_dir, PathBuf::from("models"));
        assert_eq!(s.output_dir, PathBuf::from("data"));
        assert_eq!(s.data_url, None);
    }

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ARTIFACT_DIR, "/srv/obesity/models"),
            (ENV_DATA_URL, "https://example.org/atlas.csv"),
        ]);
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.artifact_dir, PathBuf::from("/srv/obesity/models"));
        assert_eq!(s.data_url.as_deref(), Some("https://example.org/atlas.csv"));
    }
}
