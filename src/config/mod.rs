use std::env;
use std::path::PathBuf;

/// Runtime configuration for an edit session
#[derive(Debug, Clone)]
pub struct EditConfig {
    /// AWS region (default: "eu-west-1")
    pub region: String,

    /// Custom S3-compatible endpoint, e.g. a MinIO server (default: none)
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing (default: false)
    pub force_path_style: bool,

    /// Editor command; the staged path is appended as last argument (default: "vim")
    pub editor: String,

    /// Directory holding staged files (default: system temp dir)
    pub staging_dir: PathBuf,

    /// Length of the random staging file suffix (default: 10)
    pub suffix_len: usize,

    /// Send the downloaded ETag as If-Match on upload (default: false)
    pub conditional_upload: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            editor: "vim".to_string(),
            staging_dir: env::temp_dir(),
            suffix_len: 10,
            conditional_upload: false,
        }
    }
}

impl EditConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            region: lookup("AWS_REGION")
                .filter(|v| !v.is_empty())
                .unwrap_or(default.region),

            endpoint_url: lookup("S3EDIT_ENDPOINT").filter(|v| !v.is_empty()),

            force_path_style: lookup("S3EDIT_FORCE_PATH_STYLE")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.force_path_style),

            editor: ["S3EDIT_EDITOR", "VISUAL", "EDITOR"]
                .into_iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
                .unwrap_or(default.editor),

            staging_dir: lookup("S3EDIT_STAGING_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            suffix_len: lookup("S3EDIT_SUFFIX_LEN")
                .and_then(|v| v.parse().ok())
                .filter(|len| *len > 0)
                .unwrap_or(default.suffix_len),

            conditional_upload: lookup("S3EDIT_IF_MATCH")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.conditional_upload),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EditConfig::default();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.editor, "vim");
        assert_eq!(config.suffix_len, 10);
        assert!(config.endpoint_url.is_none());
        assert!(!config.conditional_upload);
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = EditConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.editor, "vim");
        assert_eq!(config.staging_dir, env::temp_dir());
    }

    #[test]
    fn test_editor_precedence() {
        let config = EditConfig::from_lookup(lookup_from(&[
            ("EDITOR", "nano"),
            ("VISUAL", "emacs -nw"),
        ]));
        assert_eq!(config.editor, "emacs -nw");

        let config = EditConfig::from_lookup(lookup_from(&[
            ("EDITOR", "nano"),
            ("S3EDIT_EDITOR", "hx"),
        ]));
        assert_eq!(config.editor, "hx");

        let config = EditConfig::from_lookup(lookup_from(&[("VISUAL", "  "), ("EDITOR", "nano")]));
        assert_eq!(config.editor, "nano");
    }

    #[test]
    fn test_store_settings_from_env() {
        let config = EditConfig::from_lookup(lookup_from(&[
            ("AWS_REGION", "us-east-1"),
            ("S3EDIT_ENDPOINT", "http://127.0.0.1:9000"),
            ("S3EDIT_FORCE_PATH_STYLE", "true"),
            ("S3EDIT_IF_MATCH", "1"),
            ("S3EDIT_SUFFIX_LEN", "0"),
        ]));
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert!(config.force_path_style);
        assert!(config.conditional_upload);
        // zero-length suffix falls back to the default
        assert_eq!(config.suffix_len, 10);
    }
}
