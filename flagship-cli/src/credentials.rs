use std::path::Path;

use serde::{Deserialize, Serialize};

/// Saved login (from the `[credentials]` section of flagship.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub app_key: Option<String>,
    pub base_url: Option<String>,
}

/// Credentials after merging CLI/env arguments with the saved file.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub app_key: String,
    pub base_url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FlagshipToml {
    credentials: Option<Credentials>,
}

/// Load saved credentials, falling back to empty ones if the file doesn't
/// exist or cannot be parsed.
pub fn load(config_path: &str) -> Credentials {
    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(_) => return Credentials::default(),
    };
    match toml::from_str::<FlagshipToml>(&content) {
        Ok(config) => config.credentials.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(path = config_path, error = %e, "failed to parse config");
            Credentials::default()
        }
    }
}

pub fn save(config_path: &str, credentials: &Credentials) -> Result<(), String> {
    let config = FlagshipToml {
        credentials: Some(credentials.clone()),
    };
    let content =
        toml::to_string(&config).map_err(|e| format!("failed to serialize config: {}", e))?;
    std::fs::write(config_path, content)
        .map_err(|e| format!("failed to write {}: {}", config_path, e))
}

/// Removes the saved credentials. Returns `false` if there was nothing to remove.
pub fn clear(config_path: &str) -> Result<bool, String> {
    if !Path::new(config_path).exists() {
        return Ok(false);
    }
    std::fs::remove_file(config_path)
        .map(|_| true)
        .map_err(|e| format!("failed to remove {}: {}", config_path, e))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve credentials from: CLI arg (or env var, via clap) > saved config
pub fn resolve(
    app_key_arg: Option<&str>,
    base_url_arg: Option<&str>,
    saved: &Credentials,
) -> Option<Resolved> {
    let app_key = non_empty(app_key_arg).or_else(|| non_empty(saved.app_key.as_deref()))?;
    let base_url = non_empty(base_url_arg).or_else(|| non_empty(saved.base_url.as_deref()))?;
    Some(Resolved { app_key, base_url })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> String {
        dir.path().join("flagship.toml").to_string_lossy().into_owned()
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_in(&dir);
        let creds = Credentials {
            app_key: Some("app-123".into()),
            base_url: Some("https://flags.example.com".into()),
        };

        save(&path, &creds).unwrap();
        assert_eq!(load(&path), creds);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[credentials]"));
    }

    #[test]
    fn test_missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_in(&dir);
        assert_eq!(load(&path), Credentials::default());

        std::fs::write(&path, "credentials = [not toml").unwrap();
        assert_eq!(load(&path), Credentials::default());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_in(&dir);
        assert_eq!(clear(&path), Ok(false));

        save(&path, &Credentials::default()).unwrap();
        assert_eq!(clear(&path), Ok(true));
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_resolve_prefers_arguments() {
        let saved = Credentials {
            app_key: Some("saved-key".into()),
            base_url: Some("https://saved.example.com".into()),
        };

        let resolved = resolve(Some("arg-key"), None, &saved).unwrap();
        assert_eq!(resolved.app_key, "arg-key");
        assert_eq!(resolved.base_url, "https://saved.example.com");

        // blank arguments don't shadow saved values
        let resolved = resolve(Some("  "), Some(""), &saved).unwrap();
        assert_eq!(resolved.app_key, "saved-key");

        assert!(resolve(None, Some("https://x.io"), &Credentials::default()).is_none());
    }
}
