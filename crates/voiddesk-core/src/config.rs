use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Bounded re-fetch used when the host's own transfer fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Re-fetch attempts after a failed transfer. Values above 1 are clamped to 1.
    pub max_attempts: u32,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Overall timeout for the re-fetch in seconds.
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            connect_timeout_secs: 30,
            timeout_secs: 600,
        }
    }
}

/// Shell configuration loaded from `~/.config/voiddesk/config.toml`.
///
/// User-facing toggles (auto-save, reveal, downloads root) are not here; they
/// live in the settings store so the UI can change them at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Maximum number of entries kept in the download history.
    pub history_max_entries: usize,
    /// Hosts opened inside the managed surface (exact or subdomain match).
    pub trusted_hosts: Vec<String>,
    /// Link extensions treated as downloads.
    pub download_extensions: Vec<String>,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_max_entries: 100,
            trusted_hosts: ["openai.com", "chatgpt.com"].map(String::from).to_vec(),
            download_extensions: [
                "png", "jpg", "jpeg", "gif", "webp", "svg", "mp4", "zip", "pdf", "txt", "json",
                "bin", "csv", "mp3", "wav", "webm",
            ]
            .map(String::from)
            .to_vec(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// `~/.config/voiddesk/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    let base = xdg::BaseDirectories::new()?.get_config_home();
    Ok(base.join("voiddesk").join("config.toml"))
}

/// Reads [`config_path`], writing the defaults there on first run.
pub fn load_or_init() -> Result<ShellConfig> {
    load_or_init_at(&config_path()?)
}

/// Reads the shell config at `path`. A missing file is created with
/// [`ShellConfig::default`]; a malformed one is an error, never overwritten.
pub fn load_or_init_at(path: &Path) -> Result<ShellConfig> {
    match fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text)
            .with_context(|| format!("malformed config: {}", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let cfg = ShellConfig::default();
            write_config(path, &cfg)?;
            tracing::info!(path = %path.display(), "wrote default shell config");
            Ok(cfg)
        }
        Err(e) => Err(e).with_context(|| format!("read config: {}", path.display())),
    }
}

fn write_config(path: &Path, cfg: &ShellConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create config dir: {}", dir.display()))?;
    }
    let text = toml::to_string_pretty(cfg).context("serialize default config")?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("install {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ShellConfig::default();
        assert_eq!(cfg.history_max_entries, 100);
        assert!(cfg.trusted_hosts.iter().any(|h| h == "openai.com"));
        assert!(cfg.download_extensions.iter().any(|e| e == "pdf"));
        assert_eq!(cfg.fallback.max_attempts, 1);
    }

    #[test]
    fn first_run_writes_defaults_then_reads_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voiddesk").join("config.toml");

        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg.history_max_entries, 100);
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let edited = std::fs::read_to_string(&path)
            .unwrap()
            .replace("history_max_entries = 100", "history_max_entries = 7");
        std::fs::write(&path, edited).unwrap();
        assert_eq!(load_or_init_at(&path).unwrap().history_max_entries, 7);
    }

    #[test]
    fn malformed_config_is_reported_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "history_max_entries = \"lots\"").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(format!("{err:#}").contains("malformed config"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "history_max_entries = \"lots\""
        );
    }

    #[test]
    fn config_file_lives_under_voiddesk() {
        assert!(config_path().unwrap().ends_with("voiddesk/config.toml"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ShellConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ShellConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.history_max_entries, cfg.history_max_entries);
        assert_eq!(parsed.trusted_hosts, cfg.trusted_hosts);
        assert_eq!(parsed.download_extensions, cfg.download_extensions);
        assert_eq!(parsed.fallback.timeout_secs, cfg.fallback.timeout_secs);
    }

    #[test]
    fn config_toml_custom_values_without_fallback_section() {
        let toml = r#"
            history_max_entries = 10
            trusted_hosts = ["example.org"]
            download_extensions = ["iso", "deb"]
        "#;
        let cfg: ShellConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.history_max_entries, 10);
        assert_eq!(cfg.trusted_hosts, vec!["example.org".to_string()]);
        assert_eq!(cfg.download_extensions.len(), 2);
        assert_eq!(cfg.fallback.max_attempts, 1);
        assert_eq!(cfg.fallback.connect_timeout_secs, 30);
    }

    #[test]
    fn config_toml_fallback_section() {
        let toml = r#"
            history_max_entries = 5
            trusted_hosts = []
            download_extensions = []

            [fallback]
            max_attempts = 0
            connect_timeout_secs = 5
            timeout_secs = 60
        "#;
        let cfg: ShellConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.fallback.max_attempts, 0);
        assert_eq!(cfg.fallback.connect_timeout_secs, 5);
        assert_eq!(cfg.fallback.timeout_secs, 60);
    }
}
