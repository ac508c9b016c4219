use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Knobs for a [`crate::StorageFacade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Prefix prepended to every logical key
    pub namespace: String,
    /// Version tag written into every entry; entries with another tag read as absent
    pub schema_version: String,
    /// Serialized entries larger than this get their payload encoded
    pub compression_threshold: usize,
    /// Hard ceiling on a serialized entry, in bytes
    pub max_entry_size: usize,
    pub default_cache_ttl_secs: u64,
    /// Run `sweep_expired` when the facade is built
    pub sweep_on_start: bool,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            namespace: "adb_io_".to_string(),
            schema_version: "1.0".to_string(),
            compression_threshold: 1024,
            max_entry_size: 5 * 1024 * 1024,
            default_cache_ttl_secs: 3600,
            sweep_on_start: true,
        }
    }
}

/// Contents of `tierkv.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TierkvConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub facade: FacadeConfig,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("tierkv.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".tierkv").join("store.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<TierkvConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: TierkvConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &TierkvConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".tierkv/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: TierkvConfig = toml::from_str(
            r#"
            database = "data/app.db"

            [facade]
            namespace = "portal_"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.as_deref(), Some("data/app.db"));
        assert_eq!(config.facade.namespace, "portal_");
        assert_eq!(config.facade.schema_version, "1.0");
        assert_eq!(config.facade.max_entry_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tierkv.toml");
        let config = TierkvConfig {
            database: Some("x.db".to_string()),
            facade: FacadeConfig::default(),
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database, config.database);
        assert_eq!(loaded.facade, config.facade);

        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_force_write_replaces_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tierkv.toml");
        std::fs::write(&path, "database = [unterminated").unwrap();
        assert!(load_config(Some(&path)).is_err());

        write_config(&path, &TierkvConfig::default(), true).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.facade, FacadeConfig::default());
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target\n.tierkv/\n");
    }
}
