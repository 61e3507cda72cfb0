use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::collage::{LayoutConfig, TileCatalog};

/// Application configuration loaded from environment variables.
/// Every variable is optional; startup fails only on values that are present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base directory for relative tile asset paths.
    pub asset_root: PathBuf,
    /// JSON `{id: path}` table replacing the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    /// JSON layout overrides; missing keys keep their defaults.
    pub layout_path: Option<PathBuf>,
    /// When set, every generated PDF is also archived here under a unique name.
    pub archive_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            asset_root: optional_path("TILE_ASSET_ROOT").unwrap_or_else(|| PathBuf::from(".")),
            catalog_path: optional_path("TILE_CATALOG_PATH"),
            layout_path: optional_path("LAYOUT_CONFIG_PATH"),
            archive_dir: optional_path("COLLAGE_ARCHIVE_DIR"),
        })
    }

    /// Builds the tile catalog: the JSON table if configured, the built-in one otherwise.
    pub fn load_catalog(&self) -> Result<TileCatalog> {
        match &self.catalog_path {
            Some(path) => Ok(TileCatalog::from_json_file(path, &self.asset_root)?),
            None => Ok(TileCatalog::builtin(&self.asset_root)),
        }
    }

    /// Reads and validates the layout, falling back to the tabloid defaults.
    pub fn load_layout(&self) -> Result<LayoutConfig> {
        let layout = match &self.layout_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read layout config {}", path.display()))?;
                serde_json::from_str::<LayoutConfig>(&raw)
                    .with_context(|| format!("Invalid layout config {}", path.display()))?
            }
            None => LayoutConfig::default(),
        };
        layout.validate().context("Invalid layout config")?;
        Ok(layout)
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_config() -> Config {
        Config {
            port: 5000,
            rust_log: "info".to_string(),
            asset_root: PathBuf::from("."),
            catalog_path: None,
            layout_path: None,
            archive_dir: None,
        }
    }

    #[test]
    fn test_default_catalog_is_builtin() {
        let catalog = base_config().load_catalog().unwrap();
        assert_eq!(catalog.len(), 46);
    }

    #[test]
    fn test_default_layout() {
        assert_eq!(base_config().load_layout().unwrap(), LayoutConfig::default());
    }

    #[test]
    fn test_layout_file_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{"columnCount": 2, "verticalGap": 9}"#).unwrap();

        let config = Config {
            layout_path: Some(path),
            ..base_config()
        };
        let layout = config.load_layout().unwrap();
        assert_eq!(layout.column_count, 2);
        assert_eq!(layout.vertical_gap, 9.0);
        assert_eq!(layout.max_cell_width, 234.0);
    }

    #[test]
    fn test_layout_file_with_zero_columns_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{"columnCount": 0}"#).unwrap();

        let config = Config {
            layout_path: Some(path),
            ..base_config()
        };
        assert!(config.load_layout().is_err());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let config = Config {
            catalog_path: Some(PathBuf::from("/no/such/catalog.json")),
            ..base_config()
        };
        assert!(config.load_catalog().is_err());
    }
}
