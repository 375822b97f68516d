//! Panel configuration: which service to control and how the panel
//! bootstraps.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Top-level on-disk configuration.
///
/// ```toml
/// [service]
/// name = "Spooler"
/// display_name = "Print Spooler"
/// auto_start = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub service: ServiceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// OS-level service name. Required, non-empty.
    pub name: String,
    /// Operator-facing name; falls back to `name`.
    pub display_name: Option<String>,
    /// Issue a start when the panel opens and the service is down.
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

impl PanelConfig {
    /// Configuration for a service named on the command line; panel
    /// defaults apply.
    pub fn for_service(name: &str) -> Result<Self> {
        let config = Self {
            service: ServiceSection {
                name: name.to_string(),
                display_name: None,
                auto_start: true,
            },
        };
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "failed to read config file {} (pass --config or --service)",
                path.display()
            )
        })?;
        let config: PanelConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validated()
    }

    /// Explicit path if given, else the per-user config location.
    pub fn resolve_path(explicit: Option<String>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
            .join("svcpanel");
        Ok(config_dir.join("svcpanel.toml"))
    }

    pub fn service_name(&self) -> &str {
        &self.service.name
    }

    pub fn display_name(&self) -> &str {
        self.service
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.service.name)
    }

    fn validated(mut self) -> Result<Self> {
        self.service.name = self.service.name.trim().to_string();
        if self.service.name.is_empty() {
            bail!("service.name is empty; set it in the config file or pass --service");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_full_config() {
        let config: PanelConfig = toml::from_str(
            r#"
            [service]
            name = "Spooler"
            display_name = "Print Spooler"
            auto_start = false
            "#,
        )
        .unwrap();
        let config = config.validated().unwrap();

        assert_eq!(config.service_name(), "Spooler");
        assert_eq!(config.display_name(), "Print Spooler");
        assert!(!config.service.auto_start);
    }

    #[test]
    fn auto_start_defaults_to_true() {
        let config: PanelConfig = toml::from_str(
            r#"
            [service]
            name = "nginx"
            "#,
        )
        .unwrap();

        assert!(config.service.auto_start);
    }

    #[test]
    fn display_name_falls_back_to_service_name() {
        let config = PanelConfig::for_service("nginx").unwrap();
        assert_eq!(config.display_name(), "nginx");
    }

    #[test]
    fn blank_name_is_rejected() {
        let config: PanelConfig = toml::from_str(
            r#"
            [service]
            name = "   "
            "#,
        )
        .unwrap();

        assert!(config.validated().is_err());
    }

    #[test]
    fn name_is_trimmed() {
        let config = PanelConfig::for_service("  Spooler  ").unwrap();
        assert_eq!(config.service_name(), "Spooler");
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nname = \"sshd\"").unwrap();

        let path = file.path().to_path_buf();
        let config = PanelConfig::load(&path).unwrap();
        assert_eq!(config.service_name(), "sshd");
        assert!(config.service.auto_start);
    }

    #[test]
    fn missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/svcpanel.toml");
        let err = PanelConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("svcpanel.toml"));
    }
}
