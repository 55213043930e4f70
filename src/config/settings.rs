use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "OpenCode usage statistics dashboard")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the OpenCode storage directory
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Initial stats window in days (7, 14, 30 or "all")
    #[arg(short, long)]
    pub window: Option<String>,

    /// Disable live file watching
    #[arg(long)]
    pub no_watch: bool,

    /// Disable OpenRouter pricing lookups
    #[arg(long)]
    pub no_pricing: bool,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Override the OpenCode storage directory
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// Minimum delay between live stats refreshes (milliseconds)
    #[serde(default = "default_refresh_debounce")]
    pub refresh_debounce_ms: u64,

    /// Watch the storage tree for live updates
    #[serde(default = "default_watch")]
    pub watch: bool,

    /// UI settings
    #[serde(default)]
    pub ui: UiSettings,

    /// Pricing settings
    #[serde(default)]
    pub pricing: PricingSettings,
}

fn default_refresh_debounce() -> u64 {
    100
}

fn default_watch() -> bool {
    true
}

/// UI-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Initial stats window in days (7, 14, 30, or 0 for all)
    #[serde(default = "default_window_days")]
    pub default_window_days: u16,
}

fn default_window_days() -> u16 {
    30
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
        }
    }
}

/// OpenRouter pricing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Enable pricing lookups (cost estimates and savings)
    #[serde(default = "default_pricing_enabled")]
    pub enabled: bool,

    /// Disk cache lifetime for the pricing table (hours)
    #[serde(default = "default_pricing_ttl")]
    pub cache_ttl_hours: u64,
}

fn default_pricing_enabled() -> bool {
    true
}

fn default_pricing_ttl() -> u64 {
    24
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            enabled: default_pricing_enabled(),
            cache_ttl_hours: default_pricing_ttl(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            refresh_debounce_ms: default_refresh_debounce(),
            watch: default_watch(),
            ui: UiSettings::default(),
            pricing: PricingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("ocstats/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/ocstats/config.toml")),
            dirs::home_dir().map(|p| p.join(".ocstats.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(dir) = &cli.storage_dir {
            self.storage_dir = Some(dir.clone());
        }
        if let Some(window) = &cli.window {
            if window.eq_ignore_ascii_case("all") {
                self.ui.default_window_days = 0;
            } else if let Ok(days) = window.parse::<u16>() {
                self.ui.default_window_days = days;
            }
        }
        if cli.no_watch {
            self.watch = false;
        }
        if cli.no_pricing {
            self.pricing.enabled = false;
        }
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        const MIN_DEBOUNCE: u64 = 30;

        if self.refresh_debounce_ms < MIN_DEBOUNCE {
            self.refresh_debounce_ms = MIN_DEBOUNCE;
        }
        if !matches!(self.ui.default_window_days, 0 | 7 | 14 | 30) {
            self.ui.default_window_days = default_window_days();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.refresh_debounce_ms, 100);
        assert!(settings.watch);
        assert_eq!(settings.ui.default_window_days, 30);
        assert!(settings.pricing.enabled);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            refresh_debounce_ms = 250
            watch = false

            [ui]
            default_window_days = 7

            [pricing]
            enabled = false
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.refresh_debounce_ms, 250);
        assert!(!settings.watch);
        assert_eq!(settings.ui.default_window_days, 7);
        assert!(!settings.pricing.enabled);
    }

    #[test]
    fn test_merge_cli_window() {
        let mut settings = Settings::default();
        let cli = Config {
            window: Some("all".to_string()),
            no_watch: true,
            no_pricing: true,
            ..Config::default()
        };
        settings.merge_cli(&cli);
        assert_eq!(settings.ui.default_window_days, 0);
        assert!(!settings.watch);
        assert!(!settings.pricing.enabled);
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = Settings {
            refresh_debounce_ms: 1,
            ..Settings::default()
        };
        settings.ui.default_window_days = 13;
        settings.validate();
        assert_eq!(settings.refresh_debounce_ms, 30);
        assert_eq!(settings.ui.default_window_days, 30);
    }
}
