use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::conflicts::{AutoResolveMode, DetectorOptions};
use crate::constraints::{Gender, Sport};
use crate::scoring::{ScoringOptions, DEFAULT_PARTIAL_THRESHOLD};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub conflicts: ConflictsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_sport")]
    pub sport: String,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_partial_threshold")]
    pub partial_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsConfig {
    #[serde(default = "default_max_comparisons")]
    pub max_comparisons: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub violations_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sport: Option<String>,
    pub gender: Option<String>,
    pub mode: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/season-arbiter/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(sport) = overrides.sport {
            self.registry.sport = sport;
        }
        if let Some(gender) = overrides.gender {
            self.registry.gender = gender;
        }
        if let Some(mode) = overrides.mode {
            self.resolver.mode = mode;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn sport(&self) -> Result<Sport> {
        Sport::from_str(&self.registry.sport)
            .with_context(|| format!("invalid [registry] sport: {}", self.registry.sport))
    }

    /// Empty means the constraint set is not split by gender.
    pub fn gender(&self) -> Result<Option<Gender>> {
        let raw = self.registry.gender.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Gender::from_str(raw)
            .map(Some)
            .with_context(|| format!("invalid [registry] gender: {raw}"))
    }

    pub fn mode(&self) -> Result<AutoResolveMode> {
        AutoResolveMode::from_str(&self.resolver.mode)
            .with_context(|| format!("invalid [resolver] mode: {}", self.resolver.mode))
    }

    pub fn scoring_options(&self) -> ScoringOptions {
        ScoringOptions::default().with_partial_threshold(self.scoring.partial_threshold)
    }

    /// Zero disables the comparison budget or the timeout.
    pub fn detector_options(&self) -> DetectorOptions {
        let mut options = DetectorOptions::default();
        if self.conflicts.max_comparisons > 0 {
            options = options.with_max_comparisons(self.conflicts.max_comparisons);
        }
        if self.conflicts.timeout_ms > 0 {
            options = options.with_timeout(Duration::from_millis(self.conflicts.timeout_ms));
        }
        options
    }

    pub fn default_template() -> String {
        let template = r#"[registry]
sport = "football"
# "men", "women" or "" for a combined program
gender = ""

[scoring]
partial_threshold = 0.8

[conflicts]
# 0 disables the limit
max_comparisons = 100000
timeout_ms = 2000
violations_only = false

[resolver]
# conservative | balanced | aggressive
mode = "balanced"
"#;
        template.to_string()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sport: default_sport(),
            gender: String::new(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            partial_threshold: default_partial_threshold(),
        }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            max_comparisons: default_max_comparisons(),
            timeout_ms: default_timeout_ms(),
            violations_only: false,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
        }
    }
}

fn default_sport() -> String {
    "football".to_string()
}

fn default_partial_threshold() -> f64 {
    DEFAULT_PARTIAL_THRESHOLD
}

fn default_max_comparisons() -> usize {
    100_000
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_mode() -> String {
    "balanced".to_string()
}
