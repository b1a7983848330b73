//! Configuration file support for fitlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub goals: NutritionGoals,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Signed-in user, as left behind by the auth collaborator
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Daily nutrition targets the summary is measured against
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NutritionGoals {
    #[serde(default = "default_calories")]
    pub calories: i32,

    #[serde(default = "default_protein")]
    pub protein: f64,

    #[serde(default = "default_carbs")]
    pub carbs: f64,

    #[serde(default = "default_fat")]
    pub fat: f64,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        Self {
            calories: default_calories(),
            protein: default_protein(),
            carbs: default_carbs(),
            fat: default_fat(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_recent_workouts")]
    pub recent_workouts: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_workouts: default_recent_workouts(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("fitlog")
}

fn default_calories() -> i32 {
    2000
}

fn default_protein() -> f64 {
    150.0
}

fn default_carbs() -> f64 {
    200.0
}

fn default_fat() -> f64 {
    65.0
}

fn default_recent_workouts() -> usize {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject goals that would make the progress view meaningless
    pub fn validate(&self) -> Result<()> {
        let g = &self.goals;
        if g.calories < 0 || g.protein < 0.0 || g.carbs < 0.0 || g.fat < 0.0 {
            return Err(Error::Config("nutrition goals must not be negative".into()));
        }
        if self.dashboard.recent_workouts == 0 {
            return Err(Error::Config(
                "dashboard.recent_workouts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("fitlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
