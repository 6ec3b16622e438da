use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GpxHrError;
use crate::generator::GeneratorSettings;
use crate::logging::LogConfig;
use crate::models::{
    Coordinates, EndpointPolicy, HeartRate, DEFAULT_ALPHA, DEFAULT_NOISE_STD_DEV,
};
use crate::session::TimezonePolicy;
use crate::smoothing::{validate_alpha, validate_std_dev};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Synthetic session defaults
    pub generator: GeneratorConfig,

    /// Defaults for annotating uploaded tracks
    pub annotator: AnnotatorConfig,

    /// Where and under which names documents are saved
    pub output: OutputConfig,

    /// Logging setup
    pub logging: LogConfig,
}

/// Synthetic session defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Smoothing factor, in (0, 1]
    pub alpha: f64,

    /// Base heart rate in bpm
    pub base_hr: HeartRate,

    /// Session length in minutes
    pub duration_minutes: u32,

    /// Start time of day when none is given (HH:MM)
    pub start_time: String,

    /// Fixed position of every track point
    pub latitude: f64,
    pub longitude: f64,

    /// Spread of the Gaussian noise around the base heart rate
    pub noise_std_dev: f64,

    /// How the entered start time maps to UTC
    pub timezone: TimezonePolicy,

    /// Whether the final minute gets its own point
    pub endpoint: EndpointPolicy,

    /// `creator` attribute of generated documents
    pub creator: String,

    /// `<name>` of the generated track
    pub track_name: String,
}

/// Defaults for annotating uploaded tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub alpha: f64,
    pub base_hr: HeartRate,
    pub noise_std_dev: f64,
}

/// Output file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory used by `--save`
    pub directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            generator: GeneratorConfig::default(),
            annotator: AnnotatorConfig::default(),
            output: OutputConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let settings = GeneratorSettings::default();
        GeneratorConfig {
            alpha: DEFAULT_ALPHA,
            base_hr: 140,
            duration_minutes: 75,
            start_time: "19:30".to_string(),
            latitude: settings.position.latitude,
            longitude: settings.position.longitude,
            noise_std_dev: settings.noise_std_dev,
            timezone: settings.timezone,
            endpoint: settings.endpoint,
            creator: settings.creator,
            track_name: settings.track_name,
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        AnnotatorConfig {
            alpha: DEFAULT_ALPHA,
            base_hr: 142,
            noise_std_dev: DEFAULT_NOISE_STD_DEV,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: PathBuf::from("."),
        }
    }
}

impl GeneratorConfig {
    /// Settings the track generator runs with
    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            position: Coordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            noise_std_dev: self.noise_std_dev,
            timezone: self.timezone,
            endpoint: self.endpoint,
            creator: self.creator.clone(),
            track_name: self.track_name.clone(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gpxhr")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Config file not usable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check value ranges the TOML types cannot express
    pub fn validate(&self) -> std::result::Result<(), GpxHrError> {
        validate_alpha(self.generator.alpha)?;
        validate_alpha(self.annotator.alpha)?;

        for (name, std_dev) in [
            ("generator.noise_std_dev", self.generator.noise_std_dev),
            ("annotator.noise_std_dev", self.annotator.noise_std_dev),
        ] {
            validate_std_dev(std_dev).map_err(|_| {
                GpxHrError::Configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, std_dev
                ))
            })?;
        }

        if !(-90.0..=90.0).contains(&self.generator.latitude) {
            return Err(GpxHrError::Configuration(format!(
                "generator.latitude out of range: {}",
                self.generator.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.generator.longitude) {
            return Err(GpxHrError::Configuration(format!(
                "generator.longitude out of range: {}",
                self.generator.longitude
            )));
        }

        crate::session::parse_time(&self.generator.start_time)?;
        Ok(())
    }
}
