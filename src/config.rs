//! Run settings read from `TLCS_*` environment variables

use std::env;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::infra::{Intersection, LaunchOptions};
use crate::rl::{EnvConfig, TrainConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid { key: String, value: String },
    OutOfRange { key: String, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(formatter, "Invalid value '{}' for {}", value, key)
            }
            ConfigError::OutOfRange { key, reason } => write!(formatter, "{} {}", key, reason),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Test,
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Mode::Train),
            "test" => Ok(Mode::Test),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    /// Simulator bridge address
    pub host: String,
    pub sumocfg_file: String,
    pub gui: bool,
    pub total_episodes: usize,
    pub max_steps: usize,
    pub green_duration: usize,
    pub yellow_duration: usize,
    pub num_states: usize,
    pub num_actions: usize,
    pub gamma: f32,
    pub num_layers: usize,
    pub width_layers: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub training_epochs: usize,
    pub memory_size_min: usize,
    pub memory_size_max: usize,
    /// Where a trained model is written
    pub models_path: PathBuf,
    /// Model evaluated in test mode
    pub model_path: PathBuf,
    /// Seed of the evaluation episode and base seed of training episodes
    pub seed: Option<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup("TLCS_MODE") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "TLCS_MODE".to_string(),
                value,
            })?,
            None => Mode::Train,
        };

        let settings = Settings {
            mode,
            host: lookup("TLCS_HOST").unwrap_or_else(|| "localhost:50051".to_string()),
            sumocfg_file: lookup("TLCS_SUMOCFG_FILE")
                .unwrap_or_else(|| "sumo_config.sumocfg".to_string()),
            gui: parse_var(&lookup, "TLCS_GUI", false)?,
            total_episodes: parse_var(&lookup, "TLCS_TOTAL_EPISODES", 100)?,
            max_steps: parse_var(&lookup, "TLCS_MAX_STEPS", 5400)?,
            green_duration: parse_var(&lookup, "TLCS_GREEN_DURATION", 10)?,
            yellow_duration: parse_var(&lookup, "TLCS_YELLOW_DURATION", 4)?,
            num_states: parse_var(&lookup, "TLCS_NUM_STATES", 80)?,
            num_actions: parse_var(&lookup, "TLCS_NUM_ACTIONS", 4)?,
            gamma: parse_var(&lookup, "TLCS_GAMMA", 0.75)?,
            num_layers: parse_var(&lookup, "TLCS_NUM_LAYERS", 4)?,
            width_layers: parse_var(&lookup, "TLCS_WIDTH_LAYERS", 400)?,
            batch_size: parse_var(&lookup, "TLCS_BATCH_SIZE", 100)?,
            learning_rate: parse_var(&lookup, "TLCS_LEARNING_RATE", 0.001)?,
            training_epochs: parse_var(&lookup, "TLCS_TRAINING_EPOCHS", 800)?,
            memory_size_min: parse_var(&lookup, "TLCS_MEMORY_SIZE_MIN", 600)?,
            memory_size_max: parse_var(&lookup, "TLCS_MEMORY_SIZE_MAX", 50000)?,
            models_path: lookup("TLCS_MODELS_PATH")
                .unwrap_or_else(|| "models".to_string())
                .into(),
            model_path: lookup("TLCS_MODEL_PATH")
                .unwrap_or_else(|| "models/model".to_string())
                .into(),
            seed: match lookup("TLCS_SEED") {
                Some(value) => Some(parse_value("TLCS_SEED", value)?),
                None => None,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |key: &str, reason| ConfigError::OutOfRange {
            key: key.to_string(),
            reason,
        };

        if self.num_actions == 0 {
            return Err(out_of_range("TLCS_NUM_ACTIONS", "must be at least 1"));
        }
        if self.num_actions > Intersection::default().incoming_edges.len() {
            return Err(out_of_range(
                "TLCS_NUM_ACTIONS",
                "exceeds the green phases of the intersection",
            ));
        }
        if u32::try_from(self.max_steps).is_err() {
            return Err(out_of_range("TLCS_MAX_STEPS", "does not fit in 32 bits"));
        }
        if self.green_duration == 0 {
            return Err(out_of_range("TLCS_GREEN_DURATION", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(out_of_range("TLCS_GAMMA", "must be within [0, 1]"));
        }
        if self.num_states < Intersection::default().num_cells() {
            tracing::warn!(
                "TLCS_NUM_STATES={} is smaller than the {} cell layout; outer cells are dropped",
                self.num_states,
                Intersection::default().num_cells()
            );
        }
        Ok(())
    }

    pub fn env_config(&self) -> EnvConfig {
        EnvConfig {
            max_steps: self.max_steps,
            green_duration: self.green_duration,
            yellow_duration: self.yellow_duration,
            num_states: self.num_states,
            num_actions: self.num_actions,
            layout: Intersection::default(),
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            total_episodes: self.total_episodes,
            gamma: self.gamma,
            batch_size: self.batch_size,
            training_epochs: self.training_epochs,
            memory_size_max: self.memory_size_max,
            memory_size_min: self.memory_size_min,
            seed: self.seed,
            env_config: self.env_config(),
        }
    }

    pub fn launch_options(&self) -> Result<LaunchOptions, ConfigError> {
        let max_steps = u32::try_from(self.max_steps).map_err(|_| ConfigError::OutOfRange {
            key: "TLCS_MAX_STEPS".to_string(),
            reason: "does not fit in 32 bits",
        })?;

        Ok(LaunchOptions {
            config_file: self.sumocfg_file.clone(),
            gui: self.gui,
            max_steps,
            seed: self.seed,
        })
    }

    #[cfg(feature = "rl")]
    pub fn model_config(&self) -> crate::rl::ModelConfig {
        crate::rl::ModelConfig {
            num_layers: self.num_layers,
            width_layers: self.width_layers,
            learning_rate: self.learning_rate,
            input_dim: self.num_states,
            output_dim: self.num_actions,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => parse_value(key, value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}
