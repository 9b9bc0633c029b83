//! Experiment configuration management via TOML files.
//!
//! This module provides configuration parsing from TOML format with sensible
//! defaults. All hyperparameters of a single experiment run live in
//! [`ExperimentConfig`]; the grid-search driver layers value lists on top of it
//! (see [`crate::search`]).

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use toml::Value;

/// Which augmentation strategy the training loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AugmentStrategy {
    /// Geometric shift and noise copies of the support set only.
    Elementary,
    /// Elementary augmentation plus distillation-guided interpolation
    /// after every training epoch.
    DistillInterpolation,
    /// Pair-sample mixing pretraining before fine-tuning on the
    /// elementary-augmented support set.
    PairPretraining,
}

impl AugmentStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AugmentStrategy::Elementary => "elementary",
            AugmentStrategy::DistillInterpolation => "distill",
            AugmentStrategy::PairPretraining => "pairing",
        }
    }
}

impl FromStr for AugmentStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elementary" => Ok(AugmentStrategy::Elementary),
            "distill" => Ok(AugmentStrategy::DistillInterpolation),
            "pairing" => Ok(AugmentStrategy::PairPretraining),
            other => Err(ConfigError::Parse(format!(
                "unknown strategy: {} (expected elementary, distill or pairing)",
                other
            ))),
        }
    }
}

/// Optimizer used for the per-class predictor networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl OptimizerKind {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Adam => "adam",
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            other => Err(ConfigError::Parse(format!(
                "unknown optimizer: {} (expected sgd or adam)",
                other
            ))),
        }
    }
}

/// Weight initialization scheme for target and predictor networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitKind {
    XavierNormal,
    XavierUniform,
}

impl InitKind {
    pub fn name(&self) -> &'static str {
        match self {
            InitKind::XavierNormal => "xavier_normal",
            InitKind::XavierUniform => "xavier_uniform",
        }
    }
}

impl FromStr for InitKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xavier_normal" => Ok(InitKind::XavierNormal),
            "xavier_uniform" => Ok(InitKind::XavierUniform),
            other => Err(ConfigError::Parse(format!(
                "unknown initialization: {} (expected xavier_normal or xavier_uniform)",
                other
            ))),
        }
    }
}

/// Scalar hyperparameters of one few-shot experiment run.
///
/// # Examples
///
/// ```
/// use fewshot_rnd::ExperimentConfig;
///
/// let config = ExperimentConfig::load_from_file("config/experiment.toml")
///     .unwrap_or_else(|_| ExperimentConfig::default());
///
/// println!("{}-way {}-shot", config.way, config.train_shot);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentConfig {
    /// Dataset name; only "glyphs" is recognised
    pub dataset: String,
    /// Augmentation strategy for the training loop
    pub strategy: AugmentStrategy,
    /// Number of classes per episode
    pub way: usize,
    /// Support samples per class
    pub train_shot: usize,
    /// Query samples per class
    pub test_shot: usize,
    /// Training epochs per episode
    pub epochs: usize,
    /// Pretraining epochs on pair-mixed samples (pairing strategy only)
    pub pretrain_epochs: usize,
    /// Number of episodes to average accuracy over
    pub trials: usize,
    /// Side length of the square input images
    pub x_dim: usize,
    /// Feature dimension of target and predictor networks
    pub z_dim: usize,
    /// Optimizer for predictor updates
    pub optimizer: OptimizerKind,
    /// Weight initialization scheme
    pub initialization: InitKind,
    /// Learning rate for the per-class predictors
    pub lr_predictor: f32,
    /// Learning rate for the target network; 0 keeps the target frozen
    pub lr_target: f32,
    /// Pixel shift for geometric augmentation
    pub shift: usize,
    /// Standard deviation of additive Gaussian noise copies
    pub noise_sigma: f32,
    /// Treat 90-degree rotations of every class as new classes
    pub add_rotations: bool,
    /// Suppress per-epoch progress printouts
    pub silent: bool,
    /// Random seed for deterministic runs
    pub seed: u64,
}

impl ExperimentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let table = value
            .get("experiment")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default();
        let defaults = Self::default();

        Ok(Self {
            dataset: get_string(&table, "dataset")?.unwrap_or(defaults.dataset),
            strategy: get_string(&table, "strategy")?
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.strategy),
            way: get_usize(&table, "way")?.unwrap_or(defaults.way),
            train_shot: get_usize(&table, "train_shot")?.unwrap_or(defaults.train_shot),
            test_shot: get_usize(&table, "test_shot")?.unwrap_or(defaults.test_shot),
            epochs: get_usize(&table, "epochs")?.unwrap_or(defaults.epochs),
            pretrain_epochs: get_usize(&table, "pretrain_epochs")?
                .unwrap_or(defaults.pretrain_epochs),
            trials: get_usize(&table, "trials")?.unwrap_or(defaults.trials),
            x_dim: get_usize(&table, "x_dim")?.unwrap_or(defaults.x_dim),
            z_dim: get_usize(&table, "z_dim")?.unwrap_or(defaults.z_dim),
            optimizer: get_string(&table, "optimizer")?
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.optimizer),
            initialization: get_string(&table, "initialization")?
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(defaults.initialization),
            lr_predictor: get_f32(&table, "lr_predictor")?.unwrap_or(defaults.lr_predictor),
            lr_target: get_f32(&table, "lr_target")?.unwrap_or(defaults.lr_target),
            shift: get_usize(&table, "shift")?.unwrap_or(defaults.shift),
            noise_sigma: get_f32(&table, "noise_sigma")?.unwrap_or(defaults.noise_sigma),
            add_rotations: get_bool(&table, "add_rotations")?.unwrap_or(defaults.add_rotations),
            silent: get_bool(&table, "silent")?.unwrap_or(defaults.silent),
            seed: get_usize(&table, "seed")?
                .map(|v| v as u64)
                .unwrap_or(defaults.seed),
        })
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: "glyphs".to_string(),
            strategy: AugmentStrategy::Elementary,
            way: 5,
            train_shot: 5,
            test_shot: 1,
            epochs: 3,
            pretrain_epochs: 0,
            trials: 100,
            x_dim: 28,
            z_dim: 500,
            optimizer: OptimizerKind::Adam,
            initialization: InitKind::XavierNormal,
            lr_predictor: 1e-3,
            lr_target: 0.0,
            shift: 4,
            noise_sigma: 0.03,
            add_rotations: true,
            silent: true,
            seed: 2019,
        }
    }
}

type Table = toml::map::Map<String, Value>;

fn get_usize(table: &Table, key: &str) -> Result<Option<usize>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .filter(|v| *v >= 0)
            .map(|v| Some(v as usize))
            .ok_or_else(|| ConfigError::Parse(format!("{} must be a non-negative integer", key))),
    }
}

fn get_f32(table: &Table, key: &str) -> Result<Option<f32>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => {
            if let Some(float) = value.as_float() {
                Ok(Some(float as f32))
            } else if let Some(int) = value.as_integer() {
                Ok(Some(int as f32))
            } else {
                Err(ConfigError::Parse(format!("{} must be a number", key)))
            }
        }
    }
}

fn get_bool(table: &Table, key: &str) -> Result<Option<bool>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| ConfigError::Parse(format!("{} must be a boolean", key))),
    }
}

fn get_string(table: &Table, key: &str) -> Result<Option<String>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::Parse(format!("{} must be a string", key))),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}
