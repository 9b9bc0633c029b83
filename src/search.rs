//! Hyperparameter grid search with CSV result logging.
//!
//! Mirrors the manual research workflow: take a base experiment configuration,
//! sweep a handful of keys over value lists, run every point in the cartesian
//! product and append one CSV row per point as soon as it finishes, so partial
//! sweeps still leave usable results behind.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use toml::Value;

use crate::config::{ConfigError, ExperimentConfig};
use crate::experiment::{run_experiment, ExperimentError};
use crate::logging::JsonlLogger;

/// A base configuration plus value lists for the swept keys.
///
/// Keys not listed fall back to a singleton of the base value, so an empty
/// `[search]` section degenerates to running the base configuration once.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    pub base: ExperimentConfig,
    pub train_shot: Vec<usize>,
    pub epochs: Vec<usize>,
    pub z_dim: Vec<usize>,
    pub lr_predictor: Vec<f32>,
    pub lr_target: Vec<f32>,
}

impl SearchSpace {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    /// Parses the `[experiment]` base and the `[search]` value lists from one
    /// TOML document.
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let base = ExperimentConfig::from_str(toml_str)?;
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let table = value
            .get("search")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            train_shot: get_usize_list(&table, "train_shot")?
                .unwrap_or_else(|| vec![base.train_shot]),
            epochs: get_usize_list(&table, "epochs")?.unwrap_or_else(|| vec![base.epochs]),
            z_dim: get_usize_list(&table, "z_dim")?.unwrap_or_else(|| vec![base.z_dim]),
            lr_predictor: get_f32_list(&table, "lr_predictor")?
                .unwrap_or_else(|| vec![base.lr_predictor]),
            lr_target: get_f32_list(&table, "lr_target")?.unwrap_or_else(|| vec![base.lr_target]),
            base,
        })
    }

    /// Cartesian product of the swept keys, in deterministic order.
    pub fn configurations(&self) -> Vec<ExperimentConfig> {
        let mut out = Vec::new();
        for &train_shot in &self.train_shot {
            for &epochs in &self.epochs {
                for &z_dim in &self.z_dim {
                    for &lr_predictor in &self.lr_predictor {
                        for &lr_target in &self.lr_target {
                            out.push(ExperimentConfig {
                                train_shot,
                                epochs,
                                z_dim,
                                lr_predictor,
                                lr_target,
                                ..self.base.clone()
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

fn get_usize_list(
    table: &toml::map::Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<usize>>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => {
            let items = value.as_array().ok_or_else(|| {
                ConfigError::Parse(format!("{} must be an array of integers", key))
            })?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let v = item.as_integer().filter(|v| *v >= 0).ok_or_else(|| {
                    ConfigError::Parse(format!("{} must be an array of integers", key))
                })?;
                out.push(v as usize);
            }
            Ok(Some(out))
        }
    }
}

fn get_f32_list(
    table: &toml::map::Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<f32>>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => {
            let items = value
                .as_array()
                .ok_or_else(|| ConfigError::Parse(format!("{} must be an array of numbers", key)))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let v = if let Some(float) = item.as_float() {
                    float as f32
                } else if let Some(int) = item.as_integer() {
                    int as f32
                } else {
                    return Err(ConfigError::Parse(format!(
                        "{} must be an array of numbers",
                        key
                    )));
                };
                out.push(v);
            }
            Ok(Some(out))
        }
    }
}

/// One finished grid point, as logged to JSONL.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRecord<'a> {
    pub config: &'a ExperimentConfig,
    pub accuracy: f64,
    pub duration_sec: f64,
    pub timestamp: String,
}

/// CSV results file, appended one row per finished grid point.
pub struct ResultsFile<'a> {
    path: &'a Path,
}

const CSV_HEADER: &str = "strategy,dataset,way,train_shot,test_shot,epochs,pretrain_epochs,\
trials,x_dim,z_dim,optimizer,lr_predictor,lr_target,accuracy,duration_sec,timestamp";

impl<'a> ResultsFile<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Appends one row, writing the header first when the file does not exist.
    pub fn append(&self, record: &SearchRecord<'_>) -> std::io::Result<()> {
        let needs_header = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path)?;
        if needs_header {
            writeln!(file, "{}", CSV_HEADER)?;
        }
        let cfg = record.config;
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.3},{}",
            cfg.strategy.name(),
            cfg.dataset,
            cfg.way,
            cfg.train_shot,
            cfg.test_shot,
            cfg.epochs,
            cfg.pretrain_epochs,
            cfg.trials,
            cfg.x_dim,
            cfg.z_dim,
            cfg.optimizer.name(),
            cfg.lr_predictor,
            cfg.lr_target,
            record.accuracy,
            record.duration_sec,
            record.timestamp
        )
    }
}

/// Runs every configuration in the grid, appending CSV rows as points finish.
///
/// Prints per-point progress with an estimated time until the end, computed
/// from the mean duration of completed points ("-" before the first one).
/// Fails up front on an unrecognised dataset name, before any training or
/// file writes happen.
pub fn run_search(
    space: &SearchSpace,
    results_path: &Path,
    mut logger: Option<&mut JsonlLogger>,
    quiet: bool,
) -> Result<Vec<f64>, ExperimentError> {
    if space.base.dataset != "glyphs" {
        return Err(ExperimentError::UnknownDataset(space.base.dataset.clone()));
    }

    let grid = space.configurations();
    let results = ResultsFile::new(results_path);
    let mut durations: Vec<f64> = Vec::with_capacity(grid.len());
    let mut accuracies = Vec::with_capacity(grid.len());

    for (i, config) in grid.iter().enumerate() {
        if !quiet {
            let estimate = if durations.is_empty() {
                "-".to_string()
            } else {
                let mean = durations.iter().sum::<f64>() / durations.len() as f64;
                format!("{:.0}", (grid.len() - i) as f64 * mean / 60.0)
            };
            println!(
                "Configuration: {}-way {}-shot, epochs={}, z_dim={}, lr_predictor={}, lr_target={}",
                config.way,
                config.train_shot,
                config.epochs,
                config.z_dim,
                config.lr_predictor,
                config.lr_target
            );
            println!(
                "Progress {}/{}. Estimated time until end: {} min",
                i + 1,
                grid.len(),
                estimate
            );
        }

        let started = Instant::now();
        let result = run_experiment(config)?;
        let duration_sec = started.elapsed().as_secs_f64();
        durations.push(duration_sec);

        let record = SearchRecord {
            config,
            accuracy: result.mean_accuracy,
            duration_sec,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        results.append(&record)?;
        if let Some(logger) = logger.as_deref_mut() {
            logger.log(&record)?;
        }
        accuracies.push(result.mean_accuracy);
    }

    Ok(accuracies)
}
