//! # fewshot-rnd
//!
//! Few-shot classification experiments built on a random-network-distillation
//! model: every class owns a predictor network trained to match a shared random
//! target network, and the per-class feature-prediction error serves as the
//! classification score. Support sets are inflated by heuristic augmentation
//! (geometric perturbation, distillation-guided interpolation, pair-sample
//! mixing) before a handful of gradient-descent epochs, and accuracy is
//! averaged over many random episodes.
//!
//! ## Quick Start
//!
//! ```rust
//! use fewshot_rnd::{run_experiment, ExperimentConfig};
//!
//! let config = ExperimentConfig {
//!     way: 2,
//!     train_shot: 1,
//!     test_shot: 1,
//!     epochs: 1,
//!     trials: 1,
//!     x_dim: 8,
//!     z_dim: 8,
//!     shift: 0,
//!     add_rotations: false,
//!     ..ExperimentConfig::default()
//! };
//!
//! let result = run_experiment(&config).unwrap();
//! println!("Mean accuracy: {}", result.mean_accuracy);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Experiment configuration via TOML
//! - [`data`] - Synthetic glyph dataset and episodic sampling
//! - [`model`] - Target/predictor networks, optimizers
//! - [`augment`] - Heuristic training-sample generation
//! - [`experiment`] - Episodic train/test protocol
//! - [`search`] - Hyperparameter grid search with CSV results
//! - [`logging`] - JSON line-delimited logging

pub mod augment;
pub mod config;
pub mod data;
pub mod experiment;
pub mod logging;
pub mod model;
pub mod search;

pub use config::{AugmentStrategy, ConfigError, ExperimentConfig, InitKind, OptimizerKind};
pub use data::{Episode, EpisodeSampler, GlyphDataset};
pub use experiment::{
    evaluate, run_epoch, run_experiment, run_experiment_with_logger, ExperimentError,
    ExperimentResult, Sample,
};
pub use logging::JsonlLogger;
pub use model::RndModel;
pub use search::{run_search, ResultsFile, SearchSpace};
