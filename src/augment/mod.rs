//! Synthetic training-sample generation for few-shot episodes.
//!
//! Three strategies, all heuristic:
//! - [`elementary`] - geometric shift and Gaussian-noise copies
//! - [`interpolate`] - distillation-guided interpolation toward other classes
//! - [`pairing`] - pair-sample mixing with coin-flip labels

pub mod elementary;
pub mod interpolate;
pub mod pairing;

pub use elementary::augment_support;
pub use interpolate::distill_interpolate;
pub use pairing::pair_samples;
