//! Random-network-distillation model: per-class predictors chasing a shared
//! random target network, with prediction error as the classification score.

pub mod net;
pub mod optimizer;
pub mod rnd;

pub use net::FeatureNet;
pub use optimizer::{Adam, Optimizer, Sgd};
pub use rnd::RndModel;
