//! Per-class predictor/target model scored by feature-prediction error.
//!
//! A single random target network maps inputs to feature space. Each class owns
//! a predictor network trained to match the target's features on that class's
//! samples only, so at test time the class whose predictor tracks the target
//! best (lowest MSE) wins. With a non-zero target learning rate the target is
//! also nudged toward the active predictor, distilling in both directions.

use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ExperimentConfig;
use crate::model::net::FeatureNet;
use crate::model::optimizer::Optimizer;

pub struct RndModel {
    target: FeatureNet,
    predictors: Vec<FeatureNet>,
    optimizers: Vec<Optimizer>,
    target_optimizer: Option<Optimizer>,
    out_dim: usize,
}

impl RndModel {
    /// Builds a model for `config.way` classes with weights drawn from `seed`.
    pub fn from_config(config: &ExperimentConfig, seed: u64) -> Self {
        let in_dim = config.x_dim * config.x_dim;
        let out_dim = config.z_dim;
        let mut rng = StdRng::seed_from_u64(seed);

        let target = FeatureNet::new(in_dim, out_dim, config.initialization, &mut rng);
        let predictors = (0..config.way)
            .map(|_| FeatureNet::new(in_dim, out_dim, config.initialization, &mut rng))
            .collect();
        let optimizers = (0..config.way)
            .map(|_| Optimizer::new(config.optimizer, config.lr_predictor))
            .collect();
        let target_optimizer = (config.lr_target > 0.0)
            .then(|| Optimizer::new(config.optimizer, config.lr_target));

        Self {
            target,
            predictors,
            optimizers,
            target_optimizer,
            out_dim,
        }
    }

    pub fn way(&self) -> usize {
        self.predictors.len()
    }

    /// Feature pair (predictor, target) for one class.
    pub fn forward(&self, class: usize, x: &Array1<f32>) -> (Array1<f32>, Array1<f32>) {
        (self.predictors[class].forward(x), self.target.forward(x))
    }

    /// One gradient step on the predictor of `class` toward the target
    /// features of `x`. Returns the MSE loss before the update.
    pub fn train_step(&mut self, class: usize, x: &Array1<f32>) -> f32 {
        let target_feat = self.target.forward(x);
        let pred_feat = self.predictors[class].forward(x);

        let diff = &pred_feat - &target_feat;
        let loss = diff.iter().map(|d| d * d).sum::<f32>() / self.out_dim as f32;

        let grad_out = diff.mapv(|d| 2.0 * d / self.out_dim as f32);
        let grad_weights = grad_out
            .view()
            .insert_axis(Axis(1))
            .dot(&x.view().insert_axis(Axis(0)))
            .as_standard_layout()
            .to_owned();

        let predictor = &mut self.predictors[class];
        let optimizer = &mut self.optimizers[class];
        optimizer.step("weights", &mut predictor.weights, &grad_weights);
        optimizer.step("bias", &mut predictor.bias, &grad_out);

        if let Some(target_optimizer) = &mut self.target_optimizer {
            // Bidirectional distillation: pull the target toward the predictor
            let grad_target = grad_out.mapv(|g| -g);
            let grad_target_weights = grad_target
                .view()
                .insert_axis(Axis(1))
                .dot(&x.view().insert_axis(Axis(0)))
                .as_standard_layout()
                .to_owned();
            target_optimizer.step("weights", &mut self.target.weights, &grad_target_weights);
            target_optimizer.step("bias", &mut self.target.bias, &grad_target);
        }

        loss
    }

    /// Per-class novelty scores for `x`: half the summed squared error between
    /// the target features and each class predictor's features. Lower means
    /// more familiar.
    pub fn scores(&self, x: &Array1<f32>) -> Vec<f32> {
        let target_feat = self.target.forward(x);
        self.predictors
            .iter()
            .map(|predictor| {
                let pred_feat = predictor.forward(x);
                pred_feat
                    .iter()
                    .zip(target_feat.iter())
                    .map(|(p, t)| (t - p) * (t - p))
                    .sum::<f32>()
                    / 2.0
            })
            .collect()
    }

    /// Class with the lowest novelty score; ties resolve to the lowest index.
    pub fn classify(&self, x: &Array1<f32>) -> usize {
        let scores = self.scores(x);
        let mut best = 0;
        for (class, &score) in scores.iter().enumerate() {
            if score < scores[best] {
                best = class;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn tiny_config() -> ExperimentConfig {
        ExperimentConfig {
            way: 3,
            x_dim: 4,
            z_dim: 8,
            lr_predictor: 0.01,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn scores_has_one_entry_per_class() {
        let model = RndModel::from_config(&tiny_config(), 1);
        let x = Array1::ones(16);
        assert_eq!(model.scores(&x).len(), 3);
        assert_eq!(model.way(), 3);
    }

    #[test]
    fn train_step_reduces_loss_on_repeated_sample() {
        let mut model = RndModel::from_config(&tiny_config(), 1);
        let x = Array1::from_vec((0..16).map(|i| i as f32 / 16.0).collect());

        let first = model.train_step(0, &x);
        let mut last = first;
        for _ in 0..50 {
            last = model.train_step(0, &x);
        }
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
    }

    #[test]
    fn trained_class_wins_its_own_sample() {
        let mut model = RndModel::from_config(&tiny_config(), 7);
        let x = Array1::from_vec((0..16).map(|i| (i as f32 * 0.3).sin().abs()).collect());

        for _ in 0..200 {
            model.train_step(1, &x);
        }
        assert_eq!(model.classify(&x), 1);
        let scores = model.scores(&x);
        assert!(scores[1] < scores[0]);
        assert!(scores[1] < scores[2]);
    }

    #[test]
    fn untrained_classes_are_untouched() {
        let mut model = RndModel::from_config(&tiny_config(), 3);
        let x = Array1::ones(16);
        let before = model.scores(&x);
        model.train_step(0, &x);
        let after = model.scores(&x);
        // Only class 0 moved; target is frozen at lr_target = 0
        assert_ne!(before[0], after[0]);
        assert_eq!(before[1], after[1]);
        assert_eq!(before[2], after[2]);
    }

    #[test]
    fn bidirectional_updates_move_the_target() {
        let config = ExperimentConfig {
            lr_target: 0.01,
            ..tiny_config()
        };
        let mut model = RndModel::from_config(&config, 3);
        let x = Array1::ones(16);
        let before = model.target.forward(&x);
        model.train_step(0, &x);
        let after = model.target.forward(&x);
        assert_ne!(before, after);
    }

    #[test]
    fn same_seed_same_model() {
        let a = RndModel::from_config(&tiny_config(), 9);
        let b = RndModel::from_config(&tiny_config(), 9);
        let x = Array1::ones(16);
        assert_eq!(a.scores(&x), b.scores(&x));
    }
}
