//! Dense feature network with Xavier initialization.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::config::InitKind;

/// A single dense map `x -> Wx + b` from `in_dim` to `out_dim`.
///
/// Both the frozen target network and the trainable per-class predictors are
/// instances of this type; what differs is only whether gradients are applied.
pub struct FeatureNet {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl FeatureNet {
    /// Creates a network with Xavier-initialized weights and zero bias.
    pub fn new<R: Rng>(in_dim: usize, out_dim: usize, init: InitKind, rng: &mut R) -> Self {
        let fan = (in_dim + out_dim) as f32;
        let mut weights = Array2::zeros((out_dim, in_dim));
        match init {
            InitKind::XavierNormal => {
                let std = (2.0 / fan).sqrt();
                for w in weights.iter_mut() {
                    *w = gaussian(rng) * std;
                }
            }
            InitKind::XavierUniform => {
                let bound = (6.0 / fan).sqrt();
                for w in weights.iter_mut() {
                    *w = rng.gen_range(-bound..bound);
                }
            }
        }

        Self {
            weights,
            bias: Array1::zeros(out_dim),
        }
    }

    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Forward pass.
    pub fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
        self.weights.dot(x) + &self.bias
    }
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(1e-10);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn forward_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = FeatureNet::new(16, 8, InitKind::XavierNormal, &mut rng);
        let x = Array1::ones(16);
        assert_eq!(net.forward(&x).len(), 8);
        assert_eq!(net.in_dim(), 16);
        assert_eq!(net.out_dim(), 8);
    }

    #[test]
    fn xavier_normal_scale_is_sane() {
        use approx::assert_abs_diff_eq;

        let mut rng = StdRng::seed_from_u64(1);
        let net = FeatureNet::new(100, 100, InitKind::XavierNormal, &mut rng);
        let n = net.weights.len() as f32;
        let mean: f32 = net.weights.iter().sum::<f32>() / n;
        let var: f32 = net.weights.iter().map(|w| (w - mean) * (w - mean)).sum::<f32>() / n;
        // Expected variance 2 / (in + out) = 0.01
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.01);
        assert_abs_diff_eq!(var, 0.01, epsilon = 0.005);
    }

    #[test]
    fn xavier_uniform_stays_in_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        let net = FeatureNet::new(50, 50, InitKind::XavierUniform, &mut rng);
        let bound = (6.0f32 / 100.0).sqrt();
        for &w in net.weights.iter() {
            assert!(w.abs() <= bound);
        }
    }

    #[test]
    fn bias_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let net = FeatureNet::new(4, 4, InitKind::XavierNormal, &mut rng);
        assert!(net.bias.iter().all(|&b| b == 0.0));
    }
}
