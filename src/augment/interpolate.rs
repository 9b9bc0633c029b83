//! Distillation-guided interpolation augmentation.
//!
//! For a slice of the training set, blend each sample toward a random sample of
//! a different class, backing the mixing weight off until just before the
//! model stops recognising the blend as the original class. The final blend is
//! taken at the midpoint of the searched range and keeps the original label,
//! so the synthetic sample sits near the model's current decision boundary
//! without crossing it.

use rand::Rng;

use crate::experiment::Sample;
use crate::model::rnd::RndModel;

/// Fraction of the training set that seeds new blends each call.
const AUGMENT_FRACTION: f32 = 0.2;
/// Initial weight on the original sample.
const BLEND_START: f32 = 0.9;
/// The search never drops the original's weight below this.
const BLEND_FLOOR: f32 = 0.7;
/// Step the weight backs off by while the blend still classifies correctly.
const BLEND_STEP: f32 = 0.02;

/// Returns `samples` extended with adaptive blends.
///
/// The first `floor(len * 0.2)` samples (at least one) seed blends. If every
/// sample shares one label no cross-class partner exists and the input is
/// returned unchanged.
pub fn distill_interpolate<R: Rng>(
    samples: &[Sample],
    model: &RndModel,
    rng: &mut R,
) -> Vec<Sample> {
    let mut out = samples.to_vec();
    if samples.is_empty() {
        return out;
    }
    if samples.iter().all(|s| s.label == samples[0].label) {
        return out;
    }

    let count = ((samples.len() as f32 * AUGMENT_FRACTION).floor() as usize).max(1);

    for sample in &samples[..count] {
        // Partner of a different class
        let mut partner = &samples[rng.gen_range(0..samples.len())];
        while partner.label == sample.label {
            partner = &samples[rng.gen_range(0..samples.len())];
        }

        let mut th = BLEND_START;
        while th > BLEND_FLOOR {
            let blend = &sample.x * th + &partner.x * (1.0 - th);
            if model.classify(&blend) != sample.label {
                break;
            }
            th -= BLEND_STEP;
        }

        let weight = (BLEND_START + th) / 2.0;
        out.push(Sample {
            x: &sample.x * weight + &partner.x * (1.0 - weight),
            label: sample.label,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ExperimentConfig {
        ExperimentConfig {
            way: 2,
            x_dim: 3,
            z_dim: 4,
            ..ExperimentConfig::default()
        }
    }

    fn sample(fill: f32, label: usize) -> Sample {
        Sample {
            x: Array1::from_elem(9, fill),
            label,
        }
    }

    #[test]
    fn appends_blends_with_source_labels() {
        let model = RndModel::from_config(&config(), 0);
        let samples = vec![
            sample(0.0, 0),
            sample(0.2, 0),
            sample(0.8, 1),
            sample(1.0, 1),
            sample(0.9, 1),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let out = distill_interpolate(&samples, &model, &mut rng);

        // floor(5 * 0.2) = 1 new sample
        assert_eq!(out.len(), 6);
        assert_eq!(out[5].label, samples[0].label);
    }

    #[test]
    fn blend_weight_stays_in_midpoint_range() {
        let model = RndModel::from_config(&config(), 0);
        // Seed sample is all zeros, every possible partner all ones, so the
        // appended blend directly exposes the mixing weight.
        let samples = vec![sample(0.0, 0), sample(1.0, 1), sample(1.0, 1)];
        let mut rng = StdRng::seed_from_u64(2);
        let out = distill_interpolate(&samples, &model, &mut rng);

        let blend = &out.last().unwrap().x;
        // x = 0 * w + 1 * (1 - w), so every element equals 1 - w
        let w = 1.0 - blend[0];
        assert!((0.8 - 1e-4..=0.9 + 1e-4).contains(&w), "weight {}", w);
    }

    #[test]
    fn single_class_input_is_unchanged() {
        let model = RndModel::from_config(&config(), 0);
        let samples = vec![sample(0.1, 0), sample(0.3, 0)];
        let mut rng = StdRng::seed_from_u64(3);
        let out = distill_interpolate(&samples, &model, &mut rng);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_input_is_unchanged() {
        let model = RndModel::from_config(&config(), 0);
        let mut rng = StdRng::seed_from_u64(4);
        assert!(distill_interpolate(&[], &model, &mut rng).is_empty());
    }

    #[test]
    fn small_sets_still_produce_one_blend() {
        let model = RndModel::from_config(&config(), 0);
        let samples = vec![sample(0.0, 0), sample(1.0, 1)];
        let mut rng = StdRng::seed_from_u64(5);
        let out = distill_interpolate(&samples, &model, &mut rng);
        assert_eq!(out.len(), 3);
    }
}
