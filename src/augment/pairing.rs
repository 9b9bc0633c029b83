//! Pair-sample mixing for pretraining.

use rand::Rng;

use crate::experiment::Sample;

/// Builds a pretraining set by averaging sample pairs.
///
/// For each of the `n` input samples, draws `n` uniformly random partners
/// (self-pairing allowed), averages the two vectors and labels the blend with
/// a fair coin flip between the two source labels. Returns `n * n` samples.
pub fn pair_samples<R: Rng>(samples: &[Sample], rng: &mut R) -> Vec<Sample> {
    let n = samples.len();
    let mut out = Vec::with_capacity(n * n);

    for sample in samples {
        for _ in 0..n {
            let partner = &samples[rng.gen_range(0..n)];
            let x = (&sample.x + &partner.x) / 2.0;
            let label = if rng.gen_bool(0.5) {
                sample.label
            } else {
                partner.label
            };
            out.push(Sample { x, label });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample(fill: f32, label: usize) -> Sample {
        Sample {
            x: Array1::from_elem(4, fill),
            label,
        }
    }

    #[test]
    fn emits_n_squared_samples() {
        let samples = vec![sample(0.0, 0), sample(1.0, 1), sample(0.5, 2)];
        let mut rng = StdRng::seed_from_u64(0);
        let paired = pair_samples(&samples, &mut rng);
        assert_eq!(paired.len(), 9);
    }

    #[test]
    fn blends_are_averages() {
        let samples = vec![sample(0.0, 0), sample(1.0, 1)];
        let mut rng = StdRng::seed_from_u64(1);
        let paired = pair_samples(&samples, &mut rng);
        // Every element is 0, 0.5 or 1 depending on the drawn pair
        for p in &paired {
            let v = p.x[0];
            assert!(v == 0.0 || v == 0.5 || v == 1.0, "got {}", v);
        }
    }

    #[test]
    fn labels_come_from_the_pair() {
        let samples = vec![sample(0.0, 3), sample(1.0, 7)];
        let mut rng = StdRng::seed_from_u64(2);
        let paired = pair_samples(&samples, &mut rng);
        for p in &paired {
            assert!(p.label == 3 || p.label == 7);
        }
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(pair_samples(&[], &mut rng).is_empty());
    }
}
