//! Episodic sampling: support/query splits for few-shot trials.

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::glyphs::GlyphDataset;

/// One few-shot trial: a support set for training and a query set for testing.
///
/// Labels are episode-local in `0..way`, ordered class-major: the first
/// `train_shot` support entries carry label 0, the next `train_shot` label 1,
/// and so on. The query set follows the same layout with `test_shot` entries
/// per class.
pub struct Episode {
    pub support: Vec<(Array2<f32>, usize)>,
    pub query: Vec<(Array2<f32>, usize)>,
}

/// Draws episodes from a [`GlyphDataset`].
pub struct EpisodeSampler<'a> {
    dataset: &'a GlyphDataset,
    way: usize,
    train_shot: usize,
    test_shot: usize,
    by_class: Vec<Vec<usize>>,
}

impl<'a> EpisodeSampler<'a> {
    /// Builds a sampler, checking the dataset can actually supply episodes of
    /// the requested shape.
    pub fn new(
        dataset: &'a GlyphDataset,
        way: usize,
        train_shot: usize,
        test_shot: usize,
    ) -> Result<Self, EpisodeError> {
        if dataset.num_classes < way {
            return Err(EpisodeError::NotEnoughClasses {
                have: dataset.num_classes,
                need: way,
            });
        }

        let mut by_class = vec![Vec::new(); dataset.num_classes];
        for (idx, &label) in dataset.labels.iter().enumerate() {
            by_class[label].push(idx);
        }

        let need = train_shot + test_shot;
        for (class, indices) in by_class.iter().enumerate() {
            if indices.len() < need {
                return Err(EpisodeError::NotEnoughSamples {
                    class,
                    have: indices.len(),
                    need,
                });
            }
        }

        Ok(Self {
            dataset,
            way,
            train_shot,
            test_shot,
            by_class,
        })
    }

    /// Draws one episode: `way` distinct classes, then disjoint support and
    /// query samples per class.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Episode {
        let mut classes: Vec<usize> = (0..self.dataset.num_classes).collect();
        classes.shuffle(rng);
        classes.truncate(self.way);

        let mut support = Vec::with_capacity(self.way * self.train_shot);
        let mut query = Vec::with_capacity(self.way * self.test_shot);

        for (episode_label, &class) in classes.iter().enumerate() {
            let mut indices = self.by_class[class].clone();
            indices.shuffle(rng);

            for &idx in indices.iter().take(self.train_shot) {
                support.push((self.dataset.images[idx].clone(), episode_label));
            }
            for &idx in indices
                .iter()
                .skip(self.train_shot)
                .take(self.test_shot)
            {
                query.push((self.dataset.images[idx].clone(), episode_label));
            }
        }

        Episode { support, query }
    }
}

#[derive(Debug)]
pub enum EpisodeError {
    NotEnoughClasses { have: usize, need: usize },
    NotEnoughSamples { class: usize, have: usize, need: usize },
}

impl std::fmt::Display for EpisodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeError::NotEnoughClasses { have, need } => {
                write!(f, "dataset has {} classes but the episode needs {}", have, need)
            }
            EpisodeError::NotEnoughSamples { class, have, need } => write!(
                f,
                "class {} has {} samples but the episode needs {}",
                class, have, need
            ),
        }
    }
}

impl std::error::Error for EpisodeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dataset() -> GlyphDataset {
        GlyphDataset::generate(6, 4, 8, 11, false)
    }

    #[test]
    fn episode_has_expected_shape() {
        let data = dataset();
        let sampler = EpisodeSampler::new(&data, 3, 2, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let episode = sampler.sample(&mut rng);

        assert_eq!(episode.support.len(), 6);
        assert_eq!(episode.query.len(), 3);
        // Class-major label layout
        let support_labels: Vec<usize> = episode.support.iter().map(|(_, l)| *l).collect();
        assert_eq!(support_labels, vec![0, 0, 1, 1, 2, 2]);
        let query_labels: Vec<usize> = episode.query.iter().map(|(_, l)| *l).collect();
        assert_eq!(query_labels, vec![0, 1, 2]);
    }

    #[test]
    fn support_and_query_are_disjoint() {
        let data = dataset();
        let sampler = EpisodeSampler::new(&data, 2, 2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let episode = sampler.sample(&mut rng);

        for (s, _) in &episode.support {
            for (q, _) in &episode.query {
                assert_ne!(s, q);
            }
        }
    }

    #[test]
    fn rejects_too_many_ways() {
        let data = dataset();
        assert!(matches!(
            EpisodeSampler::new(&data, 7, 1, 1),
            Err(EpisodeError::NotEnoughClasses { have: 6, need: 7 })
        ));
    }

    #[test]
    fn rejects_too_many_shots() {
        let data = dataset();
        assert!(matches!(
            EpisodeSampler::new(&data, 2, 3, 2),
            Err(EpisodeError::NotEnoughSamples { .. })
        ));
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let data = dataset();
        let sampler = EpisodeSampler::new(&data, 3, 1, 1).unwrap();
        let a = sampler.sample(&mut StdRng::seed_from_u64(5));
        let b = sampler.sample(&mut StdRng::seed_from_u64(5));
        for ((xa, la), (xb, lb)) in a.support.iter().zip(b.support.iter()) {
            assert_eq!(xa, xb);
            assert_eq!(la, lb);
        }
    }
}
