//! Deterministic synthetic glyph dataset.
//!
//! Stands in for an external episodic image loader: every class is a seeded
//! mixture of 2-D Gaussian blobs rasterized onto a square grid, and every drawn
//! sample jitters the blob centers and adds pixel noise. Classes are therefore
//! visually distinct but samples within a class vary, which is what the
//! few-shot protocol needs.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Blob center jitter applied per drawn sample, in unit-square coordinates.
const CENTER_JITTER: f32 = 0.04;
/// Additive pixel noise applied per drawn sample.
const PIXEL_NOISE: f32 = 0.02;

/// In-memory labeled image collection.
pub struct GlyphDataset {
    pub images: Vec<Array2<f32>>,
    pub labels: Vec<usize>,
    pub num_classes: usize,
    pub dim: usize,
}

impl GlyphDataset {
    /// Generates `num_classes` glyph classes with `samples_per_class` samples
    /// each, rendered at `dim` x `dim`.
    ///
    /// With `add_rotations`, the 90/180/270-degree rotations of every class are
    /// appended as new classes, so the result holds `4 * num_classes` classes.
    /// Output is fully determined by `seed`.
    pub fn generate(
        num_classes: usize,
        samples_per_class: usize,
        dim: usize,
        seed: u64,
        add_rotations: bool,
    ) -> Self {
        let base: Vec<Vec<Array2<f32>>> = (0..num_classes)
            .into_par_iter()
            .map(|class| {
                let class_seed = seed.wrapping_add(0x9E37_79B9_7F4A_7C15_u64.wrapping_mul(class as u64 + 1));
                let mut rng = StdRng::seed_from_u64(class_seed);
                let glyph = GlyphClass::from_seed(class_seed);
                (0..samples_per_class)
                    .map(|_| glyph.render(dim, &mut rng))
                    .collect()
            })
            .collect();

        let rotations = if add_rotations { 4 } else { 1 };
        let total_classes = num_classes * rotations;
        let mut images = Vec::with_capacity(total_classes * samples_per_class);
        let mut labels = Vec::with_capacity(total_classes * samples_per_class);

        for quarter_turns in 0..rotations {
            for (class, samples) in base.iter().enumerate() {
                let label = quarter_turns * num_classes + class;
                for img in samples {
                    let mut rotated = img.clone();
                    for _ in 0..quarter_turns {
                        rotated = rotate90(&rotated);
                    }
                    images.push(rotated);
                    labels.push(label);
                }
            }
        }

        Self {
            images,
            labels,
            num_classes: total_classes,
            dim,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// One glyph class: a fixed mixture of Gaussian blobs.
struct GlyphClass {
    blobs: Vec<Blob>,
}

struct Blob {
    row: f32,
    col: f32,
    amplitude: f32,
    sigma: f32,
}

impl GlyphClass {
    fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(3..=5);
        let blobs = (0..count)
            .map(|_| Blob {
                row: rng.gen_range(0.2..0.8),
                col: rng.gen_range(0.2..0.8),
                amplitude: rng.gen_range(0.6..1.0),
                sigma: rng.gen_range(0.06..0.14),
            })
            .collect();
        Self { blobs }
    }

    /// Rasterizes one sample of this class with per-sample jitter and noise.
    fn render(&self, dim: usize, rng: &mut StdRng) -> Array2<f32> {
        let jittered: Vec<(f32, f32, f32, f32)> = self
            .blobs
            .iter()
            .map(|b| {
                (
                    b.row + gaussian(rng) * CENTER_JITTER,
                    b.col + gaussian(rng) * CENTER_JITTER,
                    b.amplitude,
                    b.sigma,
                )
            })
            .collect();

        let mut img = Array2::zeros((dim, dim));
        for r in 0..dim {
            for c in 0..dim {
                let y = (r as f32 + 0.5) / dim as f32;
                let x = (c as f32 + 0.5) / dim as f32;
                let mut value = 0.0f32;
                for &(br, bc, amp, sigma) in &jittered {
                    let d2 = (y - br) * (y - br) + (x - bc) * (x - bc);
                    value += amp * (-d2 / (2.0 * sigma * sigma)).exp();
                }
                value += gaussian(rng) * PIXEL_NOISE;
                img[[r, c]] = value.clamp(0.0, 1.0);
            }
        }
        img
    }
}

/// Rotates a square image 90 degrees clockwise.
pub fn rotate90(img: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = img.dim();
    let mut out = Array2::zeros((cols, rows));
    for r in 0..rows {
        for c in 0..cols {
            out[[c, rows - 1 - r]] = img[[r, c]];
        }
    }
    out
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(1e-10);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
