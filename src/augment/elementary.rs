//! Geometric perturbation: shifted and noise-corrupted copies.

use ndarray::Array2;
use rand::Rng;

/// Expands one image into its augmented copies: the original, four copies
/// shifted by `shift` pixels (up, down, left, right, zero-filled), and a
/// Gaussian-noise copy of each of those.
///
/// With `shift == 0` only the original and its noise copy are produced.
pub fn augmented_copies<R: Rng>(
    img: &Array2<f32>,
    shift: usize,
    sigma: f32,
    rng: &mut R,
) -> Vec<Array2<f32>> {
    let mut base = vec![img.clone()];
    if shift > 0 {
        let s = shift as isize;
        base.push(shifted(img, -s, 0));
        base.push(shifted(img, s, 0));
        base.push(shifted(img, 0, -s));
        base.push(shifted(img, 0, s));
    }

    let mut out = Vec::with_capacity(base.len() * 2);
    for img in base {
        let noisy = noisy_copy(&img, sigma, rng);
        out.push(img);
        out.push(noisy);
    }
    out
}

/// Augments a whole support set, preserving labels.
pub fn augment_support<R: Rng>(
    support: &[(Array2<f32>, usize)],
    shift: usize,
    sigma: f32,
    rng: &mut R,
) -> Vec<(Array2<f32>, usize)> {
    let mut out = Vec::new();
    for (img, label) in support {
        for copy in augmented_copies(img, shift, sigma, rng) {
            out.push((copy, *label));
        }
    }
    out
}

/// Translates the image by (`dr`, `dc`) pixels, filling vacated cells with 0.
fn shifted(img: &Array2<f32>, dr: isize, dc: isize) -> Array2<f32> {
    let (rows, cols) = img.dim();
    let mut out = Array2::zeros((rows, cols));
    for r in 0..rows as isize {
        for c in 0..cols as isize {
            let sr = r - dr;
            let sc = c - dc;
            if sr >= 0 && sr < rows as isize && sc >= 0 && sc < cols as isize {
                out[[r as usize, c as usize]] = img[[sr as usize, sc as usize]];
            }
        }
    }
    out
}

fn noisy_copy<R: Rng>(img: &Array2<f32>, sigma: f32, rng: &mut R) -> Array2<f32> {
    img.mapv(|v| v + gaussian(rng) * sigma)
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(1e-10);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
