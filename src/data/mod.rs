//! Dataset generation and episodic sampling for few-shot experiments.

pub mod episode;
pub mod glyphs;

pub use episode::{Episode, EpisodeError, EpisodeSampler};
pub use glyphs::{rotate90, GlyphDataset};
