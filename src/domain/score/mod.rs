//! Compatibility report domain

mod model;

pub use model::{
    ScoreModel, ScoreWeights, SectionKind, SectionScore, Sections, DEFAULT_WEIGHTS_VERSION,
};
