//! Genre prediction: class labels, model backends and the classifier adapter.

mod classifier;
mod labels;
mod models;

pub use classifier::{GenreClassifier, GenrePrediction, PredictionError, PredictionPolicy};
pub use labels::{Genre, GENRE_COUNT};
pub use models::{GenreModel, HttpGenreModel, LinearGenreModel, ModelError};
