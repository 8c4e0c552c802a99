use super::labels::Genre;
use super::models::{GenreModel, ModelError};
use crate::profile::{normalize, FeatureVector, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Genre model failed: {0}")]
    Model(#[from] ModelError),
}

/// What to do when the underlying model fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionPolicy {
    /// Log the failure and answer with this genre.
    Fallback(Genre),
    /// Surface the failure to the caller.
    Strict,
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        PredictionPolicy::Fallback(Genre::Pop)
    }
}

/// Outcome of a prediction, including whether the fallback was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenrePrediction {
    pub genre: Genre,
    pub fell_back: bool,
}

#[derive(Clone)]
pub struct GenreClassifier {
    model: Arc<dyn GenreModel>,
    policy: PredictionPolicy,
}

impl GenreClassifier {
    pub fn new(model: Arc<dyn GenreModel>, policy: PredictionPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> PredictionPolicy {
        self.policy
    }

    pub async fn predict_features(
        &self,
        features: &FeatureVector,
    ) -> Result<GenrePrediction, PredictionError> {
        match self.model.predict(std::slice::from_ref(features)).await {
            Ok(output) => {
                let index = output.first().copied().unwrap_or(0);
                let genre = Genre::from_class_index(index);
                debug!(index, genre = %genre, "Genre predicted");
                Ok(GenrePrediction {
                    genre,
                    fell_back: false,
                })
            }
            Err(err) => match self.policy {
                PredictionPolicy::Fallback(genre) => {
                    warn!(error = %err, fallback = %genre, "Genre model failed, using fallback");
                    Ok(GenrePrediction {
                        genre,
                        fell_back: true,
                    })
                }
                PredictionPolicy::Strict => Err(err.into()),
            },
        }
    }

    pub async fn predict_profile(
        &self,
        profile: &UserProfile,
    ) -> Result<GenrePrediction, PredictionError> {
        self.predict_features(&normalize(profile)).await
    }
}
