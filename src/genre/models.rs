//! Genre model backends.
//!
//! The classifier adapter only needs something that maps a batch of feature
//! vectors to class indices. Two backends ship with the server: a linear
//! model loaded from a weights file and a client for a remote model-serving
//! endpoint.

use super::labels::GENRE_COUNT;
use crate::profile::{FeatureVector, FEATURE_COUNT};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model input error: {0}")]
    Input(String),

    #[error("Model connection error: {0}")]
    Connection(String),

    #[error("Model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

/// An opaque pre-trained classifier over feature vectors.
#[async_trait]
pub trait GenreModel: Send + Sync {
    /// Returns one class index per input row.
    async fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<i64>, ModelError>;
}

#[derive(Debug, Deserialize)]
struct LinearWeightsFile {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

/// Multiclass linear model: `argmax(W · x + b)`.
#[derive(Debug, Clone)]
pub struct LinearGenreModel {
    weights: Vec<[f64; FEATURE_COUNT]>,
    bias: Vec<f64>,
}

impl LinearGenreModel {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> anyhow::Result<Self> {
        if weights.len() != GENRE_COUNT {
            anyhow::bail!(
                "Expected {} weight rows, found {}",
                GENRE_COUNT,
                weights.len()
            );
        }
        if bias.len() != GENRE_COUNT {
            anyhow::bail!("Expected {} bias values, found {}", GENRE_COUNT, bias.len());
        }
        let weights = weights
            .into_iter()
            .enumerate()
            .map(|(row_index, row)| {
                <[f64; FEATURE_COUNT]>::try_from(row.as_slice()).map_err(|_| {
                    anyhow::anyhow!(
                        "Weight row {} has {} values, expected {}",
                        row_index,
                        row.len(),
                        FEATURE_COUNT
                    )
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(LinearGenreModel { weights, bias })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read genre model {:?}", path.as_ref()))?;
        let file: LinearWeightsFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse genre model {:?}", path.as_ref()))?;
        Self::new(file.weights, file.bias)
    }

    fn classify(&self, features: &FeatureVector) -> i64 {
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (class_index, (row, bias)) in self.weights.iter().zip(&self.bias).enumerate() {
            let score = row
                .iter()
                .zip(features.as_slice())
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + bias;
            if score > best_score {
                best_score = score;
                best_index = class_index;
            }
        }
        best_index as i64
    }
}

#[async_trait]
impl GenreModel for LinearGenreModel {
    async fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<i64>, ModelError> {
        Ok(batch.iter().map(|features| self.classify(features)).collect())
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<&'a [f64]>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<serde_json::Value>,
}

/// Client for a model-serving endpoint speaking the
/// `{"instances": [...]}` / `{"predictions": [...]}` protocol.
pub struct HttpGenreModel {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpGenreModel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GenreModel for HttpGenreModel {
    async fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<i64>, ModelError> {
        let request = PredictRequest {
            instances: batch.iter().map(FeatureVector::as_slice).collect(),
        };
        debug!(url = %self.url, rows = batch.len(), "Requesting genre prediction");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        body.predictions
            .iter()
            .map(|prediction| {
                prediction
                    .as_i64()
                    .or_else(|| prediction.as_f64().map(|f| f.trunc() as i64))
                    .ok_or_else(|| {
                        ModelError::InvalidResponse(format!("Non-numeric prediction {}", prediction))
                    })
            })
            .collect()
    }
}
