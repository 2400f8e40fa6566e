//! Deterministic face service for tests.

use async_trait::async_trait;
use std::collections::HashMap;

use super::services::{Embedding, FaceError, FaceImage, FaceService, ImageFormat, Liveness};

/// Maps capture bytes to a fixed embedding; captures prefixed `spoof` fail liveness
/// and unknown captures contain no face.
pub struct StubFace {
    threshold: f32,
    embeddings: HashMap<Vec<u8>, Vec<f32>>,
}

impl StubFace {
    pub fn new(threshold: f32) -> Self {
        let embeddings = [
            (b"alice".to_vec(), vec![1.0, 0.0]),
            (b"bob".to_vec(), vec![0.0, 1.0]),
            // cos 0.6 against alice
            (b"lookalike".to_vec(), vec![0.6, 0.8]),
            (b"stranger".to_vec(), vec![-1.0, 0.0]),
        ]
        .into_iter()
        .collect();
        Self {
            threshold,
            embeddings,
        }
    }
}

impl Default for StubFace {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl FaceService for StubFace {
    async fn decode(&self, bytes: &[u8]) -> Result<FaceImage, FaceError> {
        if bytes.is_empty() {
            return Err(FaceError::InvalidImage("empty upload".to_string()));
        }
        Ok(FaceImage::new(ImageFormat::Jpeg, bytes.to_vec()))
    }

    async fn check_liveness(&self, image: &FaceImage) -> Result<Liveness, FaceError> {
        if image.bytes().starts_with(b"spoof") {
            Ok(Liveness::rejected("printed photo"))
        } else {
            Ok(Liveness::live())
        }
    }

    async fn embedding(&self, image: &FaceImage) -> Result<Option<Embedding>, FaceError> {
        self.embeddings
            .get(image.bytes())
            .map(|values| Embedding::new(values.clone()))
            .transpose()
    }

    fn similarity_threshold(&self) -> f32 {
        self.threshold
    }
}
