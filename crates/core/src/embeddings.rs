use crate::error::EmbeddingError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Sentence-embedding capability used by the dense neighbor path.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// One vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Which embedding capability, if any, is available for this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmbeddingBackend {
    #[default]
    None,
    Ngram {
        dimensions: usize,
    },
    Http(HttpEmbeddingConfig),
}

impl EmbeddingBackend {
    pub fn create_embedder(&self) -> Result<Option<Box<dyn Embedder>>, EmbeddingError> {
        match self {
            EmbeddingBackend::None => Ok(None),
            EmbeddingBackend::Ngram { dimensions } => {
                Ok(Some(Box::new(CharacterNgramEmbedder { dimensions: *dimensions })))
            }
            EmbeddingBackend::Http(config) => {
                Ok(Some(Box::new(HttpEmbedder::new(config.clone())?)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    /// Hashes lower-cased character trigrams into buckets, L2-normalised.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        vector
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn name(&self) -> &str {
        "ngram"
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEmbeddingConfig {
    /// Base URL of an OpenAI-compatible API; `/embeddings` is appended.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl HttpEmbeddingConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: 64,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for OpenAI-compatible `/embeddings` endpoints. One attempt per batch.
pub struct HttpEmbedder {
    client: Client,
    url: String,
    config: HttpEmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.endpoint.trim().is_empty() {
            return Err(EmbeddingError::Config("embedding endpoint is empty".to_string()));
        }
        if config.batch_size == 0 {
            return Err(EmbeddingError::Config("batch size must be positive".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = format!("{}/embeddings", config.endpoint.trim().trim_end_matches('/'));
        Ok(Self { client, url, config })
    }

    fn embed_chunk(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let payload = EmbeddingRequest {
            model: &self.config.model,
            input: inputs,
        };
        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(EmbeddingError::BackendResponse {
                backend: self.url.clone(),
                details: format!("status {}", response.status()),
            });
        }

        let mut parsed: EmbeddingResponse = response.json()?;
        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::BackendResponse {
                backend: self.url.clone(),
                details: format!(
                    "{} embeddings for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            });
        }
        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            vectors.extend(self.embed_chunk(batch)?);
        }
        Ok(vectors)
    }
}

pub fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}
