//! 임베딩 모듈 - Ollama API를 통한 텍스트 벡터화
//!
//! 텍스트를 벡터로 변환하는 임베딩 프로바이더입니다.
//! 재시도는 하지 않습니다. 실패 시 어떻게 처리할지는 호출자가 결정합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OllamaEmbedding::new(&host, "nomic-embed-text")?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```
//!
//! ref: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ServiceError;

/// 임베딩 요청 타임아웃
pub const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 벡터 차원은 서비스 응답으로 결정되며 여기서 고정하지 않습니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩 (네트워크 호출 1회)
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// 프로바이더(모델) 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Ollama Embedding
// ============================================================================

/// Ollama 임베딩 구현체
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

/// Ollama 임베딩 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Ollama 임베딩 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// 새 임베딩 클라이언트 생성
    ///
    /// # Arguments
    /// * `host` - Ollama 서버 주소 (끝에 `/`)
    /// * `model` - 임베딩 모델 이름
    pub fn new(host: &Url, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, model, EMBEDDING_TIMEOUT)
    }

    /// 타임아웃을 지정하여 생성
    pub fn with_timeout(host: &Url, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = host
            .join("api/embeddings")
            .context("Failed to build embeddings endpoint")?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::ServiceUnavailable(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = serde_json::from_str(&body).map_err(|e| {
            ServiceError::MalformedResponse(format!("invalid embedding response: {}", e))
        })?;

        if parsed.embedding.is_empty() {
            return Err(ServiceError::MalformedResponse(
                "embedding array is empty".to_string(),
            ));
        }

        tracing::debug!(
            "Embedded {} chars -> dim {}",
            text.chars().count(),
            parsed.embedding.len()
        );

        Ok(parsed.embedding)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
