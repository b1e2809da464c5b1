//! 테스트용 가짜 구현 (임베딩, 벡터 인덱스, 생성기)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::ServiceError;
use crate::generation::TextGenerator;
use crate::knowledge::{l2_distance_squared, Neighbor, VectorEntry, VectorStore};

/// 가짜 임베딩의 어휘 (차원 = 어휘 수)
pub(crate) const VOCAB: &[&str] = &[
    "cost", "rubles", "year", "ai", "program", "product", "manager", "career", "engineer", "exam",
    "admission", "dormitory",
];

// ============================================================================
// KeywordEmbedding
// ============================================================================

/// 어휘 단어 출현 횟수를 벡터로 쓰는 결정적 임베딩
#[derive(Default)]
pub(crate) struct KeywordEmbedding {
    calls: AtomicUsize,
    always_fail: bool,
    failing: Vec<String>,
    truncated: Vec<String>,
}

impl KeywordEmbedding {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 모든 호출 실패 (HTTP 500 상황)
    pub(crate) fn unavailable() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// 특정 텍스트만 실패
    pub(crate) fn failing_on(texts: &[&str]) -> Self {
        Self {
            failing: texts.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// 특정 텍스트는 다른 차원의 벡터를 반환
    pub(crate) fn truncating(texts: &[&str]) -> Self {
        Self {
            truncated: texts.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vectorize(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        VOCAB
            .iter()
            .map(|word| tokens.iter().filter(|t| *t == word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(ServiceError::ServiceUnavailable(
                "embedding service returned 500 Internal Server Error".to_string(),
            ));
        }
        if self.failing.iter().any(|t| t == text) {
            return Err(ServiceError::MalformedResponse("missing embedding".to_string()));
        }

        let mut vector = Self::vectorize(text);
        if self.truncated.iter().any(|t| t == text) {
            vector.truncate(2);
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "keyword-test"
    }
}

// ============================================================================
// MemoryVectorStore
// ============================================================================

/// 메모리 전수 검색 벡터 인덱스
pub(crate) struct MemoryVectorStore {
    entries: Vec<VectorEntry>,
    dimension: usize,
    /// 검색 결과 뒤에 덧붙일 잘못된 이웃
    bogus: Vec<Neighbor>,
    count_override: Option<usize>,
}

impl MemoryVectorStore {
    pub(crate) fn new(entries: Vec<VectorEntry>, dimension: usize) -> Self {
        Self {
            entries,
            dimension,
            bogus: Vec::new(),
            count_override: None,
        }
    }

    /// 위치 i에 `vectors[i]`를 넣은 인덱스
    pub(crate) fn from_vectors(chunk_ids: &[&str], vectors: Vec<Vec<f32>>) -> Self {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        let entries = vectors
            .into_iter()
            .zip(chunk_ids)
            .enumerate()
            .map(|(i, (embedding, id))| VectorEntry {
                position: i as i64,
                chunk_id: id.to_string(),
                embedding,
            })
            .collect();
        Self::new(entries, dimension)
    }

    pub(crate) fn with_bogus(mut self, bogus: Vec<Neighbor>) -> Self {
        self.bogus = bogus;
        self
    }

    pub(crate) fn with_count(mut self, count: usize) -> Self {
        self.count_override = Some(count);
        self
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
        let mut scored: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|e| Neighbor {
                position: e.position,
                chunk_id: e.chunk_id.clone(),
                distance: l2_distance_squared(query_embedding, &e.embedding),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(limit);
        scored.extend(self.bogus.iter().cloned());
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.count_override.unwrap_or(self.entries.len()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// ScriptedGenerator
// ============================================================================

/// 받은 프롬프트를 기록하고 정해진 답을 돌려주는 생성기
pub(crate) struct ScriptedGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub(crate) fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| ServiceError::ServiceUnavailable("timed out".to_string()))
    }

    fn name(&self) -> &str {
        "scripted-test"
    }
}
