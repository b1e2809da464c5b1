//! Retriever - 질문 임베딩 + 지식베이스 검색 → 컨텍스트 블록
//!
//! 실패는 에러로 전파하지 않고 [`RetrievedContext`]의 변형으로 돌려줍니다.
//! 호출자는 문자열 비교가 아닌 변형으로 실패를 구분합니다.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;

use super::base::{KnowledgeBase, SearchHit};

/// 질문을 처리하지 못했을 때의 문구
pub const QUERY_FAILED_MESSAGE: &str =
    "Could not process your question for the knowledge base search.";

/// 관련 청크가 없을 때의 문구
pub const NO_MATCHES_MESSAGE: &str = "No relevant information was found in the knowledge base.";

// ============================================================================
// RetrievedContext
// ============================================================================

/// 검색 결과 컨텍스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievedContext {
    /// 포맷된 청크 블록
    Found(String),
    /// 검색 결과 없음
    NoMatches,
    /// 질문 임베딩/검색 실패
    QueryFailed,
}

impl RetrievedContext {
    /// LLM 프롬프트나 사용자에게 보낼 텍스트
    pub fn as_text(&self) -> &str {
        match self {
            RetrievedContext::Found(text) => text,
            RetrievedContext::NoMatches => NO_MATCHES_MESSAGE,
            RetrievedContext::QueryFailed => QUERY_FAILED_MESSAGE,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RetrievedContext::QueryFailed)
    }
}

// ============================================================================
// Retriever
// ============================================================================

/// 지식베이스 검색기
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    knowledge: Arc<KnowledgeBase>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            embedder,
            knowledge,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// 질문과 가까운 청크 k개를 컨텍스트 블록으로
    pub async fn retrieve(&self, question: &str, k: usize) -> RetrievedContext {
        let query_embedding = match self.embedder.embed(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::error!("Failed to embed question via {}: {}", self.embedder.name(), e);
                return RetrievedContext::QueryFailed;
            }
        };

        let hits = match self.knowledge.search(&query_embedding, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("Knowledge base search failed: {}", e);
                return RetrievedContext::QueryFailed;
            }
        };

        tracing::debug!("Retrieved {} chunks (k={})", hits.len(), k);

        if hits.is_empty() {
            return RetrievedContext::NoMatches;
        }

        RetrievedContext::Found(format_context(&hits))
    }
}

/// 검색 결과를 순위 순서대로 컨텍스트 블록으로 포맷
pub fn format_context(hits: &[SearchHit<'_>]) -> String {
    let mut context = String::new();
    for hit in hits {
        context.push_str(&format!(
            "Fragment from program '{}':\n---\n{}\n---\n\n",
            hit.record.program_name, hit.record.text
        ));
    }
    context.trim_end().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{embed_chunks, ChunkRecord};
    use crate::test_support::{KeywordEmbedding, MemoryVectorStore};

    async fn knowledge_base(records: Vec<ChunkRecord>) -> Arc<KnowledgeBase> {
        let embedded = embed_chunks(records, &KeywordEmbedding::new()).await.unwrap();
        let index = MemoryVectorStore::new(embedded.to_entries(), embedded.dimension);
        Arc::new(KnowledgeBase::new(embedded.chunks, Arc::new(index)).await.unwrap())
    }

    fn scenario_records() -> Vec<ChunkRecord> {
        vec![
            ChunkRecord::new("u", "AI Product", "Admission exam and career engineer tracks", "ai_product_0"),
            ChunkRecord::new("u", "AI", "Cost: 599000 rubles per year", "ai_0"),
            ChunkRecord::new("u", "AI Product", "Dormitory admission for product manager applicants", "ai_product_1"),
        ]
    }

    #[test]
    fn test_format_context() {
        let a = ChunkRecord::new("u", "AI", "first text", "ai_0");
        let b = ChunkRecord::new("u", "AI Product", "second text", "ai_product_0");
        let hits = vec![
            SearchHit { record: &a, distance: 0.1 },
            SearchHit { record: &b, distance: 0.2 },
        ];

        assert_eq!(
            format_context(&hits),
            "Fragment from program 'AI':\n---\nfirst text\n---\n\n\
             Fragment from program 'AI Product':\n---\nsecond text\n---"
        );
    }

    #[test]
    fn test_sentinels_are_distinct() {
        assert_ne!(QUERY_FAILED_MESSAGE, NO_MATCHES_MESSAGE);
        assert!(RetrievedContext::QueryFailed.is_failure());
        assert!(!RetrievedContext::NoMatches.is_failure());
        assert!(!RetrievedContext::Found("x".to_string()).is_failure());
        assert_eq!(RetrievedContext::NoMatches.as_text(), NO_MATCHES_MESSAGE);
    }

    #[tokio::test]
    async fn test_retrieve_cost_of_ai_program() {
        let retriever = Retriever::new(
            Arc::new(KeywordEmbedding::new()),
            knowledge_base(scenario_records()).await,
        );

        let context = retriever.retrieve("cost of AI program", 5).await;
        let RetrievedContext::Found(text) = context else {
            panic!("expected context, got {:?}", context);
        };

        assert!(text.starts_with(
            "Fragment from program 'AI':\n---\nCost: 599000 rubles per year\n---"
        ));
        let cost_pos = text.find("599000").unwrap();
        let exam_pos = text.find("Admission exam").unwrap();
        assert!(cost_pos < exam_pos);
    }

    #[tokio::test]
    async fn test_retrieve_embedding_failure_is_sentinel() {
        let embedder = Arc::new(KeywordEmbedding::unavailable());
        let retriever = Retriever::new(embedder.clone(), knowledge_base(scenario_records()).await);

        let context = retriever.retrieve("cost of AI program", 5).await;
        assert_eq!(context, RetrievedContext::QueryFailed);
        assert_eq!(context.as_text(), QUERY_FAILED_MESSAGE);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_zero_k_is_no_matches() {
        let retriever = Retriever::new(
            Arc::new(KeywordEmbedding::new()),
            knowledge_base(scenario_records()).await,
        );
        assert_eq!(
            retriever.retrieve("cost", 0).await,
            RetrievedContext::NoMatches
        );
    }
}
