//! admission-rag - 대학원 입학 상담 RAG 시스템
//!
//! 두 석사 프로그램의 입학 안내 페이지를 스크랩하여 LanceDB 벡터 인덱스로 만들고,
//! Ollama 임베딩/생성 모델로 지원자 질문에 답변합니다.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod scraper;

#[cfg(test)]
mod test_support;

// Re-exports
pub use config::{get_data_dir, Config};
pub use conversation::{
    ConversationRouter, KeywordRecommender, Recommender, Reply, ReplySink, RouterConfig,
    SessionId, SessionState, Trigger, Turn,
};
pub use embedding::{EmbeddingProvider, OllamaEmbedding};
pub use error::{KnowledgeBaseError, ServiceError};
pub use generation::{AnswerGenerator, OllamaGenerator, TextGenerator};
pub use knowledge::{
    ChunkConfig, ChunkRecord, Chunker, KnowledgeArtifacts, KnowledgeBase, LanceVectorStore,
    RetrievedContext, Retriever, SentenceChunker, VectorEntry, VectorStore,
};
pub use scraper::{default_programs, Program, ProgramScraper};
