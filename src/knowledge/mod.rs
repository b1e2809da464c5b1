//! Knowledge 모듈 - RAG 지식베이스
//!
//! - Chunker: 문장 경계 기반 텍스트 분할
//! - Record: 청크 레코드 (source, program_name, text, chunk_id)
//! - LanceDB: L2 벡터 인덱스
//! - KnowledgeBase: 청크 목록 + 인덱스 (불변, 공유)
//! - Artifacts: 디스크 저장/로드 (쌍 단위 교체)
//! - Retriever: 질문 → 컨텍스트 블록

mod artifacts;
mod base;
mod chunker;
mod lance;
mod record;
mod retriever;
mod vector;

// Re-exports
pub use artifacts::{KnowledgeArtifacts, Manifest};
pub use base::{embed_chunks, EmbeddedChunks, KnowledgeBase, SearchHit};
pub use chunker::{
    chunk_text, default_chunker, sentence_chunker, split_sentences, ChunkConfig, Chunker,
    SentenceChunker,
};
pub use lance::LanceVectorStore;
pub use record::{read_records, write_records, ChunkRecord};
pub use retriever::{
    format_context, RetrievedContext, Retriever, NO_MATCHES_MESSAGE, QUERY_FAILED_MESSAGE,
};
pub use vector::{l2_distance_squared, Neighbor, VectorEntry, VectorStore};
