//! Knowledge Base - 청크 레코드 + 벡터 인덱스
//!
//! 빌드 후에는 불변이며 `Arc<KnowledgeBase>`로 모든 세션이 공유합니다.
//! 인덱스 행은 청크 목록에서의 위치와 `chunk_id`를 직접 저장하므로
//! 검색 결과를 청크 레코드에 연결할 때 이 둘을 함께 검증합니다.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::KnowledgeBaseError;

use super::record::ChunkRecord;
use super::vector::{VectorEntry, VectorStore};

// ============================================================================
// Types
// ============================================================================

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub record: &'a ChunkRecord,
    /// L2 거리 (작을수록 가까움)
    pub distance: f32,
}

/// 임베딩이 끝난 청크 (빌드 중간 결과)
///
/// `chunks[i]`와 `vectors[i]`는 같은 청크에서 나온 것입니다.
#[derive(Debug, Clone)]
pub struct EmbeddedChunks {
    pub chunks: Vec<ChunkRecord>,
    pub vectors: Vec<Vec<f32>>,
    pub dimension: usize,
    /// 임베딩 실패로 버려진 청크 수
    pub skipped: usize,
}

impl EmbeddedChunks {
    /// 인덱스에 넣을 엔트리 (위치 순서)
    pub fn to_entries(&self) -> Vec<VectorEntry> {
        self.chunks
            .iter()
            .zip(&self.vectors)
            .enumerate()
            .map(|(position, (chunk, embedding))| VectorEntry {
                position: position as i64,
                chunk_id: chunk.chunk_id.clone(),
                embedding: embedding.clone(),
            })
            .collect()
    }
}

// ============================================================================
// Build
// ============================================================================

/// 모든 청크를 순서대로 임베딩
///
/// 임베딩에 실패한 청크는 로그를 남기고 버립니다.
/// 하나도 성공하지 못하면 [`KnowledgeBaseError::Empty`],
/// 차원이 섞이면 [`KnowledgeBaseError::DimensionMismatch`]입니다.
pub async fn embed_chunks(
    records: Vec<ChunkRecord>,
    embedder: &dyn EmbeddingProvider,
) -> Result<EmbeddedChunks, KnowledgeBaseError> {
    let total = records.len();
    let mut chunks = Vec::with_capacity(total);
    let mut vectors = Vec::with_capacity(total);
    let mut dimension: Option<usize> = None;
    let mut skipped = 0;

    for (i, record) in records.into_iter().enumerate() {
        tracing::debug!("Embedding chunk {}/{} ({})", i + 1, total, record.chunk_id);

        let embedding = match embedder.embed(&record.text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!("Skipping chunk {}: embedding failed: {}", record.chunk_id, e);
                skipped += 1;
                continue;
            }
        };

        match dimension {
            None => dimension = Some(embedding.len()),
            Some(expected) if expected != embedding.len() => {
                tracing::error!(
                    "Chunk {} has embedding dimension {}, expected {}",
                    record.chunk_id,
                    embedding.len(),
                    expected
                );
                return Err(KnowledgeBaseError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
        }

        chunks.push(record);
        vectors.push(embedding);
    }

    let dimension = dimension.ok_or(KnowledgeBaseError::Empty)?;

    tracing::info!(
        "Embedded {}/{} chunks (dim={}, skipped={})",
        chunks.len(),
        total,
        dimension,
        skipped
    );

    Ok(EmbeddedChunks {
        chunks,
        vectors,
        dimension,
        skipped,
    })
}

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 읽기 전용 지식베이스
pub struct KnowledgeBase {
    chunks: Vec<ChunkRecord>,
    index: Arc<dyn VectorStore>,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("chunks", &self.chunks.len())
            .field("dimension", &self.index.dimension())
            .finish()
    }
}

impl KnowledgeBase {
    /// 청크 목록과 인덱스를 묶어 생성
    ///
    /// 인덱스의 벡터 수가 청크 수와 다르면 사용할 수 없는 지식베이스입니다.
    pub async fn new(
        chunks: Vec<ChunkRecord>,
        index: Arc<dyn VectorStore>,
    ) -> Result<Self, KnowledgeBaseError> {
        let count = index.count().await?;
        if count != chunks.len() {
            return Err(KnowledgeBaseError::Unavailable(format!(
                "chunk list has {} records but vector index has {} vectors",
                chunks.len(),
                count
            )));
        }
        if chunks.is_empty() {
            return Err(KnowledgeBaseError::Empty);
        }

        Ok(Self { chunks, index })
    }

    /// 청크 수
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// 벡터 차원
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// 청크 목록 (인덱스 위치 순서)
    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    /// k-최근접 청크 검색
    ///
    /// 거리 오름차순, 최대 `k`개. 유효하지 않은 이웃(음수/범위 밖 위치,
    /// `chunk_id` 불일치)은 결과에서 빠집니다.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit<'_>>, KnowledgeBaseError> {
        if k == 0 {
            return Ok(vec![]);
        }

        let expected = self.index.dimension();
        if query_embedding.len() != expected {
            return Err(KnowledgeBaseError::DimensionMismatch {
                expected,
                actual: query_embedding.len(),
            });
        }

        let neighbors = self.index.search(query_embedding, k).await?;

        let mut hits: Vec<SearchHit<'_>> = neighbors
            .into_iter()
            .filter_map(|n| {
                let record = usize::try_from(n.position)
                    .ok()
                    .and_then(|p| self.chunks.get(p));

                match record {
                    Some(record) if record.chunk_id == n.chunk_id => Some(SearchHit {
                        record,
                        distance: n.distance,
                    }),
                    Some(record) => {
                        tracing::warn!(
                            "Index row {} points at {} but chunk list has {}",
                            n.position,
                            n.chunk_id,
                            record.chunk_id
                        );
                        None
                    }
                    None => {
                        tracing::debug!("Skipping neighbor without a chunk (position {})", n.position);
                        None
                    }
                }
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        Ok(hits)
    }
}

// ============================================================================
// Tests
// ============================================================================
