//! 지식베이스 아티팩트 - 디스크 저장/로드
//!
//! 하나의 지식베이스 디렉토리 안에 두 아티팩트를 함께 둡니다:
//! - `chunks.json`: 청크 레코드 목록 (인덱스 위치 순서)
//! - `vectors.lance`: LanceDB 벡터 테이블
//!
//! 선택적으로 `manifest.json`(빌드 정보)이 함께 저장됩니다.
//! 재빌드는 임시 디렉토리에 모두 쓴 뒤 디렉토리 단위로 교체합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::KnowledgeBaseError;

use super::base::{embed_chunks, EmbeddedChunks, KnowledgeBase};
use super::lance::LanceVectorStore;
use super::record::ChunkRecord;

const CHUNKS_FILE: &str = "chunks.json";
const INDEX_DIR: &str = "vectors.lance";
const MANIFEST_FILE: &str = "manifest.json";

// ============================================================================
// Manifest
// ============================================================================

/// 빌드 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub built_at: DateTime<Utc>,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub skipped_chunks: usize,
}

// ============================================================================
// KnowledgeArtifacts
// ============================================================================

/// 지식베이스 디렉토리 핸들
#[derive(Debug, Clone)]
pub struct KnowledgeArtifacts {
    dir: PathBuf,
}

impl KnowledgeArtifacts {
    /// # Arguments
    /// * `dir` - 지식베이스 디렉토리 (예: `~/.admission-rag/knowledge`)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// 청크 임베딩 → 저장 → 로드
    pub async fn build(
        &self,
        records: Vec<ChunkRecord>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<KnowledgeBase, KnowledgeBaseError> {
        tracing::info!("Building knowledge base from {} chunks", records.len());

        let embedded = embed_chunks(records, embedder).await?;
        self.write(&embedded, embedder.name()).await?;
        self.load().await
    }

    /// 두 아티팩트를 한 쌍으로 교체
    ///
    /// 같은 아티팩트를 읽는 서버가 떠 있는 동안 실행하면 안 됩니다.
    pub async fn write(
        &self,
        embedded: &EmbeddedChunks,
        embedding_model: &str,
    ) -> Result<(), KnowledgeBaseError> {
        let parent = self
            .dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;

        let name = self
            .dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("knowledge");
        let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&staging).await?;

        if let Err(e) = Self::write_staging(&staging, embedded, embedding_model).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        // 기존 디렉토리를 옆으로 치우고 새 디렉토리를 제자리로
        let retired = parent.join(format!(".{}.old-{}", name, uuid::Uuid::new_v4()));
        let had_previous = tokio::fs::try_exists(&self.dir).await?;
        if had_previous {
            tokio::fs::rename(&self.dir, &retired).await?;
        }

        if let Err(e) = tokio::fs::rename(&staging, &self.dir).await {
            if had_previous {
                let _ = tokio::fs::rename(&retired, &self.dir).await;
            }
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        if had_previous {
            if let Err(e) = tokio::fs::remove_dir_all(&retired).await {
                tracing::warn!("Failed to remove previous knowledge base {:?}: {}", retired, e);
            }
        }

        tracing::info!(
            "Knowledge base written to {:?} ({} chunks, dim={})",
            self.dir,
            embedded.chunks.len(),
            embedded.dimension
        );

        Ok(())
    }

    async fn write_staging(
        staging: &Path,
        embedded: &EmbeddedChunks,
        embedding_model: &str,
    ) -> Result<(), KnowledgeBaseError> {
        LanceVectorStore::create(
            &staging.join(INDEX_DIR),
            &embedded.to_entries(),
            embedded.dimension,
        )
        .await?;

        let chunks_json = serde_json::to_string_pretty(&embedded.chunks)?;
        tokio::fs::write(staging.join(CHUNKS_FILE), chunks_json).await?;

        let manifest = Manifest {
            built_at: Utc::now(),
            embedding_model: embedding_model.to_string(),
            dimension: embedded.dimension,
            chunk_count: embedded.chunks.len(),
            skipped_chunks: embedded.skipped,
        };
        let manifest_json = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(staging.join(MANIFEST_FILE), manifest_json).await?;

        Ok(())
    }

    /// 지식베이스 로드
    ///
    /// 아티팩트 중 하나라도 없거나 읽을 수 없거나 개수가 맞지 않으면
    /// [`KnowledgeBaseError::Unavailable`]입니다.
    pub async fn load(&self) -> Result<KnowledgeBase, KnowledgeBaseError> {
        let chunks_path = self.chunks_path();
        let chunks_json = tokio::fs::read_to_string(&chunks_path).await.map_err(|e| {
            KnowledgeBaseError::Unavailable(format!("cannot read {}: {}", chunks_path.display(), e))
        })?;
        let chunks: Vec<ChunkRecord> = serde_json::from_str(&chunks_json).map_err(|e| {
            KnowledgeBaseError::Unavailable(format!("cannot parse {}: {}", chunks_path.display(), e))
        })?;

        let index_path = self.index_path();
        let index = LanceVectorStore::open(&index_path).await.map_err(|e| {
            KnowledgeBaseError::Unavailable(format!("cannot open {}: {:#}", index_path.display(), e))
        })?;

        let knowledge = match KnowledgeBase::new(chunks, Arc::new(index)).await {
            Ok(kb) => kb,
            Err(KnowledgeBaseError::Index(e)) => {
                return Err(KnowledgeBaseError::Unavailable(format!("{:#}", e)))
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Knowledge base loaded: {} vectors (dim={})",
            knowledge.len(),
            knowledge.dimension()
        );

        Ok(knowledge)
    }

    /// 빌드 정보 읽기 (없으면 None)
    pub async fn read_manifest(&self) -> Option<Manifest> {
        let json = tokio::fs::read_to_string(self.manifest_path()).await.ok()?;
        match serde_json::from_str(&json) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!("Ignoring unreadable manifest: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
