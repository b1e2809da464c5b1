//! LanceDB Vector Store - 지식베이스 벡터 인덱스
//!
//! 빌드 시 한 번에 테이블을 만들고, 서빙 시에는 읽기 전용으로 엽니다.
//! 벡터 인덱스를 따로 만들지 않으므로 검색은 전수(flat) L2 검색입니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::Table;

use super::vector::{Neighbor, VectorEntry, VectorStore};

/// 벡터 테이블 이름
const TABLE_NAME: &str = "chunks";

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    table: Table,
    dimension: usize,
}

impl LanceVectorStore {
    /// 새 테이블 생성 후 엔트리 일괄 삽입
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로 (존재하지 않아야 함)
    /// * `entries` - 위치 순서대로 정렬된 엔트리
    /// * `dimension` - 모든 엔트리가 공유하는 벡터 차원
    pub async fn create(path: &Path, entries: &[VectorEntry], dimension: usize) -> Result<Self> {
        if path.exists() {
            anyhow::bail!("Vector store already exists: {}", path.display());
        }

        let batch = Self::entries_to_batch(entries, dimension)?;
        let schema = batch.schema();

        let db = lancedb::connect(path_str(path)?)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        let table = db
            .create_table(TABLE_NAME, batches)
            .execute()
            .await
            .context("Failed to create vector table")?;

        tracing::debug!(
            "Created vector table at {:?} ({} rows, dim={})",
            path,
            entries.len(),
            dimension
        );

        Ok(Self { table, dimension })
    }

    /// 기존 테이블 열기
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Vector store not found: {}", path.display());
        }

        let db = lancedb::connect(path_str(path)?)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let table = db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open vector table")?;

        let schema = table.schema().await.context("Failed to read table schema")?;
        let dimension = match schema
            .field_with_name("embedding")
            .context("Missing embedding column")?
            .data_type()
        {
            DataType::FixedSizeList(_, size) if *size > 0 => *size as usize,
            other => anyhow::bail!("Unexpected embedding column type: {:?}", other),
        };

        Ok(Self { table, dimension })
    }

    /// 벡터 테이블 스키마 생성
    fn create_schema(dimension: i32) -> Schema {
        Schema::new(vec![
            Field::new("position", DataType::Int64, false),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(entries: &[VectorEntry], dimension: usize) -> Result<RecordBatch> {
        if entries.is_empty() {
            anyhow::bail!("Cannot create batch from empty entries");
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimension) {
            anyhow::bail!(
                "Embedding for {} has dimension {}, expected {}",
                bad.chunk_id,
                bad.embedding.len(),
                dimension
            );
        }

        let dim = i32::try_from(dimension).context("Embedding dimension too large")?;

        let positions: Vec<i64> = entries.iter().map(|e| e.position).collect();
        let chunk_ids: Vec<&str> = entries.iter().map(|e| e.chunk_id.as_str()).collect();

        // 임베딩을 FixedSizeList로 변환
        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list =
            FixedSizeListArray::try_new(field, dim, Arc::new(values) as Arc<dyn Array>, None)
                .context("Failed to create embedding array")?;

        let batch = RecordBatch::try_new(
            Arc::new(Self::create_schema(dim)),
            vec![
                Arc::new(Int64Array::from(positions)),
                Arc::new(StringArray::from(chunk_ids)),
                Arc::new(embeddings_list),
            ],
        )
        .context("Failed to create RecordBatch")?;

        Ok(batch)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<Neighbor>> {
        if limit == 0 {
            return Ok(vec![]);
        }

        // 기본 거리 함수는 L2
        let results = self
            .table
            .vector_search(query_embedding.to_vec())
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute vector search")?;

        let batches: Vec<RecordBatch> = results.try_collect().await?;
        let mut neighbors = Vec::new();

        for batch in batches {
            let positions = batch
                .column_by_name("position")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing position column"))?;

            let chunk_ids = batch
                .column_by_name("chunk_id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_id column"))?;

            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                if positions.is_null(i) || chunk_ids.is_null(i) {
                    neighbors.push(Neighbor {
                        position: -1,
                        chunk_id: String::new(),
                        distance: f32::INFINITY,
                    });
                    continue;
                }

                neighbors.push(Neighbor {
                    position: positions.value(i),
                    chunk_id: chunk_ids.value(i).to_string(),
                    distance: distances.value(i),
                });
            }
        }

        Ok(neighbors)
    }

    async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .context("Failed to count rows")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_entry(position: i64, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            position,
            chunk_id: format!("ai_{}", position),
            embedding,
        }
    }

    fn test_entries() -> Vec<VectorEntry> {
        vec![
            create_test_entry(0, vec![0.0, 0.0, 0.0]),
            create_test_entry(1, vec![1.0, 0.0, 0.0]),
            create_test_entry(2, vec![5.0, 5.0, 5.0]),
        ]
    }

    #[tokio::test]
    async fn test_lance_create_and_open() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("vectors.lance");

        let store = LanceVectorStore::create(&lance_path, &test_entries(), 3)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.dimension(), 3);

        let reopened = LanceVectorStore::open(&lance_path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
        assert_eq!(reopened.dimension(), 3);
    }

    #[tokio::test]
    async fn test_lance_create_rejects_existing_path() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("vectors.lance");

        LanceVectorStore::create(&lance_path, &test_entries(), 3)
            .await
            .unwrap();
        assert!(LanceVectorStore::create(&lance_path, &test_entries(), 3)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_lance_search_sorted_by_distance() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("vectors.lance");
        let store = LanceVectorStore::create(&lance_path, &test_entries(), 3)
            .await
            .unwrap();

        let results = store.search(&[0.9, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[0].chunk_id, "ai_1");
        assert_eq!(results[1].position, 0);
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_lance_search_limit_larger_than_count() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("vectors.lance");
        let store = LanceVectorStore::create(&lance_path, &test_entries(), 3)
            .await
            .unwrap();

        let results = store.search(&[0.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(store.search(&[0.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lance_dimension_mismatch_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let lance_path = temp_dir.path().join("vectors.lance");
        let entries = vec![
            create_test_entry(0, vec![0.0, 0.0]),
            create_test_entry(1, vec![0.0, 0.0, 0.0]),
        ];

        assert!(LanceVectorStore::create(&lance_path, &entries, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_lance_open_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(LanceVectorStore::open(&temp_dir.path().join("nope.lance"))
            .await
            .is_err());
    }
}
