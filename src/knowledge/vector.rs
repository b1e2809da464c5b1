//! Vector Store - 벡터 인덱스 트레이트
//!
//! 인덱스의 각 행은 청크 목록에서의 위치(`position`)와 `chunk_id`를 함께 저장합니다.
//! 검색 결과는 이 위치로 청크 레코드에 연결됩니다.

use anyhow::Result;
use async_trait::async_trait;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 청크 목록에서의 위치 (0-based)
    pub position: i64,
    /// 청크 ID
    pub chunk_id: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 최근접 이웃 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// 청크 목록에서의 위치 (유효한 이웃이 없으면 음수)
    pub position: i64,
    /// 인덱스에 저장된 청크 ID
    pub chunk_id: String,
    /// L2 거리 (작을수록 가까움)
    pub distance: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// 읽기 전용 벡터 인덱스 (async)
///
/// 빌드 이후에는 변경되지 않으므로 여러 세션에서 동시에 검색할 수 있습니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// L2 거리 기준 k-최근접 이웃 검색 (거리 오름차순)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<Neighbor>>;

    /// 저장된 벡터 개수
    async fn count(&self) -> Result<usize>;

    /// 벡터 차원
    fn dimension(&self) -> usize;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 L2 거리
///
/// 길이가 다르면 `f32::INFINITY`를 반환합니다.
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ============================================================================
// Tests
// ============================================================================
