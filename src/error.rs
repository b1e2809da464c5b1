//! 에러 타입
//!
//! - [`ServiceError`]: 임베딩/생성 서비스 호출 실패
//! - [`KnowledgeBaseError`]: 지식베이스 빌드/로드/검색 실패

use thiserror::Error;

/// 외부 모델 서비스(임베딩, 텍스트 생성) 호출 에러
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 연결 실패, 타임아웃, 비정상 HTTP 상태
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 응답은 받았지만 기대한 필드/형태가 아님
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::MalformedResponse(err.to_string())
        } else {
            ServiceError::ServiceUnavailable(err.to_string())
        }
    }
}

/// 지식베이스 에러
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    /// 아티팩트 누락/손상 또는 청크 수와 벡터 수 불일치
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),

    /// 임베딩에 성공한 청크가 하나도 없음
    #[error("knowledge base is empty: no chunk could be embedded")]
    Empty,

    /// 벡터 차원 불일치
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 벡터 인덱스 에러
    #[error("vector index error: {0:#}")]
    Index(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
