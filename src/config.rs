//! 설정 모듈
//!
//! 환경변수에서 Ollama 엔드포인트, 모델 이름, 데이터 디렉토리를 읽습니다.
//! 환경변수가 없으면 기본값을 사용합니다.

use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

use crate::knowledge::ChunkConfig;

/// Ollama 기본 주소
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// 기본 생성 모델
pub const DEFAULT_LLM_MODEL: &str = "qwen3:8b";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로
///
/// 우선순위:
/// 1. `ADMISSION_RAG_DATA_DIR` 환경변수
/// 2. `<local data dir>/.admission-rag/`
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_env("ADMISSION_RAG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".admission-rag")
}

// ============================================================================
// Config
// ============================================================================

/// 실행 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// Ollama 서버 주소
    pub ollama_host: Url,
    /// 임베딩 모델 이름
    pub embedding_model: String,
    /// 답변 생성 모델 이름
    pub llm_model: String,
    /// 데이터 디렉토리 (스크랩 결과, 지식베이스 아티팩트)
    pub data_dir: PathBuf,
    /// 청킹 길이 범위
    pub chunk: ChunkConfig,
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// - `OLLAMA_HOST`
    /// - `EMBEDDING_MODEL`
    /// - `LLM_MODEL`
    /// - `ADMISSION_RAG_DATA_DIR`
    /// - `CHUNK_MIN_LENGTH`, `CHUNK_MAX_LENGTH`
    pub fn from_env() -> Result<Self> {
        let host = non_empty_env("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
        let ollama_host = parse_host(&host)?;

        let defaults = ChunkConfig::default();
        let chunk = ChunkConfig {
            min_characters: parse_usize_env("CHUNK_MIN_LENGTH")?.unwrap_or(defaults.min_characters),
            max_characters: parse_usize_env("CHUNK_MAX_LENGTH")?.unwrap_or(defaults.max_characters),
        };
        if chunk.min_characters > chunk.max_characters {
            anyhow::bail!(
                "CHUNK_MIN_LENGTH ({}) must not exceed CHUNK_MAX_LENGTH ({})",
                chunk.min_characters,
                chunk.max_characters
            );
        }

        Ok(Self {
            ollama_host,
            embedding_model: non_empty_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            llm_model: non_empty_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            data_dir: get_data_dir(),
            chunk,
        })
    }

    /// 데이터 디렉토리 덮어쓰기 (CLI --data-dir)
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    /// 지식베이스 아티팩트 디렉토리
    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join("knowledge")
    }

    /// 스크랩 결과(원본 청크 목록) 파일
    pub fn scraped_chunks_path(&self) -> PathBuf {
        self.data_dir.join("scraped_chunks.json")
    }
}

/// Ollama 주소 파싱 (경로 결합을 위해 끝에 `/` 보장)
pub fn parse_host(host: &str) -> Result<Url> {
    let normalized = if host.ends_with('/') {
        host.to_string()
    } else {
        format!("{}/", host)
    };
    Url::parse(&normalized).with_context(|| format!("Invalid OLLAMA_HOST: {}", host))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_usize_env(key: &str) -> Result<Option<usize>> {
    match non_empty_env(key) {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, value)),
        None => Ok(None),
    }
}

// ============================================================================
// Tests
// ============================================================================
