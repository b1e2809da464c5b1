//! 청크 레코드 - 지식베이스의 텍스트 단위

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 지식베이스 청크 레코드
///
/// 빌드 시 생성되고 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// 출처 (프로그램 페이지 URL)
    pub source: String,
    /// 프로그램 이름
    pub program_name: String,
    /// 청크 텍스트
    pub text: String,
    /// 프로그램 내 고유 ID (`<program key>_<n>`)
    pub chunk_id: String,
}

impl ChunkRecord {
    pub fn new(
        source: impl Into<String>,
        program_name: impl Into<String>,
        text: impl Into<String>,
        chunk_id: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            program_name: program_name.into(),
            text: text.into(),
            chunk_id: chunk_id.into(),
        }
    }
}

/// 청크 레코드 목록을 JSON 파일에서 읽기
pub fn read_records(path: &Path) -> Result<Vec<ChunkRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse chunk file {}", path.display()))
}

/// 청크 레코드 목록을 JSON 파일로 쓰기
pub fn write_records(path: &Path, records: &[ChunkRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create chunk file directory")?;
        }
    }

    let json = serde_json::to_string_pretty(records).context("Failed to serialize chunks")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chunk file {}", path.display()))
}
