//! 프로그램 페이지 스크래퍼 - 입학 안내 페이지에서 청크 레코드 추출
//!
//! 페이지의 두 부분을 사용합니다:
//! - 핵심 정보 목록 (`ul[data-testid="program-params-list"]`): 짧은 "키: 값." 문장, 청킹 안 함
//! - `h2` 제목 섹션: 섹션 본문을 청킹하고 섹션 이름을 앞에 붙임
//!
//! JavaScript 렌더링이 필요한 페이지는 미리 저장한 HTML 파일(`<key>.html`)로 처리합니다.

use std::path::Path;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};

use crate::knowledge::{ChunkConfig, ChunkRecord, Chunker, SentenceChunker};

/// 이 길이(문자 수) 이하의 섹션 본문은 건너뜀
const MIN_SECTION_CHARS: usize = 50;

// ============================================================================
// Program Catalogue
// ============================================================================

/// 석사 프로그램
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// 짧은 키 (chunk_id 접두사)
    pub key: String,
    /// 표시 이름
    pub name: String,
    /// 입학 안내 페이지 URL
    pub url: String,
}

impl Program {
    pub fn new(key: &str, name: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// 기본 프로그램 목록
pub fn default_programs() -> Vec<Program> {
    vec![
        Program::new(
            "ai",
            "Artificial Intelligence",
            "https://abit.itmo.ru/program/master/ai",
        ),
        Program::new(
            "ai_product",
            "AI Product Management",
            "https://abit.itmo.ru/program/master/ai_product",
        ),
    ]
}

// ============================================================================
// ProgramScraper
// ============================================================================

/// 프로그램 페이지 스크래퍼
pub struct ProgramScraper {
    client: reqwest::Client,
    chunker: SentenceChunker,
}

impl ProgramScraper {
    /// 새 스크래퍼 생성
    pub fn new(chunk: ChunkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("admission-rag/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self {
            client,
            chunker: SentenceChunker::new(chunk),
        })
    }

    /// 프로그램 하나를 청크 레코드로
    ///
    /// `html_dir`이 있으면 `<html_dir>/<key>.html`을 읽고, 없으면 URL에서 가져옵니다.
    pub async fn scrape(&self, program: &Program, html_dir: Option<&Path>) -> Result<Vec<ChunkRecord>> {
        let html = match html_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.html", program.key));
                tracing::info!("Reading saved page: {:?}", path);
                tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("HTML 파일 읽기 실패: {}", path.display()))?
            }
            None => self.fetch(&program.url).await?,
        };

        let texts = self.parse_page(&html);
        tracing::info!("{}: {} fragments extracted", program.name, texts.len());

        Ok(to_records(program, texts))
    }

    /// URL에서 HTML 가져오기
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::info!("Scraping: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP 요청 실패")?
            .error_for_status()
            .context("HTTP 에러 응답")?;

        response.text().await.context("응답 본문 읽기 실패")
    }

    /// 페이지에서 텍스트 조각 추출 (핵심 정보 → 섹션 청크 순)
    pub fn parse_page(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        let main = Selector::parse("main")
            .ok()
            .and_then(|s| document.select(&s).next());
        let root = main.unwrap_or_else(|| document.root_element());

        let mut fragments = extract_key_facts(&root);

        for (header, body) in extract_sections(&root) {
            if body.chars().count() <= MIN_SECTION_CHARS {
                continue;
            }
            for chunk in self.chunker.chunk(&body) {
                fragments.push(format!("From section '{}': {}", header, chunk));
            }
        }

        fragments
    }
}

/// 텍스트 조각 → 청크 레코드 (`<key>_<n>`)
pub fn to_records(program: &Program, texts: Vec<String>) -> Vec<ChunkRecord> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            ChunkRecord::new(
                program.url.as_str(),
                program.name.as_str(),
                text,
                format!("{}_{}", program.key, i),
            )
        })
        .collect()
}

/// 핵심 정보 목록 ("키: 값.")
fn extract_key_facts(root: &ElementRef<'_>) -> Vec<String> {
    let (Ok(list_sel), Ok(item_sel), Ok(key_sel), Ok(value_sel)) = (
        Selector::parse(r#"ul[data-testid="program-params-list"]"#),
        Selector::parse("li"),
        Selector::parse(r#"p[class*="title"]"#),
        Selector::parse(r#"p[class*="value"]"#),
    ) else {
        return vec![];
    };

    let Some(list) = root.select(&list_sel).next() else {
        return vec![];
    };

    list.select(&item_sel)
        .filter_map(|item| {
            let key = item.select(&key_sel).next()?;
            let value = item.select(&value_sel).next()?;
            Some(format!(
                "{}: {}.",
                clean_text(&element_text(&key)),
                clean_text(&element_text(&value))
            ))
        })
        .collect()
}

/// `h2` 제목 섹션 (제목, 본문)
///
/// 본문은 제목의 조부모 요소 텍스트에서 제목을 한 번 제거한 것입니다.
fn extract_sections(root: &ElementRef<'_>) -> Vec<(String, String)> {
    let Ok(header_sel) = Selector::parse(r#"h2[class*="title"]"#) else {
        return vec![];
    };

    root.select(&header_sel)
        .filter_map(|header| {
            let header_text = clean_text(&element_text(&header));
            let container = header
                .parent()
                .and_then(|p| p.parent())
                .and_then(ElementRef::wrap)?;

            let body = clean_text(&element_text(&container))
                .replacen(&header_text, "", 1)
                .trim()
                .to_string();

            Some((header_text, body))
        })
        .collect()
}

/// 요소 텍스트 (노드 사이 공백)
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// 연속 공백 정리
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tests
// ============================================================================
