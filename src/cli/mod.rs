//! CLI 모듈
//!
//! admission-rag CLI 명령어 정의 및 구현
//!
//! 작업 순서: `scrape` → `build` → `chat` (또는 `search` / `ask`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::conversation::{
    ConversationRouter, KeywordRecommender, Reply, ReplySink, RouterConfig, SessionId, Turn,
    COMPARE_BUTTON, QUESTION_BUTTON, RECOMMEND_BUTTON,
};
use crate::embedding::{EmbeddingProvider, OllamaEmbedding};
use crate::generation::{AnswerGenerator, OllamaGenerator};
use crate::knowledge::{
    read_records, write_records, KnowledgeArtifacts, KnowledgeBase, Retriever,
};
use crate::scraper::{default_programs, ProgramScraper};

/// 콘솔 대화의 세션 ID
const CONSOLE_SESSION: SessionId = 0;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "admission-rag")]
#[command(version, about = "대학원 입학 상담 RAG 시스템", long_about = None)]
pub struct Cli {
    /// 데이터 디렉토리 (기본: ADMISSION_RAG_DATA_DIR 또는 ~/.admission-rag)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 프로그램 페이지를 스크랩하여 청크 목록 저장
    Scrape {
        /// 미리 저장한 HTML 디렉토리 (`<key>.html`)
        #[arg(long)]
        html_dir: Option<PathBuf>,

        /// 출력 파일 (기본: <data-dir>/scraped_chunks.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 청크 목록을 임베딩하여 지식베이스 생성
    Build {
        /// 입력 청크 파일 (기본: <data-dir>/scraped_chunks.json)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// 지식베이스 검색 (거리 포함)
    Search {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// 질문 하나에 답변
    Ask {
        /// 질문
        question: String,

        /// 컨텍스트 청크 개수
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// 콘솔 대화 (메뉴: 비교 / 질문 / 추천)
    Chat,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?.with_data_dir(cli.data_dir);

    match cli.command {
        Commands::Scrape { html_dir, output } => cmd_scrape(&config, html_dir, output).await,
        Commands::Build { input } => cmd_build(&config, input).await,
        Commands::Search { query, limit } => cmd_search(&config, &query, limit).await,
        Commands::Ask { question, limit } => cmd_ask(&config, &question, limit).await,
        Commands::Chat => cmd_chat(&config).await,
        Commands::Status => cmd_status(&config).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 스크랩 명령어 (scrape)
///
/// 두 프로그램 페이지에서 청크 레코드를 추출하여 JSON으로 저장합니다.
async fn cmd_scrape(
    config: &Config,
    html_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let scraper = ProgramScraper::new(config.chunk.clone()).context("ProgramScraper 생성 실패")?;
    let programs = default_programs();

    let mut records = Vec::new();
    let mut failed = 0;

    for (i, program) in programs.iter().enumerate() {
        print!("[{}/{}] {}... ", i + 1, programs.len(), program.name);

        match scraper.scrape(program, html_dir.as_deref()).await {
            Ok(program_records) => {
                println!("{} 청크", program_records.len());
                records.extend(program_records);
            }
            Err(e) => {
                println!("실패: {:#}", e);
                failed += 1;
            }
        }
    }

    if records.is_empty() {
        bail!("추출된 청크가 없습니다. 페이지가 JavaScript로 렌더링된다면 --html-dir로 저장된 HTML을 지정하세요");
    }

    let output = output.unwrap_or_else(|| config.scraped_chunks_path());
    write_records(&output, &records)?;

    println!();
    println!("[OK] {} 청크 저장됨 (실패한 프로그램: {})", records.len(), failed);
    println!("     파일: {}", output.display());

    Ok(())
}

/// 빌드 명령어 (build)
///
/// 청크를 임베딩하여 청크 목록 + 벡터 인덱스를 한 쌍으로 교체합니다.
async fn cmd_build(config: &Config, input: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| config.scraped_chunks_path());
    let records = read_records(&input)
        .with_context(|| format!("청크 파일 읽기 실패. 먼저 `admission-rag scrape`를 실행하세요: {}", input.display()))?;

    println!("[*] {} 청크 임베딩 중 (모델: {})...", records.len(), config.embedding_model);

    let embedder = OllamaEmbedding::new(&config.ollama_host, config.embedding_model.clone())?;
    let artifacts = KnowledgeArtifacts::new(config.knowledge_dir());
    let knowledge = artifacts
        .build(records, &embedder)
        .await
        .context("지식베이스 생성 실패")?;

    println!("[OK] 지식베이스 생성 완료");
    println!("     청크: {} (차원: {})", knowledge.len(), knowledge.dimension());
    if let Some(manifest) = artifacts.read_manifest().await {
        if manifest.skipped_chunks > 0 {
            println!("[!] 임베딩 실패로 제외된 청크: {}", manifest.skipped_chunks);
        }
    }
    println!("     위치: {}", artifacts.dir().display());

    Ok(())
}

/// 검색 명령어 (search)
async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let knowledge = load_knowledge(config).await?;
    let embedder = OllamaEmbedding::new(&config.ollama_host, config.embedding_model.clone())?;

    println!("[*] 검색 중: \"{}\"", query);

    let query_embedding = embedder.embed(query).await.context("쿼리 임베딩 실패")?;
    let hits = knowledge
        .search(&query_embedding, limit)
        .await
        .context("검색 실패")?;

    if hits.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [거리: {:.4}] {} ({})",
            i + 1,
            hit.distance,
            hit.record.program_name,
            hit.record.chunk_id
        );
        println!("   내용: {}", truncate_text(&hit.record.text, 200));
        println!();
    }

    Ok(())
}

/// 질문 명령어 (ask)
async fn cmd_ask(config: &Config, question: &str, limit: usize) -> Result<()> {
    let knowledge = load_knowledge(config).await?;
    let embedder = OllamaEmbedding::new(&config.ollama_host, config.embedding_model.clone())?;
    let generator = OllamaGenerator::new(&config.ollama_host, config.llm_model.clone())?;

    let retriever = Retriever::new(Arc::new(embedder), knowledge);
    let answerer = AnswerGenerator::new(Arc::new(generator));

    println!("[*] 답변 생성 중...");

    let context = retriever.retrieve(question, limit).await;
    if context.is_failure() {
        println!("[!] {}", context.as_text());
        return Ok(());
    }

    let answer = answerer.answer(question, context.as_text()).await;
    println!();
    println!("{}", answer);

    Ok(())
}

/// 대화 명령어 (chat)
///
/// 지식베이스를 불러올 수 없으면 시작하지 않습니다.
async fn cmd_chat(config: &Config) -> Result<()> {
    let knowledge = load_knowledge(config).await?;
    let embedder = OllamaEmbedding::new(&config.ollama_host, config.embedding_model.clone())?;
    let generator = OllamaGenerator::new(&config.ollama_host, config.llm_model.clone())?;

    let router = ConversationRouter::new(
        Retriever::new(Arc::new(embedder), knowledge),
        AnswerGenerator::new(Arc::new(generator)),
        Arc::new(KeywordRecommender::default()),
        RouterConfig::default(),
    );
    let sink = ConsoleSink;

    println!("admission-rag v{} (종료: /quit)", env!("CARGO_PKG_VERSION"));
    router
        .handle(CONSOLE_SESSION, Turn::classify("/start"), &sink)
        .await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        router
            .handle(CONSOLE_SESSION, Turn::classify(resolve_menu_choice(line)), &sink)
            .await;
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &Config) -> Result<()> {
    println!("admission-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] Ollama: {}", config.ollama_host);
    println!("    임베딩 모델: {}", config.embedding_model);
    println!("    생성 모델: {}", config.llm_model);

    // 스크랩 결과
    let scraped = config.scraped_chunks_path();
    match tokio::fs::metadata(&scraped).await {
        Ok(meta) => match read_records(&scraped) {
            Ok(records) => println!(
                "[OK] 스크랩 결과: {} 청크 ({})",
                records.len(),
                format_bytes(meta.len() as usize)
            ),
            Err(e) => println!("[!] 스크랩 결과 읽기 실패: {:#}", e),
        },
        Err(_) => println!("[!] 스크랩 결과 없음 (admission-rag scrape)"),
    }

    // 지식베이스
    let artifacts = KnowledgeArtifacts::new(config.knowledge_dir());
    match artifacts.read_manifest().await {
        Some(manifest) => {
            println!(
                "[OK] 지식베이스: {} 청크 (차원: {}, 모델: {})",
                manifest.chunk_count, manifest.dimension, manifest.embedding_model
            );
            println!(
                "     생성: {}",
                manifest.built_at.format("%Y-%m-%d %H:%M")
            );
            if manifest.skipped_chunks > 0 {
                println!("     제외된 청크: {}", manifest.skipped_chunks);
            }
        }
        None => println!("[!] 지식베이스 없음 (admission-rag build)"),
    }

    match artifacts.load().await {
        Ok(knowledge) => println!("[OK] 벡터 인덱스: {} 청크", knowledge.len()),
        Err(e) => tracing::debug!("지식베이스 로드 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Console Transport
// ============================================================================

/// 표준 출력으로 응답 출력
struct ConsoleSink;

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn send(&self, reply: Reply) -> Result<()> {
        println!();
        println!("{}", reply.text);
        if reply.show_menu {
            println!();
            println!("  1. {}", COMPARE_BUTTON);
            println!("  2. {}", QUESTION_BUTTON);
            println!("  3. {}", RECOMMEND_BUTTON);
        }
        println!();
        Ok(())
    }
}

/// 메뉴 번호 → 메뉴 문구
fn resolve_menu_choice(line: &str) -> &str {
    match line {
        "1" => COMPARE_BUTTON,
        "2" => QUESTION_BUTTON,
        "3" => RECOMMEND_BUTTON,
        other => other,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 지식베이스 로드 (모델 불일치는 경고만)
async fn load_knowledge(config: &Config) -> Result<Arc<KnowledgeBase>> {
    let artifacts = KnowledgeArtifacts::new(config.knowledge_dir());
    let knowledge = artifacts.load().await.with_context(|| {
        format!(
            "지식베이스를 불러올 수 없습니다. 먼저 `admission-rag build`를 실행하세요: {}",
            artifacts.dir().display()
        )
    })?;

    if let Some(manifest) = artifacts.read_manifest().await {
        if manifest.embedding_model != config.embedding_model {
            tracing::warn!(
                "Knowledge base was built with '{}' but '{}' is configured",
                manifest.embedding_model,
                config.embedding_model
            );
        }
    }

    Ok(Arc::new(knowledge))
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
