//! Text Chunking Module
//!
//! 스크랩한 섹션 텍스트를 문장 단위로 나눈 뒤,
//! 길이 범위(min..=max) 안에 들어가도록 탐욕적으로 묶습니다.
//!
//! 길이는 바이트가 아닌 문자(char) 수 기준입니다.

use std::sync::LazyLock;

use regex::Regex;

/// 문장 경계: `. `, `? `, `! `
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!] ").expect("valid sentence boundary pattern"));

/// 이 단어 수 이하의 문장은 버림
const MIN_SENTENCE_WORDS: usize = 2;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 최소 청크 크기 (문자 수)
    pub min_characters: usize,
    /// 최대 청크 크기 (문자 수)
    pub max_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_characters: 128,
            max_characters: 512,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SentenceChunker
// ============================================================================

/// 문장 경계 기반 청커
///
/// 1. 규칙 기반 문장 분리 (짧은 문장 제거)
/// 2. max 길이까지 문장을 탐욕적으로 묶기
/// 3. 인접 청크 병합
/// 4. min 길이 미만 청크 제거
pub struct SentenceChunker {
    config: ChunkConfig,
}

impl SentenceChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정(128..=512)으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.config.min_characters, self.config.max_characters)
    }

    fn name(&self) -> &'static str {
        "SentenceChunker"
    }
}

// ============================================================================
// Chunking Algorithm
// ============================================================================

/// 텍스트를 길이 범위 내의 청크로 분할
///
/// max를 넘는 단일 문장은 자르지 않고 그대로 하나의 청크가 됩니다.
///
/// # Arguments
/// * `text` - 분할할 텍스트
/// * `min_length` - 최소 청크 길이 (미만이면 버림)
/// * `max_length` - 최대 청크 길이 (best-effort)
pub fn chunk_text(text: &str, min_length: usize, max_length: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return vec![];
    }

    let packed = pack_sentences(&sentences, max_length);
    let merged = merge_chunks(packed, max_length);

    merged
        .into_iter()
        .filter(|c| char_len(c) >= min_length)
        .collect()
}

/// 규칙 기반 문장 분리
///
/// 구두점은 문장에 남기고 뒤의 공백 하나는 소비합니다.
/// 단어가 2개 이하인 조각은 버립니다.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // 구두점은 ASCII 1바이트
        pieces.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() > MIN_SENTENCE_WORDS)
        .map(str::to_string)
        .collect()
}

/// 문장들을 max 길이 안에서 순서대로 묶기
///
/// 누적 길이는 문장 사이 구분자(공백 1자)를 포함합니다.
fn pack_sentences(sentences: &[String], max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for sentence in sentences {
        let sentence_len = char_len(sentence);
        let separator = usize::from(!current.is_empty());

        if current_len + sentence_len + separator > max_length {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = vec![sentence.as_str()];
            current_len = sentence_len;
        } else {
            current.push(sentence.as_str());
            current_len += sentence_len + separator;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// 인접 청크 병합
///
/// 버퍼에 다음 청크를 붙여서 max 이하면 유지하고,
/// 넘으면 버퍼를 내보낸 뒤 그 청크로 새 버퍼를 시작합니다.
fn merge_chunks(chunks: Vec<String>, max_length: usize) -> Vec<String> {
    let mut result = Vec::with_capacity(chunks.len());
    let mut buffer = String::new();

    for chunk in chunks {
        let candidate = if buffer.is_empty() {
            chunk.clone()
        } else {
            format!("{} {}", buffer, chunk)
        };

        if char_len(&candidate) <= max_length {
            buffer = candidate;
        } else {
            if !buffer.is_empty() {
                result.push(std::mem::take(&mut buffer));
            }
            buffer = chunk;
        }
    }

    if !buffer.is_empty() {
        result.push(buffer);
    }

    result
}

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(SentenceChunker::with_defaults())
}

/// 문장 청커 생성 (설정 지정)
pub fn sentence_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(SentenceChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// `n`자 길이의 한 문장 (마침표 포함, 단어 3개 이상)
    fn sentence(tag: char, n: usize) -> String {
        assert!(n >= 8);
        let body: String = std::iter::repeat(tag).take(n - 7).collect();
        format!("ab cd {}.", body)
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = SentenceChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunk_text("   ", 0, 100).is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let text = "First sentence is here. Is this the second one? Yes it really is! Ok.";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "First sentence is here.",
                "Is this the second one?",
                "Yes it really is!",
            ]
        );
    }

    #[test]
    fn test_split_drops_short_sentences() {
        let sentences = split_sentences("Hi there. Two words. This one has four words.");
        assert_eq!(sentences, vec!["This one has four words."]);
    }

    #[test]
    fn test_split_without_space_is_not_boundary() {
        // "3.5" 처럼 공백이 없으면 경계가 아님
        let sentences = split_sentences("Version 3.5 was released today. It works well enough.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "Version 3.5 was released today.");
    }

    #[test]
    fn test_split_cyrillic() {
        let text = "Стоимость обучения составляет много рублей. Программа длится два года.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[1].starts_with("Программа"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 60자 키릴 문장: 바이트로는 120이 넘지만 문자 수로는 max 이내
        let s = format!("аб вг {}.", "д".repeat(53));
        assert_eq!(char_len(&s), 60);
        let chunks = chunk_text(&s, 10, 60);
        assert_eq!(chunks, vec![s]);
    }

    #[test]
    fn test_oversized_sentence_emitted_alone() {
        let long = sentence('x', 600);
        let short = sentence('y', 200);
        let text = format!("{} {}", long, short);

        let chunks = chunk_text(&text, 128, 512);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], long);
        assert_eq!(chunks[1], short);
    }

    #[test]
    fn test_packing_respects_max() {
        let sentences: Vec<String> = (0..10).map(|_| sentence('z', 100)).collect();
        let text = sentences.join(" ");

        let chunks = chunk_text(&text, 128, 512);
        // 100*5 + 4 = 504 <= 512, 6번째 문장은 넘침
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            let len = char_len(chunk);
            assert!((128..=512).contains(&len), "len = {}", len);
        }
        assert_eq!(chunks[0], sentences[..5].join(" "));
    }

    #[test]
    fn test_scenario_40_300_600() {
        let tiny = sentence('a', 40);
        let mid = sentence('b', 300);
        let huge = sentence('c', 600);
        let text = format!("{} {} {}", tiny, mid, huge);

        let chunks = chunk_text(&text, 128, 512);

        // 40자 문장은 이웃(300자)과 합쳐지고, 600자 문장은 단독
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{} {}", tiny, mid));
        assert_eq!(chunks[1], huge);
    }

    #[test]
    fn test_tail_below_min_is_dropped() {
        let text = format!("{} {}", sentence('a', 500), sentence('b', 50));
        let chunks = chunk_text(&text, 128, 512);
        assert_eq!(chunks, vec![sentence('a', 500)]);
    }

    #[test]
    fn test_merge_keeps_greedy_policy() {
        let chunks = vec!["a".repeat(100), "b".repeat(100), "c".repeat(400)];
        let merged = merge_chunks(chunks, 300);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], format!("{} {}", "a".repeat(100), "b".repeat(100)));
        assert_eq!(merged[1], "c".repeat(400));
    }

    #[test]
    fn test_merge_oversized_first_chunk_no_empty_output() {
        let merged = merge_chunks(vec!["x".repeat(50), "y".repeat(5)], 10);
        assert_eq!(merged, vec!["x".repeat(50), "y".repeat(5)]);
    }

    #[test]
    fn test_output_is_ordered_subsequence_of_sentences() {
        let text = "Alpha sentence number one. Beta sentence number two. \
                    Gamma is short. Delta sentence number four here. \
                    Epsilon sentence number five here! Zeta sentence six is last?";
        let sentences = split_sentences(text);
        let chunks = chunk_text(text, 0, 60);

        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| split_sentences(c))
            .collect();

        // 순서 유지, 중복 없음
        let mut cursor = 0;
        for piece in &rejoined {
            let pos = sentences[cursor..]
                .iter()
                .position(|s| s == piece)
                .expect("chunk sentence must come from the input, in order");
            cursor += pos + 1;
        }
        assert_eq!(rejoined.len(), sentences.len());
    }

    #[test]
    fn test_rechunking_preserves_content() {
        let text = (0..12)
            .map(|i| format!("Sentence number {} talks about the program in some detail.", i))
            .collect::<Vec<_>>()
            .join(" ");

        let first = chunk_text(&text, 50, 200);
        let second = chunk_text(&first.join(" "), 50, 200);

        let strip = |chunks: &[String]| -> String {
            chunks.concat().chars().filter(|c| !c.is_whitespace()).collect()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    fn test_deterministic() {
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve.";
        assert_eq!(chunk_text(text, 0, 30), chunk_text(text, 0, 30));
    }

    #[test]
    fn test_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.min_characters, 128);
        assert_eq!(config.max_characters, 512);
        assert_eq!(default_chunker().name(), "SentenceChunker");
    }
}
