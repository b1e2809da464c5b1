//! 답변 생성 모듈 - Ollama generate API
//!
//! - [`TextGenerator`]: 프롬프트 -> 텍스트 (외부 LLM 호출)
//! - [`AnswerGenerator`]: 질문 + 컨텍스트로 프롬프트를 구성하고,
//!   실패하면 고정 사과 문구로 대체
//!
//! ref: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-completion

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ServiceError;

/// 생성 요청 타임아웃 (임베딩보다 훨씬 느림)
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// 생성 실패 시 사용자에게 보내는 문구
pub const APOLOGY_MESSAGE: &str =
    "Sorry, an error occurred while contacting the language model. Please try again later.";

// ============================================================================
// TextGenerator Trait
// ============================================================================

/// 텍스트 생성 프로바이더 트레이트
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 비스트리밍 생성 요청 1회
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    /// 프로바이더(모델) 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Ollama Generator
// ============================================================================

/// Ollama 텍스트 생성 구현체
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    /// reasoning 모델의 thinking 출력 끄기
    think: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// 새 생성 클라이언트
    ///
    /// # Arguments
    /// * `host` - Ollama 서버 주소 (끝에 `/`)
    /// * `model` - 생성 모델 이름
    pub fn new(host: &Url, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, model, GENERATION_TIMEOUT)
    }

    /// 타임아웃을 지정하여 생성
    pub fn with_timeout(host: &Url, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = host
            .join("api/generate")
            .context("Failed to build generate endpoint")?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            think: false,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::ServiceUnavailable(format!(
                "generation service returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            ServiceError::MalformedResponse(format!("invalid generation response: {}", e))
        })?;

        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// AnswerGenerator
// ============================================================================

/// 컨텍스트 기반 답변 생성기
///
/// 실패를 전파하지 않습니다. 대화는 항상 응답으로 끝나야 하므로
/// 서비스 에러는 [`APOLOGY_MESSAGE`]로 바뀝니다.
#[derive(Clone)]
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// 질문에 대한 답변 생성
    pub async fn answer(&self, question: &str, context: &str) -> String {
        let prompt = build_prompt(question, context);

        match self.generator.generate(&prompt).await {
            Ok(answer) => {
                let answer = answer.trim();
                if answer.is_empty() {
                    tracing::warn!("Model {} returned an empty answer", self.generator.name());
                    APOLOGY_MESSAGE.to_string()
                } else {
                    answer.to_string()
                }
            }
            Err(e) => {
                tracing::error!("Generation via {} failed: {}", self.generator.name(), e);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}

/// 컨텍스트 전용 답변 프롬프트
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a friendly, expert assistant for applicants to the university's master's programs.\n\
         Your task is to answer the user's question as accurately and completely as possible using ONLY the context below.\n\
         Do not make up information. If the context does not contain a direct answer, say that you cannot find precise information on this question in the available materials.\n\
         Answer in a structured way and to the point.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         YOUR ANSWER:\n"
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator_for(server: &MockServer) -> OllamaGenerator {
        let host = crate::config::parse_host(&server.uri()).unwrap();
        OllamaGenerator::new(&host, "qwen3:8b").unwrap()
    }

    #[test]
    fn test_prompt_contract() {
        let prompt = build_prompt("How much does it cost?", "Cost: 599000 rubles per year");
        assert!(prompt.contains("ONLY the context"));
        assert!(prompt.contains("Do not make up information"));
        assert!(prompt.contains("cannot find precise information"));
        assert!(prompt.contains("CONTEXT:\nCost: 599000 rubles per year\n"));
        assert!(prompt.contains("QUESTION:\nHow much does it cost?\n"));
    }

    #[tokio::test]
    async fn test_generate_sends_non_streaming_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "qwen3:8b", "stream": false})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "  It costs 599000.  "})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let answerer = AnswerGenerator::new(Arc::new(generator_for(&server)));
        let answer = answerer.answer("cost?", "Cost: 599000").await;
        assert_eq!(answer, "It costs 599000.");
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        assert!(matches!(
            generator.generate("p").await,
            Err(ServiceError::ServiceUnavailable(_))
        ));

        let answerer = AnswerGenerator::new(Arc::new(generator));
        assert_eq!(answerer.answer("q", "c").await, APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn test_generate_missing_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        assert!(matches!(
            generator.generate("p").await,
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_answer_passes_prompt_to_generator() {
        let scripted = Arc::new(ScriptedGenerator::answering("Answer"));
        let answerer = AnswerGenerator::new(scripted.clone());

        assert_eq!(answerer.answer("Q?", "CTX").await, "Answer");
        let prompts = scripted.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_prompt("Q?", "CTX"));
    }

    #[tokio::test]
    async fn test_empty_answer_degrades_to_apology() {
        let answerer = AnswerGenerator::new(Arc::new(ScriptedGenerator::answering("   ")));
        assert_eq!(answerer.answer("Q?", "CTX").await, APOLOGY_MESSAGE);
    }
}
