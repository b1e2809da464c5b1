//! Conversation Router - 세션별 대화 상태 머신
//!
//! ```text
//! IDLE --compare--> IDLE                  (검색 k=10 + 답변)
//! IDLE --question--> AWAITING_QUESTION    AWAITING_QUESTION --text--> IDLE (검색 k=5 + 답변)
//! IDLE --recommend--> AWAITING_BACKGROUND AWAITING_BACKGROUND --text--> IDLE (추천기)
//! AWAITING_* --cancel--> IDLE
//! ```
//!
//! 세션 상태는 세션 ID별 맵에 두며, 잠금은 `.await` 너머로 유지하지 않습니다.
//! 지식베이스는 Retriever를 통해 읽기만 합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::generation::AnswerGenerator;
use crate::knowledge::Retriever;

use super::recommender::Recommender;

/// 메뉴: 프로그램 비교
pub const COMPARE_BUTTON: &str = "Compare programs";
/// 메뉴: 질문하기
pub const QUESTION_BUTTON: &str = "Ask a question about the programs";
/// 메뉴: 추천 받기
pub const RECOMMEND_BUTTON: &str = "Help me choose (Recommendation)";

/// 비교 흐름에서 사용하는 고정 질문
pub const COMPARE_QUESTION: &str = "Compare the master's programs 'Artificial Intelligence' and \
    'AI Product Management'. Describe their key goals, who they are suited for, and what \
    graduates become. Present the answer as a point-by-point comparison.";

pub const CANCELLED_MESSAGE: &str = "Action cancelled.";

const GREETING_MESSAGE: &str = "Hello! I am an assistant for applicants to the AI master's \
    programs. I can compare the programs, answer your questions or give you a recommendation.";
const MENU_HINT_MESSAGE: &str = "Please choose one of the options from the menu.";
const COMPARE_PROGRESS_MESSAGE: &str =
    "Preparing a comparison of the programs based on their websites... This may take a minute.";
const QUESTION_PROMPT_MESSAGE: &str = "Ask your question about admission, studies, courses or \
    careers. I will look for the answer in the materials from both programs' websites.\n\n\
    Type /cancel to cancel.";
const QUESTION_PROGRESS_MESSAGE: &str = "Searching for information and generating an answer... Please wait.";
const BACKGROUND_PROMPT_MESSAGE: &str = "Sure! To give you a recommendation, describe your current \
    experience or education in 1-2 sentences.\n\n\
    For example: 'I am a frontend developer and want to move into ML' or 'I am a manager at an IT company'.\n\n\
    Type /cancel to cancel.";

// ============================================================================
// Types
// ============================================================================

/// 세션(사용자) ID
pub type SessionId = i64;

/// 전송 계층이 분류한 입력 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `/start`
    Start,
    /// 비교 메뉴
    Compare,
    /// 질문 메뉴
    AskQuestion,
    /// 추천 메뉴
    Recommend,
    /// `/cancel`
    Cancel,
    /// 자유 텍스트
    Text,
}

/// 사용자 입력 한 턴
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub trigger: Trigger,
    /// 원문 (대기 상태에서는 트리거와 무관하게 이 텍스트를 사용)
    pub text: String,
}

impl Turn {
    /// 고정 메뉴 문구/명령어 분류
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        let trigger = match trimmed {
            COMPARE_BUTTON => Trigger::Compare,
            QUESTION_BUTTON => Trigger::AskQuestion,
            RECOMMEND_BUTTON => Trigger::Recommend,
            _ if is_command(trimmed, "/start") => Trigger::Start,
            _ if is_command(trimmed, "/cancel") => Trigger::Cancel,
            _ => Trigger::Text,
        };

        Self {
            trigger,
            text: trimmed.to_string(),
        }
    }
}

/// `/cmd` 또는 `/cmd@botname`
fn is_command(text: &str, command: &str) -> bool {
    match text.strip_prefix(command) {
        Some(rest) => rest.is_empty() || rest.starts_with('@'),
        None => false,
    }
}

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingBackground,
    AwaitingQuestion,
}

/// 사용자에게 보낼 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// 메인 메뉴 표시 여부
    pub show_menu: bool,
}

/// 응답 전달 (전송 계층)
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: Reply) -> Result<()>;
}

/// 라우터 설정
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// 비교 흐름 검색 개수
    pub compare_top_k: usize,
    /// 자유 질문 검색 개수
    pub question_top_k: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            compare_top_k: 10,
            question_top_k: 5,
        }
    }
}

// ============================================================================
// ConversationRouter
// ============================================================================

/// 대화 라우터
pub struct ConversationRouter {
    retriever: Retriever,
    answerer: AnswerGenerator,
    recommender: Arc<dyn Recommender>,
    config: RouterConfig,
    /// Idle이 아닌 세션만 보관
    sessions: Mutex<HashMap<SessionId, SessionState>>,
}

impl ConversationRouter {
    pub fn new(
        retriever: Retriever,
        answerer: AnswerGenerator,
        recommender: Arc<dyn Recommender>,
        config: RouterConfig,
    ) -> Self {
        Self {
            retriever,
            answerer,
            recommender,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 현재 세션 상태
    pub fn state(&self, session: SessionId) -> SessionState {
        self.sessions().get(&session).copied().unwrap_or_default()
    }

    /// 대기 중인 세션 수
    pub fn active_sessions(&self) -> usize {
        self.sessions().len()
    }

    /// 한 턴 처리 후 새 상태 반환
    ///
    /// 모든 턴은 최소 하나의 응답으로 끝납니다.
    pub async fn handle(&self, session: SessionId, turn: Turn, sink: &dyn ReplySink) -> SessionState {
        let state = self.state(session);
        tracing::debug!("Session {}: {:?} + {:?}", session, state, turn.trigger);

        match (state, turn.trigger) {
            (_, Trigger::Start) => {
                self.set_state(session, SessionState::Idle);
                self.send(sink, GREETING_MESSAGE, true).await;
            }
            (_, Trigger::Cancel) => {
                self.set_state(session, SessionState::Idle);
                self.send(sink, CANCELLED_MESSAGE, true).await;
            }
            (SessionState::AwaitingQuestion, _) => {
                self.set_state(session, SessionState::Idle);
                self.answer_question(&turn.text, sink).await;
            }
            (SessionState::AwaitingBackground, _) => {
                self.set_state(session, SessionState::Idle);
                let recommendation = self.recommender.recommend(&turn.text).await;
                self.send(sink, &recommendation, true).await;
            }
            (SessionState::Idle, Trigger::Compare) => {
                self.compare_programs(sink).await;
            }
            (SessionState::Idle, Trigger::AskQuestion) => {
                self.set_state(session, SessionState::AwaitingQuestion);
                self.send(sink, QUESTION_PROMPT_MESSAGE, false).await;
            }
            (SessionState::Idle, Trigger::Recommend) => {
                self.set_state(session, SessionState::AwaitingBackground);
                self.send(sink, BACKGROUND_PROMPT_MESSAGE, false).await;
            }
            (SessionState::Idle, Trigger::Text) => {
                self.send(sink, MENU_HINT_MESSAGE, true).await;
            }
        }

        self.state(session)
    }

    /// 비교 흐름 (단일 턴)
    async fn compare_programs(&self, sink: &dyn ReplySink) {
        self.send(sink, COMPARE_PROGRESS_MESSAGE, false).await;
        self.retrieve_and_answer(COMPARE_QUESTION, self.config.compare_top_k, sink)
            .await;
    }

    /// 자유 질문 흐름
    async fn answer_question(&self, question: &str, sink: &dyn ReplySink) {
        self.send(sink, QUESTION_PROGRESS_MESSAGE, false).await;
        self.retrieve_and_answer(question, self.config.question_top_k, sink)
            .await;
    }

    async fn retrieve_and_answer(&self, question: &str, k: usize, sink: &dyn ReplySink) {
        let context = self.retriever.retrieve(question, k).await;

        // 질문을 처리하지 못했으면 LLM을 호출하지 않음
        if context.is_failure() {
            self.send(sink, context.as_text(), true).await;
            return;
        }

        let answer = self.answerer.answer(question, context.as_text()).await;
        self.send(sink, &answer, true).await;
    }

    async fn send(&self, sink: &dyn ReplySink, text: &str, show_menu: bool) {
        let reply = Reply {
            text: text.to_string(),
            show_menu,
        };
        if let Err(e) = sink.send(reply).await {
            tracing::warn!("Failed to deliver reply: {:#}", e);
        }
    }

    fn set_state(&self, session: SessionId, state: SessionState) {
        let mut sessions = self.sessions();
        match state {
            SessionState::Idle => {
                sessions.remove(&session);
            }
            other => {
                sessions.insert(session, other);
            }
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionState>> {
        // 잠금 중 panic이 나도 맵 자체는 일관된 상태
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================
