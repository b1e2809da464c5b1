//! Conversation 모듈 - 사용자 대화 라우팅
//!
//! - Turn: 전송 계층이 분류한 사용자 입력
//! - ConversationRouter: 세션별 상태 머신 (비교 / 질문 / 추천)
//! - Recommender: 추천 문구 생성 (외부 협력자)

mod recommender;
mod router;

// Re-exports
pub use recommender::{KeywordRecommender, ProgramProfile, Recommender};
pub use router::{
    ConversationRouter, Reply, ReplySink, RouterConfig, SessionId, SessionState, Trigger, Turn,
    CANCELLED_MESSAGE, COMPARE_BUTTON, COMPARE_QUESTION, QUESTION_BUTTON, RECOMMEND_BUTTON,
};
