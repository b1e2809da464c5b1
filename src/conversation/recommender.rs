//! 프로그램 추천 - 지원자 배경 설명 → 추천 문구
//!
//! 라우터는 추천 로직을 알지 못하고 [`Recommender`] 트레이트만 사용합니다.

use async_trait::async_trait;

/// 추천 트레이트
#[async_trait]
pub trait Recommender: Send + Sync {
    /// 배경 설명에 대한 추천 문구
    async fn recommend(&self, background: &str) -> String;
}

/// 추천 대상 프로그램 (이름 + 신호 키워드)
#[derive(Debug, Clone)]
pub struct ProgramProfile {
    pub name: String,
    pub pitch: String,
    pub keywords: Vec<String>,
}

/// 키워드 점수 기반 추천기
#[derive(Debug, Clone)]
pub struct KeywordRecommender {
    engineering: ProgramProfile,
    product: ProgramProfile,
}

impl Default for KeywordRecommender {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect();

        Self {
            engineering: ProgramProfile {
                name: "Artificial Intelligence".to_string(),
                pitch: "it focuses on building ML systems: deep learning, data engineering and research practice."
                    .to_string(),
                keywords: words(&[
                    "developer", "programmer", "engineer", "backend", "frontend", "ml",
                    "machine", "data", "python", "math", "mathematics", "research", "scientist",
                    "algorithms", "code",
                ]),
            },
            product: ProgramProfile {
                name: "AI Product Management".to_string(),
                pitch: "it focuses on launching AI products: discovery, product metrics and team leadership."
                    .to_string(),
                keywords: words(&[
                    "manager", "management", "product", "business", "marketing", "analyst",
                    "startup", "owner", "project", "sales", "consultant", "founder", "lead",
                ]),
            },
        }
    }
}

impl KeywordRecommender {
    fn score(profile: &ProgramProfile, tokens: &[String]) -> usize {
        tokens
            .iter()
            .filter(|t| profile.keywords.iter().any(|k| k == *t))
            .count()
    }
}

#[async_trait]
impl Recommender for KeywordRecommender {
    async fn recommend(&self, background: &str) -> String {
        let lowered = background.to_lowercase();
        let tokens: Vec<String> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let engineering = Self::score(&self.engineering, &tokens);
        let product = Self::score(&self.product, &tokens);
        tracing::debug!("Recommendation scores: engineering={}, product={}", engineering, product);

        let pick = |p: &ProgramProfile| {
            format!(
                "*Recommendation:* the *{}* program looks like the better fit, because {}",
                p.name, p.pitch
            )
        };

        if engineering > product {
            pick(&self.engineering)
        } else if product > engineering {
            pick(&self.product)
        } else {
            format!(
                "Both programs could suit you.\n\n\
                 - *{}*: {}\n\
                 - *{}*: {}\n\n\
                 Tell me more about your experience to get a more specific recommendation.",
                self.engineering.name,
                self.engineering.pitch,
                self.product.name,
                self.product.pitch
            )
        }
    }
}
