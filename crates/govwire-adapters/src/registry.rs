use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Ordered list of upstream sources; file order is run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub base_url: String,
    pub news_url: String,
    #[serde(default)]
    pub selectors: SelectorSet,
    /// Title pool for the synthetic adapter.
    #[serde(default)]
    pub templates: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// CSS selectors used to pull rows out of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub articles: String,
    pub title: String,
    pub link: String,
    pub date: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            articles: ".board-list tbody tr".to_string(),
            title: "td.left a".to_string(),
            link: "td.left a".to_string(),
            date: "td.date".to_string(),
        }
    }
}

impl SourceRegistry {
    /// The three financial regulators the wire ships with.
    pub fn builtin() -> Self {
        Self {
            sources: vec![
                SourceConfig {
                    source_id: "fsc".into(),
                    display_name: "금융위원회".into(),
                    enabled: true,
                    base_url: "https://www.fsc.go.kr".into(),
                    news_url: "https://www.fsc.go.kr/no010101".into(),
                    selectors: SelectorSet::default(),
                    templates: strings(&[
                        "디지털 금융 혁신 방안 발표",
                        "서민금융 지원정책 확대 시행",
                        "ESG 금융 활성화를 위한 제도 개선",
                        "가상자산 시장 건전성 제고 방안",
                        "금융소비자보호 강화 조치 시행",
                        "중소기업 금융지원 프로그램 확대",
                        "코로나19 피해 지원금융 연장",
                        "자본시장 경쟁력 강화 방안",
                    ]),
                },
                SourceConfig {
                    source_id: "fss".into(),
                    display_name: "금융감독원".into(),
                    enabled: true,
                    base_url: "https://www.fss.or.kr".into(),
                    news_url: "https://www.fss.or.kr/fss/bbs/B0000188/list.do?menuNo=200218".into(),
                    selectors: SelectorSet {
                        title: ".left a".into(),
                        link: ".left a".into(),
                        date: ".date".into(),
                        ..SelectorSet::default()
                    },
                    templates: strings(&[
                        "은행 건전성 감독 강화 조치",
                        "보험업계 리스크 관리 가이드라인 개정",
                        "금융회사 사이버보안 강화 방안",
                        "대부업체 불법행위 집중단속 실시",
                        "금융소비자 피해구제 절차 개선",
                        "카드업계 수수료 투명성 제고",
                        "인터넷전문은행 감독 강화",
                        "금융권 개인정보보호 점검 결과",
                    ]),
                },
                SourceConfig {
                    source_id: "ftc".into(),
                    display_name: "공정거래위원회".into(),
                    enabled: true,
                    base_url: "https://www.ftc.go.kr".into(),
                    news_url: "https://www.ftc.go.kr/www/selectReportList.do?key=10&pageUnit=10&searchCnd=&searchKrwd=".into(),
                    selectors: SelectorSet::default(),
                    templates: strings(&[
                        "대기업 골목상권 진출 제한 강화",
                        "온라인 플랫폼 독점행위 조사 착수",
                        "하도급 대금 지연지급 업체 제재",
                        "프랜차이즈 불공정행위 단속 강화",
                        "대형마트 의무휴업일 준수 점검",
                        "소비자 단체소송 제도 개선 방안",
                        "전자상거래 공정거래 가이드라인",
                        "납품업체 보호 강화 조치 발표",
                    ]),
                },
            ],
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing source registry yaml")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load `path` when it exists, otherwise fall back to [`SourceRegistry::builtin`].
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let registry = Self::load(path)?;
            info!(path = %path.display(), sources = registry.sources.len(), "loaded source registry");
            Ok(registry)
        } else {
            debug!(path = %path.display(), "no source registry file; using built-in sources");
            Ok(Self::builtin())
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
