use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Locales the announcement API serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-cn")]
    ZhCn,
    #[serde(rename = "zh-tw")]
    ZhTw,
    #[serde(rename = "de-de")]
    DeDe,
    #[default]
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "es-es")]
    EsEs,
    #[serde(rename = "fr-fr")]
    FrFr,
    #[serde(rename = "id-id")]
    IdId,
    #[serde(rename = "it-it")]
    ItIt,
    #[serde(rename = "ja-jp")]
    JaJp,
    #[serde(rename = "ko-kr")]
    KoKr,
    #[serde(rename = "pt-pt")]
    PtPt,
    #[serde(rename = "ru-ru")]
    RuRu,
    #[serde(rename = "th-th")]
    ThTh,
    #[serde(rename = "tr-tr")]
    TrTr,
    #[serde(rename = "vi-vn")]
    ViVn,
}

impl Language {
    pub const ALL: [Language; 15] = [
        Language::ZhCn,
        Language::ZhTw,
        Language::DeDe,
        Language::EnUs,
        Language::EsEs,
        Language::FrFr,
        Language::IdId,
        Language::ItIt,
        Language::JaJp,
        Language::KoKr,
        Language::PtPt,
        Language::RuRu,
        Language::ThTh,
        Language::TrTr,
        Language::ViVn,
    ];

    /// The tag sent as the `lang` query parameter.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Language::ZhCn => "zh-cn",
            Language::ZhTw => "zh-tw",
            Language::DeDe => "de-de",
            Language::EnUs => "en-us",
            Language::EsEs => "es-es",
            Language::FrFr => "fr-fr",
            Language::IdId => "id-id",
            Language::ItIt => "it-it",
            Language::JaJp => "ja-jp",
            Language::KoKr => "ko-kr",
            Language::PtPt => "pt-pt",
            Language::RuRu => "ru-ru",
            Language::ThTh => "th-th",
            Language::TrTr => "tr-tr",
            Language::ViVn => "vi-vn",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    /// Tags are matched case-insensitively; `_` is accepted for `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_tag() == normalized)
            .ok_or_else(|| ValidationError::new("language", "supported language tag", format!("{:?}", s)))
    }
}
