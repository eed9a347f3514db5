use std::fmt;

use serde::{Deserialize, Serialize};

/// Word budget used for the forced regeneration after a low self-evaluation.
pub const RETRY_MAX_WORDS: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Cautious,
    Constructive,
}

impl Tone {
    /// Strength word echoed in every asset-section prefix.
    pub fn strength(&self) -> &'static str {
        match self {
            Tone::Neutral => "moderate",
            Tone::Cautious => "tentative",
            Tone::Constructive => "firm",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Cautious => "cautious",
            Tone::Constructive => "constructive",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    Retail,
    Advisor,
}

impl Audience {
    pub fn description(&self) -> &'static str {
        match self {
            Audience::Retail => "a general retail audience; avoid jargon",
            Audience::Advisor => "financial advisors; concise professional terminology is fine",
        }
    }
}

/// Per-invocation narrative configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeConfig {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
    #[serde(default)]
    pub audience: Audience,
}

fn default_max_words() -> u32 {
    120
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            max_words: default_max_words(),
            audience: Audience::default(),
        }
    }
}

impl NarrativeConfig {
    /// Configuration for the single regeneration after a low evaluation.
    pub fn for_retry(&self) -> Self {
        Self {
            tone: Tone::Neutral,
            max_words: RETRY_MAX_WORDS,
            audience: self.audience,
        }
    }
}

/// What to do when a generated asset section lacks its required prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixPolicy {
    /// Verify every asset section; a mismatch falls back to the template.
    #[default]
    Enforce,
    /// Accept sections as returned.
    Trust,
}
