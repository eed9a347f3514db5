pub const FRED_API_URL: &str = "https://api.stlouisfed.org";
pub const BLS_API_URL: &str = "https://api.bls.gov";
pub const OPENAI_API_URL: &str = "https://api.openai.com";

/// Signal type written by the inflation batch job.
pub const INFLATION_SIGNAL: &str = "inflation";
/// Signal type written by the key events job.
pub const KEY_EVENT_SIGNAL: &str = "key_event";

pub const MODEL_VERSION: &str = "gpt-4.1-mini";
pub const PROMPT_VERSION: &str = "inflation-v3.0";
pub const SCORING_VERSION: &str = "inflation-v2.2";
pub const KEY_EVENT_PROMPT_VERSION: &str = "key_event_v1";
pub const KEY_EVENT_SCORING_VERSION: &str = "v1";

/// Trailing observations kept in each history window.
pub const HISTORY_WINDOW: usize = 24;

// Series identifiers
pub const FRED_HEADLINE_CPI: &str = "CPIAUCSL";
pub const FRED_CORE_CPI: &str = "CPILFESL";
pub const FRED_BREAKEVEN_5Y: &str = "T5YIE";
pub const BLS_HEADLINE_CPI: &str = "CUUR0000SA0";
pub const BLS_CORE_CPI: &str = "CUUR0000SA0L1E";

/// Marker FRED uses for a missing observation.
pub const FRED_MISSING_VALUE: &str = ".";
