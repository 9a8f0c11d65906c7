//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for atfbot.
#[derive(Debug, thiserror::Error)]
pub enum AtfError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid index composition on {date}: {eligible} eligible symbols, need {required}")]
    InvalidComposition {
        date: NaiveDate,
        eligible: usize,
        required: usize,
    },

    #[error("no index composition in effect on {date}")]
    NoComposition { date: NaiveDate },

    #[error("missing price for {symbol} on {date}")]
    PriceGap { symbol: String, date: NaiveDate },

    #[error("missing market cap snapshot on {date}")]
    MarketCapGap { date: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AtfError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AtfError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_data_gap(&self) -> bool {
        matches!(
            self,
            AtfError::PriceGap { .. } | AtfError::MarketCapGap { .. }
        )
    }
}

impl From<&AtfError> for std::process::ExitCode {
    fn from(err: &AtfError) -> Self {
        let code: u8 = match err {
            AtfError::Io(_) => 1,
            AtfError::ConfigParse { .. }
            | AtfError::ConfigMissing { .. }
            | AtfError::ConfigInvalid { .. } => 2,
            AtfError::Data { .. } => 3,
            AtfError::InvalidComposition { .. } | AtfError::NoComposition { .. } => 4,
            AtfError::PriceGap { .. } | AtfError::MarketCapGap { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
