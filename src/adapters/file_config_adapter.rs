//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lowercases them).

use crate::domain::error::AtfError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

const INLINE_SOURCE: &str = "<inline>";

pub struct FileConfigAdapter {
    ini: Ini,
    source: String,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AtfError> {
        let source = path.as_ref().display().to_string();
        let mut ini = Ini::new();
        ini.load(path.as_ref())
            .map_err(|reason| AtfError::ConfigParse {
                file: source.clone(),
                reason,
            })?;
        Ok(Self { ini, source })
    }

    pub fn from_string(content: &str) -> Result<Self, AtfError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| AtfError::ConfigParse {
                file: INLINE_SOURCE.into(),
                reason,
            })?;
        Ok(Self {
            ini,
            source: INLINE_SOURCE.into(),
        })
    }

    /// Path the config was read from, or `<inline>`.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn has_section(&self, section: &str) -> bool {
        let wanted = section.to_lowercase();
        self.ini.sections().iter().any(|s| *s == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[backtest]
start_date = 2021-01-01
initial_cash = 10000.0
fee_per_trade = free

[index]
stablecoin_exclusions = usdt, USDC ,,dai

[sell_sl]
win_sl = 7
cool = -2

[buy_dip]
enable = off
first_buy_full = Yes
all_in_below = maybe
"#;

    fn sample() -> FileConfigAdapter {
        FileConfigAdapter::from_string(SAMPLE).unwrap()
    }

    #[test]
    fn get_string_reads_values() {
        let adapter = sample();
        assert_eq!(
            adapter.get_string("backtest", "start_date"),
            Some("2021-01-01".to_string())
        );
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.source(), "<inline>");
    }

    #[test]
    fn require_string_rejects_missing_key() {
        let err = sample().require_string("backtest", "price_dir").unwrap_err();
        assert!(matches!(err, AtfError::ConfigMissing { ref key, .. } if key == "price_dir"));
    }

    #[test]
    fn require_date_parses_iso_dates() {
        let date = sample().require_date("backtest", "start_date").unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert!(matches!(
            sample().require_date("backtest", "initial_cash"),
            Err(AtfError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn get_f64_default_and_malformed() {
        let adapter = sample();
        assert_eq!(adapter.get_f64("backtest", "initial_cash", 0.0).unwrap(), 10_000.0);
        assert_eq!(adapter.get_f64("buy_dip", "dip_share", 20.0).unwrap(), 20.0);
        assert!(matches!(
            adapter.get_f64("backtest", "fee_per_trade", 0.0),
            Err(AtfError::ConfigInvalid { ref key, .. }) if key == "fee_per_trade"
        ));
    }

    #[test]
    fn get_usize_rejects_negative_values() {
        let adapter = sample();
        assert_eq!(adapter.get_usize("sell_sl", "win_sl", 5).unwrap(), 7);
        assert_eq!(adapter.get_usize("sell_sl", "sl_share", 20).unwrap(), 20);
        assert!(adapter.get_usize("sell_sl", "cool", 0).is_err());
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = sample();
        assert!(!adapter.get_bool("buy_dip", "enable", true).unwrap());
        assert!(adapter.get_bool("buy_dip", "first_buy_full", false).unwrap());
        assert!(adapter.get_bool("sell_tp", "enable", true).unwrap());
        assert!(adapter.get_bool("buy_dip", "all_in_below", false).is_err());
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = sample();
        assert_eq!(
            adapter.get_list("index", "stablecoin_exclusions"),
            Some(vec!["usdt".to_string(), "USDC".to_string(), "dai".to_string()])
        );
        assert_eq!(adapter.get_list("index", "missing"), None);
    }

    #[test]
    fn has_section_ignores_case() {
        let adapter = sample();
        assert!(adapter.has_section("sell_sl"));
        assert!(adapter.has_section("Sell_SL"));
        assert!(!adapter.has_section("sell_tp"));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[Backtest]\nPrice_Dir = /data/prices\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "price_dir"),
            Some("/data/prices".to_string())
        );
        assert_eq!(adapter.source(), file.path().display().to_string());
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/atf.ini");
        assert!(matches!(result, Err(AtfError::ConfigParse { ref file, .. }) if file.ends_with("atf.ini")));
    }
}
