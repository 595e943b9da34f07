//! INI file configuration adapter.

use crate::domain::error::AitraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AitraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| AitraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, AitraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AitraderError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[backtest]
initial_balance = 10000
data = data/btc_1h.csv

[risk]
stop_loss_pct = 0.03
use_atr_stop = yes
cooldown_bars = 2

[signal]
policy = weighted
"#;

    #[test]
    fn from_string_parses_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "data"),
            Some("data/btc_1h.csv".to_string())
        );
        assert_eq!(
            adapter.get_string("signal", "policy"),
            Some("weighted".to_string())
        );
        assert!(adapter.has_key("risk", "stop_loss_pct"));
        assert!(!adapter.has_key("risk", "take_profit_pct"));
    }

    #[test]
    fn typed_getters_read_values() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_balance", 0.0), 10000.0);
        assert_eq!(adapter.get_double("risk", "stop_loss_pct", 0.0), 0.03);
        assert_eq!(adapter.get_int("risk", "cooldown_bars", 0), 2);
        assert!(adapter.get_bool("risk", "use_atr_stop", false));
    }

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\ncooldown_bars = abc\nuse_atr_stop = maybe\n")
                .unwrap();
        assert_eq!(adapter.get_int("risk", "cooldown_bars", 7), 7);
        assert_eq!(adapter.get_double("risk", "missing", 0.5), 0.5);
        assert!(adapter.get_bool("risk", "use_atr_stop", true));
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_bool_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("risk", "a", true));
        assert!(!adapter.get_bool("risk", "b", true));
        assert!(!adapter.get_bool("risk", "c", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[oracle]\nkind = logistic\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("oracle", "kind"),
            Some("logistic".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(AitraderError::ConfigParse { .. })));
    }
}
