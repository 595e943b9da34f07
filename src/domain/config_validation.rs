//! Configuration validation.
//!
//! Every recognised key is checked for syntax and range before a run is
//! built from the config. Missing keys fall back to their defaults.

use crate::domain::error::AitraderError;
use crate::domain::ohlcv::parse_timestamp;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;

pub const POLICIES: [&str; 4] = ["conjunctive", "weighted", "majority", "technical"];
pub const ORACLE_KINDS: [&str; 2] = ["constant", "logistic"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    validate_backtest(config)?;
    validate_risk(config)?;
    validate_indicators(config)?;
    validate_sizing(config)?;
    validate_signal(config)?;
    validate_oracle(config)?;
    Ok(())
}

fn number(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, AitraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AitraderError::invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

fn count(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, AitraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| AitraderError::invalid(section, key, format!("'{raw}' is not an integer"))),
    }
}

fn positive_count(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, AitraderError> {
    let value = count(config, section, key, default)?;
    if value <= 0 {
        return Err(AitraderError::invalid(section, key, "must be positive"));
    }
    Ok(value)
}

fn fraction(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, AitraderError> {
    let value = number(config, section, key, default)?;
    if value <= 0.0 || value >= 1.0 {
        return Err(AitraderError::invalid(section, key, "must be between 0 and 1 (exclusive)"));
    }
    Ok(value)
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AitraderError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
            _ => Err(AitraderError::invalid(section, key, format!("'{raw}' is not a boolean"))),
        },
    }
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    let balance = number(config, "backtest", "initial_balance", 10_000.0)?;
    if balance <= 0.0 {
        return Err(AitraderError::invalid("backtest", "initial_balance", "must be positive"));
    }

    let mut bounds = Vec::new();
    for key in ["start", "end"] {
        if let Some(raw) = config.get_string("backtest", key) {
            let ts = parse_timestamp(&raw).ok_or_else(|| {
                AitraderError::invalid("backtest", key, format!("'{raw}' is not a date or datetime"))
            })?;
            bounds.push(ts);
        }
    }
    if let [start, end] = bounds.as_slice() {
        if start >= end {
            return Err(AitraderError::invalid("backtest", "start", "start must be before end"));
        }
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    fraction(config, "risk", "stop_loss_pct", 0.03)?;
    fraction(config, "risk", "take_profit_pct", 0.06)?;
    fraction(config, "risk", "max_drawdown_pct", 0.05)?;
    flag(config, "risk", "use_atr_stop")?;
    flag(config, "risk", "scale_by_exposure")?;
    if count(config, "risk", "cooldown_bars", 0)? < 0 {
        return Err(AitraderError::invalid("risk", "cooldown_bars", "must be non-negative"));
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    let s = "indicators";
    positive_count(config, s, "rsi_period", 14)?;

    let overbought = number(config, s, "rsi_overbought", 70.0)?;
    let oversold = number(config, s, "rsi_oversold", 30.0)?;
    for (key, v) in [("rsi_overbought", overbought), ("rsi_oversold", oversold)] {
        if !(0.0..=100.0).contains(&v) {
            return Err(AitraderError::invalid(s, key, "must be within 0..100"));
        }
    }
    if oversold >= overbought {
        return Err(AitraderError::invalid(s, "rsi_oversold", "must be below rsi_overbought"));
    }

    let fast = positive_count(config, s, "macd_fast", 12)?;
    let slow = positive_count(config, s, "macd_slow", 26)?;
    positive_count(config, s, "macd_signal", 9)?;
    if fast >= slow {
        return Err(AitraderError::invalid(s, "macd_fast", "must be below macd_slow"));
    }

    if positive_count(config, s, "bb_period", 20)? < 2 {
        return Err(AitraderError::invalid(s, "bb_period", "must be at least 2"));
    }
    if number(config, s, "bb_std", 2.0)? <= 0.0 {
        return Err(AitraderError::invalid(s, "bb_std", "must be positive"));
    }

    positive_count(config, s, "ma_period", 20)?;
    let ma_fast = positive_count(config, s, "ma_fast", 10)?;
    let ma_slow = positive_count(config, s, "ma_slow", 30)?;
    if ma_fast >= ma_slow {
        return Err(AitraderError::invalid(s, "ma_fast", "must be below ma_slow"));
    }

    positive_count(config, s, "atr_period", 14)?;
    if number(config, s, "atr_multiplier", 2.0)? <= 0.0 {
        return Err(AitraderError::invalid(s, "atr_multiplier", "must be positive"));
    }
    if positive_count(config, s, "volatility_window", 20)? < 2 {
        return Err(AitraderError::invalid(s, "volatility_window", "must be at least 2"));
    }
    positive_count(config, s, "volume_profile_bins", 20)?;
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    let max_fraction = number(config, "sizing", "max_position_fraction", 0.1)?;
    if max_fraction <= 0.0 || max_fraction > 1.0 {
        return Err(AitraderError::invalid(
            "sizing",
            "max_position_fraction",
            "must be in (0, 1]",
        ));
    }
    if number(config, "sizing", "volatility_threshold", 0.03)? <= 0.0 {
        return Err(AitraderError::invalid("sizing", "volatility_threshold", "must be positive"));
    }
    Ok(())
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    if let Some(policy) = config.get_string("signal", "policy") {
        let policy = policy.trim().to_lowercase();
        if !POLICIES.contains(&policy.as_str()) {
            return Err(AitraderError::invalid(
                "signal",
                "policy",
                format!("unknown policy '{policy}', expected one of {}", POLICIES.join(", ")),
            ));
        }
    }
    let weight = number(config, "signal", "weighted_oracle_weight", 0.5)?;
    if !(0.0..=1.0).contains(&weight) {
        return Err(AitraderError::invalid("signal", "weighted_oracle_weight", "must be within 0..1"));
    }
    let threshold = number(config, "signal", "weighted_threshold", 0.35)?;
    if !(0.0..1.0).contains(&threshold) {
        return Err(AitraderError::invalid("signal", "weighted_threshold", "must be within 0..1"));
    }
    Ok(())
}

fn validate_oracle(config: &dyn ConfigPort) -> Result<(), AitraderError> {
    if let Some(kind) = config.get_string("oracle", "kind") {
        let kind = kind.trim().to_lowercase();
        if !ORACLE_KINDS.contains(&kind.as_str()) {
            return Err(AitraderError::invalid(
                "oracle",
                "kind",
                format!("unknown oracle '{kind}', expected one of {}", ORACLE_KINDS.join(", ")),
            ));
        }
    }
    if let Some(vote) = config.get_string("oracle", "vote") {
        vote.parse::<Signal>()
            .map_err(|reason| AitraderError::invalid("oracle", "vote", reason))?;
    }
    if count(config, "oracle", "train_bars", 0)? < 0 {
        return Err(AitraderError::invalid("oracle", "train_bars", "must be non-negative"));
    }
    if positive_count(config, "oracle", "window", 11)? < 2 {
        return Err(AitraderError::invalid("oracle", "window", "must be at least 2"));
    }
    positive_count(config, "oracle", "horizon", 5)?;
    if number(config, "oracle", "label_threshold", 0.01)? < 0.0 {
        return Err(AitraderError::invalid("oracle", "label_threshold", "must be non-negative"));
    }
    positive_count(config, "oracle", "epochs", 200)?;
    if number(config, "oracle", "learning_rate", 0.1)? <= 0.0 {
        return Err(AitraderError::invalid("oracle", "learning_rate", "must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockConfig {
        values: HashMap<(String, String), String>,
    }

    impl MockConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let values = entries
                .iter()
                .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                .collect();
            Self { values }
        }
    }

    impl ConfigPort for MockConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
            self.get_string(section, key)
                .map(|v| v == "true")
                .unwrap_or(default)
        }
    }

    fn expect_invalid(entries: &[(&str, &str, &str)], section: &str, key: &str) {
        match validate_config(&MockConfig::new(entries)) {
            Err(AitraderError::ConfigInvalid {
                section: s, key: k, ..
            }) => {
                assert_eq!(s, section);
                assert_eq!(k, key);
            }
            other => panic!("expected ConfigInvalid [{section}] {key}, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        assert!(validate_config(&MockConfig::new(&[])).is_ok());
    }

    #[test]
    fn full_valid_config() {
        let config = MockConfig::new(&[
            ("backtest", "initial_balance", "25000"),
            ("backtest", "start", "2023-01-01"),
            ("backtest", "end", "2023-12-31 23:00:00"),
            ("risk", "use_atr_stop", "yes"),
            ("risk", "cooldown_bars", "3"),
            ("risk", "scale_by_exposure", "false"),
            ("signal", "policy", "Weighted"),
            ("oracle", "kind", "logistic"),
            ("oracle", "vote", "sell"),
        ]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_positive_balance() {
        expect_invalid(&[("backtest", "initial_balance", "0")], "backtest", "initial_balance");
    }

    #[test]
    fn rejects_unparseable_number() {
        expect_invalid(&[("risk", "stop_loss_pct", "three")], "risk", "stop_loss_pct");
    }

    #[test]
    fn rejects_percentages_out_of_range() {
        expect_invalid(&[("risk", "take_profit_pct", "1.5")], "risk", "take_profit_pct");
        expect_invalid(&[("risk", "max_drawdown_pct", "0")], "risk", "max_drawdown_pct");
    }

    #[test]
    fn rejects_inverted_dates() {
        expect_invalid(
            &[("backtest", "start", "2024-02-01"), ("backtest", "end", "2024-01-01")],
            "backtest",
            "start",
        );
        expect_invalid(&[("backtest", "end", "soon")], "backtest", "end");
    }

    #[test]
    fn rejects_fast_not_below_slow() {
        expect_invalid(
            &[("indicators", "macd_fast", "26"), ("indicators", "macd_slow", "12")],
            "indicators",
            "macd_fast",
        );
        expect_invalid(&[("indicators", "ma_fast", "30")], "indicators", "ma_fast");
    }

    #[test]
    fn rejects_inverted_rsi_thresholds() {
        expect_invalid(&[("indicators", "rsi_oversold", "75")], "indicators", "rsi_oversold");
    }

    #[test]
    fn rejects_zero_period() {
        expect_invalid(&[("indicators", "rsi_period", "0")], "indicators", "rsi_period");
    }

    #[test]
    fn rejects_unknown_names() {
        expect_invalid(&[("signal", "policy", "unanimous")], "signal", "policy");
        expect_invalid(&[("oracle", "kind", "forest")], "oracle", "kind");
        expect_invalid(&[("oracle", "vote", "maybe")], "oracle", "vote");
    }

    #[test]
    fn rejects_bad_flag_and_fraction() {
        expect_invalid(&[("risk", "use_atr_stop", "sometimes")], "risk", "use_atr_stop");
        expect_invalid(&[("risk", "scale_by_exposure", "partly")], "risk", "scale_by_exposure");
        expect_invalid(&[("sizing", "max_position_fraction", "1.2")], "sizing", "max_position_fraction");
    }
}
