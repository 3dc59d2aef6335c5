use crate::models::config::*;

/// Check every parameter against its declared bounds.
///
/// Returns all problems at once, not just the first. The generator never calls
/// this; keeping the configuration in range is the host's job.
pub fn validate_config(config: &IndicatorConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if !(LOOKBACK_MIN..=LOOKBACK_MAX).contains(&config.lookback) {
        errors.push(format!(
            "lookback: {} is outside [{}, {}]",
            config.lookback, LOOKBACK_MIN, LOOKBACK_MAX
        ));
    }

    check_range(&mut errors, "buy_threshold", config.buy_threshold, BUY_THRESHOLD_MIN, BUY_THRESHOLD_MAX);
    check_range(&mut errors, "sell_threshold", config.sell_threshold, SELL_THRESHOLD_MIN, SELL_THRESHOLD_MAX);
    check_range(&mut errors, "bias", config.bias, BIAS_MIN, BIAS_MAX);

    for (id, weight) in config.weights.iter() {
        check_range(&mut errors, &format!("weights.{}", id), *weight, WEIGHT_MIN, WEIGHT_MAX);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_range(errors: &mut Vec<String>, field: &str, value: f64, min: f64, max: f64) {
    if !value.is_finite() {
        errors.push(format!("{}: must be a finite number, got {}", field, value));
    } else if value < min || value > max {
        errors.push(format!("{}: {} is outside [{:?}, {:?}]", field, value, min, max));
    }
}

/// Non-fatal problems worth telling the user about.
///
/// With the buy threshold at or below the sell threshold the script's guard
/// keeps both signals permanently off.
pub fn threshold_warnings(config: &IndicatorConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.buy_threshold <= config.sell_threshold {
        warnings.push(format!(
            "buy threshold ({:.2}) is not above sell threshold ({:.2}); buy and sell signals will never fire",
            config.buy_threshold, config.sell_threshold
        ));
    }
    if config.features.iter().all(|(_, enabled)| !enabled) {
        warnings.push("no features enabled; probability depends on bias alone".to_string());
    }
    warnings
}
