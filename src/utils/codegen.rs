use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::engine::tables::{marker_size_token, probability_expr, FEATURE_SPECS, MARKER_SIZE_TOKENS};
use crate::models::config::*;
use crate::utils::format::fixed2;

// ══════════════════════════════════════════════════════════════
// Public API — types
// ══════════════════════════════════════════════════════════════

/// Pine Script language version targeted by the generator.
pub const PINE_VERSION: u32 = 5;

/// Title shown on the chart and in the indicator list.
pub const SCRIPT_TITLE: &str = "Agentic ML Signal Suite";

/// File name used when the script is exported.
pub const SCRIPT_FILENAME: &str = "AgenticMLSignalSuite.pine";

const MAX_LABELS_COUNT: u32 = 500;
const MAX_LINES_COUNT: u32 = 500;

/// Disables both signals unless the thresholds are correctly ordered.
pub const THRESHOLD_GUARD: &str = "buyThreshold > sellThreshold";

/// A single generated code file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeFile {
    pub filename: String,
    pub code: String,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Generate the Pine Script v5 indicator for a configuration.
///
/// Pure and total: the same configuration always yields byte-identical text,
/// and out-of-range values are embedded as given.
pub fn generate_pinescript(config: &IndicatorConfig) -> String {
    let blocks = [
        pine_header(),
        pine_hyperparameters(config),
        pine_feature_toggles(&config.features),
        pine_weight_inputs(&config.weights),
        pine_features(),
        pine_accumulation(),
        pine_model(config.model),
        pine_signals(),
        pine_plots(),
        pine_alerts(),
        pine_debug_table(),
    ];

    let mut out = String::with_capacity(4096);
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(block);
    }
    out
}

/// Generate the script wrapped as an exportable file.
pub fn generate_script_file(config: &IndicatorConfig) -> CodeFile {
    CodeFile {
        filename: SCRIPT_FILENAME.to_string(),
        code: generate_pinescript(config),
    }
}

// ══════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════
//
// Every block below returns its lines terminated by '\n'; the pipeline puts
// one blank line between blocks.

fn pine_header() -> String {
    let mut out = String::new();
    writeln!(out, "//@version={}", PINE_VERSION).ok();
    writeln!(
        out,
        "indicator('{}', overlay=true, max_labels_count={}, max_lines_count={})",
        SCRIPT_TITLE, MAX_LABELS_COUNT, MAX_LINES_COUNT
    )
    .ok();
    out
}

fn pine_hyperparameters(config: &IndicatorConfig) -> String {
    let mut out = String::new();
    writeln!(out, "// === Hyperparameters ===").ok();
    writeln!(
        out,
        "lookback = input.int({}, 'Lookback Period', minval={}, maxval={}, step=1, group='Model Controls')",
        config.lookback, LOOKBACK_MIN, LOOKBACK_MAX
    )
    .ok();
    writeln!(
        out,
        "modelType = input.string('{}', 'Model Type', options=[{}], group='Model Controls')",
        config.model.pine_name(),
        quoted_options(ModelType::ALL.iter().map(|m| m.pine_name()))
    )
    .ok();
    writeln!(
        out,
        "biasInput = input.float({}, 'Model Bias', step=0.05, minval={:?}, maxval={:?}, group='Model Weights')",
        fixed2(config.bias), BIAS_MIN, BIAS_MAX
    )
    .ok();
    writeln!(out).ok();

    writeln!(
        out,
        "buyThreshold = input.float({}, 'Buy Threshold', minval={:?}, maxval={:?}, step=0.01, group='Signal Thresholds')",
        fixed2(config.buy_threshold), BUY_THRESHOLD_MIN, BUY_THRESHOLD_MAX
    )
    .ok();
    writeln!(
        out,
        "sellThreshold = input.float({}, 'Sell Threshold', minval={:?}, maxval={:?}, step=0.01, group='Signal Thresholds')",
        fixed2(config.sell_threshold), SELL_THRESHOLD_MIN, SELL_THRESHOLD_MAX
    )
    .ok();
    writeln!(out).ok();

    writeln!(
        out,
        "markerSize = input.string('{}', 'Marker Size', options=[{}], group='Visuals')",
        config.marker_size.label(),
        quoted_options(MarkerSize::ALL.iter().map(|s| s.label()))
    )
    .ok();
    writeln!(out, "markerSizePine = {}", marker_size_selector()).ok();
    out
}

/// `'a', 'b', 'c'` for an `options=[...]` argument.
fn quoted_options<'a>(options: impl Iterator<Item = &'a str>) -> String {
    options
        .map(|o| format!("'{}'", o))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Nested ternary resolving the `markerSize` input to its `size.*` token.
fn marker_size_selector() -> String {
    let mut expr = String::new();
    let last = MARKER_SIZE_TOKENS.len() - 1;
    for (i, (size, _)) in MARKER_SIZE_TOKENS.iter().enumerate() {
        let token = marker_size_token(*size);
        if i == last {
            expr.push_str(token);
        } else {
            write!(expr, "markerSize == '{}' ? {} : ", size.label(), token).ok();
        }
    }
    expr
}

fn pine_feature_toggles(features: &PerFeature<bool>) -> String {
    let mut out = String::new();
    for spec in &FEATURE_SPECS {
        writeln!(
            out,
            "{} = input.bool({}, '{}', group='Feature Selection')",
            spec.toggle_var(),
            features[spec.id],
            spec.label
        )
        .ok();
    }
    out
}

fn pine_weight_inputs(weights: &PerFeature<f64>) -> String {
    let mut out = String::new();
    for spec in &FEATURE_SPECS {
        writeln!(
            out,
            "{} = input.float({}, '{}', minval={:?}, maxval={:?}, step=0.05, group='Model Weights')",
            spec.weight_var(),
            fixed2(weights[spec.id]),
            spec.weight_label,
            WEIGHT_MIN,
            WEIGHT_MAX
        )
        .ok();
    }
    out
}

// ══════════════════════════════════════════════════════════════
// Feature expressions
// ══════════════════════════════════════════════════════════════

/// All formulas are emitted whether or not the feature is enabled; only the
/// accumulation is gated.
fn pine_features() -> String {
    let mut out = String::new();
    writeln!(out, "// === Feature Engineering ===").ok();
    for (i, spec) in FEATURE_SPECS.iter().enumerate() {
        if i > 0 {
            writeln!(out).ok();
        }
        writeln!(out, "{}", spec.formula).ok();
    }
    out
}

// ══════════════════════════════════════════════════════════════
// Scoring
// ══════════════════════════════════════════════════════════════

fn pine_accumulation() -> String {
    let mut out = String::new();
    writeln!(out, "modelSum = 0.0").ok();
    for spec in &FEATURE_SPECS {
        writeln!(
            out,
            "modelSum += {} ? {} * {} : 0.0",
            spec.toggle_var(),
            spec.weight_var(),
            spec.normalized_var
        )
        .ok();
    }
    out
}

/// Linear score, nonlinearity and clamp.
///
/// The selected model's expression is the first branch; the remaining models
/// follow so that changing `modelType` in the chart settings still works.
fn pine_model(model: ModelType) -> String {
    let mut out = String::new();
    writeln!(out, "linearComponent = modelSum + biasInput").ok();
    writeln!(out, "probability = if modelType == '{}'", model.pine_name()).ok();
    writeln!(out, "    {}", probability_expr(model)).ok();

    let others: Vec<ModelType> = ModelType::ALL.into_iter().filter(|m| *m != model).collect();
    for (i, other) in others.iter().enumerate() {
        if i + 1 == others.len() {
            writeln!(out, "else").ok();
        } else {
            writeln!(out, "else if modelType == '{}'", other.pine_name()).ok();
        }
        writeln!(out, "    {}", probability_expr(*other)).ok();
    }
    writeln!(out).ok();

    writeln!(out, "probability := math.clamp(probability, 0.0, 1.0)").ok();
    out
}

fn pine_signals() -> String {
    let mut out = String::new();
    writeln!(out, "buySignal = probability >= buyThreshold and {}", THRESHOLD_GUARD).ok();
    writeln!(out, "sellSignal = probability <= sellThreshold and {}", THRESHOLD_GUARD).ok();
    out
}

// ══════════════════════════════════════════════════════════════
// Output directives
// ══════════════════════════════════════════════════════════════

fn pine_plots() -> String {
    let mut out = String::new();
    writeln!(out, "plot(probability, 'ML Probability', color=color.new(color.cyan, 0), linewidth=2)").ok();
    writeln!(out, "plot(buyThreshold, 'Buy Threshold', color=color.new(color.green, 60), linewidth=1, style=plot.style_dashed)").ok();
    writeln!(out, "plot(sellThreshold, 'Sell Threshold', color=color.new(color.red, 60), linewidth=1, style=plot.style_dashed)").ok();
    writeln!(out).ok();
    writeln!(out, "plotshape(buySignal, title='Buy Signal', location=location.belowbar, style=shape.triangleup, color=color.new(color.lime, 0), size=markerSizePine, offset=0)").ok();
    writeln!(out, "plotshape(sellSignal, title='Sell Signal', location=location.abovebar, style=shape.triangledown, color=color.new(color.red, 0), size=markerSizePine, offset=0)").ok();
    out
}

fn pine_alerts() -> String {
    let mut out = String::new();
    writeln!(out, "alertcondition(buySignal, title='Agentic ML Buy', message='Agentic ML Buy Signal Triggered')").ok();
    writeln!(out, "alertcondition(sellSignal, title='Agentic ML Sell', message='Agentic ML Sell Signal Triggered')").ok();
    out
}

/// Status table, drawn on the most recent bar only.
fn pine_debug_table() -> String {
    let mut out = String::new();
    writeln!(out, "// Debug table for transparency").ok();
    writeln!(out, "var table debugTable = table.new(position.top_right, 1, 4, border_width=1)").ok();
    writeln!(out, "if barstate.islast").ok();
    writeln!(out, "    table.cell(debugTable, 0, 0, 'ML Probability: ' + str.tostring(probability, '#.##'))").ok();
    writeln!(out, "    table.cell(debugTable, 0, 1, 'Buy Threshold: ' + str.tostring(buyThreshold, '#.##'))").ok();
    writeln!(out, "    table.cell(debugTable, 0, 2, 'Sell Threshold: ' + str.tostring(sellThreshold, '#.##'))").ok();
    writeln!(out, "    table.cell(debugTable, 0, 3, 'Selected Model: ' + modelType)").ok();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_SCRIPT: &str = r#"//@version=5
indicator('Agentic ML Signal Suite', overlay=true, max_labels_count=500, max_lines_count=500)

// === Hyperparameters ===
lookback = input.int(100, 'Lookback Period', minval=50, maxval=200, step=1, group='Model Controls')
modelType = input.string('Logistic Regression', 'Model Type', options=['Logistic Regression', 'SVM (Linear Kernel)'], group='Model Controls')
biasInput = input.float(0.10, 'Model Bias', step=0.05, minval=-10.0, maxval=10.0, group='Model Weights')

buyThreshold = input.float(0.70, 'Buy Threshold', minval=0.5, maxval=0.9, step=0.01, group='Signal Thresholds')
sellThreshold = input.float(0.30, 'Sell Threshold', minval=0.1, maxval=0.5, step=0.01, group='Signal Thresholds')

markerSize = input.string('Medium', 'Marker Size', options=['Small', 'Medium', 'Large'], group='Visuals')
markerSizePine = markerSize == 'Small' ? size.small : markerSize == 'Medium' ? size.large : size.huge

useRSI = input.bool(true, 'RSI Oscillator', group='Feature Selection')
useMACD = input.bool(true, 'MACD Momentum', group='Feature Selection')
useVOLUME = input.bool(false, 'Volume Profile', group='Feature Selection')
usePRICE = input.bool(true, 'Price Action', group='Feature Selection')

weightRSI = input.float(0.65, 'RSI Weight', minval=-5.0, maxval=5.0, step=0.05, group='Model Weights')
weightMACD = input.float(0.45, 'MACD Weight', minval=-5.0, maxval=5.0, step=0.05, group='Model Weights')
weightVOLUME = input.float(0.30, 'Volume Weight', minval=-5.0, maxval=5.0, step=0.05, group='Model Weights')
weightPRICE = input.float(0.35, 'Price Action Weight', minval=-5.0, maxval=5.0, step=0.05, group='Model Weights')

// === Feature Engineering ===
rsiSource = ta.rsi(close, 14)
normalizedRsi = math.max(math.min((rsiSource - 50) / 50, 1), -1)

[macdFast, macdSlow, macdHist] = ta.macd(close, 12, 26, 9)
normalizedMacd = math.tanh(macdHist / ta.stdev(macdHist, math.max(5, math.round(lookback * 0.2))))

volumeMean = ta.sma(volume, lookback)
normalizedVolume = math.tanh(volume / volumeMean - 1)

priceMomentum = ta.roc(close, math.max(2, math.round(lookback * 0.25)))
rangeNormalizedMomentum = math.tanh(priceMomentum / 100)

modelSum = 0.0
modelSum += useRSI ? weightRSI * normalizedRsi : 0.0
modelSum += useMACD ? weightMACD * normalizedMacd : 0.0
modelSum += useVOLUME ? weightVOLUME * normalizedVolume : 0.0
modelSum += usePRICE ? weightPRICE * rangeNormalizedMomentum : 0.0

linearComponent = modelSum + biasInput
probability = if modelType == 'Logistic Regression'
    1.0 / (1.0 + math.exp(-linearComponent))
else
    0.5 + 0.5 * math.tanh(linearComponent)

probability := math.clamp(probability, 0.0, 1.0)

buySignal = probability >= buyThreshold and buyThreshold > sellThreshold
sellSignal = probability <= sellThreshold and buyThreshold > sellThreshold

plot(probability, 'ML Probability', color=color.new(color.cyan, 0), linewidth=2)
plot(buyThreshold, 'Buy Threshold', color=color.new(color.green, 60), linewidth=1, style=plot.style_dashed)
plot(sellThreshold, 'Sell Threshold', color=color.new(color.red, 60), linewidth=1, style=plot.style_dashed)

plotshape(buySignal, title='Buy Signal', location=location.belowbar, style=shape.triangleup, color=color.new(color.lime, 0), size=markerSizePine, offset=0)
plotshape(sellSignal, title='Sell Signal', location=location.abovebar, style=shape.triangledown, color=color.new(color.red, 0), size=markerSizePine, offset=0)

alertcondition(buySignal, title='Agentic ML Buy', message='Agentic ML Buy Signal Triggered')
alertcondition(sellSignal, title='Agentic ML Sell', message='Agentic ML Sell Signal Triggered')

// Debug table for transparency
var table debugTable = table.new(position.top_right, 1, 4, border_width=1)
if barstate.islast
    table.cell(debugTable, 0, 0, 'ML Probability: ' + str.tostring(probability, '#.##'))
    table.cell(debugTable, 0, 1, 'Buy Threshold: ' + str.tostring(buyThreshold, '#.##'))
    table.cell(debugTable, 0, 2, 'Sell Threshold: ' + str.tostring(sellThreshold, '#.##'))
    table.cell(debugTable, 0, 3, 'Selected Model: ' + modelType)
"#;

    fn count_lines_starting_with(code: &str, prefix: &str) -> usize {
        code.lines().filter(|l| l.starts_with(prefix)).count()
    }

    #[test]
    fn test_default_script_matches_reference() {
        let code = generate_pinescript(&IndicatorConfig::default());
        assert_eq!(code, DEFAULT_SCRIPT);
    }

    #[test]
    fn test_deterministic() {
        let mut config = IndicatorConfig::default();
        config.weights.macd = -2.345;
        config.model = ModelType::SvmLinearKernel;
        let first = generate_pinescript(&config);
        for _ in 0..5 {
            assert_eq!(generate_pinescript(&config.clone()), first);
        }
    }

    #[test]
    fn test_scenario_a_defaults() {
        let code = generate_pinescript(&IndicatorConfig::default());
        assert!(code.contains("lookback = input.int(100, 'Lookback Period'"));
        assert!(code.contains("modelType = input.string('Logistic Regression', 'Model Type'"));
        assert!(code.contains("markerSize = input.string('Medium'"));
        assert!(code.contains("markerSize == 'Medium' ? size.large"));
        assert!(code.contains("useVOLUME = input.bool(false"));
        assert!(code.contains("useRSI = input.bool(true"));
    }

    #[test]
    fn test_scenario_b_model_switch_touches_only_model_lines() {
        let logistic = IndicatorConfig::default();
        let mut svm = logistic.clone();
        svm.model = ModelType::SvmLinearKernel;

        let a = generate_pinescript(&logistic);
        let b = generate_pinescript(&svm);
        let a_lines: Vec<&str> = a.lines().collect();
        let b_lines: Vec<&str> = b.lines().collect();
        assert_eq!(a_lines.len(), b_lines.len());

        let changed: Vec<(&str, &str)> = a_lines
            .iter()
            .zip(&b_lines)
            .filter(|(x, y)| x != y)
            .map(|(x, y)| (*x, *y))
            .collect();
        assert_eq!(changed.len(), 4, "{:?}", changed);
        assert!(changed[0].1.starts_with("modelType = input.string('SVM (Linear Kernel)'"));
        assert_eq!(changed[1].1, "probability = if modelType == 'SVM (Linear Kernel)'");
        assert_eq!(changed[2].1, "    0.5 + 0.5 * math.tanh(linearComponent)");
        assert_eq!(changed[3].1, "    1.0 / (1.0 + math.exp(-linearComponent))");
    }

    #[test]
    fn test_scenario_c_equal_thresholds() {
        let mut config = IndicatorConfig::default();
        config.buy_threshold = 0.5;
        config.sell_threshold = 0.5;
        let code = generate_pinescript(&config);

        assert!(code.contains("buyThreshold = input.float(0.50,"));
        assert!(code.contains("sellThreshold = input.float(0.50,"));
        assert!(code.contains("buySignal = probability >= buyThreshold and buyThreshold > sellThreshold"));
        assert!(code.contains("sellSignal = probability <= sellThreshold and buyThreshold > sellThreshold"));
        assert!(code.contains("plot(buyThreshold, 'Buy Threshold'"));
        assert!(code.contains("plot(sellThreshold, 'Sell Threshold'"));
    }

    #[test]
    fn test_scenario_d_disabled_feature_is_gated_not_omitted() {
        let mut config = IndicatorConfig::default();
        config.features = PerFeature { rsi: true, macd: true, volume: false, price: true };
        config.weights.volume = 1.25;
        let code = generate_pinescript(&config);

        assert!(code.contains("useVOLUME = input.bool(false, 'Volume Profile'"));
        assert!(code.contains("weightVOLUME = input.float(1.25, 'Volume Weight'"));
        assert!(code.contains("volumeMean = ta.sma(volume, lookback)"));
        assert!(code.contains("normalizedVolume = math.tanh(volume / volumeMean - 1)"));
        assert!(code.contains("modelSum += useVOLUME ? weightVOLUME * normalizedVolume : 0.0"));
    }

    #[test]
    fn test_total_coverage_when_everything_disabled() {
        let mut config = IndicatorConfig::default();
        config.features = PerFeature { rsi: false, macd: false, volume: false, price: false };
        let code = generate_pinescript(&config);

        for spec in &FEATURE_SPECS {
            let toggle = format!("{} = input.bool(false, ", spec.toggle_var());
            let weight = format!("{} = input.float(", spec.weight_var());
            let accumulate = format!("modelSum += {} ? ", spec.toggle_var());
            assert_eq!(count_lines_starting_with(&code, &toggle), 1, "{}", spec.id);
            assert_eq!(count_lines_starting_with(&code, &weight), 1, "{}", spec.id);
            assert_eq!(count_lines_starting_with(&code, &accumulate), 1, "{}", spec.id);
            assert_eq!(code.matches(spec.formula).count(), 1, "{}", spec.id);
        }
    }

    #[test]
    fn test_feature_order_is_fixed() {
        let code = generate_pinescript(&IndicatorConfig::default());
        let positions: Vec<usize> = ["useRSI", "useMACD", "useVOLUME", "usePRICE"]
            .iter()
            .map(|v| code.find(&format!("{} = input.bool", v)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let formulas: Vec<usize> = FEATURE_SPECS
            .iter()
            .map(|s| code.find(s.formula).unwrap())
            .collect();
        assert!(formulas.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_structural_counts() {
        for model in ModelType::ALL {
            let mut config = IndicatorConfig::default();
            config.model = model;
            let code = generate_pinescript(&config);

            assert_eq!(count_lines_starting_with(&code, "//@version=5"), 1);
            assert_eq!(count_lines_starting_with(&code, "linearComponent = "), 1);
            assert_eq!(count_lines_starting_with(&code, "probability = if modelType == "), 1);
            assert_eq!(code.matches("math.clamp(").count(), 1);
            assert_eq!(code.matches(THRESHOLD_GUARD).count(), 2);
            assert_eq!(count_lines_starting_with(&code, "plot("), 3);
            assert_eq!(count_lines_starting_with(&code, "plotshape("), 2);
            assert_eq!(count_lines_starting_with(&code, "alertcondition("), 2);
            assert_eq!(count_lines_starting_with(&code, "if barstate.islast"), 1);
        }
    }

    #[test]
    fn test_two_decimal_formatting() {
        let mut config = IndicatorConfig::default();
        config.buy_threshold = 0.7;
        config.sell_threshold = 0.123456;
        config.bias = -3.0;
        config.weights = PerFeature { rsi: 1.0, macd: -0.5, volume: 4.999, price: -0.0 };
        let code = generate_pinescript(&config);

        assert!(code.contains("buyThreshold = input.float(0.70,"));
        assert!(code.contains("sellThreshold = input.float(0.12,"));
        assert!(code.contains("biasInput = input.float(-3.00,"));
        assert!(code.contains("weightRSI = input.float(1.00,"));
        assert!(code.contains("weightMACD = input.float(-0.50,"));
        assert!(code.contains("weightVOLUME = input.float(5.00,"));
        assert!(code.contains("weightPRICE = input.float(0.00,"));

        config.weights = PerFeature { rsi: 0.125, macd: -0.625, volume: 2.375, price: -0.001 };
        let code = generate_pinescript(&config);
        assert!(code.contains("weightRSI = input.float(0.13,"));
        assert!(code.contains("weightMACD = input.float(-0.63,"));
        assert!(code.contains("weightVOLUME = input.float(2.38,"));
        assert!(code.contains("weightPRICE = input.float(-0.00,"));
    }

    #[test]
    fn test_marker_sizes() {
        for (size, label) in [
            (MarkerSize::Small, "Small"),
            (MarkerSize::Medium, "Medium"),
            (MarkerSize::Large, "Large"),
        ] {
            let mut config = IndicatorConfig::default();
            config.marker_size = size;
            let code = generate_pinescript(&config);
            assert!(code.contains(&format!("markerSize = input.string('{}', 'Marker Size'", label)));
            assert!(code.contains(
                "markerSizePine = markerSize == 'Small' ? size.small : markerSize == 'Medium' ? size.large : size.huge"
            ));
        }
    }

    #[test]
    fn test_out_of_range_values_are_embedded() {
        let mut config = IndicatorConfig::default();
        config.lookback = 10;
        config.buy_threshold = 1.5;
        config.bias = 42.0;
        let code = generate_pinescript(&config);

        assert!(code.contains("lookback = input.int(10, 'Lookback Period', minval=50, maxval=200"));
        assert!(code.contains("buyThreshold = input.float(1.50,"));
        assert!(code.contains("biasInput = input.float(42.00,"));
    }

    #[test]
    fn test_script_file() {
        let file = generate_script_file(&IndicatorConfig::default());
        assert_eq!(file.filename, "AgenticMLSignalSuite.pine");
        assert!(file.code.starts_with("//@version=5\n"));
        assert!(file.code.ends_with("'Selected Model: ' + modelType)\n"));
    }
}
