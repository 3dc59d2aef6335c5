//! Fixed platform knowledge the generator draws from.
//!
//! Each table maps an enumeration onto literal Pine Script text. Adding a
//! feature, model or marker size is a change here, not in the emitters.

use crate::models::config::{FeatureId, MarkerSize, ModelType};

// ── Features ──

/// Static description of one engineered feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub id: FeatureId,
    /// Upper-case suffix of the `use*` / `weight*` input variables.
    pub suffix: &'static str,
    /// Label of the enable toggle.
    pub label: &'static str,
    /// Label of the weight input.
    pub weight_label: &'static str,
    /// Pine variable holding the normalized value, roughly in [-1, 1].
    pub normalized_var: &'static str,
    /// Pine statements computing `normalized_var` from price/volume and `lookback`.
    pub formula: &'static str,
}

impl FeatureSpec {
    pub fn toggle_var(&self) -> String {
        format!("use{}", self.suffix)
    }

    pub fn weight_var(&self) -> String {
        format!("weight{}", self.suffix)
    }
}

/// One row per feature, in emission order.
pub static FEATURE_SPECS: [FeatureSpec; 4] = [
    FeatureSpec {
        id: FeatureId::Rsi,
        suffix: "RSI",
        label: "RSI Oscillator",
        weight_label: "RSI Weight",
        normalized_var: "normalizedRsi",
        formula: "rsiSource = ta.rsi(close, 14)\n\
                  normalizedRsi = math.max(math.min((rsiSource - 50) / 50, 1), -1)",
    },
    FeatureSpec {
        id: FeatureId::Macd,
        suffix: "MACD",
        label: "MACD Momentum",
        weight_label: "MACD Weight",
        normalized_var: "normalizedMacd",
        formula: "[macdFast, macdSlow, macdHist] = ta.macd(close, 12, 26, 9)\n\
                  normalizedMacd = math.tanh(macdHist / ta.stdev(macdHist, math.max(5, math.round(lookback * 0.2))))",
    },
    FeatureSpec {
        id: FeatureId::Volume,
        suffix: "VOLUME",
        label: "Volume Profile",
        weight_label: "Volume Weight",
        normalized_var: "normalizedVolume",
        formula: "volumeMean = ta.sma(volume, lookback)\n\
                  normalizedVolume = math.tanh(volume / volumeMean - 1)",
    },
    FeatureSpec {
        id: FeatureId::Price,
        suffix: "PRICE",
        label: "Price Action",
        weight_label: "Price Action Weight",
        normalized_var: "rangeNormalizedMomentum",
        formula: "priceMomentum = ta.roc(close, math.max(2, math.round(lookback * 0.25)))\n\
                  rangeNormalizedMomentum = math.tanh(priceMomentum / 100)",
    },
];

pub fn feature_spec(id: FeatureId) -> &'static FeatureSpec {
    match FEATURE_SPECS.iter().find(|spec| spec.id == id) {
        Some(spec) => spec,
        None => unreachable!("FEATURE_SPECS covers every FeatureId"),
    }
}

// ── Markers ──

/// Marker size → Pine `size.*` token.
///
/// Medium maps to `size.large`, not `size.normal`: the designer has always
/// rendered medium markers at the platform's large size and deployed scripts
/// rely on it.
pub static MARKER_SIZE_TOKENS: [(MarkerSize, &str); 3] = [
    (MarkerSize::Small, "size.small"),
    (MarkerSize::Medium, "size.large"),
    (MarkerSize::Large, "size.huge"),
];

pub fn marker_size_token(size: MarkerSize) -> &'static str {
    match MARKER_SIZE_TOKENS.iter().find(|(s, _)| *s == size) {
        Some(&(_, token)) => token,
        None => unreachable!("MARKER_SIZE_TOKENS covers every MarkerSize"),
    }
}

// ── Models ──

/// Model → Pine expression mapping `linearComponent` into (0, 1).
pub static MODEL_PROBABILITY_EXPRS: [(ModelType, &str); 2] = [
    (
        ModelType::LogisticRegression,
        "1.0 / (1.0 + math.exp(-linearComponent))",
    ),
    (
        ModelType::SvmLinearKernel,
        "0.5 + 0.5 * math.tanh(linearComponent)",
    ),
];

pub fn probability_expr(model: ModelType) -> &'static str {
    match MODEL_PROBABILITY_EXPRS.iter().find(|(m, _)| *m == model) {
        Some(&(_, expr)) => expr,
        None => unreachable!("MODEL_PROBABILITY_EXPRS covers every ModelType"),
    }
}
