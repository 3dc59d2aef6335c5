use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::utils::format::fixed2;

// ── Bounds ──
//
// Declared ranges for each user-facing parameter. The generator embeds them in
// the `input.*` declarations; validation checks against the same values.

pub const LOOKBACK_MIN: u32 = 50;
pub const LOOKBACK_MAX: u32 = 200;
pub const BUY_THRESHOLD_MIN: f64 = 0.5;
pub const BUY_THRESHOLD_MAX: f64 = 0.9;
pub const SELL_THRESHOLD_MIN: f64 = 0.1;
pub const SELL_THRESHOLD_MAX: f64 = 0.5;
pub const WEIGHT_MIN: f64 = -5.0;
pub const WEIGHT_MAX: f64 = 5.0;
pub const BIAS_MIN: f64 = -10.0;
pub const BIAS_MAX: f64 = 10.0;

// ── Features ──

/// Engineered signals the model can combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureId {
    Rsi,
    Macd,
    Volume,
    Price,
}

impl FeatureId {
    /// All features, in emission order.
    pub const ALL: [FeatureId; 4] = [
        FeatureId::Rsi,
        FeatureId::Macd,
        FeatureId::Volume,
        FeatureId::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureId::Rsi => "rsi",
            FeatureId::Macd => "macd",
            FeatureId::Volume => "volume",
            FeatureId::Price => "price",
        }
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rsi" => Ok(FeatureId::Rsi),
            "macd" => Ok(FeatureId::Macd),
            "volume" => Ok(FeatureId::Volume),
            "price" => Ok(FeatureId::Price),
            _ => Err(format!("Unknown feature: {} (expected rsi, macd, volume or price)", s)),
        }
    }
}

/// One value per feature. Every `FeatureId` has exactly one slot, so a
/// `PerFeature` can never be missing a key or carry an extra one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerFeature<T> {
    pub rsi: T,
    pub macd: T,
    pub volume: T,
    pub price: T,
}

impl<T> PerFeature<T> {
    pub fn get(&self, id: FeatureId) -> &T {
        match id {
            FeatureId::Rsi => &self.rsi,
            FeatureId::Macd => &self.macd,
            FeatureId::Volume => &self.volume,
            FeatureId::Price => &self.price,
        }
    }

    pub fn get_mut(&mut self, id: FeatureId) -> &mut T {
        match id {
            FeatureId::Rsi => &mut self.rsi,
            FeatureId::Macd => &mut self.macd,
            FeatureId::Volume => &mut self.volume,
            FeatureId::Price => &mut self.price,
        }
    }

    /// Iterate `(id, value)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &T)> + '_ {
        FeatureId::ALL.iter().map(move |&id| (id, self.get(id)))
    }
}

impl<T> Index<FeatureId> for PerFeature<T> {
    type Output = T;

    fn index(&self, id: FeatureId) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<FeatureId> for PerFeature<T> {
    fn index_mut(&mut self, id: FeatureId) -> &mut T {
        self.get_mut(id)
    }
}

// ── Model ──

/// Nonlinearity applied to the linear score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[serde(alias = "Logistic Regression")]
    LogisticRegression,
    #[serde(alias = "SVM (Linear Kernel)")]
    SvmLinearKernel,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::LogisticRegression, ModelType::SvmLinearKernel];

    /// Option string shown in the script's settings dialog.
    pub fn pine_name(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression => "Logistic Regression",
            ModelType::SvmLinearKernel => "SVM (Linear Kernel)",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pine_name())
    }
}

impl std::str::FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logistic" | "logistic_regression" | "logistic regression" => {
                Ok(ModelType::LogisticRegression)
            }
            "svm" | "svm_linear_kernel" | "svm (linear kernel)" => Ok(ModelType::SvmLinearKernel),
            _ => Err(format!("Unknown model: {} (expected logistic or svm)", s)),
        }
    }
}

// ── Visuals ──

/// Signal marker size as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSize {
    #[serde(alias = "Small")]
    Small,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Large")]
    Large,
}

impl MarkerSize {
    pub const ALL: [MarkerSize; 3] = [MarkerSize::Small, MarkerSize::Medium, MarkerSize::Large];

    pub fn label(&self) -> &'static str {
        match self {
            MarkerSize::Small => "Small",
            MarkerSize::Medium => "Medium",
            MarkerSize::Large => "Large",
        }
    }
}

impl std::fmt::Display for MarkerSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for MarkerSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(MarkerSize::Small),
            "medium" => Ok(MarkerSize::Medium),
            "large" => Ok(MarkerSize::Large),
            _ => Err(format!("Unknown marker size: {} (expected small, medium or large)", s)),
        }
    }
}

// ── Indicator configuration ──

/// Everything the generator needs to emit a script.
///
/// Fields missing from a JSON document fall back to [`IndicatorConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorConfig {
    /// Window length used by the volume, MACD and momentum features.
    pub lookback: u32,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Which features contribute to the score.
    pub features: PerFeature<bool>,
    /// Multiplier applied to each enabled feature's normalized value.
    pub weights: PerFeature<f64>,
    /// Additive constant in the linear score.
    pub bias: f64,
    pub model: ModelType,
    pub marker_size: MarkerSize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            lookback: 100,
            buy_threshold: 0.70,
            sell_threshold: 0.30,
            features: PerFeature {
                rsi: true,
                macd: true,
                volume: false,
                price: true,
            },
            weights: PerFeature {
                rsi: 0.65,
                macd: 0.45,
                volume: 0.30,
                price: 0.35,
            },
            bias: 0.10,
            model: ModelType::LogisticRegression,
            marker_size: MarkerSize::Medium,
        }
    }
}

impl IndicatorConfig {
    /// Key built from exactly the values the generator prints, with floats at
    /// the same two-decimal precision. Equal keys produce identical scripts.
    pub fn cache_key(&self) -> String {
        let mut key = format!(
            "lb{}_bt{}_st{}_b{}_{:?}_{:?}",
            self.lookback,
            fixed2(self.buy_threshold),
            fixed2(self.sell_threshold),
            fixed2(self.bias),
            self.model,
            self.marker_size,
        );
        for (id, enabled) in self.features.iter() {
            key.push_str(&format!(
                "_{}{}w{}",
                id.as_str(),
                u8::from(*enabled),
                fixed2(self.weights[id])
            ));
        }
        key
    }
}
