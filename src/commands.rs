use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::cache::ScriptCache;
use crate::engine::validation::{threshold_warnings, validate_config};
use crate::errors::AppError;
use crate::models::config::{FeatureId, IndicatorConfig, MarkerSize, ModelType};
use crate::utils::codegen::{generate_pinescript, generate_script_file, CodeFile};
use crate::utils::export;

// ── Configuration Commands ──

/// Field-by-field changes applied on top of a base configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub lookback: Option<u32>,
    pub buy_threshold: Option<f64>,
    pub sell_threshold: Option<f64>,
    pub bias: Option<f64>,
    pub model: Option<ModelType>,
    pub marker_size: Option<MarkerSize>,
    pub enable: Vec<FeatureId>,
    pub disable: Vec<FeatureId>,
    pub weights: Vec<(FeatureId, f64)>,
}

impl ConfigOverrides {
    /// Apply every override to `config`. A feature both enabled and disabled is rejected.
    pub fn apply(&self, config: &mut IndicatorConfig) -> Result<(), AppError> {
        if let Some(id) = self.enable.iter().find(|id| self.disable.contains(id)) {
            return Err(AppError::InvalidOverride {
                input: id.to_string(),
                message: "feature is both enabled and disabled".into(),
            });
        }

        if let Some(v) = self.lookback {
            config.lookback = v;
        }
        if let Some(v) = self.buy_threshold {
            config.buy_threshold = v;
        }
        if let Some(v) = self.sell_threshold {
            config.sell_threshold = v;
        }
        if let Some(v) = self.bias {
            config.bias = v;
        }
        if let Some(v) = self.model {
            config.model = v;
        }
        if let Some(v) = self.marker_size {
            config.marker_size = v;
        }
        for &id in &self.enable {
            config.features[id] = true;
        }
        for &id in &self.disable {
            config.features[id] = false;
        }
        for &(id, weight) in &self.weights {
            config.weights[id] = weight;
        }
        Ok(())
    }
}

/// Parse a `FEATURE=WEIGHT` override such as `rsi=0.8`.
pub fn parse_weight_override(input: &str) -> Result<(FeatureId, f64), AppError> {
    let invalid = |message: String| AppError::InvalidOverride {
        input: input.to_string(),
        message,
    };

    let (id, value) = input
        .split_once('=')
        .ok_or_else(|| invalid("expected FEATURE=WEIGHT".into()))?;
    let id: FeatureId = id.parse().map_err(invalid)?;
    let weight: f64 = value
        .trim()
        .parse()
        .map_err(|e| invalid(format!("bad weight: {}", e)))?;
    Ok((id, weight))
}

/// Build a configuration from defaults or a JSON file, then apply overrides.
pub fn build_config(
    base: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<IndicatorConfig, AppError> {
    let mut config = match base {
        Some(path) => {
            let config = export::load_config_json(path)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => IndicatorConfig::default(),
    };
    overrides.apply(&mut config)?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Validate a configuration, returning its non-fatal warnings.
pub fn check_config(config: &IndicatorConfig) -> Result<Vec<String>, AppError> {
    validate_config(config).map_err(|errors| AppError::InvalidConfig(errors.join("; ")))?;
    Ok(threshold_warnings(config))
}

/// Pretty JSON of the default configuration, as a starting point for editing.
pub fn default_config_json() -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(&IndicatorConfig::default())?)
}

// ── Generation Commands ──

/// Validate and generate the script text.
pub fn generate_script(
    config: &IndicatorConfig,
    cache: Option<&ScriptCache>,
) -> Result<String, AppError> {
    for warning in check_config(config)? {
        warn!("{}", warning);
    }

    let code = match cache {
        Some(cache) => cache.get_or_generate(config).to_string(),
        None => generate_pinescript(config),
    };

    info!(
        "Generated script: model={}, lookback={}, {} bytes",
        config.model,
        config.lookback,
        code.len()
    );
    Ok(code)
}

/// Validate, generate and write the script.
///
/// An existing directory receives the script under its standard file name;
/// any other path is written as given.
pub fn export_script(config: &IndicatorConfig, output: &Path) -> Result<PathBuf, AppError> {
    for warning in check_config(config)? {
        warn!("{}", warning);
    }

    let file = generate_script_file(config);
    let path = if output.is_dir() {
        export::write_script(&file, output)?
    } else {
        export::write_script_to(&file.code, output)?;
        output.to_path_buf()
    };

    info!("Script written to {}", path.display());
    Ok(path)
}

/// Generate one script per configuration file into `dir`, each named after
/// its configuration file (`trend.json` → `trend.pine`).
///
/// Generation goes through `cache`, so configurations that print the same
/// script are generated once.
pub fn export_batch(
    configs: &[PathBuf],
    dir: &Path,
    cache: &ScriptCache,
) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::with_capacity(configs.len());
    for path in configs {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::FileRead(format!("No file name in {}", path.display())))?;
        let config = build_config(Some(path), &ConfigOverrides::default())?;
        let file = CodeFile {
            filename: format!("{}.pine", stem),
            code: generate_script(&config, Some(cache))?,
        };
        written.push(export::write_script(&file, dir)?);
    }

    info!(
        "Batch wrote {} scripts ({} distinct) to {}",
        written.len(),
        cache.len(),
        dir.display()
    );
    Ok(written)
}
