use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use signal_designer_lib::commands::{self, ConfigOverrides};
use signal_designer_lib::engine::cache::ScriptCache;
use signal_designer_lib::errors::AppError;
use signal_designer_lib::models::config::{FeatureId, IndicatorConfig, MarkerSize, ModelType};
use signal_designer_lib::utils::export;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIG: i32 = 1;
const EXIT_IO: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "signal-designer")]
#[command(about = "Generate non-repainting ML signal indicators as Pine Script", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the Pine Script indicator (stdout unless --output is given)
    Generate {
        #[command(flatten)]
        settings: Settings,

        /// File or directory to write the script to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print or save the default configuration as JSON
    Defaults {
        /// File to write the configuration to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate one script per configuration file into a directory
    Batch {
        /// JSON configuration files; each script is named after its file
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Directory to write the scripts to
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Check a configuration without generating
    Validate {
        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(Args, Debug)]
struct Settings {
    /// JSON configuration file (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lookback period in bars (50-200)
    #[arg(long)]
    lookback: Option<u32>,

    /// Buy threshold (0.5-0.9)
    #[arg(long)]
    buy_threshold: Option<f64>,

    /// Sell threshold (0.1-0.5)
    #[arg(long)]
    sell_threshold: Option<f64>,

    /// Model bias (-10 to 10)
    #[arg(long, allow_hyphen_values = true)]
    bias: Option<f64>,

    /// Model type: logistic or svm
    #[arg(long)]
    model: Option<ModelType>,

    /// Marker size: small, medium or large
    #[arg(long)]
    marker_size: Option<MarkerSize>,

    /// Enable a feature (rsi, macd, volume, price); repeatable
    #[arg(long)]
    enable: Vec<FeatureId>,

    /// Disable a feature; repeatable
    #[arg(long)]
    disable: Vec<FeatureId>,

    /// Feature weight as FEATURE=WEIGHT, e.g. rsi=0.8; repeatable
    #[arg(long, value_parser = commands::parse_weight_override)]
    weight: Vec<(FeatureId, f64)>,
}

impl Settings {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            lookback: self.lookback,
            buy_threshold: self.buy_threshold,
            sell_threshold: self.sell_threshold,
            bias: self.bias,
            model: self.model,
            marker_size: self.marker_size,
            enable: self.enable.clone(),
            disable: self.disable.clone(),
            weights: self.weight.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    signal_designer_lib::init_tracing(cli.verbose);

    let code = match execute(cli.command) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("{}", e);
            if e.is_config_error() {
                EXIT_CONFIG
            } else {
                EXIT_IO
            }
        }
    };
    std::process::exit(code);
}

fn execute(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Generate { settings, output } => {
            let config = commands::build_config(settings.config.as_deref(), &settings.overrides())?;
            match output {
                Some(path) => {
                    commands::export_script(&config, &path)?;
                }
                None => {
                    let code = commands::generate_script(&config, None)?;
                    export::write_stream(&mut std::io::stdout().lock(), &code)?;
                }
            }
        }
        Commands::Batch { configs, output_dir } => {
            let cache = ScriptCache::new();
            commands::export_batch(&configs, &output_dir, &cache)?;
        }
        Commands::Defaults { output } => match output {
            Some(path) => {
                export::write_config_json(&IndicatorConfig::default(), &path)?;
                info!("Default configuration written to {}", path.display());
            }
            None => {
                let mut json = commands::default_config_json()?;
                json.push('\n');
                export::write_stream(&mut std::io::stdout().lock(), &json)?;
            }
        },
        Commands::Validate { settings } => {
            let config = commands::build_config(settings.config.as_deref(), &settings.overrides())?;
            for warning in commands::check_config(&config)? {
                warn!("{}", warning);
            }
            info!("Configuration is valid");
        }
    }
    Ok(())
}
