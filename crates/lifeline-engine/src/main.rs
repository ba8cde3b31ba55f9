//! Tick driver for the Lifeline story engine.
//!
//! Wires configuration, the chosen generator, the state store, and the
//! comment inbox together, then advances the story on a randomized
//! schedule until it completes or the process is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `LIFELINE_CONFIG` or `lifeline-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the generator selected by `generator.mode`
//! 4. Build the orchestrator over `store.data_dir`
//! 5. Run the tick loop until completion, the tick limit, or Ctrl-C

mod driver;
mod error;
mod generator;

use std::path::{Path, PathBuf};

use lifeline_core::config::{EngineConfig, GeneratorMode, LoggingConfig};
use lifeline_core::generator::{StoryGenerator, TemplateGenerator};
use lifeline_core::orchestrator::NarrativeOrchestrator;
use lifeline_llm::{LlmConfig, LlmStoryGenerator};
use lifeline_store::CommentInbox;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::driver::Driver;
use crate::error::DriverError;
use crate::generator::ConfiguredGenerator;

/// Config file used when `LIFELINE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "lifeline-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if initialization fails or a tick hits a persistence
/// or invariant error.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_logging(&config.logging);

    info!(
        data_dir = %config.store.data_dir.display(),
        mode = ?config.generator.mode,
        posts_per_year = config.pacing.posts_per_year,
        start_age = config.pacing.start_age,
        end_age = config.pacing.end_age,
        "lifeline-engine starting"
    );

    let generator = build_generator(&config)?;
    info!(generator = generator.name(), "generator ready");

    let inbox = CommentInbox::new(&config.store.data_dir, &config.store.inbox_file);
    let driver_config = config.driver.clone();
    let orchestrator = NarrativeOrchestrator::new(config, generator)?;
    let mut driver = Driver::new(orchestrator, inbox, driver_config);

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl-C; running until completion");
            std::future::pending::<()>().await;
        }
    };
    let reason = driver.run(shutdown).await?;
    info!(?reason, status = ?driver.orchestrator().status(), "lifeline-engine stopped");

    Ok(())
}

/// Load the engine configuration, falling back to defaults when no file
/// exists at the default path.
fn load_config() -> Result<EngineConfig, DriverError> {
    let (path, required) = match std::env::var_os("LIFELINE_CONFIG") {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    if required || path.exists() {
        return Ok(EngineConfig::from_file(&path)?);
    }
    let mut config = EngineConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_generator(config: &EngineConfig) -> Result<ConfiguredGenerator, DriverError> {
    match config.generator.mode {
        GeneratorMode::Template => Ok(ConfiguredGenerator::Template(TemplateGenerator::new())),
        GeneratorMode::Llm => {
            let llm = LlmConfig::from_env()?;
            info!(
                backend = ?llm.primary.backend_type,
                model = llm.primary.model,
                fallback = llm.fallback.as_ref().map(|f| f.model.as_str()),
                templates_dir = %templates_dir(config).display(),
                "live generator configured"
            );
            let generator = LlmStoryGenerator::new(&llm, templates_dir(config))?;
            Ok(ConfiguredGenerator::Llm(Box::new(generator)))
        }
    }
}

fn templates_dir(config: &EngineConfig) -> &Path {
    &config.generator.templates_dir
}
