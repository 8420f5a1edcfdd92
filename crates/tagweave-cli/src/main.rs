#![deny(unsafe_code)]

//! tagweave CLI: inspect tag resolution over a program manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tagweave_config::EngineConfig;
use tagweave_core::engine::native_predicate;
use tagweave_core::{
    Element, FactoryError, Manifest, MetadataEngine, ProgramModel, TagTypeId, TypeName,
};

/// tagweave: meta-tag resolution for dependency-injection hosts.
#[derive(Parser)]
#[command(name = "tagweave", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "tagweave.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a tag type on an element.
    Resolve {
        /// Program manifest (TOML).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Element: `app.Widget`, `app.Widget::create`, or `@app.Listen`.
        #[arg(short, long)]
        element: Element,

        /// Tag type to resolve.
        #[arg(short, long)]
        tag: String,

        /// Print the resolved tag as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the factory method of a type.
    Factory {
        /// Program manifest (TOML).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Type whose factory method to select.
        #[arg(short = 't', long = "type")]
        ty: String,
    },

    /// Check factory declarations of every type in a manifest.
    Check {
        /// Program manifest (TOML).
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config).await?;

    // -v overrides the configured level
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !from_file {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Resolve {
            manifest,
            element,
            tag,
            json,
        } => cmd_resolve(&config, &manifest, &element, &tag, json).await?,
        Commands::Factory { manifest, ty } => cmd_factory(&config, &manifest, &ty).await?,
        Commands::Check { manifest } => cmd_check(&config, &manifest).await?,
        Commands::Config { show } => cmd_config(&config, &cli.config, show)?,
    }

    Ok(())
}

async fn cmd_resolve(
    config: &EngineConfig,
    manifest: &Path,
    element: &Element,
    tag: &str,
    json: bool,
) -> Result<()> {
    let engine = open_engine(config, manifest).await?;
    let tag_type = TagTypeId::new(tag);
    let found = engine.resolve(element, &tag_type);

    if json {
        println!("{}", serde_json::to_string_pretty(&found.as_deref())?);
        return Ok(());
    }
    match found {
        Some(tag) => println!("{} {}", tag.tag_type, serde_json::to_string(&tag.attrs)?),
        None => println!("{tag_type} does not apply to {element}"),
    }
    Ok(())
}

async fn cmd_factory(config: &EngineConfig, manifest: &Path, ty: &str) -> Result<()> {
    let engine = open_engine(config, manifest).await?;
    let ty = TypeName::new(ty);
    match engine.find_factory_method(&ty)? {
        Some(method) => match &method.returns {
            Some(returns) => println!("{} -> {returns}", method.method),
            None => println!("{}", method.method),
        },
        None => println!("{ty} has no factory method"),
    }
    Ok(())
}

async fn cmd_check(config: &EngineConfig, manifest: &Path) -> Result<()> {
    let engine = open_engine(config, manifest).await?;
    let violations = factory_violations(&engine);
    for violation in &violations {
        println!("{violation}");
    }
    if !violations.is_empty() {
        anyhow::bail!("{} factory declaration(s) are invalid", violations.len());
    }
    println!("Factory declarations in '{}' are valid.", manifest.display());
    Ok(())
}

fn cmd_config(config: &EngineConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Run factory selection over every declared type, collecting failures.
fn factory_violations(engine: &MetadataEngine<ProgramModel>) -> Vec<FactoryError> {
    engine
        .model()
        .type_names()
        .iter()
        .filter_map(|ty| match engine.find_factory_method(ty) {
            Ok(_) => None,
            Err(err) => {
                warn!(%ty, "invalid factory declaration");
                Some(err)
            }
        })
        .collect()
}

async fn open_engine(
    config: &EngineConfig,
    manifest: &Path,
) -> Result<MetadataEngine<ProgramModel>> {
    let model = Manifest::load(manifest)
        .await
        .with_context(|| format!("loading manifest '{}'", manifest.display()))?
        .into_model(native_predicate(config))?;
    info!(
        manifest = %manifest.display(),
        types = model.type_names().len(),
        "Program model loaded"
    );
    Ok(MetadataEngine::from_config(model, config))
}

async fn load_config(path: &Path) -> Result<(EngineConfig, bool)> {
    if path.exists() {
        let config = EngineConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok((config, true))
    } else {
        Ok((EngineConfig::default(), false))
    }
}
