//! `appcenter` - inspect app secrets and settings, and drive a simulated SDK.
//!
//! ```text
//! appcenter secret "ios=AAA;android=BBB" --platform ios
//! appcenter check [settings.toml]
//! appcenter simulate [settings.toml]
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `info` filter), command
//! output to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use appcenter_analytics::Analytics;
use appcenter_config::{Settings, config_path};
use appcenter_core::{
    AppCenter, SecretResolution, ServiceDescriptor, ServiceRegistry, SimulatedBridge,
    resolve_secret,
};
use appcenter_types::{EventProperties, Platform, ServiceId, StartOptions};

#[derive(Parser)]
#[command(name = "appcenter")]
#[command(about = "Inspect App Center secrets and settings, and drive a simulated SDK")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the app secret for one platform
    Secret {
        /// Bare secret or `platform=secret;...` pairs
        secrets: String,
        /// Platform to resolve for; defaults to the build target
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Load and validate a settings file
    Check {
        /// Settings file; defaults to `$APPCENTER_CONFIG` or ~/.appcenter/config.toml
        path: Option<PathBuf>,
    },
    /// Start a simulated SDK from a settings file and track a sample event
    Simulate {
        /// Settings file; defaults to `$APPCENTER_CONFIG` or ~/.appcenter/config.toml
        path: Option<PathBuf>,
        /// Platform the simulated SDK reports
        #[arg(long)]
        platform: Option<Platform>,
        /// Name of the sample event
        #[arg(long, default_value = "appcenter_cli_sample")]
        event: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Secret { secrets, platform } => {
            secret(&secrets, platform.or(Platform::current()));
            Ok(())
        }
        Commands::Check { path } => check(path.as_deref()),
        Commands::Simulate {
            path,
            platform,
            event,
        } => simulate(path.as_deref(), platform.or(Platform::current()), &event).await,
    }
}

fn platform_name(platform: Option<Platform>) -> &'static str {
    platform.map_or("none", Platform::identifier)
}

fn secret(secrets: &str, platform: Option<Platform>) {
    let resolution = resolve_secret(platform, secrets);
    println!("platform: {}", platform_name(platform));
    println!("secret: {}", resolution.secret());
    match resolution.fallback() {
        Some(reason) => println!("source: unchanged ({})", reason.describe()),
        None => println!("source: platform assignment"),
    }
}

fn load_settings(path: Option<&Path>) -> Result<(PathBuf, Settings)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path().context("cannot locate a home directory for settings")?,
    };
    if !path.exists() {
        bail!("no settings file at {}", path.display());
    }
    let settings = Settings::load_from(&path)?;
    Ok((path, settings))
}

fn check(path: Option<&Path>) -> Result<()> {
    let (path, settings) = load_settings(path)?;
    let options = settings
        .resolve()
        .with_context(|| format!("settings at {} are not usable", path.display()))?;

    println!("settings: {}", path.display());
    println!("log_level: {}", options.log_level);
    println!("log_url: {}", options.log_url.as_deref().unwrap_or("(default)"));
    println!("user_id: {}", options.user_id.as_deref().unwrap_or("(none)"));
    let services: Vec<&str> = options.services.iter().map(|id| id.as_str()).collect();
    println!("services: {}", services.join(", "));

    for &platform in Platform::all() {
        let status = match resolve_secret(Some(platform), &options.app_secret) {
            SecretResolution::Resolved(secret) if secret.is_empty() => "empty".to_string(),
            SecretResolution::Resolved(_) => "[REDACTED]".to_string(),
            SecretResolution::Unchanged { reason, .. } => {
                format!("[REDACTED] ({})", reason.describe())
            }
        };
        println!("app_secret[{}]: {status}", platform.identifier());
    }
    Ok(())
}

/// Registry accepting every stock service; the simulated SDK starts any of them.
fn simulated_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    for &id in ServiceId::all() {
        registry.register(ServiceDescriptor::new(id));
    }
    appcenter_analytics::register(&mut registry);
    registry
}

async fn simulate(path: Option<&Path>, platform: Option<Platform>, event: &str) -> Result<()> {
    let (path, settings) = load_settings(path)?;
    let options: StartOptions = settings
        .resolve()
        .with_context(|| format!("settings at {} are not usable", path.display()))?;

    let bridge = Arc::new(SimulatedBridge::new().with_platform(platform));
    let app_center = AppCenter::new(bridge.clone());
    app_center.start_with_settings(&options, &simulated_registry())?;
    tracing::info!(
        platform = platform_name(platform),
        services = ?bridge.started_services(),
        "Simulated session started"
    );

    let analytics = Analytics::new(bridge.clone());
    let mut properties = EventProperties::new();
    properties.insert("source".to_string(), "appcenter-cli".to_string());
    analytics.track_event_with_properties(event, &properties);

    let enabled = app_center.is_enabled().await??;
    let install_id = app_center.install_id().await??;

    println!("platform: {}", platform_name(platform));
    println!("configured: {}", app_center.is_configured());
    println!("enabled: {enabled}");
    println!(
        "install_id: {}",
        install_id.map_or_else(|| "(none)".to_string(), |id| id.to_string())
    );
    println!("log_level: {}", app_center.log_level());
    println!("events tracked: {}", bridge.events().len());
    Ok(())
}
