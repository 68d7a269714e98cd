//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry console binary
//!
//! Reads the registry configuration, connects to the selected backend and
//! lists or mutates the registered service instances.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use service_registry::{
    init_registry, Registry, RegistryConfig, RegistryType, ServiceListing, REGISTRY_VERSION,
};

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Inspect and manage services registered in ZooKeeper, Consul or etcd")]
#[command(version = REGISTRY_VERSION)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Registry type (zookeeper, etcd, etcdv3, consul)
    #[arg(long, global = true)]
    registry_type: Option<String>,

    /// Registry address(es), comma separated
    #[arg(long, global = true)]
    registry_url: Option<String>,

    /// Base path of the service tree
    #[arg(long, global = true)]
    base_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered services
    List {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Mark a service instance active
    Activate {
        /// Service identifier as shown by `list`
        id: String,
    },

    /// Mark a service instance inactive
    Deactivate {
        /// Service identifier as shown by `list`
        id: String,
    },

    /// Replace the metadata of a service instance
    UpdateMetadata {
        /// Service identifier as shown by `list`
        id: String,

        /// New metadata in query-string form, e.g. `group=web&weight=10`
        metadata: String,
    },

    /// Check that the backend is reachable
    Check,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Validate the configuration without connecting
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Validate => {
                info!("Configuration is valid");
            }
        },
        command => {
            let registry = match init_registry(config).await {
                Ok(registry) => registry,
                Err(e) => {
                    error!("Failed to connect to registry: {}", e);
                    std::process::exit(1);
                }
            };
            run(&registry, command).await?;
        }
    }

    Ok(())
}

async fn run(registry: &Registry, command: Commands) -> Result<()> {
    match command {
        Commands::List { format } => {
            let listing = registry.scan_services().await;
            if !listing.is_complete() {
                warn!(
                    "Listing is partial: {} branches failed, {} leaves skipped",
                    listing.failed_branches.len(),
                    listing.skipped_leaves
                );
            }
            match format {
                OutputFormat::Table => print_table(&listing),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&listing.services)?)
                }
            }
        }
        Commands::Activate { id } => {
            registry
                .activate_by_id(&id)
                .await
                .with_context(|| format!("failed to activate {}", id))?;
            info!("Service activated");
        }
        Commands::Deactivate { id } => {
            registry
                .deactivate_by_id(&id)
                .await
                .with_context(|| format!("failed to deactivate {}", id))?;
            info!("Service deactivated");
        }
        Commands::UpdateMetadata { id, metadata } => {
            registry
                .update_metadata_by_id(&id, &metadata)
                .await
                .with_context(|| format!("failed to update metadata of {}", id))?;
            info!("Metadata updated");
        }
        Commands::Check => {
            if registry.health_check().await? {
                println!("{} backend is healthy", registry.kind());
            } else {
                println!("{} backend is unhealthy", registry.kind());
                std::process::exit(1);
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Load the configuration file when present, otherwise the environment, then apply flags
fn load_config(cli: &Cli) -> Result<RegistryConfig> {
    let mut config = if cli.config.exists() {
        let config = RegistryConfig::from_file(&cli.config)?;
        info!("Configuration loaded from: {}", cli.config.display());
        config
    } else {
        warn!(
            "Configuration file not found: {}. Using environment and defaults.",
            cli.config.display()
        );
        RegistryConfig::from_env()?
    };

    apply_overrides(&mut config, cli)?;
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut RegistryConfig, cli: &Cli) -> Result<()> {
    if let Some(registry_type) = &cli.registry_type {
        config.registry_type = registry_type.parse::<RegistryType>()?;
    }
    if let Some(registry_url) = &cli.registry_url {
        config.registry_url = registry_url.clone();
    }
    if let Some(base_path) = &cli.base_path {
        config.service_base_url = base_path.clone();
    }
    Ok(())
}

fn print_table(listing: &ServiceListing) {
    println!(
        "{:<24} {:<32} {:<10} {:<12} ID",
        "SERVICE", "ADDRESS", "STATE", "GROUP"
    );
    for service in &listing.services {
        println!(
            "{:<24} {:<32} {:<10} {:<12} {}",
            service.name,
            service.address,
            service.state,
            service.group.as_deref().unwrap_or("-"),
            service.id
        );
    }
    println!("{} services", listing.services.len());
}
