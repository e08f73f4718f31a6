//! `fleetctl`: the operational entry point, config bootstrapper, and
//! logging initializer for the fleet data plane, playing the same role
//! `ferrexctl` plays for `ferrex-server` — it is explicitly not the
//! interactive TUI (that renderer/event-loop pair is an out-of-scope
//! collaborator); it wires `fleet-config` → `fleet-core::FleetClient`
//! against an in-memory demo cluster client for smoke-testing
//! `get`/`watch`/`delete`/`logs`.

mod cli;
mod demo;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fleet_contracts::{ClusterClient, FleetClientApi, LogOptions};
use fleet_core::{ClientFactory, FleetClient, FleetClientConfig, ReconnectBackoff};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetctl=info,fleet_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn client_config(cfg: &fleet_config::Configuration) -> FleetClientConfig {
    FleetClientConfig {
        cache_size: cfg.cache_size,
        cache_ttl: cfg.cache_ttl,
        parallel_fetch: cfg.parallel_fetch,
        health_check_interval: cfg.health_check_interval,
        context_timeout: cfg.context_timeout,
        max_connections: cfg.max_connections,
        watch_listener_buffer: cfg.watch_listener_buffer,
        batch_size: cfg.batch_size,
        batch_timeout: cfg.batch_timeout,
        reconnect: ReconnectBackoff {
            base: cfg.reconnect.base,
            cap: cfg.reconnect.cap,
            factor: cfg.reconnect.factor,
            max_attempts: cfg.reconnect.max_attempts,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let (config, metadata) =
        fleet_config::load(cli.config.as_deref()).context("loading fleet-view configuration")?;
    info!(
        file_loaded = metadata.file_loaded,
        env_overrides = metadata.env_overrides_applied,
        "configuration loaded"
    );

    if matches!(cli.command, Command::Config) {
        print_config(&config, &metadata);
        return Ok(());
    }

    let factory_contexts = cli.contexts.clone();
    let factory: ClientFactory = Arc::new(move |ctx: &str| {
        if !factory_contexts.iter().any(|c| c == ctx) {
            warn!(context = ctx, "context not in configured fan-out set");
        }
        Ok(demo::DemoClusterClient::new(ctx) as Arc<dyn ClusterClient>)
    });

    let fleet = Arc::new(FleetClient::new(
        cli.contexts.clone(),
        factory,
        client_config(&config),
    ));
    fleet.start();

    let result = run_command(&fleet, cli.command).await;

    fleet.close().await;
    result
}

fn print_config(cfg: &fleet_config::Configuration, meta: &fleet_config::ConfigMetadata) {
    println!("cache_size             = {}", cfg.cache_size);
    println!("cache_ttl              = {:?}", cfg.cache_ttl);
    println!("parallel_fetch         = {}", cfg.parallel_fetch);
    println!("health_check_interval  = {:?}", cfg.health_check_interval);
    println!("context_timeout        = {:?}", cfg.context_timeout);
    println!("max_connections        = {}", cfg.max_connections);
    println!("watch_listener_buffer  = {}", cfg.watch_listener_buffer);
    println!("batch_size             = {}", cfg.batch_size);
    println!("batch_timeout          = {:?}", cfg.batch_timeout);
    println!(
        "reconnect              = base={:?} cap={:?} factor={} max_attempts={}",
        cfg.reconnect.base, cfg.reconnect.cap, cfg.reconnect.factor, cfg.reconnect.max_attempts
    );
    println!();
    println!(
        "loaded from: {}{}",
        meta.file_path.as_deref().unwrap_or("(no file supplied)"),
        if meta.file_loaded { "" } else { " (not found, defaults used)" }
    );
    println!("env overrides applied: {}", meta.env_overrides_applied);
}

async fn run_command(fleet: &Arc<FleetClient>, command: Command) -> Result<()> {
    match command {
        Command::Config => unreachable!("handled before fleet client construction"),
        Command::Get {
            kind,
            namespace,
            show_namespace,
        } => {
            fleet.set_show_namespace(show_namespace);
            let aggregated = fleet
                .list_kind_across_contexts(kind, &namespace)
                .await
                .context("listing resources across contexts")?;
            for err in &aggregated.partial_errors {
                warn!(context = %err.context, transient = err.transient, "{}", err.error);
            }
            let headers = fleet_core::TransformerRegistry::new()
                .get(kind)
                .headers(show_namespace, fleet.contexts().len() > 1);
            let rows: Vec<Vec<String>> = aggregated.rows.into_iter().map(|r| r.cells).collect();
            print!("{}", render::render_table(&headers, &rows));
            if !aggregated.partial_errors.is_empty() {
                eprintln!(
                    "\n{} context(s) failed; showing partial results",
                    aggregated.partial_errors.len()
                );
            }
            Ok(())
        }
        Command::Watch { kind, namespace } => {
            let mut rx = fleet
                .subscribe_kind(kind, &namespace)
                .await
                .context("subscribing to watch events")?;
            println!("watching {kind} in {namespace} (ctrl-c to stop)...");
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => {
                        break;
                    }
                    event = rx.recv() => {
                        match event {
                            Some(event) => {
                                let name = event
                                    .object
                                    .as_ref()
                                    .map(|o| o.metadata.name.clone())
                                    .unwrap_or_else(|| "?".to_string());
                                println!(
                                    "[{}] {:?} {}/{}",
                                    event.timestamp.format("%H:%M:%S"),
                                    event.change_kind,
                                    event.namespace,
                                    name
                                );
                            }
                            None => break,
                        }
                    }
                }
            }
            Ok(())
        }
        Command::Delete {
            kind,
            name,
            namespace,
            context,
        } => {
            let context = context.unwrap_or_else(|| {
                fleet.contexts().into_iter().next().unwrap_or_default()
            });
            fleet
                .delete(&context, kind, &namespace, &name)
                .await
                .with_context(|| format!("deleting {namespace}/{name} in {context}"))?;
            println!("deleted {namespace}/{name} ({kind}) in {context}");
            Ok(())
        }
        Command::Logs {
            pod,
            namespace,
            context,
            tail_lines,
            follow,
        } => {
            let context = context.unwrap_or_else(|| {
                fleet.contexts().into_iter().next().unwrap_or_default()
            });
            let options = LogOptions {
                follow,
                tail_lines,
                previous: false,
                since_time: None,
                timestamps: true,
                container: None,
            };
            let mut stream = fleet
                .logs(&context, &namespace, &pod, options)
                .await
                .with_context(|| format!("streaming logs for {namespace}/{pod}"))?;
            while let Some(chunk) = stream.next().await {
                let bytes = chunk.context("reading log chunk")?;
                print!("{}", String::from_utf8_lossy(&bytes));
            }
            Ok(())
        }
        Command::CacheStats { kind, namespace } => {
            // Touch the kind once so the metrics snapshot reflects this
            // invocation's own hit/miss, the same way `ferrexctl`'s
            // `stack up --profile` first materializes what it reports on.
            let _ = fleet.list_kind_across_contexts(kind, &namespace).await;
            println!("{}", fleet.cache_metrics());
            Ok(())
        }
    }
}
