pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod models;
pub mod scheduler;
pub mod services;

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, SearchCommands, UserCommands};
pub use config::Config;
use scheduler::Scheduler;
use services::{AlertCycle, CycleReport, StopFlag};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let port = config.observability.metrics_port;
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics listening on port {}", port);
    }

    let Some(command) = cli.command else {
        print_help();
        return Ok(());
    };

    match command {
        Commands::Daemon => run_daemon(config).await,

        Commands::Check => run_single_check(config).await,

        Commands::User { command } => match command {
            UserCommands::Add { email, name, plan } => {
                cli::cmd_user_add(&config, &email, &name, &plan).await
            }
            UserCommands::List => cli::cmd_user_list(&config).await,
            UserCommands::Remove { email } => cli::cmd_user_remove(&config, &email).await,
        },

        Commands::Search { command } => match command {
            SearchCommands::Add(args) => cli::cmd_search_add(&config, args).await,
            SearchCommands::List { email } => {
                cli::cmd_search_list(&config, email.as_deref()).await
            }
            SearchCommands::Remove { id, user } => {
                cli::cmd_search_remove(&config, id, &user).await
            }
        },

        Commands::Unsubscribe { email, search, all } => {
            cli::cmd_unsubscribe(&config, &email, search, all).await
        }

        Commands::History { search_id, limit } => {
            cli::cmd_history(&config, search_id, limit).await
        }

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_help() {
    println!("JobSeek - recurring job alerts by email");
    println!();
    println!("USAGE:");
    println!("  jobseek <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  user add <email> <name> [--plan p]   Register a user");
    println!("  user list                            List users");
    println!("  user remove <email>                  Remove a user and their searches");
    println!("  search add <email> <keyword> [...]   Save a search");
    println!("  search list [email]                  List saved searches");
    println!("  search remove <id> --user <email>    Remove a saved search");
    println!("  unsubscribe <email> --search <id>    Stop one alert");
    println!("  unsubscribe <email> --all            Stop every alert of a user");
    println!("  history <search_id> [n]              Show delivered postings");
    println!("  check                                Run one alert cycle now");
    println!("  daemon                               Run the scheduler until Ctrl+C");
    println!("  init                                 Create default config file");
    println!("  help                                 Show this help message");
}

async fn build_cycle(config: &Config) -> anyhow::Result<AlertCycle> {
    let store = db::Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    AlertCycle::from_config(store, config)
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "JobSeek v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let cycle = Arc::new(build_cycle(&config).await?);
    let scheduler = Arc::new(Scheduler::new(cycle, config.scheduler.clone()));

    let mut scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move { sched.start().await })
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    // start() only returns early when the scheduler is disabled or fails.
    let scheduler_exited = tokio::select! {
        signal = signal::ctrl_c() => {
            log_shutdown_signal(signal);
            false
        }
        joined = &mut scheduler_handle => {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e.context("Scheduler failed")),
                Err(e) => anyhow::bail!("Scheduler task failed: {e}"),
            }
            true
        }
    };

    if scheduler_exited {
        log_shutdown_signal(signal::ctrl_c().await);
    }

    scheduler.stop().await;

    if !scheduler_exited
        && tokio::time::timeout(Duration::from_secs(5), &mut scheduler_handle)
            .await
            .is_err()
    {
        warn!("Scheduler did not exit in time, aborting it");
        scheduler_handle.abort();
    }
    info!("Daemon stopped");

    Ok(())
}

fn log_shutdown_signal(signal: std::io::Result<()>) {
    match signal {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn run_single_check(config: Config) -> anyhow::Result<()> {
    info!("Running single alert cycle...");

    let cycle = build_cycle(&config).await?;
    let report = cycle.run_cycle(&StopFlag::new()).await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!("Alert cycle complete");
    println!("{:-<40}", "");
    println!("  Saved searches:   {}", report.searches);
    println!("  Not due:          {}", report.not_due);
    println!("  Search failed:    {}", report.search_failed);
    println!("  No results:       {}", report.no_results);
    println!("  All seen:         {}", report.all_seen);
    println!("  Delivered:        {}", report.delivered);
    println!("  Delivery failed:  {}", report.delivery_failed);
    println!("  Postings sent:    {}", report.postings_delivered);
    if report.stopped_early {
        println!("  (stopped early)");
    }
}
