use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use mcp_sync_core::paths::standardized;
use mcp_sync_core::{
    AuditEventStatus, AutoConfirm, Confirmer, EnabledState, McpSyncError, ProjectSelector,
    ProviderKind, ProviderOutcome, ProviderReport, SyncEngine, ToggleRequest,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcp-sync")]
#[command(about = "Keep MCP server configuration in sync across AI tools")]
struct Cli {
    /// Answer yes to every confirmation.
    #[arg(long, global = true)]
    yes: bool,
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty unified store.
    Init,
    List {
        #[arg(long)]
        json: bool,
    },
    Enable(ToggleArgs),
    Disable(ToggleArgs),
    Sync {
        #[arg(long, value_parser = parse_provider)]
        provider: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Import {
        #[arg(long, value_parser = parse_provider)]
        provider: String,
        #[arg(long)]
        json: bool,
    },
    Status {
        #[arg(long)]
        json: bool,
    },
    History {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Doctor,
}

#[derive(clap::Args, Debug)]
struct ToggleArgs {
    #[arg(long = "server", required = true, num_args = 1..)]
    servers: Vec<String>,
    #[arg(long, value_parser = parse_provider)]
    provider: Option<String>,
    #[arg(long = "project", num_args = 1.., conflicts_with = "global")]
    projects: Vec<String>,
    /// Every project the provider knows (the default).
    #[arg(long)]
    global: bool,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirmer)
    };
    let engine = SyncEngine::current(confirmer)?;
    tracing::debug!(store = %engine.store().path().display(), "engine ready");

    match cli.command {
        Commands::Init => {
            let path = engine.store().path().display();
            if engine.store().init()? {
                println!("created {path}");
            } else {
                println!("exists {path}");
            }
        }
        Commands::List { json } => {
            let registry = engine.load_registry()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&registry)?);
            } else {
                for (name, record) in &registry.servers {
                    let states = record
                        .meta
                        .enabled
                        .iter()
                        .map(|(provider, state)| format!("{provider}={}", describe_state(state)))
                        .collect::<Vec<_>>();
                    println!(
                        "{}\t{}\t{}",
                        name,
                        record.spec.transport_label(),
                        if states.is_empty() {
                            String::from("-")
                        } else {
                            states.join(" ")
                        }
                    );
                }
            }
        }
        Commands::Enable(args) => run_toggle(&engine, true, args)?,
        Commands::Disable(args) => run_toggle(&engine, false, args)?,
        Commands::Sync { provider, json } => {
            let report = engine.sync(provider.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_providers(&report.providers);
                for (provider, servers) in &report.installed {
                    println!("installed into {provider}: {}", servers.join(", "));
                }
                print_warnings(&report.warnings);
            }
        }
        Commands::Import { provider, json } => {
            let report = engine.import(&provider)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "imported={} conflicts={} from {}",
                    report.imported.len(),
                    report.conflicts.len(),
                    report.provider
                );
                for name in &report.imported {
                    println!("  + {name}");
                }
                print_warnings(&report.warnings);
            }
        }
        Commands::Status { json } => {
            let status = engine.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                for server in &status {
                    let providers = server
                        .providers
                        .iter()
                        .map(|item| {
                            let desired = item
                                .desired
                                .as_ref()
                                .map(describe_state)
                                .unwrap_or_else(|| String::from("unset"));
                            let installed = if item.installed { "installed" } else { "absent" };
                            let drift = if item.drifted { ",drifted" } else { "" };
                            format!("{}={desired}({installed}{drift})", item.provider)
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("{}\t{}\t{}", server.name, server.transport, providers);
                    print_warnings(&server.warnings);
                }
            }
        }
        Commands::History {
            limit,
            status,
            action,
            json,
        } => {
            let status = status
                .as_deref()
                .map(str::parse::<AuditEventStatus>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let audit = engine
                .audit()
                .ok_or_else(|| anyhow!("audit log is not configured"))?;
            let events = audit.list_events(limit, status, action.as_deref());
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                for event in events {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        event.occurred_at,
                        event.action,
                        event.status.as_str(),
                        event.providers.join(","),
                        event.summary
                    );
                }
            }
        }
        Commands::Doctor => {
            println!("home={}", engine.environment().home_directory.display());
            println!(
                "store={} exists={}",
                engine.store().path().display(),
                engine.store().exists()
            );
            for health in engine.doctor() {
                println!(
                    "{}\t{}\texists={}\tdisable={}\tprojects={}\tservers={}{}",
                    health.provider,
                    health.config_path,
                    health.config_exists,
                    health.supports_disabled_state,
                    health.projects,
                    health.servers,
                    health
                        .error
                        .map(|error| format!("\terror={error}"))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

fn run_toggle(engine: &SyncEngine, enabled: bool, args: ToggleArgs) -> Result<()> {
    let projects = if args.global || args.projects.is_empty() {
        ProjectSelector::Global
    } else {
        ProjectSelector::Projects(
            args.projects
                .iter()
                .map(|project| standardized(Path::new(project)).display().to_string())
                .collect(),
        )
    };

    let report = engine.toggle(&ToggleRequest {
        enabled,
        servers: args.servers,
        provider: args.provider,
        projects,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_providers(&report.providers);
        for name in &report.imported {
            println!("imported {name} into the unified store");
        }
        print_warnings(&report.warnings);
    }
    Ok(())
}

fn print_providers(providers: &[ProviderReport]) {
    for item in providers {
        let outcome = match &item.outcome {
            ProviderOutcome::Written(result) => result.as_str().to_string(),
            ProviderOutcome::Skipped(reason) => format!("skipped ({reason})"),
            ProviderOutcome::Failed(error) => format!("failed ({error})"),
        };
        if item.servers.is_empty() {
            println!("{}\t{}", item.provider, outcome);
        } else {
            println!("{}\t{}\t{}", item.provider, outcome, item.servers.join(","));
        }
    }
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn describe_state(state: &EnabledState) -> String {
    match state {
        EnabledState::Global(true) => String::from("on"),
        EnabledState::Global(false) => String::from("off"),
        EnabledState::PerProject(projects) => {
            let on = projects.values().filter(|value| **value).count();
            format!("{on}/{} projects", projects.len())
        }
    }
}

fn parse_provider(value: &str) -> Result<String, String> {
    value
        .parse::<ProviderKind>()
        .map(|kind| kind.as_str().to_string())
        .map_err(|error| error.to_string())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("MCP_SYNC_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// y/N on stderr; end of input declines.
struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool, McpSyncError> {
        let stdin = io::stdin();
        loop {
            eprint!("{prompt} (y/N) ");
            io::stderr()
                .flush()
                .map_err(|error| McpSyncError::Prompt(error.to_string()))?;

            let mut input = String::new();
            let read = stdin
                .lock()
                .read_line(&mut input)
                .map_err(|error| McpSyncError::Prompt(error.to_string()))?;
            if read == 0 {
                return Ok(false);
            }
            match input.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" | "" => return Ok(false),
                _ => eprintln!("Please enter 'y' for yes or 'n' for no."),
            }
        }
    }
}
