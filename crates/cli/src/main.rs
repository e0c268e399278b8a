mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::format::strip_views;
use runtime::{Assistant, ModelBackend, Phase, ToolRegistry, TurnOutcome};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "ember.toml";

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "An on-device chat assistant with tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file (default: ./ember.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List available tools and whether they are enabled
    Tools,
    /// List models known to the backend
    Models,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Tools) => cmd_tools(&config),
        Some(Commands::Models) => cmd_models(&config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if !path.exists() => Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        }),
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn build_registry(config: &Config, client: reqwest::Client) -> ToolRegistry {
    ToolRegistry::new(tools::builtin_tools(client)).with_selected(&config.tools.selected)
}

async fn cmd_chat(config: &Config) -> Result<()> {
    println!("ember v{}", env!("CARGO_PKG_VERSION"));

    let client = reqwest::Client::new();
    let backend = config.backend(client.clone())?;
    println!("Backend: {backend}");

    let registry = Arc::new(build_registry(config, client));
    let assistant = Assistant::new(Arc::new(backend), registry, config.assistant());
    println!("Model: {}", assistant.model());
    println!("Tools: {}", assistant.registry().selected().join(", "));
    println!("Type /help for commands, 'quit' or Ctrl+D to exit. Ctrl+C stops a reply.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if let Some(command) = input.strip_prefix('/') {
            run_command(&assistant, command);
            continue;
        }

        run_turn(&assistant, input).await?;
    }

    println!("\nBye.");
    Ok(())
}

/// Stream one turn to stdout. Ctrl-C cancels it.
async fn run_turn(assistant: &Assistant, input: &str) -> Result<()> {
    let mut stdout = io::stdout();
    let mut updates = assistant.subscribe();
    let _ = updates.borrow_and_update();

    let turn = assistant.generate(input);
    tokio::pin!(turn);

    let mut streamed = String::new();
    let mut loading_shown = false;
    println!();
    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            _ = tokio::signal::ctrl_c() => assistant.cancel(),
            Ok(()) = updates.changed() => {
                let snapshot = updates.borrow_and_update().clone();
                if let Some(progress) = snapshot.loading_progress.filter(|_| snapshot.is_loading) {
                    print!("\r[{} {:>3.0}%]", progress.label, progress.fraction * 100.0);
                    loading_shown = true;
                } else if snapshot.phase == Phase::Streaming {
                    if loading_shown {
                        println!();
                        loading_shown = false;
                    }
                    if let Some(delta) = snapshot.output.strip_prefix(streamed.as_str()) {
                        print!("{delta}");
                        streamed.push_str(delta);
                    }
                }
                stdout.flush()?;
            }
        }
    };

    match outcome {
        TurnOutcome::Completed { output } => {
            let output = strip_views(&output);
            if output.trim() != streamed.trim() {
                println!("\n\n{output}");
            }
            let stat = assistant.snapshot().stat;
            if stat.is_empty() {
                println!("\n");
            } else {
                println!("\n[{stat}]\n");
            }
        }
        TurnOutcome::Failed { error } => eprintln!("\nFailed: {error}\n"),
        TurnOutcome::Cancelled => println!("\n[cancelled]\n"),
        TurnOutcome::Rejected => eprintln!("A reply is already in progress.\n"),
    }
    Ok(())
}

fn run_command(assistant: &Assistant, command: &str) {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let registry = assistant.registry();

    match (name, arg) {
        ("help", _) => {
            println!("/tools            list tools");
            println!("/add <tool>       enable a tool");
            println!("/remove <tool>    disable a tool");
            println!("/model [id]       show or switch the model\n");
        }
        ("tools", _) => print_tools(registry),
        ("add", tool) if !tool.is_empty() => match registry.add_tool(tool) {
            Ok(true) => println!("Enabled {tool}.\n"),
            Ok(false) => println!("{tool} is already enabled.\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        },
        ("remove", tool) if !tool.is_empty() => {
            if registry.remove_tool(tool) {
                println!("Disabled {tool}.\n");
            } else {
                println!("{tool} is not enabled.\n");
            }
        }
        ("model", "") => println!("Model: {}\n", assistant.model()),
        ("model", id) => match assistant.select_model(id) {
            Ok(()) => println!("Model set to {id}. It will load on the next message.\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        },
        _ => eprintln!("Unknown command: /{command}. Type /help.\n"),
    }
}

fn print_tools(registry: &ToolRegistry) {
    for spec in registry.available() {
        let mark = if registry.is_selected(&spec.name) { "x" } else { " " };
        println!("[{mark}] {:<20} {}", spec.name, spec.description);
    }
    println!();
}

fn cmd_tools(config: &Config) -> Result<()> {
    let registry = build_registry(config, reqwest::Client::new());
    print_tools(&registry);
    Ok(())
}

async fn cmd_models(config: &Config) -> Result<()> {
    let backend = config.backend(reqwest::Client::new())?;
    let models = backend.list_models().await?;

    if models.is_empty() {
        println!("No models found. The default model is pulled on first use.");
        return Ok(());
    }

    let current = config.assistant().model;
    println!("{:<36}  {:>10}", "MODEL", "SIZE");
    println!("{}", "-".repeat(48));
    for model in models {
        let size = model
            .size_bytes
            .map(|b| format!("{:.1} GB", b as f64 / 1e9))
            .unwrap_or_default();
        let mark = if model.id == current { " *" } else { "" };
        println!("{:<36}  {size:>10}{mark}", model.id);
    }
    Ok(())
}
