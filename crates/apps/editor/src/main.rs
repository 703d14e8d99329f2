//! Crossworld UI script editor
//!
//! Runs Lua UI scripts and node catalogues from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Print the UI tree a script builds
//! editor run panels/inventory.lua
//!
//! # Re-run on every save
//! editor --config config/scripting.kdl watch panels/inventory.lua
//!
//! # Evaluate a snippet
//! editor eval "return utils.format('{1}!', 'hi')"
//!
//! # Catalogues
//! editor components
//! editor nodes --category flow
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use editor::RunOutput;
use logic::{NodeCategory, NodeRegistry};
use scripting::{ScriptFile, UiRuntime};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "editor")]
#[command(about = "Run and preview Crossworld UI scripts", long_about = None)]
struct Cli {
    /// KDL config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script and print its UI tree as JSON
    Run {
        /// Lua script file
        file: PathBuf,
    },

    /// Re-run a script whenever it changes
    Watch {
        /// Lua script file
        file: PathBuf,
    },

    /// Evaluate Lua code and print the returned value
    Eval {
        /// Lua source
        code: String,
    },

    /// List UI component tags
    Components,

    /// List node types
    Nodes {
        /// Only this category: event, action, condition, data, flow, custom
        #[arg(long)]
        category: Option<NodeCategory>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = editor::load_config(cli.config.as_deref())?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { file } => {
            let runtime = UiRuntime::with_config(config)?;
            let script = ScriptFile::load(file)?;
            match editor::run_script(&runtime, &script)? {
                RunOutput::Failed(diagnostic) => return Err(diagnostic.into()),
                output => println!("{}", output),
            }
        }
        Commands::Watch { file } => {
            let runtime = UiRuntime::with_config(config)?;
            editor::watch(&file, &runtime, |output| match output {
                RunOutput::Failed(diagnostic) => eprintln!("{}", diagnostic),
                output => println!("{}", output),
            })?;
        }
        Commands::Eval { code } => {
            let runtime = UiRuntime::with_config(config)?;
            println!("{}", editor::eval(&runtime, &code)?);
        }
        Commands::Components => {
            for line in editor::component_listing() {
                println!("{}", line);
            }
        }
        Commands::Nodes { category } => {
            let registry = NodeRegistry::new();
            for line in editor::node_listing(&registry, category) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
