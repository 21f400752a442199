use clap::{Parser, Subcommand};

pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "bountyd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DAO bounty lifecycle engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the reconciliation service
    Run {
        /// Path to config file (default: ~/.local/share/bountyd/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Path to write (default: ~/.local/share/bountyd/config.toml)
        #[arg(long)]
        path: Option<String>,

        /// Address of the deployed escrow program
        #[arg(long, default_value = "EscrowProg1111111111111111111111")]
        escrow_program_id: String,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::InitConfig {
            path,
            escrow_program_id,
        } => {
            let path = path
                .map(std::path::PathBuf::from)
                .unwrap_or_else(config::default_config_path);
            config::BountydConfig::create_default(&path, &escrow_program_id)?;
            println!("Created: {}", path.display());
            Ok(())
        }
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
