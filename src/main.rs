use clap::{Parser, Subcommand};
use knowledge_mcp::commands::{load_knowledge, serve_mcp, show_config, show_status};
use knowledge_mcp::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "knowledge-mcp")]
#[command(about = "Role-tagged knowledge search over an embedded corpus, served via MCP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and index a corpus directory of markdown files
    Load {
        /// Directory containing role-prefixed markdown files
        dir: PathBuf,
        /// Keep existing chunks instead of clearing the index first
        #[arg(long)]
        append: bool,
    },
    /// Start MCP server on stdio
    Serve,
    /// Show connectivity and index statistics
    Status,
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load { dir, append } => {
            load_knowledge(dir, append).await?;
        }
        Commands::Serve => {
            serve_mcp().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Config => {
            show_config(&Config::load()?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn load_command_takes_a_directory() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "load", "./knowledge"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Load { dir, append } = parsed.command {
                assert_eq!(dir, PathBuf::from("./knowledge"));
                assert!(!append);
            }
        }
    }

    #[test]
    fn load_command_append_flag() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "load", "./knowledge", "--append"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Load { append, .. } = parsed.command {
                assert!(append);
            }
        }
    }

    #[test]
    fn load_command_requires_a_directory() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "load"]);
        assert!(cli.is_err());
    }

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Serve);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["knowledge-mcp", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
