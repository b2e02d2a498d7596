use anyhow::{Context, Result};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::database::lancedb::LanceIndex;
use crate::embeddings::ollama::OllamaClient;
use crate::engine::{EngineGate, RetrievalEngine};
use crate::mcp::server::McpServer;
use crate::mcp::tools::register_knowledge_tools;

async fn build_engine(config: &Config) -> Result<RetrievalEngine> {
    let client =
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let index = LanceIndex::connect(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await
    .context("Failed to open the vector index")?;
    Ok(RetrievalEngine::new(Arc::new(client), Arc::new(index)))
}

/// Load a knowledge corpus into the vector index
#[inline]
pub async fn load_knowledge(source_dir: PathBuf, append: bool) -> Result<()> {
    info!("Loading knowledge corpus from {}", source_dir.display());

    let config = Config::load().context("Failed to load configuration")?;

    let records = load_corpus(&source_dir, &config.chunking)?;
    if records.is_empty() {
        println!("No chunks produced from {}", source_dir.display());
        println!("Nothing to load.");
        return Ok(());
    }
    let file_count = records
        .iter()
        .map(|r| r.metadata.source_file.as_str())
        .unique()
        .count();
    println!("Chunked {} files into {} passages", file_count, records.len());

    // Fail before touching the index if the embedding server is down.
    let client =
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    client
        .health_check()
        .context("Ollama is not ready; start it and pull the embedding model")?;

    let engine = build_engine(&config).await?;

    if append {
        println!("Appending to the existing index (matching ids are overwritten)");
    } else {
        println!("Clearing the existing index");
        engine.clear().await.context("Failed to clear the index")?;
    }

    println!("Embedding and indexing (model: {})...", config.ollama.model);
    let added = engine
        .add(records)
        .await
        .context("Failed to index the corpus")?;

    let total = engine.count().await?;
    let roles = engine.all_roles().await?;
    println!();
    println!("Load complete:");
    println!("  Chunks added: {added}");
    println!("  Chunks stored: {total}");
    println!("  Roles present: {}", roles.join(", "));

    Ok(())
}

/// Start the MCP server on stdio, initializing the engine in the background
#[inline]
pub async fn serve_mcp() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    // Surface embedding problems early; tool calls would otherwise stall
    // on the gate and then fail with a less obvious error.
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            if let Err(e) = client.health_check() {
                warn!("Ollama is reachable but unhealthy: {}", e);
                eprintln!("Warning: Ollama may not be ready. Searches may fail until it is.");
            }
        }
        Err(e) => {
            error!("Failed to create Ollama client: {}", e);
            return Err(e.into());
        }
    }

    // One-shot background initialization: the server answers protocol
    // traffic immediately, tool calls wait on the gate.
    let gate = Arc::new(EngineGate::new());
    gate.begin();
    {
        let gate = Arc::clone(&gate);
        let config = config.clone();
        tokio::spawn(async move {
            match build_engine(&config).await {
                Ok(engine) => gate.finish(Arc::new(engine)),
                Err(e) => gate.fail(e.to_string()),
            }
        });
    }

    let server = Arc::new(McpServer::new(
        "knowledge-mcp".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    register_knowledge_tools(&server, Arc::clone(&gate)).await;

    eprintln!(
        "MCP server ready with tools: search_knowledge, search_by_role, list_roles, get_stats"
    );
    eprintln!("Serving on stdio; connect via an MCP client. Press Ctrl+C to stop.");

    let mut restart_count = 0;
    const MAX_RESTARTS: u32 = 3;

    loop {
        tokio::select! {
            result = Arc::clone(&server).serve_stdio() => {
                match result {
                    Ok(()) => {
                        info!("MCP server stopped normally");
                        break;
                    }
                    Err(e) => {
                        error!("MCP server error (attempt {}/{}): {}", restart_count + 1, MAX_RESTARTS + 1, e);
                        restart_count += 1;

                        if restart_count > MAX_RESTARTS {
                            error!("Maximum restart attempts reached, shutting down");
                            break;
                        }

                        eprintln!("MCP server encountered an error, restarting in 5 seconds...");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Received interrupt signal, shutting down...");
                break;
            }
        }
    }

    eprintln!("Shutdown complete");
    Ok(())
}

/// Show connectivity and index statistics
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("Knowledge-MCP Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("Ollama:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "  Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("  Model: {}", config.ollama.model);
                println!("  Batch size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("  Reachable but unhealthy: {e}");
            }
        },
        Err(e) => {
            println!("  Failed to connect: {e}");
        }
    }

    println!();
    println!("Vector index ({}):", config.index_path().display());
    match LanceIndex::connect(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await
    {
        Ok(index) => {
            report_index_stats(&index).await;
        }
        Err(e) => {
            println!("  Failed to open: {e}");
        }
    }

    println!();
    println!("Next steps:");
    println!("  knowledge-mcp load <dir>   index a corpus directory");
    println!("  knowledge-mcp serve        start the MCP server for AI assistants");

    Ok(())
}

async fn report_index_stats(index: &LanceIndex) {
    use crate::database::VectorIndex;

    match index.count().await {
        Ok(count) => println!("  Stored chunks: {count}"),
        Err(e) => println!("  Failed to count chunks: {e}"),
    }
    match index.scan_metadata().await {
        Ok(metadata) => {
            let roles: std::collections::BTreeSet<&str> =
                metadata.iter().map(|m| m.role.as_str()).collect();
            if roles.is_empty() {
                println!("  Roles present: none");
            } else {
                println!(
                    "  Roles present: {}",
                    roles.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }
        Err(e) => println!("  Failed to scan roles: {e}"),
    }
}

/// Print the resolved configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("# {}", config_file_path(&config.base_dir).display());
    println!("{rendered}");
    Ok(())
}

fn config_file_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config.toml")
}
