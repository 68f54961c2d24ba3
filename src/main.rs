//! Medibot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Build the engine (directory, tools, index, agent)
//!   5. Serve HTTP, or fall back to a console loop

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use medibot::{config, engine::Engine, error::AppError, logger, server};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level, config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    let engine = Arc::new(Engine::new(&config)?);

    if config.http.enabled {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                signal_token.cancel();
            }
        });
        server::run_http(engine, &config.http.bind, shutdown).await
    } else {
        console_loop(engine).await
    }
}

/// Minimal console channel: one session, line in, reply out.
async fn console_loop(engine: Arc<Engine>) -> Result<(), AppError> {
    let session_id = uuid::Uuid::now_v7().to_string();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AppError::Comms(format!("stdin read failed: {e}")))?
    {
        let input = line.trim();
        if input.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }

        match engine.chat(&session_id, input).await {
            Ok(reply) => {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n> ").await?;
            }
            Err(e) => {
                stdout.write_all(format!("error: {e}\n> ").as_bytes()).await?;
            }
        }
        stdout.flush().await?;
    }

    Ok(())
}
