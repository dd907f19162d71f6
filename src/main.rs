use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use tonebot::config::load_config;
use tonebot::gemini::GeminiClient;
use tonebot::style::{StyleLearner, StyleProfileStore, StyleService};
use tonebot::training::{training_messages, ChatPreprocessor};
use tonebot::transport::{TelegramTransport, Transport};
use tonebot::Bot;

/// Telegram bot that replies in a learned communication style.
#[derive(Parser)]
#[command(name = "tonebot", version)]
struct Cli {
    /// Config file (TOML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Info-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot (default)
    Run,
    /// Train the style profile on a chat export or preprocessed file
    Train {
        /// Export made of JSON objects with a `messages` array, or
        /// `preprocess` output
        file: PathBuf,
    },
    /// Convert raw chat exports into per-user training data
    Preprocess {
        input: PathBuf,
        output: PathBuf,
        /// Messages from this sender are tagged as bot messages
        #[arg(long)]
        bot_username: Option<String>,
    },
    /// Print the current style profile
    Profile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            config.validate()?;
            info!("Starting tonebot version {}", env!("CARGO_PKG_VERSION"));

            let generator = Arc::new(GeminiClient::new(config.gemini.clone())?);
            let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(
                &config.telegram.bot_token,
                config.telegram.poll_timeout_seconds,
            )?);
            let bot = Arc::new(Bot::from_config(&config, generator, Arc::clone(&transport)));

            let term_signal = tokio::signal::ctrl_c();
            tokio::pin!(term_signal);

            let run = Arc::clone(&bot).start();
            tokio::pin!(run);

            tokio::select! {
                result = &mut run => {
                    if let Err(e) = result {
                        error!("Bot error: {}", e);
                        return Err(e.into());
                    }
                }
                _ = &mut term_signal => {
                    info!("Shutdown requested");
                    bot.stop();
                    // Let the current poll drain
                    if let Err(e) = run.await {
                        error!("Bot error during shutdown: {}", e);
                    }
                }
            }
            info!("Bot shutting down normally");
        }
        Command::Train { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extracted = training_messages(&content);
            if extracted.messages.is_empty() {
                warn!("No training messages found in {}", file.display());
                return Ok(());
            }

            let store = StyleProfileStore::new(config.paths.style_profile())
                .with_max_frequent_phrases(config.frequent_phrase_limit);
            let learner = StyleLearner::new(config.frequent_phrase_limit);
            let (style, _task) = StyleService::spawn(store, learner, config.learning);

            let summary = style.train(extracted.messages).await?;
            info!(
                "Trained on {} messages ({} records skipped, {} new words, {} new emojis)",
                summary.messages, extracted.skipped_records, summary.new_words, summary.new_emojis
            );
        }
        Command::Preprocess {
            input,
            output,
            bot_username,
        } => {
            let mut preprocessor = ChatPreprocessor::new(input, output);
            if let Some(name) = bot_username {
                preprocessor = preprocessor.with_bot_username(name);
            }
            let written = preprocessor.run().await?;
            info!("Preprocessed {} export(s)", written.len());
        }
        Command::Profile => {
            let profile = StyleProfileStore::new(config.paths.style_profile())
                .with_max_frequent_phrases(config.frequent_phrase_limit)
                .load();
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}
