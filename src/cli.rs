//! CLI interface for topic-ladder

use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::error::{CallPurpose, SelectionError};
use crate::progression::ProgressionEngine;
use crate::session::LearningSession;
use crate::types::{Branch, SelectionOutcome};

#[derive(Parser)]
#[command(name = "topic-ladder")]
#[command(about = "Level-by-level security learning paths", long_about = None)]
#[command(version)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(short, long, global = true, env = "TOPIC_LADDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List topics in menu order
    Topics,
    /// Start a learning session (default when no command given)
    Learn {
        /// Run a single selection for this topic (id, title or menu number) and exit
        #[arg(short, long)]
        topic: Option<String>,
    },
    /// Show recommended topics for the configured learner
    Recommend,
    /// Configure topic-ladder
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
        /// Set the oracle base URL
        #[arg(long)]
        set_oracle_url: Option<String>,
    },
}

/// Parse arguments and run the selected command
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Config { show, reset, set_oracle_url }) = &cli.command {
        if *reset {
            return config::reset_config(cli.config.as_deref());
        }
        if let Some(url) = set_oracle_url {
            return config::set_oracle_url(cli.config.as_deref(), url);
        }
        if *show {
            return config::show_config(&load_config(&cli)?);
        }
        println!("{}", config::default_config_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    match cli.command {
        Some(Commands::Topics) => list_topics(&config).await,
        Some(Commands::Recommend) => recommend(&config).await,
        Some(Commands::Learn { topic }) => learn(&config, topic).await,
        None => learn(&config, None).await,
        Some(Commands::Config { .. }) => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn list_topics(config: &Config) -> Result<()> {
    let session = LearningSession::from_config(config).await?;
    print_menu(&session.engine).await;
    Ok(())
}

async fn recommend(config: &Config) -> Result<()> {
    let session = LearningSession::from_config(config).await?;
    print_recommendations(&session).await;
    Ok(())
}

async fn learn(config: &Config, topic: Option<String>) -> Result<()> {
    let session = LearningSession::from_config(config).await?;

    if let Some(query) = topic {
        select_and_print(&session.engine, &query).await;
        return Ok(());
    }

    println!("Select a learning topic. Commands: :topics, :log [topic], :save <topic> <file>, :recommend, :quit\n");
    print_menu(&session.engine).await;

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        match rl.readline("topic> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ":quit" | ":q" | ":exit" => break,
                    ":topics" => print_menu(&session.engine).await,
                    ":recommend" => print_recommendations(&session).await,
                    cmd if cmd.starts_with(":save") => {
                        save_log(&session.engine, cmd.trim_start_matches(":save").trim()).await
                    }
                    cmd if cmd.starts_with(":log") => {
                        print_log(&session.engine, cmd.trim_start_matches(":log").trim()).await
                    }
                    cmd if cmd.starts_with(':') => println!("Unknown command: {}", cmd),
                    query => select_and_print(&session.engine, query).await,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

async fn print_menu(engine: &ProgressionEngine) {
    for (i, topic) in engine.registry().list_topics().await.iter().enumerate() {
        let level = topic.top_level();
        let queued = engine.state(&topic.id).await.pending_queue.len();
        println!(
            "  {}. {:<22} level {} - {} ({} queued)",
            i + 1,
            topic.title,
            level,
            topic.level_title(level).unwrap_or_default(),
            queued
        );
    }
    println!();
}

async fn print_recommendations(session: &LearningSession) {
    match session.engine.recommendations().await {
        Ok(topics) if topics.is_empty() => println!("Nothing left to recommend - every topic is mastered."),
        Ok(topics) => {
            if let Some(user) = &session.user_id {
                println!("Recommended for {}:", user);
            } else {
                println!("Recommended topics:");
            }
            for topic in topics {
                println!("  - {}", topic);
            }
        }
        Err(e) => println!("Could not load recommendations: {}", e),
    }
}

async fn print_log(engine: &ProgressionEngine, query: &str) {
    if query.is_empty() {
        for topic in engine.registry().list_topics().await {
            println!("  {:<22} {} blocks", topic.title, engine.content().len(&topic.id).await);
        }
        println!();
        return;
    }

    match engine.registry().resolve(query).await {
        Ok(topic) => {
            let blocks = engine.content().blocks(&topic.id).await;
            if blocks.is_empty() {
                println!("Nothing studied in {} yet.", topic.title);
            }
            for (i, block) in blocks.iter().enumerate() {
                println!("--- {} part {} ---\n{}\n", topic.title, i + 1, block);
            }
        }
        Err(e) => println!("{}", SelectionError::new(query, CallPurpose::Lookup, e).user_message()),
    }
}

/// `:save <topic> <file>` writes the topic's rendered log as HTML
async fn save_log(engine: &ProgressionEngine, args: &str) {
    let Some((query, path)) = args.rsplit_once(' ') else {
        println!("Usage: :save <topic> <file>");
        return;
    };
    let topic = match engine.registry().resolve(query.trim()).await {
        Ok(topic) => topic,
        Err(e) => {
            println!("{}", SelectionError::new(query.trim(), CallPurpose::Lookup, e).user_message());
            return;
        }
    };
    match std::fs::write(path, engine.render(&topic.id).await) {
        Ok(()) => println!("Saved {} to {}", topic.title, path),
        Err(e) => println!("Could not write {}: {}", path, e),
    }
}

async fn select_and_print(engine: &ProgressionEngine, query: &str) {
    let topic = match engine.registry().resolve(query).await {
        Ok(topic) => topic,
        Err(e) => {
            println!("{}", SelectionError::new(query, CallPurpose::Lookup, e).user_message());
            return;
        }
    };

    println!("Loading {}...", topic.title);
    match engine.select(&topic.id).await {
        Ok(outcome) => print_outcome(&topic.title, &outcome),
        Err(e) => {
            println!("{}", e.user_message());
            if e.source.is_oracle_failure() {
                println!("Is the oracle running? Check the address with `topic-ladder config --show`.");
            }
            println!();
        }
    }
}

fn print_outcome(title: &str, outcome: &SelectionOutcome) {
    if let Branch::Advanced { level, title: level_title } = &outcome.branch {
        println!("*** {} reached level {}: {} ***", title, level, level_title);
    }
    println!("== {} / {} ==\n", title, outcome.subtopic);
    println!("{}\n", outcome.content);
    println!("({} more subtopics queued at level {})\n", outcome.remaining, outcome.level);
}
