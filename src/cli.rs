//! CLI interface for pref-learner

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::learning::{diff, UpdateRequest};
use crate::types::{LearningRate, PreferenceState, SegmentKind, Threshold};

#[derive(Parser)]
#[command(name = "pref-learner")]
#[command(about = "Learns summary-writing preferences from how you edit generated summaries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Summarize the state file's source document under its rules
    Summarize {
        /// Preference state file (JSON)
        #[arg(short, long)]
        state: PathBuf,
        /// Write the new summaries back to the state file
        #[arg(short, long)]
        write: bool,
    },
    /// Run one learning round against a state file
    Update {
        /// Preference state file (JSON)
        #[arg(short, long)]
        state: PathBuf,
        /// File holding the edited summary (default: the state's working summary)
        #[arg(short, long)]
        edited: Option<PathBuf>,
        /// A preference stated directly
        #[arg(long)]
        preference: Option<String>,
        /// Promotion threshold
        #[arg(short, long, conflicts_with = "learning_rate")]
        threshold: Option<u32>,
        /// Learning rate tier (slow, normal, fast)
        #[arg(short, long)]
        learning_rate: Option<LearningRate>,
        /// Write the new rules and observations back to the state file
        #[arg(short, long)]
        write: bool,
    },
    /// Show the word-level diff between two files
    Diff {
        original: PathBuf,
        edited: PathBuf,
    },
    /// Configure the learner
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Store the API key in the OS keyring
        #[arg(long)]
        set_api_key: Option<String>,
        /// Set the model used for all calls
        #[arg(long)]
        set_model: Option<String>,
        /// Set the OpenAI-compatible API base URL
        #[arg(long)]
        set_base_url: Option<String>,
        /// Set the default learning rate (slow, normal, fast)
        #[arg(long)]
        set_learning_rate: Option<LearningRate>,
        /// Set an explicit default promotion threshold
        #[arg(long)]
        set_threshold: Option<u32>,
    },
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = Config::load()?;
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            crate::server::start(&host, port).await?;
        }
        Commands::Summarize { state, write } => {
            summarize(&state, write).await?;
        }
        Commands::Update { state, edited, preference, threshold, learning_rate, write } => {
            let threshold = threshold.map(Threshold::new).transpose()?;
            update(&state, edited.as_deref(), preference, threshold, learning_rate, write).await?;
        }
        Commands::Diff { original, edited } => {
            let original = read_text(&original)?;
            let edited = read_text(&edited)?;
            print_diff(&original, &edited);
        }
        Commands::Config { show, set_api_key, set_model, set_base_url, set_learning_rate, set_threshold } => {
            if let Some(key) = set_api_key {
                crate::config::set_api_key(&key)?;
            } else if let Some(model) = set_model {
                crate::config::set_model(&model)?;
            } else if let Some(url) = set_base_url {
                crate::config::set_base_url(&url)?;
            } else if let Some(rate) = set_learning_rate {
                crate::config::set_learning_rate(rate)?;
            } else if let Some(value) = set_threshold {
                crate::config::set_threshold(value)?;
            } else if show {
                crate::config::show_config()?;
            } else {
                println!("Use --show to see the configuration, or --help for the settings.");
            }
        }
    }

    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Load a state file
pub fn load_state(path: &Path) -> Result<PreferenceState> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse state file {}", path.display()))
}

/// Save a state file
pub fn save_state(path: &Path, state: &PreferenceState) -> Result<()> {
    let contents = serde_json::to_string_pretty(state)
        .context("Failed to serialize state")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write state file {}", path.display()))
}

async fn summarize(path: &Path, write: bool) -> Result<()> {
    let config = Config::load()?;
    let engine = crate::agent::engine_from_config(&config)?;
    let mut state = load_state(path)?;

    let summary = engine.produce_summary(&state.source_document, &state.rules).await?;
    println!("{}", summary);

    if write {
        state.reference_summary = summary.clone();
        state.working_summary = summary;
        save_state(path, &state)?;
        eprintln!("✓ Saved summaries to {}", path.display());
    }

    Ok(())
}

async fn update(
    path: &Path,
    edited: Option<&Path>,
    preference: Option<String>,
    threshold: Option<Threshold>,
    learning_rate: Option<LearningRate>,
    write: bool,
) -> Result<()> {
    let config = Config::load()?;
    let engine = crate::agent::engine_from_config(&config)?;
    let mut state = load_state(path)?;

    if let Some(edited) = edited {
        state.working_summary = read_text(edited)?;
    }

    let threshold = config
        .learning
        .resolve(threshold, learning_rate.or(state.learning_rate));
    let request = UpdateRequest {
        reference_summary: state.reference_summary.clone(),
        working_summary: state.working_summary.clone(),
        direct_preference: preference,
        rules: state.rules.clone(),
        observations: state.observations.clone(),
        threshold,
    };

    let outcome = engine.update_preferences(request).await?;

    for failure in &outcome.warnings {
        eprintln!("⚠ Could not promote \"{}\": {}", failure.observation, failure.reason);
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if write {
        state.rules = outcome.rules;
        state.observations = outcome.observations;
        save_state(path, &state)?;
        eprintln!("✓ Saved rules and observations to {}", path.display());
    }

    Ok(())
}

fn print_diff(original: &str, edited: &str) {
    let segments = diff(original, edited);
    if !crate::learning::diff::has_changes(&segments) {
        println!("No changes.");
        return;
    }
    for segment in &segments {
        match segment.kind {
            SegmentKind::Unchanged => {}
            SegmentKind::Added => println!("+ {:?}", segment.value),
            SegmentKind::Removed => println!("- {:?}", segment.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Observation;

    #[test]
    fn test_state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = PreferenceState {
            rules: vec!["Use bullet points.".to_string()],
            observations: vec![Observation::new("prefers short sentences", 2)],
            source_document: "Notes".to_string(),
            learning_rate: Some(LearningRate::Fast),
            ..Default::default()
        };
        save_state(&path, &state).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"sourceDocument\""));
        assert!(written.contains("\"observation\": \"prefers short sentences\""));
        assert_eq!(load_state(&path).unwrap(), state);
    }

    #[test]
    fn test_load_missing_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_state(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from([
            "pref-learner", "update", "--state", "s.json", "--learning-rate", "fast", "--write",
        ])
        .unwrap();
        match cli.command {
            Commands::Update { learning_rate, write, threshold, .. } => {
                assert_eq!(learning_rate, Some(LearningRate::Fast));
                assert!(write);
                assert!(threshold.is_none());
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_cli_rejects_threshold_with_learning_rate() {
        let result = Cli::try_parse_from([
            "pref-learner", "update", "--state", "s.json", "--threshold", "4", "--learning-rate", "slow",
        ]);
        assert!(result.is_err());
    }
}
