use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cvrank::feedback::{self, JsonlSink};
use cvrank::loader;
use cvrank::ranking::{ModelRegistry, RankedOutput, Ranker, StrategyKind, TextEncoder};
use cvrank::Config;

mod cli;

const BAR_WIDTH: usize = 20;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let config = Config::load().context("failed to load config")?;

    match args.command {
        cli::Command::Rank {
            query,
            query_file,
            strategy,
            json,
            review,
            files,
        } => {
            let query = read_query(query, query_file.as_deref())?;
            let kind = strategy.unwrap_or(config.default_strategy);
            let documents = loader::load_paths(&files).context("failed to read input files")?;

            let spinner = spinner();

            let models = if kind.is_dense() {
                spinner.set_message(format!("loading {} model...", kind));
                ModelRegistry::load(&config.dense, config.base_path(), &[kind])
                    .with_context(|| format!("failed to load model for {}", kind))?
            } else {
                ModelRegistry::empty()
            };
            let ranker = Ranker::new(models, config.ranker_options());

            spinner.set_message(format!("ranking {} documents...", documents.len()));
            let result = ranker.rank(&query, &documents, kind);
            spinner.finish_and_clear();

            let mut output = result.context("ranking failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            print_ranking(&output);

            if review {
                review_ranking(&config, &mut output, &query)?;
            }

            Ok(())
        }

        cli::Command::Models { load } => {
            for kind in StrategyKind::ALL {
                match config.dense.spec(kind) {
                    None => println!("{:<8} built-in tf-idf", kind),
                    Some(spec) => println!(
                        "{:<8} {} (max {} tokens)",
                        kind, spec.model, spec.max_length
                    ),
                }
            }

            if load {
                let dense: Vec<StrategyKind> =
                    StrategyKind::ALL.into_iter().filter(|k| k.is_dense()).collect();
                let registry = ModelRegistry::load(&config.dense, config.base_path(), &dense)
                    .context("failed to load models")?;

                println!();
                for kind in registry.loaded_kinds() {
                    let encoder: &dyn TextEncoder = registry.get(kind)?;
                    println!("{:<8} ready, {} dimensions", kind, encoder.dimensions());
                }
            }

            Ok(())
        }

        cli::Command::Config {} => {
            println!("# {}", config.path().display());
            println!("# feedback log: {}", config.feedback_log_path().display());
            print!("{}", serde_yml::to_string(&config)?);
            Ok(())
        }
    }
}

fn read_query(query: Option<String>, query_file: Option<&Path>) -> anyhow::Result<String> {
    let query = match (query, query_file) {
        (Some(query), _) => query,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query from {}", path.display()))?,
        (None, None) => bail!("either --query or --query-file is required"),
    };

    if query.trim().is_empty() {
        bail!("query is empty");
    }

    Ok(query)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Similarity as shown to users: clamped to [0, 1], two decimals.
fn display_score(similarity: f32) -> f32 {
    (similarity.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

fn score_bar(score: f32) -> String {
    let filled = (score * BAR_WIDTH as f32).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn print_ranking(output: &RankedOutput) {
    let width = output
        .results
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0);

    match &output.model {
        Some(model) => println!("{} ({}, {} dims)\n", output.strategy, model, output.dimensions),
        None => println!("{} ({} terms)\n", output.strategy, output.dimensions),
    }

    for result in &output.results {
        let score = display_score(result.similarity);
        println!(
            "{:>3}. {:<width$}  {:.2}  {}",
            result.rank,
            result.name,
            score,
            score_bar(score),
        );
    }
}

fn review_ranking(config: &Config, output: &mut RankedOutput, query: &str) -> anyhow::Result<()> {
    let len = output.len();
    println!();

    let mut ranks = Vec::with_capacity(len);
    for result in &output.results {
        let answer = inquire::CustomType::<usize>::new(&format!("Your rank for {}:", result.name))
            .with_help_message(&format!("1-{}, esc to skip", len))
            .prompt_skippable()?;

        if let Some(rank) = answer {
            ranks.push((result.position, rank));
        }
    }

    if ranks.is_empty() {
        println!("No ranks given, nothing recorded");
        return Ok(());
    }

    feedback::assign_human_ranks(output, &ranks).context("invalid ranks")?;

    println!("\nReviewed order:");
    for result in feedback::reviewed_order(output) {
        let human = result
            .human_rank
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>3}. {} (engine #{})", human, result.name, result.rank);
    }

    let sink = JsonlSink::new(config.feedback_log_path());
    let count = feedback::submit(&sink, output, query)
        .with_context(|| format!("failed to write {}", sink.path().display()))?;
    println!("\n{} feedback records written to {}", count, sink.path().display());

    Ok(())
}
