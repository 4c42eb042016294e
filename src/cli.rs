use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cvrank::StrategyKind;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank files against a query
    Rank {
        /// Query text, e.g. a job description
        #[clap(short, long, conflicts_with = "query_file")]
        query: Option<String>,

        /// Read the query from a file
        #[clap(long)]
        query_file: Option<PathBuf>,

        /// tfidf, bert or minilm. Defaults to `default_strategy` from config.yaml
        #[clap(short, long)]
        strategy: Option<StrategyKind>,

        /// Print results as json
        #[clap(long, default_value = "false")]
        json: bool,

        /// Ask for a rank per document and save it to the feedback log
        #[clap(long, default_value = "false", conflicts_with = "json")]
        review: bool,

        /// Plain text or pdf files
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// List strategies and their configured models
    Models {
        /// Download and initialize every dense model
        #[clap(long, default_value = "false")]
        load: bool,
    },

    /// Print data directory and configuration
    Config {},
}
