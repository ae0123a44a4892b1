use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use threadsift::cli::{classify, list, read, results, runs, spec, subreddit, sync};
use threadsift::config::Config;
use threadsift::store::MetadataStore;

#[derive(Parser)]
#[command(name = "threadsift")]
#[command(about = "Reddit thread ingestion and LLM classification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "threadsift.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the newest submissions of every subreddit
    Sync {
        /// Keep running, one pass every sync.run_interval_secs
        #[arg(long)]
        watch: bool,
    },

    /// Run every detection spec over stored submissions
    Classify {
        /// Only classify submissions from this subreddit
        #[arg(short, long)]
        subreddit: Option<String>,

        /// Re-classify pairs that already have a verdict
        #[arg(long)]
        force: bool,
    },

    /// Subreddit management
    Subreddit {
        #[command(subcommand)]
        command: SubredditCommands,
    },

    /// Detection spec management
    Spec {
        #[command(subcommand)]
        command: SpecCommands,
    },

    /// List stored submissions
    List {
        /// Filter by subreddit
        #[arg(short, long)]
        subreddit: Option<String>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Print a stored thread as the model sees it
    Read {
        /// Submission id, with or without the t3_ prefix
        reddit_id: String,
    },

    /// Show recorded classification verdicts
    Results {
        /// Filter by detection spec id
        #[arg(long)]
        spec: Option<i64>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Show sync and classification run history
    Runs {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum SubredditCommands {
    /// Register a subreddit for syncing
    Add {
        /// Subreddit name, without r/
        name: String,
    },
    /// List registered subreddits
    List,
    /// Refresh subreddit details from Reddit
    Refresh {
        /// Subreddit name (all when omitted)
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum SpecCommands {
    /// Create a detection spec
    Add {
        /// Response format name
        #[arg(long)]
        format: String,
        /// Instruction given to the model
        #[arg(long)]
        instruction: String,
        /// Response field as name:type (str, int, float, bool, dict, list, tuple, set, none)
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
    },
    /// List detection specs
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config)?.with_env_overrides();

    // Initialize store
    let store = MetadataStore::open(&config.database_path())?;

    match cli.command {
        Commands::Sync { watch } => {
            sync::run(&store, &config, watch).await?;
        }
        Commands::Classify { subreddit, force } => {
            classify::run(&store, &config, subreddit, force).await?;
        }
        Commands::Subreddit { command } => match command {
            SubredditCommands::Add { name } => {
                subreddit::add(&store, &config, name).await?;
            }
            SubredditCommands::List => {
                subreddit::list(&store)?;
            }
            SubredditCommands::Refresh { name } => {
                subreddit::refresh(&store, &config, name).await?;
            }
        },
        Commands::Spec { command } => match command {
            SpecCommands::Add {
                format,
                instruction,
                fields,
            } => {
                spec::add(&store, format, instruction, fields)?;
            }
            SpecCommands::List => {
                spec::list(&store)?;
            }
        },
        Commands::List { subreddit, limit } => {
            list::run(&store, subreddit, limit)?;
        }
        Commands::Read { reddit_id } => {
            read::run(&store, &reddit_id)?;
        }
        Commands::Results { spec, limit } => {
            results::run(&store, spec, limit)?;
        }
        Commands::Runs { limit } => {
            runs::run(&store, limit)?;
        }
    }

    Ok(())
}
