//! Prior-art similarity CLI.
//!
//! Usage:
//!     priorart compare --target target.json --candidate candidate.json
//!     priorart rank --target target.json --corpus corpus.json --min-score 40
//!     priorart health --corpus-url http://127.0.0.1:8080

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use priorart_corpus::{
    read_patent, CorpusSource, HttpCorpus, HttpCorpusConfig, JsonFileCorpus,
};
use priorart_explain::{explain_score, summarize_match};
use priorart_model::{CategoryWeights, PatentMaterialData, ScopeSelection};
use priorart_rank::{rank, select_prior_art, RankConfig};
use priorart_score::{Scorer, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "priorart")]
#[command(about = "Score prior-art patents against a target by material similarity")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file with "scoring" and "ranking" sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one candidate against a target
    Compare {
        /// Target patent (JSON)
        #[arg(short, long)]
        target: PathBuf,

        /// Candidate patent (JSON)
        #[arg(short, long)]
        candidate: PathBuf,

        #[command(flatten)]
        scoring: ScoringArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rank a corpus of candidates against a target
    Rank {
        /// Target patent (JSON)
        #[arg(short, long)]
        target: PathBuf,

        #[command(flatten)]
        corpus: CorpusArgs,

        #[command(flatten)]
        scoring: ScoringArgs,

        /// Minimum overall similarity (0-100)
        #[arg(long)]
        min_score: Option<f64>,

        /// Number of matches to keep
        #[arg(short = 'k', long, conflicts_with = "all")]
        top_k: Option<usize>,

        /// Keep every match above the minimum score
        #[arg(long)]
        all: bool,

        /// Score candidates on a single thread
        #[arg(long)]
        sequential: bool,

        /// Also consider candidates published after the target
        #[arg(long)]
        ignore_dates: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that a corpus can be reached
    Health {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct CorpusArgs {
    /// Corpus JSON file
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Base URL of an HTTP patent service
    #[arg(long)]
    corpus_url: Option<String>,
}

#[derive(Args)]
struct ScoringArgs {
    /// Exclude chemical composition
    #[arg(long)]
    no_composition: bool,

    /// Exclude microstructure
    #[arg(long)]
    no_microstructure: bool,

    /// Exclude mechanical properties
    #[arg(long)]
    no_properties: bool,

    /// Category weights as composition,microstructure,properties (e.g. 50,30,20)
    #[arg(long, value_parser = parse_weights)]
    weights: Option<CategoryWeights>,
}

impl ScoringArgs {
    fn scope(&self) -> ScopeSelection {
        ScopeSelection {
            composition: !self.no_composition,
            microstructure: !self.no_microstructure,
            properties: !self.no_properties,
        }
    }
}

/// Settings read from `--config`; flags override them.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    scoring: ScoringConfig,
    ranking: RankConfig,
}

impl AppConfig {
    fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    fn scorer(&self, args: &ScoringArgs) -> Scorer {
        let mut scoring = self.scoring.clone();
        if let Some(weights) = args.weights {
            scoring.category_weights = weights;
        }
        Scorer::new(scoring)
    }
}

fn parse_weights(s: &str) -> Result<CategoryWeights, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p.trim(), e)))
        .collect::<Result<_, _>>()?;

    match parts.as_slice() {
        [composition, microstructure, properties] => Ok(CategoryWeights::new(
            *composition,
            *microstructure,
            *properties,
        )),
        _ => Err(format!("expected three comma-separated weights, got {}", parts.len())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("priorart={level}").parse()?),
        )
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compare {
            target,
            candidate,
            scoring,
            format,
        } => {
            run_compare(&config, &target, &candidate, &scoring, &format).await?;
        }
        Commands::Rank {
            target,
            corpus,
            scoring,
            min_score,
            top_k,
            all,
            sequential,
            ignore_dates,
            format,
        } => {
            let mut ranking = config.ranking.clone();
            if let Some(min_score) = min_score {
                ranking.min_overall = min_score;
            }
            if all {
                ranking.top_k = None;
            } else if top_k.is_some() {
                ranking.top_k = top_k;
            }
            if sequential {
                ranking.parallel = false;
            }

            let scorer = config.scorer(&scoring);
            let target = read_patent(&target).await?;
            let corpus = load_corpus(&corpus).await?;
            let candidates = if ignore_dates {
                corpus
                    .into_iter()
                    .filter(|candidate| candidate.id != target.id)
                    .collect()
            } else {
                select_prior_art(&target, corpus)
            };
            tracing::info!(target_id = %target.id, candidates = candidates.len(), "Selected candidates");

            run_rank(scorer, target, candidates, scoring.scope(), ranking, &format).await?;
        }
        Commands::Health { corpus } => {
            run_health(&corpus).await?;
        }
    }

    Ok(())
}

async fn load_corpus(args: &CorpusArgs) -> Result<Vec<PatentMaterialData>> {
    if let Some(url) = &args.corpus_url {
        let source = HttpCorpus::new(HttpCorpusConfig {
            base_url: url.clone(),
            ..Default::default()
        })?;
        return Ok(source.load().await?);
    }

    match &args.corpus {
        Some(path) => Ok(JsonFileCorpus::new(path).load().await?),
        None => anyhow::bail!("either --corpus or --corpus-url is required"),
    }
}

async fn run_compare(
    config: &AppConfig,
    target_path: &Path,
    candidate_path: &Path,
    scoring: &ScoringArgs,
    format: &str,
) -> Result<()> {
    let target = read_patent(target_path).await?;
    let candidate = read_patent(candidate_path).await?;
    let scope = scoring.scope();

    let detailed = config
        .scorer(scoring)
        .score_detailed(&target, &candidate, scope)?;
    let explanations = explain_score(&detailed, scope);

    if format == "json" {
        let output = serde_json::json!({
            "target": target.id,
            "candidate": candidate.id,
            "score": detailed,
            "explanations": explanations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Target:    {}", target.id);
    println!("Candidate: {}", candidate.id);
    println!("---");
    println!("{}", summarize_match(&detailed.record));

    for explanation in &explanations {
        println!("\n{}", explanation.summary);
        println!("   {}", explanation.detail);
        for item in &explanation.evidence {
            match &item.context {
                Some(context) => println!("   - {}: {}", item.value, context),
                None => println!("   - {}", item.value),
            }
        }
    }

    Ok(())
}

async fn run_rank(
    scorer: Scorer,
    target: PatentMaterialData,
    candidates: Vec<PatentMaterialData>,
    scope: ScopeSelection,
    ranking: RankConfig,
    format: &str,
) -> Result<()> {
    let candidate_count = candidates.len();
    let target_id = target.id.clone();

    // Scoring is CPU-bound; keep it off the async workers.
    let hits = tokio::task::spawn_blocking(move || {
        rank(&scorer, &target, candidates, scope, &ranking)
    })
    .await??;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    println!("Target: {}", target_id);
    println!("Scored {} prior-art candidates", candidate_count);
    println!("---");

    for hit in &hits {
        println!("\n{}. {}", hit.rank, hit.patent.id);
        if !hit.patent.title.is_empty() {
            println!("   {}", hit.patent.title);
        }
        if let Some(date) = &hit.patent.publication_date {
            println!("   Published: {}", date);
        }
        println!("   {}", summarize_match(&hit.scores));
    }

    println!("\n---");
    println!("Total: {} matches", hits.len());

    Ok(())
}

async fn run_health(args: &CorpusArgs) -> Result<()> {
    let result = if let Some(url) = &args.corpus_url {
        let source = HttpCorpus::new(HttpCorpusConfig {
            base_url: url.clone(),
            ..Default::default()
        })?;
        print!("Checking {} corpus... ", source.name());
        source.health_check().await
    } else if let Some(path) = &args.corpus {
        let source = JsonFileCorpus::new(path);
        print!("Checking {} corpus... ", source.name());
        source.health_check().await
    } else {
        anyhow::bail!("either --corpus or --corpus-url is required");
    };

    match result {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
