mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use leverage_ai::{
    Claude, ClaudeWriter, DEFAULT_MODEL, ExemplarPolicy, Exemplars, NumberContrastHeuristic,
    RetryPolicy, ScorerSet, StructureHeuristic, WALL_OF_TEXT, judged_scorers,
};
use leverage_core::{Corpus, CorpusLoader, GateConfig, JsonFileLoader, Settings};
use leverage_gate::{QualityAggregator, RevisionLoop, ValidationHarness};

#[derive(Parser)]
#[command(name = "leverage")]
#[command(about = "Score, validate and generate posts against the Leverage quality gate")]
#[command(version)]
struct Cli {
    /// JSON settings file (gate, revision, validation); defaults when absent
    #[arg(long, global = true, env = "LEVERAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Labeled corpus: a JSON array of annotated examples
    #[arg(
        long,
        global = true,
        env = "LEVERAGE_CORPUS",
        default_value = "data/corpus.json"
    )]
    corpus: PathBuf,

    #[arg(long, global = true, env = "LEVERAGE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one post and print its quality report
    Score {
        /// Post text (or use --file)
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// Source material the post was written from
        #[arg(long, default_value = "")]
        context: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Rule-based scorers only; no API calls
        #[arg(long)]
        offline: bool,

        /// Skip the critic pass
        #[arg(long)]
        no_critic: bool,
    },

    /// Run the gate over the labeled corpus and report agreement
    Validate {
        /// Write the full summary as JSON
        #[arg(long)]
        out: Option<PathBuf>,

        /// Only the first N examples
        #[arg(long)]
        limit: Option<usize>,

        /// Pause between examples, overriding the settings file
        #[arg(long)]
        delay_ms: Option<u64>,

        #[arg(long)]
        offline: bool,
    },

    /// Summarize the corpus and show exemplar selection per scorer
    Inspect,

    /// Draft a post from source material and revise it until it passes
    Generate {
        /// Source material (or use --file)
        #[arg(conflicts_with = "file")]
        context: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// Proven posts shown to the writer as voice examples
        #[arg(long, default_value_t = 3)]
        voice_examples: usize,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("leverage v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Score {
            ref text,
            ref file,
            ref context,
            json,
            offline,
            no_critic,
        } => {
            let post = read_input(text.as_deref(), file.as_deref(), "post")?;
            let aggregator = if offline {
                offline_aggregator()?
            } else {
                let corpus = load_corpus(&cli.corpus)?;
                judged_aggregator(&cli, &settings.gate, &corpus, !no_critic)?
            };
            let report = aggregator.evaluate(context, &post).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                display::print_report(&report, aggregator.config());
            }
        }

        Command::Validate {
            ref out,
            limit,
            delay_ms,
            offline,
        } => {
            let corpus = load_corpus(&cli.corpus)?;
            let mut validation = settings.validation.clone();
            match delay_ms {
                Some(ms) => validation.inter_request_delay_ms = ms,
                None if offline => validation.inter_request_delay_ms = 0,
                None => {}
            }
            let aggregator = if offline {
                offline_aggregator()?
            } else {
                judged_aggregator(&cli, &settings.gate, &corpus, false)?
            };
            let harness = ValidationHarness::new(Arc::new(aggregator), validation)?;

            let examples = corpus.examples();
            let examples = &examples[..limit.unwrap_or(examples.len()).min(examples.len())];
            let summary = harness.validate(examples).await?;
            display::print_summary(&summary);

            if let Some(path) = out {
                summary
                    .write_json(path)
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("Results written to {}", path.display());
            }
        }

        Command::Inspect => {
            let corpus = load_corpus(&cli.corpus)?;
            display::print_corpus_summary(&corpus.summary());

            let policy = ExemplarPolicy::default();
            println!("Exemplars");
            for signal in &settings.gate.signals {
                let selection = Exemplars::for_signal(&corpus, &signal.name, &policy);
                display::print_exemplars(&signal.name, &selection);
            }
            for pattern in &settings.gate.anti_patterns {
                let selection = Exemplars::for_anti_pattern(&corpus, &pattern.name, &policy);
                display::print_exemplars(&pattern.name, &selection);
            }
        }

        Command::Generate {
            ref context,
            ref file,
            voice_examples,
            json,
        } => {
            let source = read_input(context.as_deref(), file.as_deref(), "context")?;
            let corpus = load_corpus(&cli.corpus)?;
            let aggregator = judged_aggregator(&cli, &settings.gate, &corpus, true)?;

            let voice = corpus.best(voice_examples).into_iter().cloned().collect();
            let writer = ClaudeWriter::new(claude(&cli)?, voice);
            let revision = RevisionLoop::new(
                Arc::new(aggregator),
                Arc::new(writer),
                settings.revision.clone(),
            )?;

            let outcome = revision.run(source).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                display::print_outcome(&outcome);
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn load_corpus(path: &Path) -> anyhow::Result<Corpus> {
    JsonFileLoader::new(path)
        .load()
        .with_context(|| format!("loading corpus from {}", path.display()))
}

fn read_input(inline: Option<&str>, file: Option<&Path>, what: &str) -> anyhow::Result<String> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {what} from {}", path.display()))?,
        (None, None) => bail!("no {what} given: pass it inline or with --file"),
    };
    if text.trim().is_empty() {
        bail!("{what} is empty");
    }
    Ok(text)
}

fn claude(cli: &Cli) -> anyhow::Result<Claude> {
    let key = cli
        .api_key
        .as_deref()
        .context("ANTHROPIC_API_KEY is not set (use --offline for rule-based scoring)")?;
    Ok(Claude::new(key, &cli.model))
}

/// Rule-based gate: number contrast as the only signal, wall of text as the
/// only anti-pattern.
fn offline_aggregator() -> anyhow::Result<QualityAggregator> {
    let heuristic = NumberContrastHeuristic::default();
    let config = GateConfig::empty(0.20, 0.85)
        .with_signal(leverage_ai::rubric::SHOCKING_NUMBER_CONTRAST, 0.80)
        .with_anti_pattern(WALL_OF_TEXT);
    let scorers = ScorerSet::new()
        .with_signal(heuristic)
        .with_anti_pattern(StructureHeuristic::default());
    QualityAggregator::new(config, scorers).context("building offline gate")
}

fn judged_aggregator(
    cli: &Cli,
    config: &GateConfig,
    corpus: &Corpus,
    with_critic: bool,
) -> anyhow::Result<QualityAggregator> {
    let claude = Arc::new(claude(cli)?);
    let scorers = judged_scorers(
        config,
        corpus,
        claude.clone(),
        &ExemplarPolicy::default(),
        &RetryPolicy::default(),
    )
    .context("building judged scorers")?;
    let aggregator = QualityAggregator::new(config.clone(), scorers).context("building gate")?;
    Ok(if with_critic {
        aggregator.with_critic(claude)
    } else {
        aggregator
    })
}
