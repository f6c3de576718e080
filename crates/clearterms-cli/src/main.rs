mod display;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use clearterms_ai::{GeminiClient, JsonRepair, ModelRepair, NoRepair, harden};
use clearterms_core::schema::policy;
use clearterms_core::{Analysis, AnalyzeResponse, Settings};
use clearterms_engine::{API_KEY_STORE_KEY, Analyzer, HttpPage, PageSource, StaticPage};
use clearterms_store::{DetectionLog, DetectorRepository, JsonFileStore, set_as};
use tracing::info;

#[derive(Parser)]
#[command(name = "clearterms", version, about = "Legal-policy risk reports from web pages")]
struct Cli {
    /// JSON file holding the detector model, cached reports, and log
    #[arg(long, env = "CLEARTERMS_STORE", default_value = "clearterms-store.json")]
    store: PathBuf,

    /// Optional JSON settings file; missing fields take defaults
    #[arg(long, env = "CLEARTERMS_CONFIG")]
    config: Option<PathBuf>,

    /// Gemini API key; falls back to a key saved with `set-key`
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to try, in order (repeatable); replaces the configured list
    #[arg(long = "model", value_name = "MODEL")]
    models: Vec<String>,

    /// Print JSON instead of text cards
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Page URL (with --file, the URL the HTML was saved from)
    url: String,

    /// Read HTML from this file instead of fetching the URL
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a page and extract its policy text
    Classify(SourceArgs),
    /// Classify a page, then analyze its text (cached reports are reused)
    Analyze(SourceArgs),
    /// Harden raw model output read from a file or stdin
    Harden {
        /// File with raw model output; stdin when omitted
        file: Option<PathBuf>,
        /// Skip the remote repair call
        #[arg(long)]
        local: bool,
    },
    /// Look up a cached report
    Cached {
        domain: String,
        /// Content hash of the extracted text
        hash: String,
    },
    /// Inspect or reset the adaptive detector
    Detector {
        #[command(subcommand)]
        action: DetectorAction,
    },
    /// Show the detection log
    Log {
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the JSON schema sent to the model
    Schema,
    /// Save an API key in the store
    SetKey { key: String },
}

#[derive(Subcommand)]
enum DetectorAction {
    Show,
    Reset,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(key) = &cli.api_key {
        settings.analyzer.api_key = Some(key.clone());
    }
    if !cli.models.is_empty() {
        settings.analyzer.models = cli.models.clone();
    }
    Ok(settings)
}

fn page_source(args: &SourceArgs) -> anyhow::Result<Box<dyn PageSource>> {
    Ok(match &args.file {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Box::new(StaticPage::new(args.url.clone(), html))
        }
        None => Box::new(HttpPage::new(args.url.clone())),
    })
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_analysis(analysis: &Analysis, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(analysis)
    } else {
        display::print_report_card(analysis);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays parseable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("clearterms v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let client = GeminiClient::new(&settings.analyzer.endpoint_base);
    let analyzer = Analyzer::new(JsonFileStore::open(&cli.store), client, settings)?;

    match &cli.command {
        Commands::Classify(args) => {
            let source = page_source(args)?;
            let page = analyzer.classify_and_extract(source.as_ref()).await?;
            if cli.json {
                print_json(&page)?;
            } else {
                display::print_collected(&page);
            }
        }
        Commands::Analyze(args) => {
            let source = page_source(args)?;
            let page = analyzer.classify_and_extract(source.as_ref()).await?;
            if !page.is_policy_page {
                info!(url = %page.url, "page does not look like a policy; analyzing anyway");
            }
            match analyzer.analyze(&page.to_request()).await {
                AnalyzeResponse::Report { analysis } => print_analysis(&analysis, cli.json)?,
                AnalyzeResponse::Error { error, message } => {
                    if cli.json {
                        print_json(&AnalyzeResponse::Error {
                            error,
                            message: message.clone(),
                        })?;
                    }
                    match message {
                        Some(detail) => bail!("{} ({error}: {detail})", error.status_message()),
                        None => bail!("{} ({error})", error.status_message()),
                    }
                }
            }
        }
        Commands::Harden { file, local } => {
            let raw = read_input(file.as_deref())?;
            let cfg = &analyzer.settings().analyzer;
            let schema = policy::analysis_schema(&analyzer.settings().hardener);
            let api_key = cfg.api_key.clone().filter(|k| !k.trim().is_empty());
            let model = cfg.models.first().cloned();
            let repair_client = GeminiClient::new(&cfg.endpoint_base);

            let repair: Box<dyn JsonRepair + '_> = match (api_key.as_deref(), model.as_deref()) {
                (Some(key), Some(model)) if !*local => Box::new(ModelRepair {
                    client: &repair_client,
                    api_key: key,
                    model,
                    temperature: cfg.repair_temperature,
                    max_tokens: cfg.max_output_tokens,
                    max_input_chars: cfg.max_input_chars,
                }),
                _ => Box::new(NoRepair),
            };
            let analysis = harden(&raw, &schema, repair.as_ref(), &analyzer.settings().hardener)
                .await
                .context("hardening model output")?;
            print_analysis(&analysis, cli.json)?;
        }
        Commands::Cached { domain, hash } => {
            match analyzer.get_cached(domain, hash).await.analysis {
                Some(analysis) => print_analysis(&analysis, cli.json)?,
                None => println!("no cached report for {domain}"),
            }
        }
        Commands::Detector { action } => {
            let repo = DetectorRepository::new(analyzer.store());
            if let DetectorAction::Reset = action {
                repo.reset().await.context("resetting detector")?;
                info!("detector reset to defaults");
            }
            let model = repo.load().await;
            if cli.json {
                print_json(&model)?;
            } else {
                display::print_detector(&model);
            }
        }
        Commands::Log { limit } => {
            let entries = DetectionLog::new(analyzer.store())
                .entries()
                .await
                .context("reading detection log")?;
            let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
            let entries = &entries[skip..];
            if cli.json {
                print_json(entries)?;
            } else {
                display::print_log(entries);
            }
        }
        Commands::Schema => {
            print_json(&policy::analysis_schema(&analyzer.settings().hardener))?;
        }
        Commands::SetKey { key } => {
            if key.trim().is_empty() {
                bail!("API key must not be empty");
            }
            set_as(analyzer.store(), API_KEY_STORE_KEY, key.trim())
                .await
                .context("saving API key")?;
            println!("API key saved to {}", cli.store.display());
        }
    }

    Ok(())
}
