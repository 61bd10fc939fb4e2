use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use studycoach::{router, AppState};
use studycoach_core::{analyze, AnalysisConfig, AnalysisOptions, SummaryStyle};
use studycoach_local::{extract_document, HttpFetcher, MoodleClient};

#[derive(Parser, Debug)]
#[command(name = "studycoach")]
#[command(about = "Summaries and practice quizzes from lecture documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service.
    Serve(ServeCmd),
    /// Analyze a local document and print the report as JSON.
    Analyze(AnalyzeCmd),
    /// Print version info (json).
    Version,
}

#[derive(clap::Args, Debug)]
struct AnalysisArgs {
    /// TOML file with analysis tunables (counts, mask, stop-words). Missing keys keep defaults.
    #[arg(long, env = "STUDYCOACH_CONFIG")]
    config: Option<PathBuf>,
    /// Minimum normalized text length before a document is analyzed.
    #[arg(long, env = "STUDYCOACH_MIN_TEXT_CHARS")]
    min_text_chars: Option<usize>,
}

impl AnalysisArgs {
    fn load(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(p) => AnalysisConfig::from_toml_file(p)
                .with_context(|| format!("loading analysis config {}", p.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(n) = self.min_text_chars {
            cfg.min_text_chars = n;
        }
        Ok(cfg)
    }
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Listen address.
    #[arg(long, env = "STUDYCOACH_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,
    /// Per-download timeout in milliseconds.
    #[arg(long, env = "STUDYCOACH_FETCH_TIMEOUT_MS", default_value_t = 20_000)]
    fetch_timeout_ms: u64,
    /// Largest document accepted, for downloads and uploads alike.
    #[arg(long, env = "STUDYCOACH_MAX_DOWNLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
    max_download_bytes: u64,
    /// Base URL of the Moodle site to proxy (enables the /moodle routes).
    #[arg(long, env = "STUDYCOACH_MOODLE_URL")]
    moodle_url: Option<String>,
    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    /// Document to analyze (pdf, docx, pptx or plain text).
    path: PathBuf,
    /// Also generate multiple-choice questions.
    #[arg(long)]
    mcq: bool,
    /// Titled summary blocks instead of the flat summary.
    #[arg(long)]
    blocks: bool,
    /// Seed the question shuffler for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    #[command(flatten)]
    analysis: AnalysisArgs,
}

fn load_env_file() {
    // Opt-in; never overrides the process environment and never logs values.
    let Ok(p) = std::env::var("STUDYCOACH_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "studycoach=info,studycoach_local=info,tower_http=info",
                )
            }),
        )
        .init();
}

async fn serve(args: ServeCmd) -> Result<()> {
    let analysis = args.analysis.load()?;
    let fetcher = HttpFetcher::new(
        Duration::from_millis(args.fetch_timeout_ms),
        args.max_download_bytes,
    )?;
    let mut state = AppState::new(Arc::new(fetcher.clone()), analysis)
        .with_limits(args.fetch_timeout_ms, args.max_download_bytes);
    if let Some(base) = args.moodle_url.as_deref().filter(|s| !s.trim().is_empty()) {
        let moodle =
            MoodleClient::new(base, fetcher)?.with_max_download_bytes(args.max_download_bytes);
        tracing::info!(moodle = %moodle.base_url(), "moodle proxy enabled");
        state = state.with_lms(Arc::new(moodle));
    }

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn analyze_file(args: AnalyzeCmd) -> Result<()> {
    let cfg = args.analysis.load()?;
    let bytes =
        std::fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let name = args.path.file_name().and_then(|s| s.to_str());
    let extracted = extract_document(&bytes, None, name)?;
    let opts = AnalysisOptions {
        summary: if args.blocks {
            SummaryStyle::Blocks
        } else {
            SummaryStyle::Flat
        },
        cloze: true,
        mcq: args.mcq,
    };
    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let report = analyze(&extracted.text, &opts, &cfg, &mut rng)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Analyze(args) => analyze_file(args)?,
        Commands::Version => {
            let v = serde_json::json!({
                "name": "studycoach",
                "version": env!("CARGO_PKG_VERSION"),
            });
            println!("{v}");
        }
    }
    Ok(())
}
