//! rsthreat 命令行入口

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use rsthreat::model::sample;
use rsthreat::{
    AnalysisReport, ConfigManager, ElementKind, FeedConfig, ModelInput, RuleCacheManager, RuleLoader, RuleSet,
    ThreatDetector,
};

#[derive(Parser)]
#[command(name = "rsthreat", version)]
#[command(about = "Threat-modeling analysis engine", long_about = None)]
struct Cli {
    /// Enable debug-level logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a model file (JSON) against structural checks, rules and feeds.
    Analyze(AnalyzeArgs),

    /// Analyze the built-in AWS reference architecture.
    SampleAws(OutputArgs),

    /// List the supported element kinds.
    Kinds,

    /// Convert a JSON rule file into the MessagePack rule format.
    PackRules(PackRulesArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Model file in editor JSON form.
    #[arg(long, short = 'm')]
    model: PathBuf,

    /// Static rules (.json or .mp); the built-in rules are used when omitted.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Threat feed source; overrides the feedConfig of the model file.
    #[arg(long)]
    feed_source: Option<String>,

    #[arg(long, requires = "feed_source")]
    api_key: Option<String>,

    #[arg(long, requires = "feed_source")]
    custom_url: Option<String>,

    /// Skip all threat feeds.
    #[arg(long, conflicts_with = "feed_source")]
    offline: bool,

    /// Per-feed timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct PackRulesArgs {
    /// JSON rule file.
    #[arg(long)]
    rules: PathBuf,

    /// Output MessagePack file.
    #[arg(long, short = 'o')]
    out: PathBuf,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => cmd_analyze(args).await,
        Commands::SampleAws(output) => cmd_sample_aws(output),
        Commands::Kinds => {
            cmd_kinds();
            Ok(())
        }
        Commands::PackRules(args) => cmd_pack_rules(args).await,
    }
}

async fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.model)
        .await
        .with_context(|| format!("failed to read model file {}", args.model.display()))?;
    let input = ModelInput::from_json(&text).with_context(|| format!("invalid model file {}", args.model.display()))?;
    let model = input.build().context("failed to build threat model")?;

    let mut builder = ConfigManager::custom();
    if let Some(secs) = args.timeout {
        builder = builder.feed_timeout(Duration::from_secs(secs));
    }
    let config = builder.build();

    let detector = match &args.rules {
        Some(path) => ThreatDetector::with_rules(config, Arc::new(load_rules(path).await?))?,
        None => ThreatDetector::new(config)?,
    };

    let feeds: Vec<FeedConfig> = if args.offline {
        Vec::new()
    } else if let Some(source) = args.feed_source {
        let mut feed = FeedConfig::new(source);
        if let Some(key) = args.api_key {
            feed = feed.with_api_key(key);
        }
        if let Some(url) = args.custom_url {
            feed = feed.with_custom_url(url);
        }
        vec![feed]
    } else {
        input.feed_config.iter().cloned().collect()
    };
    debug!("{} threat feeds configured", feeds.len());

    let report = tokio::select! {
        report = detector.analyze(&model, &feeds) => report,
        _ = tokio::signal::ctrl_c() => bail!("analysis interrupted"),
    };
    print_report(&report, args.output.format)
}

fn cmd_sample_aws(output: OutputArgs) -> Result<()> {
    let model = sample::aws_reference_model()?;
    let detector = ThreatDetector::new(ConfigManager::get_default())?;
    print_report(&detector.analyze_model(&model), output.format)
}

fn cmd_kinds() {
    for kind in ElementKind::ALL {
        println!("{:<16} {:<20} {}", kind.as_str(), kind.label(), kind.provider().as_str());
    }
}

async fn cmd_pack_rules(args: PackRulesArgs) -> Result<()> {
    let json = tokio::fs::read_to_string(&args.rules)
        .await
        .with_context(|| format!("failed to read rule file {}", args.rules.display()))?;
    let records = RuleCacheManager::records_from_json(&json)?;

    // 打包前先编译一遍，错误规则直接报出
    let checked = RuleLoader::from_records(&records);
    for diagnostic in &checked.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }

    let bytes = RuleCacheManager::to_msgpack(&records)?;
    tokio::fs::write(&args.out, &bytes)
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!("packed {} rules into {} bytes", records.len(), bytes.len());
    println!("{} rules -> {}", records.len(), args.out.display());
    Ok(())
}

async fn load_rules(path: &Path) -> Result<RuleSet> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read rule file {}", path.display()))?;
    let rules = match path.extension().and_then(|ext| ext.to_str()) {
        Some("mp") | Some("msgpack") => RuleLoader::from_msgpack(&bytes)?,
        _ => RuleLoader::from_json_str(std::str::from_utf8(&bytes).context("rule file is not UTF-8")?)?,
    };
    info!("loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

fn print_report(report: &AnalysisReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json_pretty()?),
    }
    Ok(())
}
