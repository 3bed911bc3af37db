use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use wave_analyzer::config::AnalysisConfig;
use wave_analyzer::exchange::{CandleSource, HistoricalSource};
use wave_analyzer::models::Timeframe;
use wave_analyzer::strategies::wave_analyzer::MultiTimeframeAnalyzer;

const USAGE: &str =
    "usage: wave-analyzer <tactical.json> [strategic.json] [--tf 1h] [--htf 4h]";

/// Max bars pulled from the source per timeframe.
const FETCH_LIMIT: usize = 5000;

struct Args {
    tactical_path: String,
    strategic_path: Option<String>,
    tactical_tf: Timeframe,
    strategic_tf: Option<Timeframe>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut paths = Vec::new();
    let mut tactical_tf = Timeframe::H1;
    let mut strategic_tf = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tf" | "--htf" => {
                let value = iter.next().with_context(|| format!("{} needs a value", arg))?;
                let tf = Timeframe::from_str_loose(value)
                    .with_context(|| format!("unknown timeframe '{}'", value))?;
                if arg == "--tf" {
                    tactical_tf = tf;
                } else {
                    strategic_tf = Some(tf);
                }
            }
            "-h" | "--help" => bail!("{}", USAGE),
            _ => paths.push(arg.clone()),
        }
    }

    let mut paths = paths.into_iter();
    let Some(tactical_path) = paths.next() else {
        bail!("{}", USAGE);
    };
    Ok(Args {
        tactical_path,
        strategic_path: paths.next(),
        tactical_tf,
        strategic_tf,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AnalysisConfig::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.to_lowercase()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let raw: Vec<String> = std::env::args().collect();
    let args = parse_args(&raw)?;
    let strategic_tf = args.strategic_tf.unwrap_or_else(|| args.tactical_tf.higher());
    if strategic_tf <= args.tactical_tf {
        bail!(
            "strategic timeframe {} must be above tactical {}",
            strategic_tf,
            args.tactical_tf
        );
    }

    let mut source = HistoricalSource::new();
    source.load_json_file(args.tactical_tf, &args.tactical_path)?;
    match &args.strategic_path {
        Some(path) => {
            source.load_json_file(strategic_tf, path)?;
        }
        None => tracing::info!(
            "No strategic file given, resampling {} from {}",
            strategic_tf,
            args.tactical_tf
        ),
    }

    let tactical = source.fetch_ohlcv(args.tactical_tf, FETCH_LIMIT).await?;
    let strategic = source.fetch_ohlcv(strategic_tf, FETCH_LIMIT).await?;

    let mtf = Arc::new(MultiTimeframeAnalyzer::from_config(&cfg)?);
    let tactical_tf = args.tactical_tf;

    let tactical_task = {
        let mtf = Arc::clone(&mtf);
        tokio::task::spawn_blocking(move || mtf.tactical.analyze(&tactical, tactical_tf))
    };
    let strategic_task = {
        let mtf = Arc::clone(&mtf);
        tokio::task::spawn_blocking(move || mtf.strategic.analyze(&strategic, strategic_tf))
    };

    let tactical = tactical_task
        .await
        .context("tactical analysis task panicked")?
        .with_context(|| format!("{} analysis failed", tactical_tf))?;
    let strategic = strategic_task
        .await
        .context("strategic analysis task panicked")?
        .with_context(|| format!("{} analysis failed", strategic_tf))?;

    let analysis = mtf.combine(strategic, tactical);
    tracing::info!(
        "Composite: {} (aligned={}, conf={:.1})",
        analysis.composite.signal.action,
        analysis.composite.aligned,
        analysis.composite.signal.confidence
    );

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
