//! Crisis Risk Agent CLI
//!
//! Sustained-distress detection over scored screen text.

use anyhow::Context;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use crisis_risk_agent::{
    alert::{AlertBuilder, AlertStore},
    config::Config,
    core::{AlertDecision, DecisionReason, EngineConfig, RiskEngine, SharedRiskEngine},
    feed::{FeedItem, JsonlFeed},
    transparency::{create_shared_log_with_persistence, read_persisted, SharedTransparencyLog},
    MONITORING_NOTICE, VERSION,
};
use crossbeam_channel::RecvTimeoutError;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crisis-risk")]
#[command(version = VERSION)]
#[command(about = "Sustained-distress risk aggregation and alerting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a score feed and raise alerts
    Run {
        /// JSONL score feed (`-` for stdin)
        #[arg(long, short, default_value = "-")]
        input: PathBuf,

        /// Which clock supplies "now" for evaluation
        #[arg(long, value_enum, default_value_t = ClockMode::Replay)]
        clock: ClockMode,
    },

    /// Run the engine through synthetic demo scenarios
    Simulate,

    /// Show cumulative decision statistics
    Status,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },

    /// Display the monitoring notice
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ClockMode {
    /// Use each record's own timestamp (never moving backwards)
    Replay,
    /// Use the system clock and re-evaluate while idle
    Wall,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Run { input, clock } => cmd_run(&config, input, clock),
        Commands::Simulate => cmd_simulate(),
        Commands::Status => cmd_status(&config),
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Notice => {
            println!("{MONITORING_NOTICE}");
            Ok(())
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything needed to act on a decision.
struct AlertPipeline {
    engine: SharedRiskEngine,
    builder: AlertBuilder,
    store: AlertStore,
    transparency: SharedTransparencyLog,
}

impl AlertPipeline {
    fn evaluate(&self, now: DateTime<Utc>) -> AlertDecision {
        let decision = self.engine.evaluate(now);
        self.transparency.record_decision(&decision);

        tracing::debug!(
            reason = %decision.reason,
            risk = decision.risk,
            samples = decision.stats.sample_count,
            "evaluated"
        );

        if decision.fired {
            self.raise(&decision, now);
        }
        decision
    }

    fn raise(&self, decision: &AlertDecision, now: DateTime<Utc>) {
        let evidence = self.engine.snapshot(now).into_iter().map(|s| s.evidence);
        let Some(record) = self.builder.build(decision, evidence) else {
            return;
        };

        match self.store.persist(&record) {
            Ok(path) => {
                self.transparency.record_alert_persisted();
                println!(
                    "  ALERT {} | severity {} | risk {:.3} | saved to {:?}",
                    record.alert_id, record.severity, record.risk, path
                );
            }
            Err(e) => tracing::error!(alert_id = %record.alert_id, error = %e, "could not persist alert"),
        }
    }
}

fn cmd_run(config: &Config, input: PathBuf, clock: ClockMode) -> anyhow::Result<()> {
    let engine_config = config
        .risk
        .engine_config()
        .context("invalid risk configuration")?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!(error = %e, "could not create directories");
    }

    println!("Crisis Risk Agent v{VERSION}");
    println!();
    print_engine_config(&engine_config);
    println!();

    let reader: Box<dyn BufRead + Send> = if input.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(&input)
            .with_context(|| format!("could not open feed {input:?}"))?;
        Box::new(BufReader::new(file))
    };

    let pipeline = AlertPipeline {
        engine: Arc::new(RiskEngine::new(engine_config)),
        builder: AlertBuilder::new(config.alerts.max_evidence_refs),
        store: AlertStore::new(&config.alerts),
        transparency: create_shared_log_with_persistence(config.transparency_path()),
    };
    tracing::info!(instance_id = %pipeline.builder.instance_id(), ?clock, "agent started");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("could not set Ctrl+C handler")?;

    let feed = JsonlFeed::spawn(reader);
    let receiver = feed.receiver().clone();
    let mut replay_now: Option<DateTime<Utc>> = None;
    let mut last_idle_eval = Instant::now();
    let mut reached_eof = false;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(FeedItem::Record(record)) => {
                let sample = match record.into_sample() {
                    Ok(sample) => sample,
                    Err(e) => {
                        tracing::warn!(error = %e, "rejected sample");
                        pipeline.transparency.record_sample_rejected();
                        continue;
                    }
                };

                let now = match clock {
                    ClockMode::Replay => {
                        let now = replay_now.map_or(sample.timestamp, |t| t.max(sample.timestamp));
                        replay_now = Some(now);
                        now
                    }
                    ClockMode::Wall => Utc::now(),
                };

                let score = sample.score;
                pipeline.engine.ingest_sample(sample);
                pipeline.transparency.record_sample_ingested();

                let decision = pipeline.evaluate(now);
                print_decision(Some(score), &decision);
            }
            Ok(FeedItem::Malformed { line, error }) => {
                tracing::warn!(line, %error, "malformed score record");
                pipeline.transparency.record_malformed_record();
            }
            Err(RecvTimeoutError::Timeout) => {
                // Let the window age while the scorer is quiet
                if clock == ClockMode::Wall && last_idle_eval.elapsed() >= Duration::from_secs(1) {
                    let decision = pipeline.evaluate(Utc::now());
                    if decision.fired {
                        print_decision(None, &decision);
                    }
                    last_idle_eval = Instant::now();
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                reached_eof = true;
                break;
            }
        }
    }

    feed.stop();
    if reached_eof {
        match feed.join() {
            Ok(records) => tracing::info!(records, "feed finished"),
            Err(e) => tracing::error!(error = %e, "feed failed"),
        }
    }

    if let Err(e) = pipeline.transparency.save() {
        tracing::warn!(error = %e, "could not save transparency log");
    }

    println!();
    println!("Alerts fired this session: {}", pipeline.engine.alert_count());
    println!("{}", pipeline.transparency.summary());
    Ok(())
}

fn print_engine_config(config: &EngineConfig) {
    println!("  Window: {} min", config.window_duration().num_minutes());
    println!("  Alert threshold: {}", config.alert_threshold());
    println!("  Min samples: {}", config.min_samples());
    println!("  Cooldown: {} min", config.cooldown_duration().num_minutes());
}

fn print_decision(score: Option<f64>, decision: &AlertDecision) {
    let score = score.map_or_else(|| "  -  ".to_string(), |s| format!("{s:.3}"));
    let marker = match decision.reason {
        DecisionReason::Fired => " <<< ALERT",
        DecisionReason::Suppressed => " (cooldown)",
        _ => "",
    };
    println!(
        "[{}] score {} | risk {:.3} | samples {} | avg {:.3} | {}{}",
        decision.evaluated_at.format("%H:%M:%S"),
        score,
        decision.risk,
        decision.stats.sample_count,
        decision.stats.avg_score,
        decision.reason,
        marker
    );
}

fn cmd_simulate() -> anyhow::Result<()> {
    let config = EngineConfig::new(
        ChronoDuration::minutes(5),
        0.65,
        3,
        ChronoDuration::minutes(2),
    )?;

    println!("Risk Engine Simulation - Time-Windowed Aggregation");
    println!("==================================================");
    println!();
    print_engine_config(&config);

    let scenarios: [(&str, &[f64]); 3] = [
        (
            "Gradual increase in distress",
            &[0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.85, 0.9],
        ),
        (
            "Fluctuating scores (no sustained distress)",
            &[0.7, 0.2, 0.8, 0.3, 0.6, 0.1, 0.7, 0.2],
        ),
        ("Single spike", &[0.1, 0.15, 0.95, 0.1, 0.12, 0.1]),
    ];

    let start = Utc
        .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .context("invalid simulation start")?;

    for (name, scores) in scenarios {
        println!();
        println!("Scenario: {name}");
        println!("{}", "-".repeat(50));

        let engine: RiskEngine<()> = RiskEngine::new(config);
        for (i, &score) in scores.iter().enumerate() {
            let now = start + ChronoDuration::seconds(30 * i as i64);
            engine.ingest(now, score, ())?;
            print_decision(Some(score), &engine.evaluate(now));
        }
        println!("Alerts fired: {}", engine.alert_count());
    }

    Ok(())
}

fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("Crisis Risk Agent Status");
    println!("========================");
    println!();

    println!("Configuration:");
    match config.risk.engine_config() {
        Ok(engine_config) => print_engine_config(&engine_config),
        Err(e) => println!("  {e}"),
    }
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        let stats = read_persisted(&stats_path)
            .with_context(|| format!("could not read {stats_path:?}"))?;
        println!("Cumulative Statistics (as of {}):", stats.last_updated.to_rfc3339());
        println!("  Samples ingested: {}", stats.samples_ingested);
        println!("  Samples rejected: {}", stats.samples_rejected);
        println!("  Malformed records: {}", stats.malformed_records);
        println!("  Insufficient samples: {}", stats.insufficient);
        println!("  Suppressed (cooldown): {}", stats.suppressed);
        println!("  Below threshold: {}", stats.below_threshold);
        println!("  Fired: {}", stats.fired);
        println!("  Alerts persisted: {}", stats.alerts_persisted);
    } else {
        println!("No previous session data found.");
    }
    println!();

    let alerts = AlertStore::new(&config.alerts).load_all()?;
    println!("Alert records: {}", alerts.len());
    if let Some(last) = alerts.last() {
        println!(
            "  Latest: {} ({}, risk {:.3})",
            last.alert_id, last.severity, last.risk
        );
    }

    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        config.save().context("could not write config file")?;
        tracing::info!(path = ?Config::config_path(), "config written");
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    if let Err(e) = config.risk.engine_config() {
        println!();
        println!("Warning: {e}");
    }
    Ok(())
}
