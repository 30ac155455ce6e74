use anyhow::{Context, Result};
use clap::Parser;
use scantrace::cli::Cli;
use scantrace::config::TracerConfig;
use scantrace::demo::{self, DemoConfig, SwitchModel};
use scantrace::session::TraceSession;
use scantrace::time::ManualClock;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else {
        // Warnings (late renames, failed drops) always reach the user
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
            )
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => TracerConfig::from_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TracerConfig::default(),
    };
    if let Some(output) = &args.output {
        config = config.with_filename(output);
    }
    if args.no_events {
        config = config.with_events_enabled(false);
    }

    let model = SwitchModel::build();
    let clock = ManualClock::new();
    let mut session = TraceSession::with_config(&model.tree, &clock, config);

    let demo_config = DemoConfig {
        packets_per_sender: args.packets,
        transactions: args.transactions,
        seed: args.seed,
    };
    let summary = demo::run(&mut session, &model, &clock, &demo_config)
        .context("Simulation failed while recording")?;
    session.close().context("Failed to finish trace file")?;

    if args.stats {
        let report = serde_json::json!({
            "session": session.stats(),
            "run": summary,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "Recorded {} packet(s), {} delivery(ies) and {} transaction(s) to {}",
            summary.packets_sent,
            summary.deliveries,
            summary.transactions,
            session.filename()
        );
    }

    Ok(())
}
