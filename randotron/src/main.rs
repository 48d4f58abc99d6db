use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use sabirth_randotron::{Config, Engine};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Parse arguments
    let matches = Command::new("randotron")
        .about("Play SA:BIRTH calibration sessions against an in-process ledger.")
        .arg(Arg::new("config").long("config").required(true))
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit structured (JSON) logs"),
        )
        .get_matches();

    // Load from config file
    let config_file = matches
        .get_one::<String>("config")
        .context("missing --config")?;
    let contents = std::fs::read_to_string(config_file)
        .with_context(|| format!("could not read config file {config_file}"))?;
    let config = Config::from_yaml(&contents).context("could not parse config file")?;
    let level = config
        .session
        .clone()
        .validate()
        .context("invalid config")?
        .log_level;

    // Setup logging
    if matches.get_flag("json") {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }

    // Initialize runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .context("could not build runtime")?;

    runtime.block_on(async move {
        info!(
            playthroughs = config.playthroughs,
            strategy = ?config.strategy,
            seed = ?config.session.seed,
            "starting randotron"
        );
        let summaries = Engine::new(config)?.run().await?;
        for summary in &summaries {
            println!("{}", serde_json::to_string(summary)?);
        }
        Ok::<(), anyhow::Error>(())
    })
}
