use std::io;

use clap::Parser;
use eyre::{Result, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use trainmap_core::engine::SimulationEngine;
use trainmap_core::history::RunHistory;
use trainmap_core::playback::TickScheduler;
use trainmap_network::DefaultFetcher;
use trainmap_viewer::app::{App, ResourceSet, run_console};
use trainmap_viewer::config::ViewerArgs;
use trainmap_viewer::engines::{ProcessEngine, ReplayEngine};
use trainmap_viewer::logging::setup_logging;
use trainmap_viewer::surface::TerminalSurface;

fn main() -> Result<()> {
    let args = ViewerArgs::parse();
    setup_logging(args.log_level());

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build runtime")?
        .block_on(run(args))
}

fn engine(args: &ViewerArgs) -> Result<Box<dyn SimulationEngine>> {
    if let Some(path) = &args.replay {
        let engine = ReplayEngine::open(path)
            .wrap_err_with(|| format!("failed to open recording {}", path.display()))?;
        return Ok(Box::new(engine));
    }

    let command = args.engine.as_deref().unwrap_or_default();
    let engine = ProcessEngine::spawn(command)
        .wrap_err_with(|| format!("failed to launch engine `{command}`"))?;
    Ok(Box::new(engine))
}

async fn run(args: ViewerArgs) -> Result<()> {
    let fetcher = DefaultFetcher::new();
    let mut app = App::new(
        TickScheduler::with_cadence(engine(&args)?, args.cadence()),
        RunHistory::load(args.history_storage()),
        TerminalSurface::new(args.width, args.height, !args.no_color && !args.headless),
        ResourceSet {
            stations: args.stations_location(),
            segments: args.segments_location(),
        },
        args.run_config(),
    );
    app.attach()?;
    app.reload(&fetcher).await?;

    if args.headless {
        match app.play_headless(args.run_config()).await? {
            Some(id) => println!("{id}"),
            None => tracing::warn!("run stopped before finishing"),
        }
        return Ok(());
    }

    if args.autostart {
        app.start(args.run_config(), Instant::now())?;
    }

    let (sender, receiver) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if sender.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::error!(%error, "failed to read command");
                    break;
                }
            }
        }
    });

    let mut out = io::stdout().lock();
    run_console(&mut app, &fetcher, receiver, &mut out).await?;
    app.detach()?;
    Ok(())
}
