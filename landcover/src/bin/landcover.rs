use std::process;

use clap::Parser as _;
use landcover::LandCoverAppResult;
use landcover::config::args::{Args, Command, RenderArgs};
use landcover::config::read_config;
use landcover::env::{Env as _, OsEnv};
use landcover::logging::{core_log_filter, init_tracing};
use landcover::render::render_tiles;
use landcover_core::layer::LandCoverLayer;
use log::{Level, log_enabled};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn start(args: Args) -> LandCoverAppResult<()> {
    info!("Land cover renderer v{VERSION}");

    let env = OsEnv::default();
    info!("Using {}", args.meta.config.display());
    let mut config = read_config(&args.meta.config, &env)?;
    debug!("Config referenced environment variables {:?}", env.used_vars());

    args.merge_into_config(&mut config);
    config.finalize()?;
    let layer = config.resolve()?;

    if let Some(file_name) = &args.meta.save_config {
        config.save_to_file(file_name)?;
    }

    match args.command {
        Command::Coverages => {
            print_coverages(&layer);
            Ok(())
        }
        Command::Render(render) => render_command(&layer, render).await,
    }
}

fn print_coverages(layer: &LandCoverLayer) {
    let summaries = layer.coverage_summaries();
    if summaries.is_empty() {
        println!("No coverages are configured");
        return;
    }
    println!("Coverages from lowest to highest priority:");
    for s in summaries {
        println!(
            "  {id}: zoom {min}..={max}, {mapped} mapped codes in a table of {len}",
            id = s.id,
            min = s.min_zoom,
            max = s.max_zoom,
            mapped = s.mapped,
            len = s.table_len,
        );
    }
}

async fn render_command(layer: &LandCoverLayer, args: RenderArgs) -> LandCoverAppResult<()> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding tiles");
            on_ctrl_c.cancel();
        }
    });

    let progress = render_tiles(
        layer,
        &args.tiles,
        &args.output_dir,
        args.concurrency,
        args.keep_empty,
        &cancel,
    )
    .await?;
    info!(
        "Wrote {} tiles, skipped {} empty tiles",
        progress.written(),
        progress.empty()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let env = OsEnv::default();
    let filter = core_log_filter(env.get_env_str("RUST_LOG"));
    init_tracing(&filter, env.get_env_str("LANDCOVER_FORMAT"));

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        process::exit(1);
    }
}
