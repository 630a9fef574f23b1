mod backend;
mod cli;
mod commands;
mod error_fmt;
mod logging;
mod rt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use sumo_core::error::SumoError;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::commands::Ctx;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let config_error = |e: eyre::Report| eyre::Report::new(SumoError::Config(format!("{e:#}")));
    let cfg = sumo_config::load_file(&cli.config).map_err(config_error)?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {:?}", cli.config))
        .map_err(config_error)?;
    logging::init(&cli.log_level, cli.json, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("install Ctrl-C handler")?;
    }

    let ctx = Ctx {
        cfg: &cfg,
        config_path: &cli.config,
        json: cli.json,
    };

    match cli.cmd {
        Commands::Run {
            ticks,
            no_countdown,
            rt,
            rt_prio,
            rt_lock,
        } => commands::run_round(&ctx, ticks, no_countdown, rt, rt_prio, rt_lock, shutdown),
        Commands::Sensors { samples } => commands::sensors(&ctx, samples, &shutdown),
        Commands::Motors { direction, ticks } => {
            commands::motors(&ctx, direction, ticks, &shutdown)
        }
        Commands::LineTable => commands::line_table(&ctx),
        Commands::LineReset => commands::line_reset(&ctx),
        Commands::LineCalibrate { levels } => commands::line_calibrate(&ctx, &levels),
        Commands::SelfCheck => commands::self_check(&ctx),
    }
}
