//! tg-indexer - CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tg_indexer::{
    cache::{CacheStore, FileCache},
    cli::{Args, Prompt, Session},
    config::{validate_config, Config, TransportKind},
    error::{exit_codes, Error, Result},
    fs::clean_part_files,
    output::{
        print_banner, print_config_summary, print_error, print_info, print_session_stats,
        print_success, print_warning,
    },
    transport::{ExportTransport, Transport, WebTransport},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_)
                | Error::UrlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Transport(_)
                | Error::ChannelUnreachable(_)
                | Error::MessageFetch(_)
                | Error::Http(_) => ExitCode::from(exit_codes::TRANSPORT_ERROR as u8),
                Error::DownloadFailed(_) | Error::InvalidFilename(_) => {
                    ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8)
                }
                Error::Cancelled | Error::InvalidSelection(_) => {
                    ExitCode::from(exit_codes::ABORT as u8)
                }
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        tracing::debug!(
            "Configuration file not found: {}, using defaults",
            args.config.display()
        );
        Config::default()
    };

    args.merge_into_config(&mut config);
    validate_config(&config)?;

    print_config_summary(
        &config.transport.kind.to_string(),
        &config.options.scan_mode.to_string(),
        &config.options.download_directory.display().to_string(),
    );

    let cache = FileCache::open(&config.options.cache_directory, config.cache_ttl())?;
    if args.clear_cache {
        cache.clear().await?;
        print_info("Channel cache cleared");
    }

    match clean_part_files(&config.options.download_directory) {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} leftover partial download(s)", n),
        Err(e) => tracing::warn!("Could not clean partial downloads: {}", e),
    }

    let transport = build_transport(&config)?;

    // Connect; this is the only fatal transport failure
    print_info(&format!("Connecting ({} transport)...", transport.name()));
    if !transport.connect().await? {
        return Err(Error::Transport("Connection refused by transport".into()));
    }
    print_success("Connected");

    let mut session = Session::new(
        transport.as_ref(),
        &cache,
        &config,
        args.force,
        args.refresh,
    )?;

    let result = match &args.channel {
        Some(channel) => session.run_once(channel, args.download.as_deref()).await,
        None => {
            let mut prompt = Prompt::new(tokio::io::stdin());
            session.run_interactive(&mut prompt).await
        }
    };

    print_session_stats(&session.stats);
    if session.stats.cancelled > 0 {
        print_warning("Some downloads were cancelled; partial files were removed");
    }

    result
}

fn build_transport(config: &Config) -> Result<Box<dyn Transport>> {
    Ok(match config.transport.kind {
        TransportKind::Web => Box::new(WebTransport::new(&config.transport)?),
        TransportKind::Export => {
            let dir = config
                .transport
                .export_dir
                .as_ref()
                .ok_or_else(|| Error::MissingConfig("export_dir".into()))?;
            Box::new(ExportTransport::open(dir)?)
        }
    })
}
