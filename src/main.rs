/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

pub mod app;
pub mod config;
pub mod constants;
pub mod counter;
pub mod slug;
pub mod store;

use std::{
    env,
    io::ErrorKind,
    net::IpAddr,
    num::{NonZeroU16, NonZeroU8},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use config::{load_config, write_config, ConfigLoadError, FicheConfig};

use crate::app::Fiche;

/// Command line pastebin. POST anything, get a link back.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file, written with defaults when missing
    #[arg(long, default_value = constants::CONFIG_FILE)]
    config: PathBuf,

    /// Address on which fiche is waiting for connections
    #[arg(long)]
    listen: Option<IpAddr>,

    /// Port the server will listen on
    #[arg(long)]
    port: Option<NonZeroU16>,

    /// Domain used in output lines
    #[arg(long)]
    domain: Option<String>,

    /// Length of the randomly-generated slug
    #[arg(long = "slug")]
    slug_length: Option<NonZeroU8>,

    /// Directory pastes are written to
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Show additional server side logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Override config file values with given flags
    fn apply(self, config: &mut FicheConfig) {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(domain) = self.domain {
            config.domain = domain;
        }
        if let Some(slug_length) = self.slug_length {
            config.slug_length = slug_length;
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        config.debug |= self.debug;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.debug);

    log::info!("Initializing fiche...");
    let mut config = match load_config(&cli.config).await {
        Ok(config) => config,

        Err(ConfigLoadError::Unreadable(err)) => {
            log::warn!("Config is unreadable. Using default config. {}", err);

            let config = FicheConfig::default();

            if err.kind() == ErrorKind::NotFound {
                log::info!("Creating default config...");
                if let Err(write_err) = write_config(&cli.config, &config).await {
                    log::warn!("Cannot write default config. {}", write_err);
                } else {
                    log::info!("Default config written to {}", cli.config.display());
                }
            }

            config
        }

        Err(err @ ConfigLoadError::Invalid(_)) => {
            return Err(err).with_context(|| {
                format!(
                    "{} is corrupted or not in right format. Please fix or delete it and restart",
                    cli.config.display()
                )
            });
        }
    };
    cli.apply(&mut config);

    let listener = app::bind(config.bind_addr()).await?;
    let app = Arc::new(Fiche::new(config));

    log::info!(
        "Server starting on {}, answering as {}:{}, writing pastes to {}",
        listener.local_addr()?,
        app.config().domain,
        app.config().port,
        app.config().out_dir.display()
    );

    app.run(listener, shutdown_signal()).await?;
    log::info!("Server closed");

    Ok(())
}

fn init_logger(debug: bool) {
    if let Some(level) = logger_level(env::var("APP_LOG").ok().as_deref(), debug) {
        env::set_var("APP_LOG", level);
    }

    pretty_env_logger::init_custom_env("APP_LOG");
}

/// Filter to install in `APP_LOG`. `None` keeps the current one.
fn logger_level(current: Option<&str>, debug: bool) -> Option<&'static str> {
    match current {
        Some(filter) if !debug || is_verbose(filter) => None,
        _ if cfg!(debug_assertions) => Some("trace"),
        _ if debug => Some("debug"),
        _ => Some("info"),
    }
}

/// Whether any directive of an env_logger filter enables debug or trace
fn is_verbose(filter: &str) -> bool {
    filter.split(',').any(|directive| {
        let level = directive.rsplit('=').next().unwrap_or_default().trim();

        level.eq_ignore_ascii_case("debug") || level.eq_ignore_ascii_case("trace")
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl+C. {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::error!("Cannot listen for SIGTERM. {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{logger_level, Cli};
    use crate::config::FicheConfig;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "fiche",
            "--port",
            "8080",
            "--slug",
            "10",
            "--domain",
            "paste.example.com",
            "--out-dir",
            "/srv/pastes",
            "--debug",
        ])
        .unwrap();
        let mut config = FicheConfig::default();

        cli.apply(&mut config);

        assert_eq!(config.port.get(), 8080);
        assert_eq!(config.slug_length.get(), 10);
        assert_eq!(config.domain, "paste.example.com");
        assert_eq!(config.out_dir.to_str(), Some("/srv/pastes"));
        assert!(config.debug);
        assert_eq!(config.listen_addr, FicheConfig::default().listen_addr);
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["fiche"]).unwrap();
        let mut config = FicheConfig {
            debug: true,
            ..Default::default()
        };

        cli.apply(&mut config);

        assert!(config.debug);
        assert_eq!(config.port.get(), 9999);
    }

    #[test]
    fn zero_slug_flag_is_rejected() {
        assert!(Cli::try_parse_from(["fiche", "--slug", "0"]).is_err());
    }

    #[test]
    fn debug_keeps_verbose_filter() {
        assert_eq!(logger_level(Some("trace"), true), None);
        assert_eq!(logger_level(Some("info,fiche=debug"), true), None);
    }

    #[test]
    fn debug_raises_quiet_filter() {
        let level = logger_level(Some("warn"), true).unwrap();

        assert!(level == "debug" || level == "trace");
    }

    #[test]
    fn user_filter_kept_without_debug() {
        assert_eq!(logger_level(Some("warn"), false), None);
        assert!(logger_level(None, false).is_some());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;

        Cli::command().debug_assert();
    }
}
