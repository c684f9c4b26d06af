/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::{NonZeroU16, NonZeroU8},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// App config
pub struct FicheConfig {
    /// Address the server binds to
    pub listen_addr: IpAddr,

    /// Port that can be used to bind server
    pub port: NonZeroU16,

    /// Domain printed in front of every returned paste path
    pub domain: String,

    /// Length of generated slugs
    pub slug_length: NonZeroU8,

    /// Directory pastes are written to
    pub out_dir: PathBuf,

    /// Dump every incoming request to the log
    pub debug: bool,

    /// What to do when a generated slug names an existing paste
    pub on_collision: CollisionPolicy,

    /// Slugs tried before giving up under [`CollisionPolicy::Regenerate`]
    pub max_slug_attempts: NonZeroU8,
}

impl FicheConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port.get())
    }
}

impl Default for FicheConfig {
    fn default() -> Self {
        Self {
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: NonZeroU16::new(9999).unwrap(),
            domain: "localhost".into(),
            slug_length: NonZeroU8::new(6).unwrap(),
            out_dir: PathBuf::from("pastes"),
            debug: false,
            on_collision: CollisionPolicy::default(),
            max_slug_attempts: NonZeroU8::new(8).unwrap(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Truncate whatever file already has the slug's name
    Overwrite,

    /// Draw a new slug until a free file name is found
    #[default]
    Regenerate,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("invalid config. {0}")]
    Invalid(#[from] toml::de::Error),

    #[error("unreadable config. {0}")]
    Unreadable(#[from] io::Error),
}

pub async fn load_config(path: impl AsRef<Path>) -> Result<FicheConfig, ConfigLoadError> {
    let data = fs::read_to_string(path).await?;

    Ok(toml::from_str(&data)?)
}

/// Write config as pretty toml
pub async fn write_config(path: impl AsRef<Path>, config: &FicheConfig) -> io::Result<()> {
    let data = toml::to_string_pretty(config)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    fs::write(path, data).await
}
