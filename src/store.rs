/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

use std::{
    io::{self, ErrorKind},
    num::NonZeroU8,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::{
    fs::{self, DirBuilder, OpenOptions},
    io::AsyncWriteExt,
};

use crate::{
    config::{CollisionPolicy, FicheConfig},
    constants,
    slug::Slug,
};

#[derive(Debug, Clone)]
pub struct PasteStore {
    out_dir: PathBuf,
    slug_length: NonZeroU8,
    on_collision: CollisionPolicy,
    max_attempts: NonZeroU8,
}

impl PasteStore {
    pub fn new(config: &FicheConfig) -> Self {
        Self {
            out_dir: config.out_dir.clone(),
            slug_length: config.slug_length,
            on_collision: config.on_collision,
            max_attempts: config.max_slug_attempts,
        }
    }

    /// Store content under a fresh slug and return the written path
    pub async fn store(&self, content: &[u8]) -> Result<PathBuf, StoreError> {
        self.ensure_dir().await?;

        let attempts = match self.on_collision {
            CollisionPolicy::Overwrite => 1,
            CollisionPolicy::Regenerate => self.max_attempts.get(),
        };

        for _ in 0..attempts {
            let slug = Slug::generate(self.slug_length);

            if let Some(path) = self.try_store(&slug, content).await? {
                return Ok(path);
            }

            log::debug!("Slug {} already taken, drawing another", slug);
        }

        Err(StoreError::SlugExhausted { attempts })
    }

    /// Create output directory and any missing parents. Succeeds if it already exists.
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o777);

        builder
            .create(&self.out_dir)
            .await
            .map_err(|source| StoreError::DirectoryCreate {
                path: self.out_dir.clone(),
                source,
            })
    }

    fn paste_path(&self, slug: &Slug) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", slug, constants::PASTE_EXTENSION))
    }

    /// Write content under `slug`.
    ///
    /// Returns `None` if the file exists and the policy forbids overwriting it.
    async fn try_store(&self, slug: &Slug, content: &[u8]) -> Result<Option<PathBuf>, StoreError> {
        let path = self.paste_path(slug);

        let mut options = OpenOptions::new();
        options.write(true);
        match self.on_collision {
            CollisionPolicy::Overwrite => options.create(true).truncate(true),
            CollisionPolicy::Regenerate => options.create_new(true),
        };

        let mut file = match options.open(&path).await {
            Ok(file) => file,
            Err(err)
                if err.kind() == ErrorKind::AlreadyExists
                    && self.on_collision == CollisionPolicy::Regenerate =>
            {
                return Ok(None)
            }
            Err(source) => return Err(StoreError::Write { path, source }),
        };

        let written = async {
            file.write_all(content).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(Some(path)),
            Err(source) => {
                self.abandon(&path).await;
                Err(StoreError::Write { path, source })
            }
        }
    }

    /// Drop a half written paste this store created, so its slug stays free
    async fn abandon(&self, path: &Path) {
        if self.on_collision != CollisionPolicy::Regenerate {
            return;
        }

        if let Err(err) = fs::remove_file(path).await {
            log::warn!("Could not remove partial paste {}. {}", path.display(), err);
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not create paste directory {}. {source}", path.display())]
    DirectoryCreate { path: PathBuf, source: io::Error },

    #[error("could not write paste {}. {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("no free slug found after {attempts} attempts")]
    SlugExhausted { attempts: u8 },
}
