//! Recipe repository rooted at a local directory or a remote URL.
//!
//! Identifiers come from untrusted clients and chart references from recipe
//! authors, so every lookup goes through [`Repository::join`], which refuses
//! to leave a local root.

use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::http::client::{self, HyperClient};
use crate::model::{Recipe, RecipeError};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid repository root {0:?}")]
    Root(String),
    #[error("reference {0:?} escapes the repository root")]
    Escapes(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to fetch {0}: {1}")]
    Remote(String, String),
}

#[derive(Clone)]
pub struct Repository {
    base: Url,
    client: Option<HyperClient>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("base", &self.base.as_str()).finish()
    }
}

impl Repository {
    /// Canonicalizes `root`: local paths become absolute `file://` URLs and
    /// every root ends with a `/`.
    pub fn new(root: &str) -> Result<Self, RepositoryError> {
        let mut base = match parse_absolute(root) {
            Some(url) => url,
            None => local_root(Path::new(root))?,
        };
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = (base.scheme() != "file").then(client::create_client);
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn is_local(&self) -> bool {
        self.base.scheme() == "file"
    }

    /// Resolves `reference` against the root.
    ///
    /// Against a local root, relative references may not climb above the
    /// root and `file:` references are refused. Against a remote root,
    /// references follow normal URL resolution but may never point at local
    /// files.
    pub fn join(&self, reference: &str) -> Result<Url, RepositoryError> {
        let absolute = parse_absolute(reference);

        if self.is_local() {
            match absolute {
                Some(url) if url.scheme() == "file" => {
                    Err(RepositoryError::Escapes(reference.to_string()))
                }
                Some(url) => Ok(url),
                None => self.join_local(reference),
            }
        } else {
            match absolute {
                Some(url) if url.scheme() == "file" => {
                    Err(RepositoryError::Escapes(reference.to_string()))
                }
                Some(url) => Ok(url),
                None => self
                    .base
                    .join(reference)
                    .map_err(|_| RepositoryError::Escapes(reference.to_string())),
            }
        }
    }

    fn join_local(&self, reference: &str) -> Result<Url, RepositoryError> {
        let escapes = || RepositoryError::Escapes(reference.to_string());
        if reference.starts_with('/') || reference.contains(['\\', '?', '#']) {
            return Err(escapes());
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in reference.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop().ok_or_else(escapes)?;
                }
                s => segments.push(s),
            }
        }

        let joined = self.base.join(&segments.join("/")).map_err(|_| escapes())?;
        if joined.scheme() != "file" || !joined.path().starts_with(self.base.path()) {
            return Err(escapes());
        }
        Ok(joined)
    }

    /// Returns the text behind `reference`.
    pub async fn fetch(&self, reference: &str) -> Result<String, RepositoryError> {
        let url = self.join(reference)?;

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| RepositoryError::Escapes(reference.to_string()))?;
            return match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(RepositoryError::NotFound(url.to_string()))
                }
                Err(e) => Err(RepositoryError::Io(url.to_string(), e)),
            };
        }

        let client = match &self.client {
            Some(client) => client.clone(),
            None => client::create_client(),
        };
        let uri = client::to_uri(&url)
            .map_err(|e| RepositoryError::Remote(url.to_string(), e.to_string()))?;
        let (status, _, body) = client::get(&client, uri, FETCH_TIMEOUT)
            .await
            .map_err(|e| RepositoryError::Remote(url.to_string(), format!("{:#}", e)))?;

        match status {
            200..=299 => String::from_utf8(body.to_vec())
                .map_err(|e| RepositoryError::Remote(url.to_string(), e.to_string())),
            404 => Err(RepositoryError::NotFound(url.to_string())),
            other => Err(RepositoryError::Remote(
                url.to_string(),
                format!("unexpected status {}", other),
            )),
        }
    }

    /// Loads and validates the recipe `{id}.yaml`.
    pub async fn recipe(&self, id: Uuid) -> Result<Recipe, RecipeError> {
        let text = self.fetch(&format!("{}.yaml", id)).await?;
        Recipe::from_yaml(id, &text)
    }

    /// Where the recipe's chart package lives.
    pub fn chart_ref(&self, recipe: &Recipe) -> Result<Url, RepositoryError> {
        self.join(&recipe.chart_package())
    }
}

/// Parses references that carry a scheme. Single letter schemes are treated
/// as Windows drive letters, i.e. local paths.
fn parse_absolute(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if url.scheme().len() > 1 => Some(url),
        _ => None,
    }
}

fn local_root(path: &Path) -> Result<Url, RepositoryError> {
    let absolute: PathBuf = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => std::path::absolute(path)
            .map_err(|_| RepositoryError::Root(path.display().to_string()))?,
    };
    Url::from_directory_path(&absolute).map_err(|_| RepositoryError::Root(path.display().to_string()))
}
