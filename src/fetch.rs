//! Artifact lookup and download.
//!
//! Artifacts are referred to by symbolic name and resolved to URLs through
//! the `autogen.json` catalog. Downloads go through curl (following
//! redirects, retrying on transient failures) and are either written to a
//! file or streamed straight into `tar` without staging the archive.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FetchOptions;
use crate::process::{quote_path, shell_quote, Cmd, CommandRunner, ProcessError};

/// Catalog file name inside the working directory.
pub const CATALOG_FILE_NAME: &str = "autogen.json";

/// GitLab project hosting the upstream wasi-sdk pipelines.
const UPSTREAM_PIPELINES_API: &str = "https://gitlab.haskell.org/api/v4/projects/3212/pipelines";
const UPSTREAM_JOBS_URL: &str = "https://gitlab.haskell.org/haskell-wasm/wasi-sdk/-/jobs";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("artifact '{name}' is not listed in {}", .catalog.display())]
    UnknownArtifact { name: String, catalog: PathBuf },

    #[error(
        "Cannot find the job with name \"{job}\" from the upstream WASI SDK pipeline {pipeline}."
    )]
    JobNotFound { job: String, pipeline: String },

    #[error("malformed job listing for upstream WASI SDK pipeline {pipeline}")]
    JobListing {
        pipeline: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    url: String,
}

/// Read-only map from artifact name to download URL.
#[derive(Debug, Clone)]
pub struct ArtifactCatalog {
    source: PathBuf,
    entries: BTreeMap<String, CatalogEntry>,
}

impl ArtifactCatalog {
    /// Load `<workdir>/autogen.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading artifact catalog '{}'", path.display()))?;
        Self::from_json(path.to_path_buf(), &text)
    }

    pub fn from_json(source: PathBuf, json: &str) -> Result<Self> {
        let entries = serde_json::from_str(json)
            .with_context(|| format!("parsing artifact catalog '{}'", source.display()))?;
        Ok(Self { source, entries })
    }

    pub fn url(&self, name: &str) -> Result<&str, FetchError> {
        self.entries
            .get(name)
            .map(|entry| entry.url.as_str())
            .ok_or_else(|| FetchError::UnknownArtifact {
                name: name.to_string(),
                catalog: self.source.clone(),
            })
    }
}

/// How a streamed download is unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// gzip tarball, top-level directory stripped.
    TarGz,
    /// xz tarball, top-level directory stripped.
    TarXz,
    /// A single member of an xz tarball.
    TarXzMember(String),
}

impl Extract {
    fn command(&self, dest: &Path) -> Result<String, ProcessError> {
        let dest = quote_path(dest)?;
        Ok(match self {
            Self::TarGz => format!("tar xz -C {dest} --no-same-owner --strip-components=1"),
            Self::TarXz => format!("tar xJ -C {dest} --no-same-owner --strip-components=1"),
            Self::TarXzMember(member) => {
                format!("tar xJ --no-same-owner -C {dest} {}", shell_quote(member)?)
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct PipelineJob {
    id: u64,
    name: String,
}

/// Downloads through curl using a [`CommandRunner`].
pub struct Fetcher<'a> {
    runner: &'a dyn CommandRunner,
    options: &'a FetchOptions,
}

impl<'a> Fetcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, options: &'a FetchOptions) -> Self {
        Self { runner, options }
    }

    fn curl(&self, url: &str) -> Result<String, ProcessError> {
        let mut line = format!("curl -f -L --retry {}", self.options.retries);
        if let Some(timeout) = self.options.connect_timeout {
            line.push_str(&format!(" --connect-timeout {}", timeout.as_secs()));
        }
        if let Some(max_time) = self.options.max_time {
            line.push_str(&format!(" --max-time {}", max_time.as_secs()));
        }
        line.push(' ');
        line.push_str(&shell_quote(url)?);
        Ok(line)
    }

    /// Download `url` into the file `dest`.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let line = format!("{} -o {}", self.curl(url)?, quote_path(dest)?);
        self.runner.run(&Cmd::shell(line), None)?;
        Ok(())
    }

    /// Stream `url` into an extraction command targeting `dest`.
    pub fn download_into(&self, url: &str, dest: &Path, extract: &Extract) -> Result<(), FetchError> {
        let line = format!("{} | {}", self.curl(url)?, extract.command(dest)?);
        self.runner.run(&Cmd::shell(line), None)?;
        Ok(())
    }

    /// Resolve the WASI SDK tarball of an upstream CI pipeline.
    ///
    /// Looks up the successful job named `job_name` in pipeline
    /// `pipeline_id` and points at `artifact_path` inside its artifacts.
    pub fn upstream_wasi_sdk_url(
        &self,
        pipeline_id: &str,
        job_name: &str,
        artifact_path: &str,
    ) -> Result<String, FetchError> {
        let listing_url = format!("{UPSTREAM_PIPELINES_API}/{pipeline_id}/jobs?scope[]=success");
        let body = self
            .runner
            .capture(&Cmd::shell(self.curl(&listing_url)?), None)?;
        let jobs: Vec<PipelineJob> =
            serde_json::from_str(&body).map_err(|source| FetchError::JobListing {
                pipeline: pipeline_id.to_string(),
                source,
            })?;

        let job = jobs
            .iter()
            .find(|job| job.name == job_name)
            .ok_or_else(|| FetchError::JobNotFound {
                job: job_name.to_string(),
                pipeline: pipeline_id.to_string(),
            })?;

        Ok(format!(
            "{UPSTREAM_JOBS_URL}/{}/artifacts/raw/{artifact_path}",
            job.id
        ))
    }
}
