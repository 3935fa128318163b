//! Multi-architecture build-and-push through the buildx plugin.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::docker::merge_streams;
use super::{BuildBackend, BuildReport, BuildRequest};
use crate::constants::BUILDX_INSTANCE;

/// Builds for several architectures at once and pushes the result; nothing is
/// kept in the local image store. Needs the buildx plugin and a dedicated
/// builder instance, created on first use.
pub struct BuildxBackend;

impl BuildxBackend {
    /// Check the plugin and make sure the builder instance exists. Safe to
    /// call before every build; an existing instance is reused.
    async fn ensure_builder(&self) -> Result<()> {
        let version = Command::new("docker")
            .args(["buildx", "version"])
            .output()
            .await
            .context("cannot run docker buildx")?;
        if !version.status.success() {
            bail!("buildx plugin unavailable: {}", merge_streams(&version).trim());
        }

        let inspect = Command::new("docker")
            .args(["buildx", "inspect", BUILDX_INSTANCE])
            .output()
            .await
            .context("cannot inspect buildx builder")?;
        if !inspect.status.success() {
            let create = Command::new("docker")
                .args(["buildx", "create", "--name", BUILDX_INSTANCE])
                .output()
                .await
                .context("cannot create buildx builder")?;
            if !create.status.success() {
                bail!(
                    "cannot create builder {BUILDX_INSTANCE}: {}",
                    merge_streams(&create).trim()
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BuildBackend for BuildxBackend {
    async fn build(&self, request: &BuildRequest) -> Result<BuildReport> {
        self.ensure_builder().await?;

        let mut command = Command::new("docker");
        command
            .current_dir(&request.context)
            .args(["buildx", "build", "--builder", BUILDX_INSTANCE])
            .arg("--file")
            .arg(&request.dockerfile)
            .arg("--no-cache")
            .arg("--progress")
            .arg("plain")
            .arg("--push")
            .arg("--tag")
            .arg(&request.image);
        if let Some(arch) = &request.arch {
            command.arg("--platform").arg(arch);
        }
        for (key, value) in &request.build_args {
            command.arg("--build-arg").arg(format!("{key}={value}"));
        }
        for (key, value) in &request.labels {
            command.arg("--label").arg(format!("{key}={value}"));
        }
        command.arg(".");

        let output = command
            .output()
            .await
            .context("cannot run docker buildx build")?;
        Ok(BuildReport {
            success: output.status.success(),
            log: merge_streams(&output),
        })
    }
}
