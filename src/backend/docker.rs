//! Single-architecture builds through the local container engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{BuildBackend, BuildReport, BuildRequest};

pub struct DockerBackend;

#[async_trait]
impl BuildBackend for DockerBackend {
    async fn build(&self, request: &BuildRequest) -> Result<BuildReport> {
        let mut command = Command::new("docker");
        command
            .arg("build")
            .arg("--file")
            .arg(&request.dockerfile)
            .arg("--tag")
            .arg(&request.image)
            .arg("--progress")
            .arg("plain");
        if let Some(arch) = &request.arch {
            command.arg("--platform").arg(arch);
        }
        for (key, value) in &request.build_args {
            command.arg("--build-arg").arg(format!("{key}={value}"));
        }
        for (key, value) in &request.labels {
            command.arg("--label").arg(format!("{key}={value}"));
        }
        command.arg(&request.context);

        let output = command.output().await.context("cannot run docker build")?;
        Ok(BuildReport {
            success: output.status.success(),
            log: merge_streams(&output),
        })
    }
}

/// Stitch stdout and stderr together; the engine splits progress and errors
/// across both.
pub(super) fn merge_streams(output: &std::process::Output) -> String {
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    log
}
