//! Build backends: one image build per invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

pub mod buildx;
pub mod docker;

pub use buildx::BuildxBackend;
pub use docker::DockerBackend;

/// Everything one backend invocation needs to build a single image.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Fully qualified reference the result is tagged with.
    pub image: String,
    /// Build context directory.
    pub context: PathBuf,
    /// Descriptor file, absolute or relative to the context.
    pub dockerfile: PathBuf,
    /// Scoped argument values, already filtered to what the descriptor
    /// declares.
    pub build_args: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Target architecture(s), engine syntax.
    pub arch: Option<String>,
}

/// Captured outcome of one backend invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub success: bool,
    /// Combined output of the build, kept for the per-image log file.
    pub log: String,
}

#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Build one image. `Err` is reserved for infrastructure problems; a
    /// failed build comes back as an unsuccessful report with its log.
    async fn build(&self, request: &BuildRequest) -> Result<BuildReport>;
}

/// Replaces every build with an unconditional success, exercising resolution
/// and ordering without creating any images.
pub struct DryRunBackend;

#[async_trait]
impl BuildBackend for DryRunBackend {
    async fn build(&self, _request: &BuildRequest) -> Result<BuildReport> {
        Ok(BuildReport {
            success: true,
            log: String::new(),
        })
    }
}
