//! End-to-end build run: sources in, built images out.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;

use anyhow::Result;

use crate::backend::{BuildBackend, BuildxBackend, DockerBackend, DryRunBackend};
use crate::config::Config;
use crate::naming::ImageNaming;
use crate::plan::{self, PlanOptions};
use crate::scheduler::{self, ScheduleOptions};
use crate::source::{self, Scratch};

/// Switches for one build run, straight off the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub sources: Vec<String>,
    pub final_name: String,
    pub get: Vec<String>,
    pub core_images: bool,
    pub keep_logs: bool,
    pub arch: Option<String>,
    pub build_optional: bool,
    pub jobs: Option<u32>,
    pub ignore: Vec<String>,
    pub enable: Vec<String>,
    pub dry_run: bool,
    pub buildx: bool,
}

/// Run the whole pipeline: materialize the sources, resolve the plan and
/// build every image in dependency order. The scratch area is removed on
/// every exit path.
pub async fn run_build(opts: &BuildOptions, config: &Config) -> Result<()> {
    let naming = ImageNaming::new(&config.registry, &config.namespace, &config.tag);
    let jobs = match opts.jobs {
        Some(jobs) => jobs.to_string(),
        None => thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .to_string(),
    };

    let build_args = BTreeMap::from([
        ("REGISTRY".to_string(), naming.registry.clone()),
        ("NAMESPACE".to_string(), naming.namespace.clone()),
        ("TAG".to_string(), naming.tag.clone()),
        ("BUILD_CORES".to_string(), jobs),
        ("VERSION".to_string(), naming.version.clone()),
    ]);

    let mut scratch = Scratch::new()?;

    println!("Sources:");
    let trees = source::collect(&opts.sources, &mut scratch)?;
    let mut discovered = Vec::new();
    for tree in &trees {
        discovered.extend(source::discover(tree)?);
    }

    let plan = plan::build_plan(
        discovered,
        &PlanOptions {
            ignore: opts.ignore.clone(),
            enable: opts.enable.clone(),
            build_optional: opts.build_optional,
            get: opts.get.clone(),
            core_images: opts.core_images,
            final_name: opts.final_name.clone(),
        },
        &naming,
        &build_args,
        &mut scratch,
    )?;

    let backend: Box<dyn BuildBackend> = if opts.dry_run {
        Box::new(DryRunBackend)
    } else if opts.buildx {
        Box::new(BuildxBackend)
    } else {
        Box::new(DockerBackend)
    };

    println!();
    println!("Build:");
    let schedule = ScheduleOptions {
        build_args,
        arch: opts.arch.clone(),
        keep_logs: opts.keep_logs,
        log_dir: PathBuf::from("."),
        version: naming.version.clone(),
    };
    scheduler::run(&plan, backend.as_ref(), &schedule).await?;
    println!("Build End");
    Ok(())
}
