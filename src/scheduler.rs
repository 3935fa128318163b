//! Dependency-ordered build execution.
//!
//! Repeated readiness passes over the pending descriptors: a node is ready
//! once every dependency that this run produces (and that is not the node's
//! own reference) has been built. The first backend failure stops the run; a
//! pass that builds nothing means the remaining nodes block each other and a
//! cycle trace is reported.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;

use crate::backend::{BuildBackend, BuildRequest};
use crate::constants::{DESCRIPTOR_FILE, LABEL_VERSION};
use crate::descriptor::Descriptor;
use crate::error::Error;
use crate::naming::expand_vars;
use crate::plan::Plan;

/// Execution switches for one scheduled run.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Global build-argument universe; a node receives only the keys it
    /// declares.
    pub build_args: BTreeMap<String, String>,
    /// Target architecture(s) handed to the backend.
    pub arch: Option<String>,
    /// Dump a log for successful builds too, not only failures.
    pub keep_logs: bool,
    /// Directory receiving per-image build logs.
    pub log_dir: PathBuf,
    /// Value of the version label stamped on every image.
    pub version: String,
}

/// Build every plan node in dependency order, aborting on the first failure.
///
/// Returns the image references in the order they were built.
pub async fn run(
    plan: &Plan,
    backend: &dyn BuildBackend,
    opts: &ScheduleOptions,
) -> Result<Vec<String>> {
    let mut built: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();

    // pass cap guarantees termination even if readiness detection misbehaves
    let mut passes = plan.descriptors.len() + 1;
    while built.len() != plan.descriptors.len() {
        if passes == 0 {
            return Err(stalled(plan, &built, opts).into());
        }
        passes -= 1;
        let before = built.len();
        for descriptor in &plan.descriptors {
            let image = &plan.refs[&descriptor.name];
            if built.contains(image) {
                continue;
            }
            let vars = node_vars(descriptor, &opts.build_args);
            if blocked(descriptor, image, &vars, plan, &built) {
                continue;
            }
            dispatch(descriptor, image, &vars, backend, opts).await?;
            built.insert(image.clone());
            order.push(image.clone());
        }
        if built.len() == before && built.len() != plan.descriptors.len() {
            return Err(stalled(plan, &built, opts).into());
        }
    }
    Ok(order)
}

/// The argument universe visible to one node. Nodes building from the shared
/// context get the location of their own descriptor directory injected.
fn node_vars(
    descriptor: &Descriptor,
    global: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut vars = global.clone();
    if !descriptor.local_context() {
        let dir = descriptor_dir(descriptor);
        vars.insert("DOCK_DIR".to_string(), dir.clone());
        // legacy alias kept for older descriptors
        vars.insert("RELPATH".to_string(), dir);
    }
    vars
}

/// Descriptor directory relative to the shared build context, with a trailing
/// separator.
fn descriptor_dir(descriptor: &Descriptor) -> String {
    let relative = descriptor
        .path
        .strip_prefix(descriptor.context_root())
        .unwrap_or(&descriptor.path);
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    let mut dir = parent.to_string_lossy().replace('\\', "/");
    if !dir.ends_with('/') {
        dir.push('/');
    }
    dir
}

fn blocked(
    descriptor: &Descriptor,
    image: &str,
    vars: &BTreeMap<String, String>,
    plan: &Plan,
    built: &HashSet<String>,
) -> bool {
    descriptor.requires.iter().any(|raw| {
        let dep = expand_vars(raw, vars);
        plan.images.contains(&dep) && !built.contains(&dep) && dep != image
    })
}

async fn dispatch(
    descriptor: &Descriptor,
    image: &str,
    vars: &BTreeMap<String, String>,
    backend: &dyn BuildBackend,
    opts: &ScheduleOptions,
) -> Result<()> {
    let (context, dockerfile) = if descriptor.local_context() {
        (
            descriptor
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
            PathBuf::from(DESCRIPTOR_FILE),
        )
    } else {
        (descriptor.context_root().to_path_buf(), descriptor.path.clone())
    };

    // only declared arguments reach the build; nothing leaks across nodes
    let build_args: BTreeMap<String, String> = vars
        .iter()
        .filter(|(key, _)| descriptor.args.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let labels = BTreeMap::from([(LABEL_VERSION.to_string(), opts.version.clone())]);

    print!("  {image}...");
    std::io::stdout().flush().ok();

    let request = BuildRequest {
        image: image.to_string(),
        context,
        dockerfile,
        build_args,
        labels,
        arch: opts.arch.clone(),
    };
    let report = backend.build(&request).await?;
    let log_path = opts.log_dir.join(format!("{}.log", descriptor.name));

    if report.success {
        println!("{}", "OK".green());
        if opts.keep_logs {
            dump_log(&log_path, &report.log, None)?;
        }
        Ok(())
    } else {
        println!("{} -> {}", "ERROR".red(), log_path.display());
        let hint = remediation_hint(&report.log);
        dump_log(&log_path, &report.log, hint.as_deref())?;
        Err(Error::BuildFailed {
            image: image.to_string(),
            log: log_path.display().to_string(),
        }
        .into())
    }
}

/// Recognize a missing-upstream-image diagnostic and point at the fix.
fn remediation_hint(log: &str) -> Option<String> {
    let pattern = Regex::new(r"manifest for (\S+) not found").ok()?;
    let capture = pattern.captures(log)?;
    Some(format!(
        "\n{} required, use -s/--source to add its Dockerfile",
        &capture[1]
    ))
}

/// Write a build log, stripped of ANSI color codes.
fn dump_log(path: &Path, log: &str, extra: Option<&str>) -> Result<()> {
    let strip = Regex::new("\u{1b}\\[[0-9;]*m").context("invalid color pattern")?;
    let mut text = strip.replace_all(log, "").into_owned();
    if let Some(extra) = extra {
        text.push_str(extra);
    }
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A full pass built nothing: the pending nodes block each other. Trace the
/// cycle so the report names the exact path.
fn stalled(plan: &Plan, built: &HashSet<String>, opts: &ScheduleOptions) -> Error {
    let by_image: HashMap<&str, &str> = plan
        .refs
        .iter()
        .map(|(name, image)| (image.as_str(), name.as_str()))
        .collect();

    let mut pending: Vec<&str> = Vec::new();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for descriptor in &plan.descriptors {
        let image = plan.refs[&descriptor.name].as_str();
        if built.contains(image) {
            continue;
        }
        pending.push(descriptor.name.as_str());
        let vars = node_vars(descriptor, &opts.build_args);
        let deps: Vec<&str> = descriptor
            .requires
            .iter()
            .filter_map(|raw| {
                let dep = expand_vars(raw, &vars);
                if plan.images.contains(&dep) && !built.contains(&dep) && dep != image {
                    by_image.get(dep.as_str()).copied()
                } else {
                    None
                }
            })
            .collect();
        edges.insert(descriptor.name.as_str(), deps);
    }

    match find_cycle(&pending, &edges) {
        Some(path) => Error::DependencyCycle {
            path: path.join(" -> "),
        },
        None => Error::DependencyCycle {
            path: pending.first().copied().unwrap_or_default().to_string(),
        },
    }
}

/// Depth-first traversal with white/gray/black coloring; returns the first
/// cycle found, closed on its entry node.
fn find_cycle<'a>(
    pending: &[&'a str],
    edges: &HashMap<&'a str, Vec<&'a str>>,
) -> Option<Vec<&'a str>> {
    let mut color: HashMap<&str, Color> =
        pending.iter().map(|name| (*name, Color::White)).collect();
    for &node in pending {
        if color.get(node) == Some(&Color::White) {
            let mut stack = Vec::new();
            if let Some(path) = visit(node, edges, &mut color, &mut stack) {
                return Some(path);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    color: &mut HashMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    color.insert(node, Color::Gray);
    stack.push(node);
    for &dep in edges.get(node).into_iter().flatten() {
        match color.get(dep).copied().unwrap_or(Color::Black) {
            Color::Gray => {
                let start = stack.iter().position(|name| *name == dep).unwrap_or(0);
                let mut path: Vec<&str> = stack[start..].to_vec();
                path.push(dep);
                return Some(path);
            }
            Color::White => {
                if let Some(path) = visit(dep, edges, color, stack) {
                    return Some(path);
                }
            }
            Color::Black => {}
        }
    }
    stack.pop();
    color.insert(node, Color::Black);
    None
}
