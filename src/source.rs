//! Source acquisition and descriptor discovery.
//!
//! Each configured source is materialized into the run's scratch area, either
//! by copying a local tree or by cloning a repository. Discovery then walks
//! the marker directory and turns every subdirectory carrying a descriptor
//! file into one descriptor candidate.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::build::RepoBuilder;
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::{DESCRIPTOR_FILE, MARKER_DIR, SCRATCH_PREFIX};
use crate::descriptor::Descriptor;

/// Scratch area owning every materialized source and synthesized descriptor
/// for one run. The directory is deleted when the value drops, on success and
/// on failure alike.
pub struct Scratch {
    root: TempDir,
    counter: usize,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .context("cannot create scratch directory")?;
        Ok(Self { root, counter: 0 })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Next unused numbered directory beneath the scratch root.
    pub fn next_dir(&mut self) -> Result<PathBuf> {
        let dir = self.root.path().join(self.counter.to_string());
        self.counter += 1;
        fs::create_dir(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        Ok(dir)
    }
}

/// One configured input, a local tree or a git repository with an optional
/// revision selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    Git { url: String, revision: Option<String> },
}

impl Source {
    /// `path` for local trees, `url[ revision]` for repositories.
    pub fn parse(spec: &str) -> Self {
        if spec.contains(':') {
            let mut fields = spec.split_whitespace();
            let url = fields.next().unwrap_or(spec).to_string();
            let revision = fields.next().map(str::to_string);
            Source::Git { url, revision }
        } else {
            Source::Local(PathBuf::from(spec))
        }
    }

    /// Copy or clone the source into `target`.
    pub fn materialize(&self, target: &Path) -> Result<()> {
        match self {
            Source::Local(path) => copy_tree(path, target)
                .with_context(|| format!("cannot copy {}", path.display())),
            Source::Git { url, revision } => {
                let mut builder = RepoBuilder::new();
                if let Some(revision) = revision {
                    builder.branch(revision);
                }
                builder
                    .clone(url, target)
                    .with_context(|| format!("cannot clone {url}"))?;
                Ok(())
            }
        }
    }
}

/// Copy a directory tree, skipping hidden entries at every level.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let walker = WalkDir::new(from).min_depth(1).into_iter().filter_entry(|entry| {
        !entry.file_name().to_string_lossy().starts_with('.')
    });
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(from)?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// A materialized source that carries the marker directory.
#[derive(Debug)]
pub struct SourceTree {
    pub origin: String,
    pub root: PathBuf,
}

/// Materialize every configured source into the scratch area. A source
/// without a marker directory contributes nothing and is dropped again.
pub fn collect(specs: &[String], scratch: &mut Scratch) -> Result<Vec<SourceTree>> {
    let mut trees = Vec::new();
    for spec in specs {
        let target = scratch.next_dir()?;
        Source::parse(spec).materialize(&target)?;
        if target.join(MARKER_DIR).is_dir() {
            println!("  {spec}");
            trees.push(SourceTree {
                origin: spec.clone(),
                root: target,
            });
        } else {
            debug!("{spec} has no {MARKER_DIR} directory, dropped");
            fs::remove_dir_all(&target).ok();
        }
    }
    Ok(trees)
}

/// Find every descriptor beneath the tree's marker directory, named by its
/// subpath with separators replaced by dashes.
pub fn discover(tree: &SourceTree) -> Result<Vec<Descriptor>> {
    let root = tree.root.join(MARKER_DIR);
    let mut found = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() || !entry.path().join(DESCRIPTOR_FILE).is_file() {
            continue;
        }
        let subpath = entry.path().strip_prefix(&root)?.to_path_buf();
        let name = descriptor_name(&subpath);
        found.push(Descriptor::parse(&root, &subpath, &name)?);
    }
    Ok(found)
}

fn descriptor_name(subpath: &Path) -> String {
    let parts: Vec<String> = subpath
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_path() {
        assert_eq!(
            Source::parse("./images"),
            Source::Local(PathBuf::from("./images"))
        );
    }

    #[test]
    fn test_parse_url_with_revision() {
        assert_eq!(
            Source::parse("https://example.com/repo.git v1.2"),
            Source::Git {
                url: "https://example.com/repo.git".to_string(),
                revision: Some("v1.2".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_url_without_revision() {
        assert_eq!(
            Source::parse("https://example.com/repo.git"),
            Source::Git {
                url: "https://example.com/repo.git".to_string(),
                revision: None,
            }
        );
    }

    #[test]
    fn test_descriptor_name_joins_components() {
        assert_eq!(descriptor_name(Path::new("py/builder")), "py-builder");
        assert_eq!(descriptor_name(Path::new("base")), "base");
        assert_eq!(descriptor_name(Path::new("")), ".");
    }
}
