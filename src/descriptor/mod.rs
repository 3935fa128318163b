use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::constants::{DESCRIPTOR_FILE, LABEL_LOCAL_CONTEXT, LABEL_OPTIONAL};

pub mod parser;
pub mod synth;

/// One build descriptor, discovered beneath a source's marker directory or
/// synthesized at run time.
///
/// `name` is the unique key for the whole run; discovered descriptors derive
/// it from the subpath below the marker directory with separators replaced by
/// dashes. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: String,
    /// Marker directory owning this descriptor tree.
    pub root: PathBuf,
    /// Full path of the descriptor file.
    pub path: PathBuf,
    /// Location below `root`; empty for a synthesized descriptor.
    pub subpath: PathBuf,
    /// Image references used as base images or copy-from sources.
    pub requires: BTreeSet<String>,
    /// Build argument names the descriptor declares.
    pub args: BTreeSet<String>,
    pub labels: BTreeMap<String, String>,
}

impl Descriptor {
    /// Parse the descriptor file at `root/subpath` under the name `name`.
    pub fn parse(root: &Path, subpath: &Path, name: &str) -> Result<Self> {
        let path = root.join(subpath).join(DESCRIPTOR_FILE);
        let directives = parser::parse_file(&path)?;
        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            path,
            subpath: subpath.to_path_buf(),
            requires: directives.requires,
            args: directives.args,
            labels: directives.labels,
        })
    }

    /// Build context shared with the rest of the source tree.
    pub fn context_root(&self) -> &Path {
        self.root.parent().unwrap_or(&self.root)
    }

    /// Whether the descriptor opted into its own directory as build context.
    pub fn local_context(&self) -> bool {
        self.labels
            .get(LABEL_LOCAL_CONTEXT)
            .is_some_and(|value| !value.is_empty())
    }

    /// Whether the descriptor is built only on request.
    pub fn optional(&self) -> bool {
        self.labels
            .get(LABEL_OPTIONAL)
            .is_some_and(|value| !value.is_empty())
    }
}
