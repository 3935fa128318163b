//! Resolution of the discovered descriptor set into a build plan.
//!
//! Filters the active descriptors, derives the core/library taxonomy,
//! synthesizes the requested aggregates and renders the fully qualified
//! reference of every image the run will produce.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use glob::Pattern;

use crate::constants::{CORE_SUFFIX, IMPLICIT_CORE, LIB_SUFFIX, NO_FINAL_IMAGE};
use crate::descriptor::{synth, Descriptor};
use crate::error::Error;
use crate::naming::ImageNaming;
use crate::source::Scratch;
use crate::taxonomy::{self, Taxonomy};

/// Selection and synthesis switches for one plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Wildcard patterns of names never built.
    pub ignore: Vec<String>,
    /// Wildcard patterns turning optional descriptors on.
    pub enable: Vec<String>,
    /// Build optional descriptors unconditionally.
    pub build_optional: bool,
    /// Explicitly requested components, with or without suffix.
    pub get: Vec<String>,
    /// Synthesize one standalone aggregate per core.
    pub core_images: bool,
    /// Name of the final combined aggregate, `-` to skip it.
    pub final_name: String,
}

/// The resolved graph: descriptors in discovery order, their fully qualified
/// references and the set of references produced this run.
#[derive(Debug, Default)]
pub struct Plan {
    pub descriptors: Vec<Descriptor>,
    pub refs: HashMap<String, String>,
    pub images: HashSet<String>,
    pub taxonomy: Taxonomy,
}

/// Compile wildcard patterns, rejecting malformed ones up front.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| {
                Error::BadPattern {
                    pattern: pattern.clone(),
                }
                .into()
            })
        })
        .collect()
}

/// Resolve `discovered` plus the synthesized aggregates into a plan.
///
/// Descriptor names are unique across the whole run; a duplicate is fatal,
/// even between an ignored and an active descriptor.
pub fn build_plan(
    discovered: Vec<Descriptor>,
    opts: &PlanOptions,
    naming: &ImageNaming,
    build_args: &BTreeMap<String, String>,
    scratch: &mut Scratch,
) -> Result<Plan> {
    let ignore = compile_patterns(&opts.ignore)?;
    let enable = compile_patterns(&opts.enable)?;

    let mut descriptors: Vec<Descriptor> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut active: HashSet<String> = HashSet::new();

    println!();
    println!("Dockerfiles:");
    for descriptor in discovered {
        if !seen.insert(descriptor.name.clone()) {
            return Err(Error::DuplicateDescriptor {
                name: descriptor.name,
            }
            .into());
        }
        let ignored = ignore.iter().any(|pattern| pattern.matches(&descriptor.name));
        let enabled = enable.iter().any(|pattern| pattern.matches(&descriptor.name));
        if ignored || (descriptor.optional() && !opts.build_optional && !enabled) {
            println!("  {} #ignored", descriptor.subpath.display());
            continue;
        }
        println!("  {}", descriptor.subpath.display());
        active.insert(descriptor.name.clone());
        descriptors.push(descriptor);
    }

    let requested: Vec<String> = opts
        .get
        .iter()
        .map(|request| taxonomy::normalize_request(request))
        .collect();
    let mut names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    names.extend(requested.iter().map(String::as_str));
    let taxonomy = taxonomy::classify(names)?;

    println!();
    println!("Cores:");
    for core in &taxonomy.cores {
        if active.contains(&format!("{core}{CORE_SUFFIX}")) {
            println!("  {core}");
        } else {
            println!("  {core} #no sources");
        }
    }

    println!();
    println!("Libs:");
    for (core, libs) in &taxonomy.libs {
        for lib in libs {
            if active.contains(&format!("{core}-{lib}{LIB_SUFFIX}")) {
                println!("  {lib} ({core})");
            } else {
                println!("  {lib} ({core}) #no sources");
            }
        }
    }

    if opts.core_images {
        for core in &taxonomy.cores {
            let mut components = vec![IMPLICIT_CORE.to_string(), core.clone()];
            components.dedup();
            let dir = scratch.next_dir()?;
            let aggregate = synth::synthesize(&dir, core, &components, &taxonomy.libs, build_args)?;
            insert(&mut descriptors, &mut seen, aggregate)?;
        }
    }
    if opts.final_name != NO_FINAL_IMAGE {
        let dir = scratch.next_dir()?;
        let aggregate = synth::synthesize(
            &dir,
            &opts.final_name,
            &taxonomy.cores,
            &taxonomy.libs,
            build_args,
        )?;
        insert(&mut descriptors, &mut seen, aggregate)?;
    }

    println!();
    println!("Images:");
    let mut refs = HashMap::new();
    let mut images = HashSet::new();
    for descriptor in &descriptors {
        let image = naming.qualify(&descriptor.name);
        println!("  {image}");
        images.insert(image.clone());
        refs.insert(descriptor.name.clone(), image);
    }

    Ok(Plan {
        descriptors,
        refs,
        images,
        taxonomy,
    })
}

fn insert(
    descriptors: &mut Vec<Descriptor>,
    seen: &mut HashSet<String>,
    descriptor: Descriptor,
) -> Result<()> {
    if !seen.insert(descriptor.name.clone()) {
        return Err(Error::DuplicateDescriptor {
            name: descriptor.name,
        }
        .into());
    }
    descriptors.push(descriptor);
    Ok(())
}
