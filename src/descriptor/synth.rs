//! Run-time generation of aggregate descriptors.
//!
//! An aggregate stacks a list of component images (and their libraries) on
//! top of the template image without requiring an on-disk descriptor. The
//! generated body goes through the regular directive scan so aggregates
//! behave exactly like discovered descriptors from there on.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::constants::{AGGREGATE_BASE, DEFAULT_NAMESPACE, DESCRIPTOR_FILE, MARKER_DIR};
use crate::descriptor::Descriptor;
use crate::error::Error;

/// One copy-from-and-install block per stacked component. Libraries reuse the
/// same block with the `-builder` suffix swapped for `-lib`.
const COMPONENT_TEMPLATE: &str = "
COPY --from=${REGISTRY}${NAMESPACE}${CORE}-builder${TAG} ${STACK_HOME} ${STACK_HOME}
RUN ${STACK_HOME}/bin/stack-${CORE}-install.sh && \\
    rm -f ${STACK_HOME}/bin/stack-${CORE}-install.sh
";

fn base_reference() -> String {
    format!("${{REGISTRY}}${{NAMESPACE}}{AGGREGATE_BASE}${{TAG}}")
}

fn header() -> String {
    format!(
        "ARG REGISTRY=\"\"\nARG NAMESPACE=\"{DEFAULT_NAMESPACE}/\"\nARG TAG=\"\"\nFROM {}\n",
        base_reference()
    )
}

/// Substitute run build-argument values into generated text. Placeholders
/// without a value (like STACK_HOME) stay templated for the runtime build.
fn substitute(text: &str, build_args: &BTreeMap<String, String>) -> String {
    let mut text = text.to_string();
    for (arg, value) in build_args {
        text = text.replace(&format!("${{{arg}}}"), value);
    }
    text
}

/// Generate an aggregate descriptor named `name` stacking `components` and
/// their libraries, written beneath `dir` and re-read through the directive
/// scan.
///
/// The scanned dependencies must line up with the component list the body was
/// generated from; anything else is an internal invariant violation.
pub fn synthesize(
    dir: &Path,
    name: &str,
    components: &[String],
    libs: &BTreeMap<String, Vec<String>>,
    build_args: &BTreeMap<String, String>,
) -> Result<Descriptor> {
    let lib_template = COMPONENT_TEMPLATE.replace("-builder", "-lib");

    let mut expected: BTreeSet<String> = BTreeSet::new();
    expected.insert(base_reference());

    let mut body = String::new();
    for component in components {
        body.push_str(&COMPONENT_TEMPLATE.replace("${CORE}", component));
        expected.insert(substitute(
            &format!("${{REGISTRY}}${{NAMESPACE}}{component}-builder${{TAG}}"),
            build_args,
        ));
        for lib in libs.get(component).map(Vec::as_slice).unwrap_or_default() {
            let compound = format!("{component}-{lib}");
            body.push_str(&lib_template.replace("${CORE}", &compound));
            expected.insert(substitute(
                &format!("${{REGISTRY}}${{NAMESPACE}}{compound}-lib${{TAG}}"),
                build_args,
            ));
        }
    }
    let body = substitute(&body, build_args);

    let root = dir.join(MARKER_DIR);
    fs::create_dir_all(&root)
        .with_context(|| format!("cannot create {}", root.display()))?;
    fs::write(root.join(DESCRIPTOR_FILE), format!("{}{}", header(), body))
        .with_context(|| format!("cannot write aggregate descriptor {name}"))?;

    let descriptor = Descriptor::parse(&root, Path::new(""), name)?;
    if descriptor.requires != expected {
        return Err(Error::AggregateMismatch {
            name: name.to_string(),
            detail: format!("expected {:?}, got {:?}", expected, descriptor.requires),
        }
        .into());
    }
    Ok(descriptor)
}
