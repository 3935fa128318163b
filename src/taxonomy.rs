//! Core / library naming taxonomy.
//!
//! A name ending in `-builder` contributes a core component; a compound name
//! of the form `<core>-<lib>-lib`, possibly chained with further `-lib`
//! segments, contributes libraries attached to that core.

use std::collections::BTreeMap;

use crate::constants::{CORE_SUFFIX, IMPLICIT_CORE, LIB_SUFFIX};
use crate::error::Error;

/// Cores and their libraries resolved from a raw name list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    /// Sorted, duplicate-free core names.
    pub cores: Vec<String>,
    /// Core name to its sorted, duplicate-free library names.
    pub libs: BTreeMap<String, Vec<String>>,
}

/// Requests without a recognized suffix refer to the component's builder.
pub fn normalize_request(name: &str) -> String {
    if name.ends_with(CORE_SUFFIX) || name.ends_with(LIB_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{CORE_SUFFIX}")
    }
}

/// Classify `names` into cores and per-core library lists.
///
/// Once any core exists, the implicit base core is part of the result.
pub fn classify<I, S>(names: I) -> Result<Taxonomy, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cores: Vec<String> = Vec::new();
    let mut libs: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in names {
        let name = name.as_ref();
        if let Some(core) = name.strip_suffix(CORE_SUFFIX) {
            cores.push(core.to_string());
        } else if name.ends_with(LIB_SUFFIX) {
            let (core, chain) = parse_lib_chain(name)?;
            if !libs.contains_key(&core) {
                cores.push(core.clone());
            }
            libs.entry(core).or_default().extend(chain);
        }
    }

    if !cores.is_empty() && !cores.iter().any(|core| core == IMPLICIT_CORE) {
        cores.push(IMPLICIT_CORE.to_string());
    }
    cores.sort();
    cores.dedup();
    for list in libs.values_mut() {
        list.sort();
        list.dedup();
    }

    Ok(Taxonomy { cores, libs })
}

/// Split a compound `<core>-<lib>-lib[-<lib>-lib…]` name into its core and
/// the chain of library names it denotes. Each chained segment repeats the
/// whole prefix so the list stays aligned with the on-disk descriptor names.
fn parse_lib_chain(name: &str) -> Result<(String, Vec<String>), Error> {
    let bad = || Error::BadLibName {
        name: name.to_string(),
    };
    let (head, mut rest) = name.split_once(LIB_SUFFIX).ok_or_else(bad)?;
    let (core, first) = head.rsplit_once('-').ok_or_else(bad)?;
    if core.is_empty() || first.is_empty() {
        return Err(bad());
    }
    let mut lib_name = first.to_string();
    let mut chain = vec![lib_name.clone()];
    while !rest.is_empty() {
        let (segment, remainder) = rest.split_once(LIB_SUFFIX).ok_or_else(bad)?;
        lib_name.push_str(LIB_SUFFIX);
        lib_name.push_str(segment);
        chain.push(lib_name.clone());
        rest = remainder;
    }
    Ok((core.to_string(), chain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_suffix_contributes_core() {
        let taxonomy = classify(["py-builder"]).unwrap();
        assert_eq!(taxonomy.cores, vec!["base", "py"]);
        assert!(taxonomy.libs.is_empty());
    }

    #[test]
    fn test_base_is_implicit_once_any_core_exists() {
        assert!(classify(Vec::<&str>::new()).unwrap().cores.is_empty());
        let taxonomy = classify(["cpp-builder"]).unwrap();
        assert!(taxonomy.cores.iter().any(|c| c == "base"));
    }

    #[test]
    fn test_lib_name_attaches_to_core() {
        let taxonomy = classify(["py-numpy-lib"]).unwrap();
        assert_eq!(taxonomy.cores, vec!["base", "py"]);
        assert_eq!(taxonomy.libs["py"], vec!["numpy"]);
    }

    #[test]
    fn test_chained_lib_names() {
        let taxonomy = classify(["py-numpy-lib-extra-lib"]).unwrap();
        assert_eq!(taxonomy.libs["py"], vec!["numpy", "numpy-lib-extra"]);
    }

    #[test]
    fn test_libs_are_sorted_and_deduplicated() {
        let taxonomy = classify(["py-zlib-lib", "py-abc-lib", "py-abc-lib"]).unwrap();
        assert_eq!(taxonomy.libs["py"], vec!["abc", "zlib"]);
    }

    #[test]
    fn test_lib_without_core_is_rejected() {
        let err = classify(["numpy-lib"]).unwrap_err();
        assert!(matches!(err, Error::BadLibName { name } if name == "numpy-lib"));
    }

    #[test]
    fn test_chain_with_stray_tail_is_rejected() {
        assert!(matches!(
            parse_lib_chain("py-a-lib-b"),
            Err(Error::BadLibName { .. })
        ));
    }

    #[test]
    fn test_name_without_recognized_suffix_is_ignored() {
        let taxonomy = classify(["py-numpy-lib-extra"]).unwrap();
        assert!(taxonomy.cores.is_empty());
        assert!(taxonomy.libs.is_empty());
    }

    #[test]
    fn test_normalize_request() {
        assert_eq!(normalize_request("py"), "py-builder");
        assert_eq!(normalize_request("py-builder"), "py-builder");
        assert_eq!(normalize_request("py-numpy-lib"), "py-numpy-lib");
    }
}
