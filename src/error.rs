/// stackbuild error types
///
/// Fatal error classes raised by the build pipeline. Warnings (an unparseable
/// directive line, a source without descriptors) are logged and never surface
/// here.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Two sources (or a source and a synthesized aggregate) resolved to the
    /// same descriptor name.
    #[error("{name} is defined multiple times")]
    DuplicateDescriptor { name: String },

    /// A compound library name that cannot be split into core and libraries.
    #[error("{name} is a bad lib name")]
    BadLibName { name: String },

    /// An ignore/enable/filter pattern that is not a valid wildcard.
    #[error("{pattern} is not a valid wildcard pattern")]
    BadPattern { pattern: String },

    /// A full scheduling pass built nothing; `path` names the traced cycle.
    #[error("dependency loop in {path}")]
    DependencyCycle { path: String },

    /// One backend invocation failed; the run stops here.
    #[error("build of {image} failed, log written to {log}")]
    BuildFailed { image: String, log: String },

    /// A synthesized aggregate resolved dependencies it was not built from.
    #[error("aggregate {name} resolved unexpected dependencies: {detail}")]
    AggregateMismatch { name: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_descriptor_display() {
        let err = Error::DuplicateDescriptor {
            name: "py-builder".to_string(),
        };
        assert_eq!(err.to_string(), "py-builder is defined multiple times");
    }

    #[test]
    fn test_cycle_display_names_path() {
        let err = Error::DependencyCycle {
            path: "a -> b -> a".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dependency loop"));
        assert!(msg.contains("a -> b -> a"));
    }
}
