// Centralized constants for the stackbuild project to avoid magic strings

/// Directory that marks a source tree as carrying build descriptors.
pub const MARKER_DIR: &str = "Dockerfiles";

/// Descriptor file looked up inside the marker directory.
pub const DESCRIPTOR_FILE: &str = "Dockerfile";

/// Prefix of the per-run scratch directory.
pub const SCRATCH_PREFIX: &str = "stackbuild-";

/// Name suffix that contributes a core component.
pub const CORE_SUFFIX: &str = "-builder";

/// Name suffix that contributes a library component.
pub const LIB_SUFFIX: &str = "-lib";

/// Core every stack implicitly builds on.
pub const IMPLICIT_CORE: &str = "base";

/// Base image of synthesized aggregate descriptors.
pub const AGGREGATE_BASE: &str = "template";

/// Label marking a descriptor as built only on request.
pub const LABEL_OPTIONAL: &str = "stackbuild.optional";

/// Label opting a descriptor into its own directory as build context.
pub const LABEL_LOCAL_CONTEXT: &str = "stackbuild.context";

/// Label carrying the stack version on every built image.
pub const LABEL_VERSION: &str = "stackbuild.version";

/// Default image namespace.
pub const DEFAULT_NAMESPACE: &str = "stackbuild";

/// Default image tag.
pub const DEFAULT_TAG: &str = "latest";

/// Default name of the final combined image.
pub const DEFAULT_FINAL_IMAGE: &str = "stack";

/// Sentinel name disabling synthesis of the final combined image.
pub const NO_FINAL_IMAGE: &str = "-";

/// buildx builder instance used for multi-architecture builds.
pub const BUILDX_INSTANCE: &str = "stackbuild";
