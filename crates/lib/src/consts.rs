/// Default root under which shared package records are created.
pub const DEFAULT_SHARED_ROOT: &str = "/var/sling/replication/";

/// Default name prefix for minted record names.
pub const DEFAULT_NAME_PREFIX: &str = "replpackage";

/// Environment variable overriding the shared root.
pub const SHARED_ROOT_ENV: &str = "PKGSHARE_SHARED_ROOT";

/// Environment variable overriding the name prefix.
pub const NAME_PREFIX_ENV: &str = "PKGSHARE_NAME_PREFIX";

/// Record property holding the wrapped package's id.
pub const PN_ORIGINAL_ID: &str = "original.package.id";

/// Record property holding the wrapped package's action.
pub const PN_ORIGINAL_ACTION: &str = "original.package.action";

/// Record property holding the wrapped package's content paths.
pub const PN_ORIGINAL_PATHS: &str = "original.package.paths";

/// Property carrying a node's resource type.
pub const PN_RESOURCE_TYPE: &str = "sling:resourceType";

/// Property carrying a node's primary type.
pub const PN_PRIMARY_TYPE: &str = "jcr:primaryType";

/// Child node marking a record as a valid shared package container.
pub const REFERENCE_ROOT_NODE: &str = "refs";

/// Node type for records, reference markers and holder entries.
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

/// Resource type given to record nodes.
pub const SLING_FOLDER: &str = "sling:Folder";

/// Separator between the prefix, timestamp and random parts of a record name.
pub const NAME_SEPARATOR: char = '_';
