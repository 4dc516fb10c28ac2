//! System-wide constants and default paths.

/// Default path of the JSON catalog describing DBMSs and their releases.
pub const DEFAULT_CATALOG_PATH: &str = "./db.json";

/// Default directory holding the shared env/meta Dockerfile trees.
pub const DEFAULT_DOCKERDB_DIR: &str = "./dockerdb";

/// Default directory holding per-release build contexts and artifacts.
pub const DEFAULT_DOWNLOAD_DIR: &str = "./download";

/// Default prefix for built image repositories.
pub const DEFAULT_IMAGE_PREFIX: &str = "qaqcatz";

/// Default prefix for container names.
pub const DEFAULT_CONTAINER_PREFIX: &str = "qaqcatz";

/// Default container runtime program.
pub const DEFAULT_RUNTIME_PROGRAM: &str = "docker";

/// Default number of readiness probe attempts.
pub const DEFAULT_READY_ATTEMPTS: u32 = 16;

/// Default sleep between readiness probe attempts, in seconds.
pub const DEFAULT_READY_INTERVAL_SECS: u64 = 3;

/// Default TCP connect/read timeout for the protocol probe, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Host address deployed instances are reached on.
pub const LOCAL_HOST: &str = "127.0.0.1";

/// Name of the Dockerfile copied from a meta template into a build context.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Suffix appended to an image repository for environment layers.
pub const ENV_REPO_SUFFIX: &str = "env";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "dbdeploy";
