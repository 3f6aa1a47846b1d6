//! System-wide constants and default resource names.

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cairn";

/// Opening delimiter of a token placeholder in a synthesized plan.
pub const PLACEHOLDER_OPEN: &str = "${";

/// Closing delimiter of a token placeholder in a synthesized plan.
pub const PLACEHOLDER_CLOSE: &str = "}";

/// Version tag written into every provisioning plan.
pub const PLAN_FORMAT_VERSION: u32 = 1;

/// Default name of the upstream market-data stream.
pub const DEFAULT_UPSTREAM_STREAM: &str = "stream-lines-market-data-upstream";

/// Default name of the downstream analytics results stream.
pub const DEFAULT_DOWNSTREAM_STREAM: &str = "stream-lines-results-downstream";

/// Default shard count for both streams.
pub const DEFAULT_STREAM_SHARDS: u32 = 2;

/// Default stream retention in hours.
pub const DEFAULT_STREAM_RETENTION_HOURS: u32 = 24;

/// Default image repository for the time-series database.
pub const DEFAULT_INFLUXDB_REPOSITORY: &str = "stream-lines-influxdb";

/// Default image repository for the ingest service.
pub const DEFAULT_INGEST_REPOSITORY: &str = "stream-lines-ingest";

/// Default image repository for the analytics service.
pub const DEFAULT_ANALYTICS_REPOSITORY: &str = "stream-lines-analytics";

/// Default image repository for the backend service.
pub const DEFAULT_BACKEND_REPOSITORY: &str = "stream-lines-backend";

/// Port the time-series database listens on inside its container.
pub const INFLUXDB_CONTAINER_PORT: u16 = 8086;

/// NFS port the database filesystem is mounted through.
pub const NFS_PORT: u16 = 2049;
