//! Deployment configuration model.
//!
//! Every external setting the composition needs is gathered here before
//! graph construction starts, so building the graph is a pure function of
//! this struct and never reads the process environment.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CairnError, Result};

/// Root configuration consumed by the composition root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Target account and region.
    pub account: AccountConfig,
    /// Stream names and sizing.
    pub streams: StreamConfig,
    /// Time-series database bootstrap settings.
    pub influxdb: InfluxDbConfig,
    /// Ingest service settings.
    pub ingest: IngestConfig,
    /// WebSocket fan-out settings.
    pub websocket: WebSocketConfig,
    /// Pre-existing resources referenced by identifier.
    pub imports: ImportConfig,
}

/// Target account and region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Account id used to build stream and table ARNs.
    pub account_id: String,
    /// Region used to build stream and table ARNs.
    pub region: String,
}

/// Stream names and sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upstream market-data stream name.
    pub upstream: String,
    /// Downstream results stream name.
    pub downstream: String,
    /// Shard count for each stream.
    pub shard_count: u32,
    /// Retention period in hours.
    pub retention_hours: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            upstream: constants::DEFAULT_UPSTREAM_STREAM.into(),
            downstream: constants::DEFAULT_DOWNSTREAM_STREAM.into(),
            shard_count: constants::DEFAULT_STREAM_SHARDS,
            retention_hours: constants::DEFAULT_STREAM_RETENTION_HOURS,
        }
    }
}

/// Time-series database bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    /// Initialisation mode (`setup` or `upgrade`).
    pub init_mode: String,
    /// Initial admin user.
    pub username: String,
    /// Initial admin password.
    pub password: String,
    /// Initial organisation.
    pub org: String,
    /// Initial bucket.
    pub bucket: String,
    /// Bucket retention (e.g. `1w`).
    pub retention: String,
    /// Admin API token.
    pub admin_token: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            init_mode: "setup".into(),
            username: String::new(),
            password: String::new(),
            org: String::new(),
            bucket: String::new(),
            retention: "1w".into(),
            admin_token: String::new(),
        }
    }
}

/// Ingest service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Market-data API key.
    pub api_key: String,
    /// Market-data API secret.
    pub api_secret: String,
    /// WebSocket read rate limit.
    pub max_ws_reads_per_sec: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            max_ws_reads_per_sec: 50,
        }
    }
}

/// WebSocket fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Table holding open connections.
    pub connections_table: String,
    /// Secondary index of connections by symbol.
    pub connections_by_symbol_index: String,
    /// Bucket holding the results pusher bundle.
    pub artifact_bucket: String,
    /// Object key of the results pusher bundle.
    pub results_pusher_key: String,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            connections_table: "stream-lines-ws-connections".into(),
            connections_by_symbol_index: "by-symbol".into(),
            artifact_bucket: String::new(),
            results_pusher_key: "results-pusher.zip".into(),
        }
    }
}

/// Identifiers of resources that exist before the deployment runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Filesystem holding the database data directory.
    pub influxdb_file_system_id: String,
    /// Security group guarding that filesystem.
    pub influxdb_file_system_security_group: String,
    /// Image repository for the database.
    pub influxdb_repository: String,
    /// Image repository for the ingest service.
    pub ingest_repository: String,
    /// Image repository for the analytics service.
    pub analytics_repository: String,
    /// Image repository for the backend service.
    pub backend_repository: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            influxdb_file_system_id: String::new(),
            influxdb_file_system_security_group: String::new(),
            influxdb_repository: constants::DEFAULT_INFLUXDB_REPOSITORY.into(),
            ingest_repository: constants::DEFAULT_INGEST_REPOSITORY.into(),
            analytics_repository: constants::DEFAULT_ANALYTICS_REPOSITORY.into(),
            backend_repository: constants::DEFAULT_BACKEND_REPOSITORY.into(),
        }
    }
}

impl DeploymentConfig {
    /// Checks that every setting the composition cannot do without is present.
    ///
    /// # Errors
    ///
    /// Returns `CairnError::Config` naming the first missing or invalid setting.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("account.account_id", &self.account.account_id),
            ("account.region", &self.account.region),
            ("streams.upstream", &self.streams.upstream),
            ("streams.downstream", &self.streams.downstream),
            ("websocket.artifact_bucket", &self.websocket.artifact_bucket),
            (
                "imports.influxdb_file_system_id",
                &self.imports.influxdb_file_system_id,
            ),
            (
                "imports.influxdb_file_system_security_group",
                &self.imports.influxdb_file_system_security_group,
            ),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(CairnError::Config {
                    message: format!("{key} must be set"),
                });
            }
        }
        if self.streams.upstream == self.streams.downstream {
            return Err(CairnError::Config {
                message: "upstream and downstream streams must differ".into(),
            });
        }
        if self.streams.shard_count == 0 {
            return Err(CairnError::Config {
                message: "streams.shard_count must be at least 1".into(),
            });
        }
        if self.ingest.max_ws_reads_per_sec == 0 {
            return Err(CairnError::Config {
                message: "ingest.max_ws_reads_per_sec must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Builds the ARN of a stream owned by the configured account.
    #[must_use]
    pub fn stream_arn(&self, stream_name: &str) -> String {
        format!(
            "arn:aws:kinesis:{}:{}:stream/{stream_name}",
            self.account.region, self.account.account_id
        )
    }

    /// Builds the ARN of a table owned by the configured account.
    #[must_use]
    pub fn table_arn(&self, table_name: &str) -> String {
        format!(
            "arn:aws:dynamodb:{}:{}:table/{table_name}",
            self.account.region, self.account.account_id
        )
    }
}
