//! Deployment settings gathered from flags, environment, and an optional file.
//!
//! Precedence: flag or environment variable, then the JSON config file, then
//! built-in defaults.

use std::path::PathBuf;

use anyhow::Context;
use cairn_common::config::DeploymentConfig;
use clap::Args;

/// Settings shared by the commands that compose the stacks.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON file with a full or partial deployment configuration.
    #[arg(long = "config", env = "CAIRN_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Target account id.
    #[arg(long, env = "AWS_ACCOUNT")]
    pub account_id: Option<String>,

    /// Target region.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Upstream market-data stream name.
    #[arg(long, env = "KINESIS_MARKET_DATA_UPSTREAM")]
    pub upstream_stream: Option<String>,

    /// Downstream results stream name.
    #[arg(long, env = "KINESIS_RESULTS_DOWNSTREAM")]
    pub downstream_stream: Option<String>,

    /// Database initialisation mode.
    #[arg(long, env = "INFLUXDB_INIT_MODE")]
    pub influxdb_init_mode: Option<String>,

    /// Database admin user.
    #[arg(long, env = "INFLUXDB_INIT_USERNAME")]
    pub influxdb_username: Option<String>,

    /// Database admin password.
    #[arg(long, env = "INFLUXDB_INIT_PASSWORD", hide_env_values = true)]
    pub influxdb_password: Option<String>,

    /// Database organisation.
    #[arg(long, env = "INFLUXDB_INIT_ORG")]
    pub influxdb_org: Option<String>,

    /// Database bucket.
    #[arg(long, env = "INFLUXDB_INIT_BUCKET")]
    pub influxdb_bucket: Option<String>,

    /// Database bucket retention.
    #[arg(long, env = "INFLUXDB_INIT_RETENTION")]
    pub influxdb_retention: Option<String>,

    /// Database admin token.
    #[arg(long, env = "INFLUXDB_INIT_ADMIN_TOKEN", hide_env_values = true)]
    pub influxdb_admin_token: Option<String>,

    /// Market-data API key for the ingest service.
    #[arg(long, env = "INGEST_ALPACA_API_KEY", hide_env_values = true)]
    pub ingest_api_key: Option<String>,

    /// Market-data API secret for the ingest service.
    #[arg(long, env = "INGEST_ALPACA_API_SECRET", hide_env_values = true)]
    pub ingest_api_secret: Option<String>,

    /// WebSocket read rate limit for the ingest service.
    #[arg(long, env = "INGEST_MAX_WS_READS_PER_SEC")]
    pub ingest_max_ws_reads_per_sec: Option<u32>,

    /// Table holding open WebSocket connections.
    #[arg(long, env = "WS_CONNS_TABLE_NAME")]
    pub ws_connections_table: Option<String>,

    /// Connections-by-symbol index name.
    #[arg(long, env = "WS_CONNS_BY_SYMBOL_INDEX")]
    pub ws_connections_index: Option<String>,

    /// Bucket holding function bundles.
    #[arg(long, env = "S3_APP_BUCKET")]
    pub artifact_bucket: Option<String>,

    /// Object key of the results pusher bundle.
    #[arg(long, env = "S3_KEY_RESULTS_PUSHER")]
    pub results_pusher_key: Option<String>,

    /// Existing filesystem holding the database data.
    #[arg(long, env = "INFLUXDB_FILE_SYSTEM_ID")]
    pub influxdb_file_system_id: Option<String>,

    /// Security group of that filesystem.
    #[arg(long, env = "INFLUXDB_FILE_SYSTEM_SG")]
    pub influxdb_file_system_security_group: Option<String>,
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl ConfigArgs {
    /// Resolves the final configuration and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or the
    /// merged configuration is incomplete.
    pub fn resolve(self) -> anyhow::Result<DeploymentConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => DeploymentConfig::default(),
        };

        apply(&mut config.account.account_id, self.account_id);
        apply(&mut config.account.region, self.region);
        apply(&mut config.streams.upstream, self.upstream_stream);
        apply(&mut config.streams.downstream, self.downstream_stream);
        apply(&mut config.influxdb.init_mode, self.influxdb_init_mode);
        apply(&mut config.influxdb.username, self.influxdb_username);
        apply(&mut config.influxdb.password, self.influxdb_password);
        apply(&mut config.influxdb.org, self.influxdb_org);
        apply(&mut config.influxdb.bucket, self.influxdb_bucket);
        apply(&mut config.influxdb.retention, self.influxdb_retention);
        apply(&mut config.influxdb.admin_token, self.influxdb_admin_token);
        apply(&mut config.ingest.api_key, self.ingest_api_key);
        apply(&mut config.ingest.api_secret, self.ingest_api_secret);
        apply(
            &mut config.ingest.max_ws_reads_per_sec,
            self.ingest_max_ws_reads_per_sec,
        );
        apply(
            &mut config.websocket.connections_table,
            self.ws_connections_table,
        );
        apply(
            &mut config.websocket.connections_by_symbol_index,
            self.ws_connections_index,
        );
        apply(&mut config.websocket.artifact_bucket, self.artifact_bucket);
        apply(
            &mut config.websocket.results_pusher_key,
            self.results_pusher_key,
        );
        apply(
            &mut config.imports.influxdb_file_system_id,
            self.influxdb_file_system_id,
        );
        apply(
            &mut config.imports.influxdb_file_system_security_group,
            self.influxdb_file_system_security_group,
        );

        config.validate()?;
        tracing::debug!(
            account = %config.account.account_id,
            region = %config.account.region,
            "resolved deployment configuration"
        );
        Ok(config)
    }
}
