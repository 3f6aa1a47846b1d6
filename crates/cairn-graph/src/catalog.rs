//! Resource catalog: which attributes each resource kind exposes.
//!
//! The catalog is supplied by the resource-definition layer. A built-in AWS
//! catalog covers the kinds the stream-lines topology uses; alternative
//! catalogs can be loaded from JSON or YAML files.

use std::collections::BTreeMap;
use std::path::Path;

use cairn_common::error::{CairnError, Result};
use cairn_common::types::ResourceKind;
use serde::{Deserialize, Serialize};

/// When an attribute's value becomes known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    /// Supplied by the declarer; concrete at declaration time.
    Declared,
    /// Assigned by the provider when the resource is created.
    Deferred,
}

/// Attribute schema of one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSchema {
    /// Attribute name to availability.
    pub attributes: BTreeMap<String, Availability>,
}

impl KindSchema {
    fn with(declared: &[&str], deferred: &[&str]) -> Self {
        let attributes = declared
            .iter()
            .map(|name| ((*name).to_owned(), Availability::Declared))
            .chain(
                deferred
                    .iter()
                    .map(|name| ((*name).to_owned(), Availability::Deferred)),
            )
            .collect();
        Self { attributes }
    }
}

/// Mapping from resource kind to attribute schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    /// Schemas keyed by kind.
    pub kinds: BTreeMap<ResourceKind, KindSchema>,
}

impl ResourceCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the schema of a kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ResourceKind, schema: KindSchema) -> Self {
        let _ = self.kinds.insert(kind, schema);
        self
    }

    /// Built-in catalog covering the AWS resources of the stream-lines deployment.
    #[must_use]
    pub fn aws() -> Self {
        use ResourceKind as K;

        Self::new()
            .with_kind(
                K::Network,
                KindSchema::with(
                    &["cidr", "maxAzs", "natGateways"],
                    &[
                        "vpcId",
                        "availabilityZones",
                        "publicSubnetIds",
                        "privateSubnetIds",
                        "isolatedSubnetIds",
                    ],
                ),
            )
            .with_kind(
                K::SecurityGroup,
                KindSchema::with(
                    &["vpcId", "allowAllOutbound", "description", "ingress"],
                    &["securityGroupId"],
                ),
            )
            .with_kind(
                K::LoadBalancer,
                KindSchema::with(
                    &["vpcId", "internetFacing", "subnetIds"],
                    &["arn", "dnsName", "securityGroupId"],
                ),
            )
            .with_kind(
                K::Listener,
                KindSchema::with(&["loadBalancerArn", "port", "protocol"], &["arn"]),
            )
            .with_kind(
                K::Compute,
                KindSchema::with(&["vpcId"], &["arn", "clusterName"]),
            )
            .with_kind(
                K::TaskDefinition,
                KindSchema::with(
                    &[
                        "family",
                        "cpu",
                        "memoryMiB",
                        "cpuArchitecture",
                        "executionRoleArn",
                        "taskRoleArn",
                        "image",
                        "environment",
                        "volumes",
                        "mountPoints",
                        "portMappings",
                        "logStreamPrefix",
                    ],
                    &["arn"],
                ),
            )
            .with_kind(
                K::Service,
                KindSchema::with(
                    &[
                        "clusterArn",
                        "taskDefinitionArn",
                        "desiredCount",
                        "assignPublicIp",
                        "subnetIds",
                        "securityGroupIds",
                        "targetListenerArn",
                        "containerName",
                        "containerPort",
                        "healthCheckPath",
                    ],
                    &["arn", "serviceName", "securityGroupId"],
                ),
            )
            .with_kind(
                K::Stream,
                KindSchema::with(&["shardCount", "retentionHours"], &["arn", "streamName"]),
            )
            .with_kind(
                K::Function,
                KindSchema::with(
                    &[
                        "runtime",
                        "handler",
                        "codeBucket",
                        "codeKey",
                        "roleArn",
                        "environment",
                        "eventSourceArn",
                        "startingPosition",
                        "batchSize",
                        "maxBatchingWindowSecs",
                        "retryAttempts",
                    ],
                    &["arn", "functionName"],
                ),
            )
            .with_kind(
                K::Filesystem,
                KindSchema::with(
                    &["vpcId", "subnetIds", "securityGroupId"],
                    &["fileSystemId", "arn"],
                ),
            )
            .with_kind(
                K::MountTarget,
                KindSchema::with(
                    &[
                        "fileSystemId",
                        "subnetIds",
                        "availabilityZoneIndex",
                        "securityGroupIds",
                    ],
                    &["mountTargetId"],
                ),
            )
            .with_kind(
                K::Role,
                KindSchema::with(
                    &["assumedBy", "managedPolicies", "policyStatements"],
                    &["arn", "roleName"],
                ),
            )
            .with_kind(
                K::Bucket,
                KindSchema::with(&["versioned"], &["arn", "bucketName"]),
            )
            .with_kind(
                K::Repository,
                KindSchema::with(
                    &["imageScanOnPush"],
                    &["arn", "repositoryName", "repositoryUri"],
                ),
            )
            .with_kind(
                K::ApiGateway,
                KindSchema::with(
                    &["routeSelectionExpression", "stageName"],
                    &["apiId", "stageArn", "connectionsUrl", "endpoint"],
                ),
            )
    }

    /// Loads a catalog from a `.json`, `.yaml`, or `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unsupported
    /// extension, or does not describe a catalog.
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading resource catalog");

        let content = std::fs::read_to_string(path).map_err(|e| CairnError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| CairnError::Config {
                    message: format!("invalid catalog {}: {e}", path.display()),
                })
            }
            _ => Err(CairnError::Config {
                message: format!(
                    "unsupported catalog format: {} (expected .json, .yaml, or .yml)",
                    path.display()
                ),
            }),
        }
    }

    /// Returns the schema of a kind, if the catalog knows it.
    #[must_use]
    pub fn schema(&self, kind: ResourceKind) -> Option<&KindSchema> {
        self.kinds.get(&kind)
    }

    /// Looks up the availability of an attribute on a kind.
    #[must_use]
    pub fn availability(&self, kind: ResourceKind, attribute: &str) -> Option<Availability> {
        self.schema(kind)
            .and_then(|schema| schema.attributes.get(attribute).copied())
    }
}
