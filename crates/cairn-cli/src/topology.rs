//! The stream-lines stacks, composed against the graph construction API.
//!
//! Stacks are registered in a fixed order. Cross-stack wiring happens only
//! through output tokens, plus a few explicit dependencies where a service
//! needs another stack to be up without consuming any of its outputs.

use std::sync::Arc;

use cairn_common::config::DeploymentConfig;
use cairn_common::constants::{INFLUXDB_CONTAINER_PORT, NFS_PORT};
use cairn_common::error::Result;
use cairn_common::types::ResourceKind;
use cairn_graph::{AttributeValue, CompositionGraph, ResourceCatalog, ResourceNode, Stack};
use serde_json::json;

/// Stack names, in registration order.
pub const NETWORK: &str = "Network";
/// WebSocket API for browser clients.
pub const API_GATEWAY: &str = "ApiGateway";
/// Market-data and results streams plus the results pusher.
pub const STREAMS: &str = "Streams";
/// Container cluster.
pub const CLUSTER: &str = "Cluster";
/// Load balancers and listeners.
pub const BALANCER: &str = "Balancer";
/// Image repositories and the task execution role.
pub const EXECUTION_ROLE: &str = "ExecutionRole";
/// Time-series database service.
pub const INFLUXDB: &str = "InfluxDb";
/// Market-data ingest service.
pub const INGEST: &str = "Ingest";
/// Stream analytics service.
pub const ANALYTICS: &str = "Analytics";
/// Query backend service.
pub const BACKEND: &str = "Backend";

const IMAGE_TAG: &str = "latest";
const INFLUXDB_IMAGE_TAG: &str = "2.0";
const INFLUXDB_DATA_VOLUME: &str = "influxdb-data";

/// Builds the full stream-lines composition graph.
///
/// # Errors
///
/// Returns the first construction error, e.g. an attribute the catalog does
/// not know.
pub fn compose(config: &DeploymentConfig, catalog: &Arc<ResourceCatalog>) -> Result<CompositionGraph> {
    let mut composer = Composer {
        config,
        catalog,
        graph: CompositionGraph::new(),
    };

    composer.network()?;
    composer.api_gateway()?;
    composer.streams()?;
    composer.cluster()?;
    composer.balancer()?;
    composer.execution_role()?;
    composer.influxdb()?;
    composer.ingest()?;
    composer.analytics()?;
    composer.backend()?;

    tracing::info!(stacks = composer.graph.stacks().len(), "composed stream-lines topology");
    Ok(composer.graph)
}

struct Composer<'a> {
    config: &'a DeploymentConfig,
    catalog: &'a Arc<ResourceCatalog>,
    graph: CompositionGraph,
}

impl Composer<'_> {
    fn stack(&self, name: &str) -> Stack {
        Stack::new(name, Arc::clone(self.catalog))
    }

    fn out(&self, stack: &str, node: &str, attribute: &str) -> Result<AttributeValue> {
        self.graph.attribute(stack, node, attribute)
    }

    fn network(&mut self) -> Result<()> {
        let mut stack = self.stack(NETWORK);
        stack.declare(
            ResourceNode::new("vpc", ResourceKind::Network)
                .with("cidr", "10.0.0.0/16")
                .with("maxAzs", 2_u32)
                .with("natGateways", 0_u32),
        )?;
        self.graph.add_stack(stack)
    }

    fn api_gateway(&mut self) -> Result<()> {
        let mut stack = self.stack(API_GATEWAY);
        stack.declare(
            ResourceNode::new("ws", ResourceKind::ApiGateway)
                .with("routeSelectionExpression", "$request.body.action")
                .with("stageName", "prod"),
        )?;
        self.graph.add_stack(stack)
    }

    fn streams(&mut self) -> Result<()> {
        let streams = &self.config.streams;
        let websocket = &self.config.websocket;
        let mut stack = self.stack(STREAMS);

        for (id, name) in [("upstream", &streams.upstream), ("downstream", &streams.downstream)] {
            stack.declare(
                ResourceNode::new(id, ResourceKind::Stream)
                    .with("streamName", name.as_str())
                    .with("shardCount", streams.shard_count)
                    .with("retentionHours", streams.retention_hours),
            )?;
        }
        let downstream_arn = stack.attribute("downstream", "arn")?;

        stack.declare_imported("artifacts", ResourceKind::Bucket, websocket.artifact_bucket.as_str())?;

        let stage_arn = self.out(API_GATEWAY, "ws", "stageArn")?;
        stack.declare(
            ResourceNode::new("pusherRole", ResourceKind::Role)
                .with("assumedBy", "lambda.amazonaws.com")
                .with(
                    "managedPolicies",
                    vec!["service-role/AWSLambdaBasicExecutionRole"],
                )
                .with(
                    "policyStatements",
                    vec![
                        statement(&["execute-api:ManageConnections"], vec![stage_arn]),
                        statement(
                            &[
                                "kinesis:GetRecords",
                                "kinesis:GetShardIterator",
                                "kinesis:DescribeStream",
                                "kinesis:ListShards",
                            ],
                            vec![downstream_arn.clone()],
                        ),
                        statement(
                            &["dynamodb:Query", "dynamodb:DeleteItem"],
                            vec![
                                self.config
                                    .table_arn(&websocket.connections_table)
                                    .into(),
                                format!(
                                    "{}/index/{}",
                                    self.config.table_arn(&websocket.connections_table),
                                    websocket.connections_by_symbol_index
                                )
                                .into(),
                            ],
                        ),
                    ],
                ),
        )?;

        stack.declare(
            ResourceNode::new("resultsPusher", ResourceKind::Function)
                .with("runtime", "nodejs20.x")
                .with("handler", "index.handler")
                .with("codeBucket", stack.attribute("artifacts", "bucketName")?)
                .with("codeKey", websocket.results_pusher_key.as_str())
                .with("roleArn", stack.attribute("pusherRole", "arn")?)
                .with(
                    "environment",
                    AttributeValue::map([
                        (
                            "CONNECTIONS_URL",
                            self.out(API_GATEWAY, "ws", "connectionsUrl")?,
                        ),
                        (
                            "WS_CONNS_TABLE_NAME",
                            websocket.connections_table.as_str().into(),
                        ),
                        (
                            "WS_CONNS_BY_SYMBOL_INDEX",
                            websocket.connections_by_symbol_index.as_str().into(),
                        ),
                    ]),
                )
                .with("eventSourceArn", downstream_arn)
                .with("startingPosition", "LATEST")
                .with("batchSize", 50_u32)
                .with("maxBatchingWindowSecs", 15_u32)
                .with("retryAttempts", 3_u32),
        )?;
        self.graph.add_stack(stack)
    }

    fn cluster(&mut self) -> Result<()> {
        let mut stack = self.stack(CLUSTER);
        stack.declare(
            ResourceNode::new("ecs", ResourceKind::Compute)
                .with("vpcId", self.out(NETWORK, "vpc", "vpcId")?),
        )?;
        self.graph.add_stack(stack)
    }

    fn balancer(&mut self) -> Result<()> {
        let mut stack = self.stack(BALANCER);
        for (alb, listener, internet_facing) in [
            ("influxAlb", "influxListener", false),
            ("backendAlb", "backendListener", true),
        ] {
            stack.declare(
                ResourceNode::new(alb, ResourceKind::LoadBalancer)
                    .with("vpcId", self.out(NETWORK, "vpc", "vpcId")?)
                    .with("internetFacing", internet_facing)
                    .with(
                        "subnetIds",
                        vec![self.out(NETWORK, "vpc", "publicSubnetIds")?],
                    ),
            )?;
            stack.declare(
                ResourceNode::new(listener, ResourceKind::Listener)
                    .with("loadBalancerArn", stack.attribute(alb, "arn")?)
                    .with("port", 80_u16)
                    .with("protocol", "HTTP"),
            )?;
        }
        self.graph.add_stack(stack)
    }

    fn execution_role(&mut self) -> Result<()> {
        let imports = &self.config.imports;
        let mut stack = self.stack(EXECUTION_ROLE);

        let repositories = [
            ("influxdbRepo", &imports.influxdb_repository),
            ("ingestRepo", &imports.ingest_repository),
            ("analyticsRepo", &imports.analytics_repository),
            ("backendRepo", &imports.backend_repository),
        ];
        let mut repository_arns = Vec::with_capacity(repositories.len());
        for (id, name) in repositories {
            stack.declare_imported(id, ResourceKind::Repository, name.as_str())?;
            repository_arns.push(stack.attribute(id, "arn")?);
        }

        stack.declare(
            ResourceNode::new("taskExecutionRole", ResourceKind::Role)
                .with("assumedBy", "ecs-tasks.amazonaws.com")
                .with(
                    "managedPolicies",
                    vec!["service-role/AmazonECSTaskExecutionRolePolicy"],
                )
                .with(
                    "policyStatements",
                    vec![
                        statement(
                            &[
                                "ecr:BatchCheckLayerAvailability",
                                "ecr:GetDownloadUrlForLayer",
                                "ecr:BatchGetImage",
                            ],
                            repository_arns,
                        ),
                        statement(&["ecr:GetAuthorizationToken"], vec!["*".into()]),
                    ],
                ),
        )?;
        self.graph.add_stack(stack)
    }

    fn influxdb(&mut self) -> Result<()> {
        let influx = &self.config.influxdb;
        let imports = &self.config.imports;
        let mut stack = self.stack(INFLUXDB);

        stack.declare(
            ResourceNode::imported(
                "dataFs",
                ResourceKind::Filesystem,
                imports.influxdb_file_system_id.as_str(),
            )
            .with(
                "securityGroupId",
                imports.influxdb_file_system_security_group.as_str(),
            ),
        )?;

        stack.declare(
            ResourceNode::new("taskDef", ResourceKind::TaskDefinition)
                .with("family", "influxdb")
                .with("cpu", 512_u32)
                .with("memoryMiB", 1024_u32)
                .with("cpuArchitecture", "ARM64")
                .with(
                    "executionRoleArn",
                    self.out(EXECUTION_ROLE, "taskExecutionRole", "arn")?,
                )
                .with(
                    "image",
                    image(
                        self.out(EXECUTION_ROLE, "influxdbRepo", "repositoryUri")?,
                        INFLUXDB_IMAGE_TAG,
                    ),
                )
                .with(
                    "environment",
                    AttributeValue::map([
                        ("DOCKER_INFLUXDB_INIT_MODE", influx.init_mode.as_str()),
                        ("DOCKER_INFLUXDB_INIT_USERNAME", influx.username.as_str()),
                        ("DOCKER_INFLUXDB_INIT_PASSWORD", influx.password.as_str()),
                        ("DOCKER_INFLUXDB_INIT_ORG", influx.org.as_str()),
                        ("DOCKER_INFLUXDB_INIT_BUCKET", influx.bucket.as_str()),
                        ("DOCKER_INFLUXDB_INIT_RETENTION", influx.retention.as_str()),
                        ("DOCKER_INFLUXDB_INIT_ADMIN_TOKEN", influx.admin_token.as_str()),
                    ]),
                )
                .with(
                    "volumes",
                    vec![AttributeValue::map([
                        ("name", AttributeValue::from(INFLUXDB_DATA_VOLUME)),
                        ("fileSystemId", stack.attribute("dataFs", "fileSystemId")?),
                        ("transitEncryption", "ENABLED".into()),
                    ])],
                )
                .with(
                    "mountPoints",
                    json!([{
                        "sourceVolume": INFLUXDB_DATA_VOLUME,
                        "containerPath": "/var/lib/influxdb2",
                        "readOnly": false,
                    }]),
                )
                .with(
                    "portMappings",
                    json!([{ "containerPort": INFLUXDB_CONTAINER_PORT }]),
                )
                .with("logStreamPrefix", "influxdb"),
        )?;

        stack.declare(
            ResourceNode::new("service", ResourceKind::Service)
                .with("clusterArn", self.out(CLUSTER, "ecs", "arn")?)
                .with("taskDefinitionArn", stack.attribute("taskDef", "arn")?)
                .with("desiredCount", 1_u32)
                .with("assignPublicIp", true)
                .with(
                    "subnetIds",
                    vec![self.out(NETWORK, "vpc", "publicSubnetIds")?],
                )
                .with(
                    "targetListenerArn",
                    self.out(BALANCER, "influxListener", "arn")?,
                )
                .with("containerName", "influxdb")
                .with("containerPort", INFLUXDB_CONTAINER_PORT)
                .with("healthCheckPath", "/health"),
        )?;

        stack.declare(
            ResourceNode::new("efsAccess", ResourceKind::SecurityGroup)
                .with("vpcId", self.out(NETWORK, "vpc", "vpcId")?)
                .with("description", "NFS access from the database service")
                .with(
                    "ingress",
                    vec![AttributeValue::map([
                        ("peer", stack.attribute("service", "securityGroupId")?),
                        ("port", NFS_PORT.into()),
                        ("protocol", "tcp".into()),
                    ])],
                ),
        )?;

        for zone in 0..2_u32 {
            stack.declare(
                ResourceNode::new(format!("mountTarget{zone}"), ResourceKind::MountTarget)
                    .with("fileSystemId", stack.attribute("dataFs", "fileSystemId")?)
                    .with(
                        "subnetIds",
                        vec![self.out(NETWORK, "vpc", "isolatedSubnetIds")?],
                    )
                    .with("availabilityZoneIndex", zone)
                    .with(
                        "securityGroupIds",
                        vec![
                            stack.attribute("efsAccess", "securityGroupId")?,
                            imports.influxdb_file_system_security_group.as_str().into(),
                        ],
                    ),
            )?;
        }
        self.graph.add_stack(stack)
    }

    fn ingest(&mut self) -> Result<()> {
        let ingest = &self.config.ingest;
        let mut stack = self.stack(INGEST);
        let upstream_arn = self.out(STREAMS, "upstream", "arn")?;

        stack.declare(
            ResourceNode::new("securityGroup", ResourceKind::SecurityGroup)
                .with("vpcId", self.out(CLUSTER, "ecs", "vpcId")?)
                .with("allowAllOutbound", true)
                .with("description", "Outbound access for market-data ingest"),
        )?;
        stack.declare(
            ResourceNode::new("taskRole", ResourceKind::Role)
                .with("assumedBy", "ecs-tasks.amazonaws.com")
                .with(
                    "policyStatements",
                    vec![statement(
                        &["kinesis:PutRecord", "kinesis:PutRecords"],
                        vec![upstream_arn],
                    )],
                ),
        )?;
        stack.declare(
            ResourceNode::new("taskDef", ResourceKind::TaskDefinition)
                .with("family", "ingest")
                .with("cpu", 256_u32)
                .with("memoryMiB", 512_u32)
                .with("cpuArchitecture", "X86_64")
                .with(
                    "executionRoleArn",
                    self.out(EXECUTION_ROLE, "taskExecutionRole", "arn")?,
                )
                .with("taskRoleArn", stack.attribute("taskRole", "arn")?)
                .with(
                    "image",
                    image(self.out(EXECUTION_ROLE, "ingestRepo", "repositoryUri")?, IMAGE_TAG),
                )
                .with(
                    "environment",
                    AttributeValue::map([
                        ("ALPACA_API_KEY", AttributeValue::from(ingest.api_key.as_str())),
                        ("ALPACA_API_SECRET", ingest.api_secret.as_str().into()),
                        (
                            "KINESIS_MARKET_DATA_UPSTREAM",
                            self.out(STREAMS, "upstream", "streamName")?,
                        ),
                        (
                            "MAX_WS_READS_PER_SEC",
                            ingest.max_ws_reads_per_sec.to_string().into(),
                        ),
                    ]),
                )
                .with("logStreamPrefix", "ingest"),
        )?;
        stack.declare(
            ResourceNode::new("service", ResourceKind::Service)
                .with("clusterArn", self.out(CLUSTER, "ecs", "arn")?)
                .with("taskDefinitionArn", stack.attribute("taskDef", "arn")?)
                .with("desiredCount", 1_u32)
                .with("assignPublicIp", true)
                .with(
                    "subnetIds",
                    vec![self.out(NETWORK, "vpc", "publicSubnetIds")?],
                )
                .with(
                    "securityGroupIds",
                    vec![stack.attribute("securityGroup", "securityGroupId")?],
                ),
        )?;
        self.graph.add_stack(stack)?;
        self.graph.declare_dependency(INGEST, STREAMS)
    }

    fn analytics(&mut self) -> Result<()> {
        let influx = &self.config.influxdb;
        let mut stack = self.stack(ANALYTICS);

        stack.declare(
            ResourceNode::new("taskRole", ResourceKind::Role)
                .with("assumedBy", "ecs-tasks.amazonaws.com")
                .with(
                    "policyStatements",
                    vec![
                        statement(
                            &[
                                "kinesis:GetRecords",
                                "kinesis:GetShardIterator",
                                "kinesis:DescribeStream",
                                "kinesis:ListShards",
                            ],
                            vec![self.out(STREAMS, "upstream", "arn")?],
                        ),
                        statement(
                            &["kinesis:PutRecord", "kinesis:PutRecords"],
                            vec![self.out(STREAMS, "downstream", "arn")?],
                        ),
                    ],
                ),
        )?;
        stack.declare(
            ResourceNode::new("taskDef", ResourceKind::TaskDefinition)
                .with("family", "analytics")
                .with("cpu", 512_u32)
                .with("memoryMiB", 1024_u32)
                .with("cpuArchitecture", "X86_64")
                .with(
                    "executionRoleArn",
                    self.out(EXECUTION_ROLE, "taskExecutionRole", "arn")?,
                )
                .with("taskRoleArn", stack.attribute("taskRole", "arn")?)
                .with(
                    "image",
                    image(
                        self.out(EXECUTION_ROLE, "analyticsRepo", "repositoryUri")?,
                        IMAGE_TAG,
                    ),
                )
                .with(
                    "environment",
                    AttributeValue::map([
                        (
                            "KINESIS_MARKET_DATA_UPSTREAM",
                            self.out(STREAMS, "upstream", "streamName")?,
                        ),
                        (
                            "KINESIS_RESULTS_DOWNSTREAM",
                            self.out(STREAMS, "downstream", "streamName")?,
                        ),
                        ("INFLUXDB_URL", self.out(BALANCER, "influxAlb", "dnsName")?),
                        ("INFLUXDB_ORG", influx.org.as_str().into()),
                        ("INFLUXDB_BUCKET", influx.bucket.as_str().into()),
                        ("INFLUXDB_TOKEN", influx.admin_token.as_str().into()),
                    ]),
                )
                .with("logStreamPrefix", "analytics"),
        )?;
        stack.declare(
            ResourceNode::new("service", ResourceKind::Service)
                .with("clusterArn", self.out(CLUSTER, "ecs", "arn")?)
                .with("taskDefinitionArn", stack.attribute("taskDef", "arn")?)
                .with("desiredCount", 1_u32)
                .with("assignPublicIp", true)
                .with(
                    "subnetIds",
                    vec![self.out(NETWORK, "vpc", "publicSubnetIds")?],
                ),
        )?;
        self.graph.add_stack(stack)?;
        self.graph.declare_dependency(ANALYTICS, STREAMS)?;
        self.graph.declare_dependency(ANALYTICS, INFLUXDB)
    }

    fn backend(&mut self) -> Result<()> {
        let influx = &self.config.influxdb;
        let mut stack = self.stack(BACKEND);

        stack.declare(
            ResourceNode::new("taskDef", ResourceKind::TaskDefinition)
                .with("family", "backend")
                .with("cpu", 256_u32)
                .with("memoryMiB", 512_u32)
                .with("cpuArchitecture", "X86_64")
                .with(
                    "executionRoleArn",
                    self.out(EXECUTION_ROLE, "taskExecutionRole", "arn")?,
                )
                .with(
                    "image",
                    image(self.out(EXECUTION_ROLE, "backendRepo", "repositoryUri")?, IMAGE_TAG),
                )
                .with(
                    "environment",
                    AttributeValue::map([
                        ("INFLUXDB_URL", self.out(BALANCER, "influxAlb", "dnsName")?),
                        ("INFLUXDB_ORG", influx.org.as_str().into()),
                        ("INFLUXDB_BUCKET", influx.bucket.as_str().into()),
                        ("INFLUXDB_TOKEN", influx.admin_token.as_str().into()),
                        ("WS_API_ENDPOINT", self.out(API_GATEWAY, "ws", "endpoint")?),
                    ]),
                )
                .with("portMappings", json!([{ "containerPort": 8080 }]))
                .with("logStreamPrefix", "backend"),
        )?;
        stack.declare(
            ResourceNode::new("service", ResourceKind::Service)
                .with("clusterArn", self.out(CLUSTER, "ecs", "arn")?)
                .with("taskDefinitionArn", stack.attribute("taskDef", "arn")?)
                .with("desiredCount", 1_u32)
                .with("assignPublicIp", true)
                .with(
                    "subnetIds",
                    vec![self.out(NETWORK, "vpc", "publicSubnetIds")?],
                )
                .with(
                    "targetListenerArn",
                    self.out(BALANCER, "backendListener", "arn")?,
                )
                .with("containerName", "backend")
                .with("containerPort", 8080_u16)
                .with("healthCheckPath", "/health"),
        )?;
        self.graph.add_stack(stack)?;
        self.graph.declare_dependency(BACKEND, API_GATEWAY)?;
        self.graph.declare_dependency(BACKEND, INFLUXDB)
    }
}

/// An `Allow` policy statement.
fn statement(actions: &[&str], resources: Vec<AttributeValue>) -> AttributeValue {
    AttributeValue::map([
        ("effect", AttributeValue::from("Allow")),
        ("actions", actions.to_vec().into()),
        ("resources", resources.into()),
    ])
}

fn image(repository_uri: AttributeValue, tag: &str) -> AttributeValue {
    AttributeValue::map([
        ("repositoryUri", repository_uri),
        ("tag", tag.into()),
    ])
}
