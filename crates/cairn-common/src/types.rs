//! Domain primitive types used across the Cairn workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a stack, unique within a composition graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackName(String);

impl StackName {
    /// Creates a stack name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StackName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StackName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a resource node, unique within its stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Category of infrastructure a resource node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Virtual network with its subnets.
    Network,
    /// Firewall rule group attached to network interfaces.
    SecurityGroup,
    /// Application load balancer.
    LoadBalancer,
    /// Listener attached to a load balancer.
    Listener,
    /// Container cluster.
    Compute,
    /// Container task definition.
    TaskDefinition,
    /// Long-running container service.
    Service,
    /// Ordered record stream.
    Stream,
    /// Event-driven function.
    Function,
    /// Network filesystem.
    Filesystem,
    /// Filesystem mount target in one subnet.
    MountTarget,
    /// Identity and access role.
    Role,
    /// Object storage bucket.
    Bucket,
    /// Container image repository.
    Repository,
    /// WebSocket API gateway.
    ApiGateway,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Network,
        Self::SecurityGroup,
        Self::LoadBalancer,
        Self::Listener,
        Self::Compute,
        Self::TaskDefinition,
        Self::Service,
        Self::Stream,
        Self::Function,
        Self::Filesystem,
        Self::MountTarget,
        Self::Role,
        Self::Bucket,
        Self::Repository,
        Self::ApiGateway,
    ];

    /// Returns the camel-case name used in catalogs and plans.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::SecurityGroup => "securityGroup",
            Self::LoadBalancer => "loadBalancer",
            Self::Listener => "listener",
            Self::Compute => "compute",
            Self::TaskDefinition => "taskDefinition",
            Self::Service => "service",
            Self::Stream => "stream",
            Self::Function => "function",
            Self::Filesystem => "filesystem",
            Self::MountTarget => "mountTarget",
            Self::Role => "role",
            Self::Bucket => "bucket",
            Self::Repository => "repository",
            Self::ApiGateway => "apiGateway",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a node is created by the deployment or refers to an existing resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum NodeOrigin {
    /// Created and owned by the deployment.
    #[default]
    Managed,
    /// Looked up by identifier; never created or deleted by the deployment.
    Imported {
        /// Provider identifier of the existing resource.
        identifier: String,
    },
}

impl NodeOrigin {
    /// Returns `true` for imported resources.
    #[must_use]
    pub const fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}
