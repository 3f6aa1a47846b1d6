//! # cairn-graph
//!
//! Deferred-value dependency graph for infrastructure composition.
//!
//! Handles:
//! - **Catalog**: which attributes each resource kind exposes and when they become known.
//! - **Token**: output tokens standing in for not-yet-created attribute values.
//! - **Node** / **Stack**: resource declarations grouped into deployable units.
//! - **Graph**: stack registration, explicit dependencies, and edge derivation.
//! - **Order**: cycle detection and deterministic topological ordering.
//! - **Synth**: validation and emission of the provisioning plan.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cairn_common::types::ResourceKind;
//! use cairn_graph::{CompositionGraph, ResourceCatalog, ResourceNode, Stack, synthesize};
//!
//! # fn main() -> cairn_common::error::Result<()> {
//! let catalog = Arc::new(ResourceCatalog::aws());
//!
//! let mut balancer = Stack::new("Balancer", Arc::clone(&catalog));
//! balancer.declare(ResourceNode::new("listener", ResourceKind::Listener).with("port", 80_u16))?;
//! let listener_arn = balancer.output("listener", "arn")?;
//!
//! let mut service = Stack::new("Service", Arc::clone(&catalog));
//! service.declare(
//!     ResourceNode::new("svc", ResourceKind::Service).with("targetListenerArn", listener_arn),
//! )?;
//!
//! let mut graph = CompositionGraph::new();
//! graph.add_stack(service)?;
//! graph.add_stack(balancer)?;
//!
//! let plan = synthesize(&graph)?;
//! assert_eq!(plan.order(), vec!["Balancer", "Service"]);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod graph;
pub mod node;
pub mod order;
pub mod stack;
pub mod synth;
pub mod token;

pub use catalog::{Availability, KindSchema, ResourceCatalog};
pub use graph::{CompositionGraph, Edge, EdgeCause};
pub use node::ResourceNode;
pub use order::deployment_order;
pub use stack::{Stack, TokenReference};
pub use synth::{ProvisioningPlan, synthesize};
pub use token::{AttributeValue, OutputToken};
