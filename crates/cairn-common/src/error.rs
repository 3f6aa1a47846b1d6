//! Unified error types for the Cairn workspace.
//!
//! Every failure is a construction-time or synthesis-time validation error.
//! None of them are transient, so nothing here is ever retried: callers
//! propagate them with `?` and no partial plan is produced.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CairnError {
    /// A node id was declared twice within one stack.
    #[error("duplicate node \"{node}\" in stack \"{stack}\"")]
    DuplicateNode {
        /// Stack that already owns the id.
        stack: String,
        /// The repeated node id.
        node: String,
    },

    /// A node id does not exist in the stack it was looked up in.
    #[error("unknown node \"{node}\" in stack \"{stack}\"")]
    UnknownNode {
        /// Stack that was searched.
        stack: String,
        /// The missing node id.
        node: String,
    },

    /// An attribute name is not part of the node kind's schema.
    #[error("attribute \"{attribute}\" is not declared on kind {kind} (node \"{node}\")")]
    UnknownAttribute {
        /// Node the attribute was requested on or declared for.
        node: String,
        /// Resource kind of the node.
        kind: String,
        /// The unknown attribute name.
        attribute: String,
    },

    /// An attribute is known but was given a value its slot cannot hold.
    #[error("invalid value for attribute \"{attribute}\" on node \"{node}\": {message}")]
    InvalidAttribute {
        /// Node being declared.
        node: String,
        /// Offending attribute name.
        attribute: String,
        /// What is wrong with the value.
        message: String,
    },

    /// A stack name was registered twice in one graph.
    #[error("duplicate stack \"{name}\"")]
    DuplicateStack {
        /// The repeated stack name.
        name: String,
    },

    /// A stack name is not registered in the graph.
    #[error("unknown stack \"{name}\"")]
    UnknownStack {
        /// The missing stack name.
        name: String,
    },

    /// The stack graph contains a cycle.
    ///
    /// `path` lists every stack on the cycle once, in edge order; the last
    /// stack depends back on the first.
    #[error("cyclic dependency between stacks: {}", render_cycle(path))]
    CyclicDependency {
        /// Stacks on the cycle, in order.
        path: Vec<String>,
    },

    /// A token points at a producer that is missing or ordered after its consumer.
    #[error(
        "unresolvable token {token} consumed by {consumer} (edge {producer_stack} -> {consumer_stack}): {reason}"
    )]
    UnresolvableToken {
        /// Fully qualified consumer attribute (`Stack.node.attribute`).
        consumer: String,
        /// Token placeholder (`${Stack.node.attribute}`).
        token: String,
        /// Stack the token claims to come from.
        producer_stack: String,
        /// Stack holding the consumer node.
        consumer_stack: String,
        /// Why the token cannot be resolved.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

fn render_cycle(path: &[String]) -> String {
    match path.first() {
        Some(first) => {
            let mut rendered = path.join(" -> ");
            rendered.push_str(" -> ");
            rendered.push_str(first);
            rendered
        }
        None => String::from("<empty>"),
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CairnError>;
