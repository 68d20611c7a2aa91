//! Sluice Workflow
//!
//! This crate provides the definition side of a sluice task graph. A
//! [`Workflow`] is built by registering nodes one at a time with
//! [`Workflow::define`]; every upstream a node names must already be
//! registered. Validation therefore happens eagerly:
//! - duplicate node ids are rejected
//! - unknown upstream ids (forward references) are rejected
//! - cycles cannot be expressed, since an edge always points at an
//!   earlier registration
//!
//! The definition order is a valid topological order, which the runtime relies
//! on when propagating skips.

mod error;
mod graph;
mod node;
mod retry;
mod workflow;

pub use error::WorkflowError;
pub use graph::Graph;
pub use node::Node;
pub use retry::RetryPolicy;
pub use workflow::Workflow;
