//! Tool management and invocation
//!
//! A [`Tool`] is a named external capability taking JSON arguments and
//! answering with [`ToolOutput`] content blocks. Tools are collected once at
//! startup into a [`ToolRegistry`], then shared read-only. [`ToolInvoker`]
//! is the uniform call path: lookup, timeout, optional rate limit and error
//! normalisation into [`ToolError`].

pub mod error;
pub mod invoker;
pub mod registry;
pub mod tool;

pub use error::ToolError;
pub use invoker::ToolInvoker;
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContent, ToolOutput};
