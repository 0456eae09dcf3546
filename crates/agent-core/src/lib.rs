//! Core abstractions shared by every crate in the workspace
//!
//! An [`Agent`] takes a single user prompt and answers with a [`TextStream`]
//! of chunks. [`drain`] concatenates such a stream in emission order.

pub mod agent;
pub mod error;
pub mod stream;

pub use agent::Agent;
pub use error::{Error, Result};
pub use stream::{TextStream, drain, from_chunks, once};
