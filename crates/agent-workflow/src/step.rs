//! Typed workflow steps

use std::time::Instant;

use async_trait::async_trait;
use tracing::{Instrument, debug, info_span, warn};

/// One unit of work with a typed input and output
#[async_trait]
pub trait Step: Send + Sync {
    /// Value consumed by the step
    type Input: Send + 'static;
    /// Value produced for the next step
    type Output: Send + 'static;
    /// Failure type, shared by every step of a workflow
    type Error: std::fmt::Display + Send + 'static;

    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Run the step
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Identifiers of the leaf steps, in execution order
    fn step_ids(&self) -> Vec<String> {
        vec![self.id().to_string()]
    }
}

/// Wraps a step in a tracing span and logs its duration and failure
pub struct Traced<S> {
    inner: S,
}

impl<S> Traced<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: Step> Step for Traced<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;

    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let span = info_span!("step", id = %self.inner.id());
        async {
            let started = Instant::now();
            let outcome = self.inner.execute(input).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(_) => debug!(elapsed_ms, "step completed"),
                Err(e) => warn!(elapsed_ms, error = %e, "step failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    fn step_ids(&self) -> Vec<String> {
        self.inner.step_ids()
    }
}

/// Two steps run back to back, the first one's output feeding the second
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A, B> Step for Chain<A, B>
where
    A: Step,
    B: Step<Input = A::Output, Error = A::Error>,
{
    type Input = A::Input;
    type Output = B::Output;
    type Error = A::Error;

    fn id(&self) -> &str {
        self.second.id()
    }

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let intermediate = self.first.execute(input).await?;
        self.second.execute(intermediate).await
    }

    fn step_ids(&self) -> Vec<String> {
        let mut ids = self.first.step_ids();
        ids.extend(self.second.step_ids());
        ids
    }
}
