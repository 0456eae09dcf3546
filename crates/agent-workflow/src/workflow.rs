//! Sequential workflow definition and execution

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::step::{Chain, Step, Traced};

/// A named, strictly sequential composition of typed steps
///
/// Each step's output is the next step's input; the first error stops the
/// run. Every step gets its own tracing span.
///
/// # Example
///
/// ```no_run
/// use agent_workflow::{Step, Workflow};
///
/// struct Trim;
///
/// #[async_trait::async_trait]
/// impl Step for Trim {
///     type Input = String;
///     type Output = String;
///     type Error = String;
///
///     fn id(&self) -> &str {
///         "trim"
///     }
///
///     async fn execute(&self, input: String) -> Result<String, String> {
///         Ok(input.trim().to_string())
///     }
/// }
///
/// # async fn example() -> Result<(), String> {
/// let workflow = Workflow::new("normalize", Trim).then(Trim);
/// assert_eq!(workflow.run("  Nvidia ".to_string()).await?, "Nvidia");
/// # Ok(())
/// # }
/// ```
pub struct Workflow<S> {
    id: String,
    steps: S,
}

impl<S: Step> Workflow<Traced<S>> {
    /// Start a workflow with its first step
    pub fn new(id: impl Into<String>, first: S) -> Self {
        Self {
            id: id.into(),
            steps: Traced::new(first),
        }
    }
}

impl<S: Step> Workflow<S> {
    /// Append a step consuming the current output
    pub fn then<N>(self, next: N) -> Workflow<Chain<S, Traced<N>>>
    where
        N: Step<Input = S::Output, Error = S::Error>,
    {
        Workflow {
            id: self.id,
            steps: Chain::new(self.steps, Traced::new(next)),
        }
    }

    /// Workflow identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Step identifiers in execution order
    pub fn step_ids(&self) -> Vec<String> {
        self.steps.step_ids()
    }

    /// Execute every step in order
    pub async fn run(&self, input: S::Input) -> Result<S::Output, S::Error> {
        let span = info_span!("workflow", id = %self.id);
        async {
            let started = Instant::now();
            let output = self.steps.execute(input).await?;
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "workflow completed");
            Ok(output)
        }
        .instrument(span)
        .await
    }
}
