//! Uniform call path for registered tools

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Result, ToolError};
use crate::{ToolOutput, ToolRegistry};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Looks up a named tool, calls it under a deadline and normalises failures.
///
/// Cheap to clone; clones share the registry and the rate limiter.
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    rate_limiter: Option<SharedRateLimiter>,
}

impl ToolInvoker {
    /// Create an invoker over a populated registry
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TIMEOUT,
            rate_limiter: None,
        }
    }

    /// Per-call deadline; elapsed calls fail as [`ToolError::Upstream`]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap calls across all clones at `per_second`; zero disables the cap
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limiter = NonZeroU32::new(per_second)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        self
    }

    /// The underlying registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Configured per-call deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fail with [`ToolError::CapabilityNotFound`] for the first name that is
    /// not registered. Meant for startup validation.
    pub fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        match self.registry.missing(names).first() {
            Some(name) => Err(ToolError::CapabilityNotFound {
                name: (*name).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Invoke `name` with `args`
    #[instrument(skip(self, args), fields(tool = %name))]
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolOutput> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::CapabilityNotFound {
                name: name.to_string(),
            })?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, tool.execute(args)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                debug!(elapsed_ms, blocks = output.content.len(), "tool call succeeded");
                Ok(output)
            }
            Ok(Err(source)) => {
                warn!(elapsed_ms, error = %source, "tool call failed");
                Err(ToolError::Upstream {
                    tool: name.to_string(),
                    source,
                })
            }
            Err(_) => {
                warn!(elapsed_ms, timeout = ?self.timeout, "tool call timed out");
                Err(ToolError::Upstream {
                    tool: name.to_string(),
                    source: agent_core::Error::Timeout(self.timeout),
                })
            }
        }
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("tools", &self.registry.len())
            .field("timeout", &self.timeout)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish()
    }
}
