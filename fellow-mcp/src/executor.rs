//! Resilient call executor.
//!
//! Wraps a single [`Transport`] attempt in the retry policy. Rate-limited and
//! server-error responses are retried with backoff; everything else is
//! returned on the first failure.

use crate::error::FellowResult;
use crate::retry::{with_retry_if, RetryPolicy, Sleeper, TokioSleeper};
use crate::transport::{RequestDescriptor, Transport, TransportError};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Executes requests against a transport with bounded retries.
#[derive(Clone)]
pub struct CallExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CallExecutor {
    /// Create an executor that waits on the tokio timer.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, Arc::new(TokioSleeper))
    }

    /// Create an executor with a custom wait implementation.
    pub fn with_sleeper(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            policy,
            sleeper,
        }
    }

    /// Get the wait implementation, shared with the pagination loop.
    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    /// Perform the request, retrying transient failures.
    ///
    /// Returns the decoded body of the first successful attempt. Terminal
    /// failures come back as `FellowError::Upstream`; running out of attempts
    /// yields `FellowError::RetriesExhausted`.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &RequestDescriptor) -> FellowResult<Value> {
        let transport = self.transport.as_ref();

        let body = with_retry_if(
            &self.policy,
            self.sleeper.as_ref(),
            move || transport.send(request),
            TransportError::is_retryable,
        )
        .await?;

        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport replaying a fixed script of responses and recording requests.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Value, TransportError>>>,
        requests: Mutex<Vec<RequestDescriptor>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<Result<Value, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<RequestDescriptor> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::network("script exhausted")))
        }
    }
}
