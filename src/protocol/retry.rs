// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timeout and retry policy for remote calls.

use std::future::Future;
use std::time::Duration;

use crate::error::ProtocolError;

/// Bounds a remote call: each attempt gets `timeout`, and the call gets at
/// most `attempts` attempts, retried immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: u32,
    pub(crate) timeout: Duration,
}

impl RetryPolicy {
    /// Runs `attempt` until it succeeds or the budget is spent.
    ///
    /// Timeouts count as ordinary failures. On exhaustion the error of the
    /// last attempt is wrapped in [`ProtocolError::RetriesExhausted`].
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt: F,
    ) -> Result<T, ProtocolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProtocolError>>,
    {
        self.run_prepared(operation, || async { Ok(()) }, |()| attempt())
            .await
    }

    /// Like [`run`](Self::run), but calls `prepare` before every attempt
    /// and hands its output to `attempt`.
    ///
    /// `prepare` is outside the per-attempt timeout and its errors end the
    /// call at once, without spending the budget.
    pub(crate) async fn run_prepared<P, T, Prep, PrepFut, F, Fut>(
        &self,
        operation: &str,
        mut prepare: Prep,
        mut attempt: F,
    ) -> Result<T, ProtocolError>
    where
        Prep: FnMut() -> PrepFut,
        PrepFut: Future<Output = Result<P, ProtocolError>>,
        F: FnMut(P) -> Fut,
        Fut: Future<Output = Result<T, ProtocolError>>,
    {
        let attempts = self.attempts.max(1);
        let mut n = 1;

        loop {
            let input = prepare().await?;
            let error = match tokio::time::timeout(self.timeout, attempt(input)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => ProtocolError::Timeout(timeout_ms(self.timeout)),
            };

            if n >= attempts {
                return Err(ProtocolError::RetriesExhausted {
                    attempts,
                    source: Box::new(error),
                });
            }

            tracing::debug!(
                operation,
                attempt = n,
                error = %error,
                "Remote call failed, retrying"
            );
            n += 1;
        }
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
