// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authenticated session and its cache.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// An authenticated session with the BlueAir API.
///
/// The access token is never printed by the `Debug` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    obtained_at: Instant,
}

impl Session {
    /// Creates a session obtained now.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            obtained_at: Instant::now(),
        }
    }

    /// Returns the bearer token sent with every API request.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the time elapsed since the session was obtained.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.obtained_at.elapsed()
    }

    /// Returns `true` once the session is older than `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("age", &self.age())
            .finish()
    }
}

#[cfg(feature = "http")]
pub(crate) use cache::SessionCache;

#[cfg(feature = "http")]
mod cache {
    use std::future::Future;
    use std::time::Duration;

    use super::Session;
    use crate::error::ProtocolError;

    /// Holds the current session and serializes refreshes.
    ///
    /// Concurrent callers that find the session expired wait for a single
    /// login instead of each starting their own.
    #[derive(Debug, Default)]
    pub(crate) struct SessionCache {
        current: parking_lot::Mutex<Option<Session>>,
        refresh: tokio::sync::Mutex<()>,
    }

    impl SessionCache {
        fn valid(&self, ttl: Duration) -> Option<Session> {
            self.current
                .lock()
                .as_ref()
                .filter(|session| !session.is_expired(ttl))
                .cloned()
        }

        /// Returns the cached session, running `login` if it is missing or
        /// expired.
        pub(crate) async fn get_or_refresh<F, Fut>(
            &self,
            ttl: Duration,
            login: F,
        ) -> Result<Session, ProtocolError>
        where
            F: FnOnce() -> Fut,
            Fut: Future<Output = Result<Session, ProtocolError>>,
        {
            if let Some(session) = self.valid(ttl) {
                return Ok(session);
            }

            let _refreshing = self.refresh.lock().await;
            if let Some(session) = self.valid(ttl) {
                return Ok(session);
            }

            tracing::debug!("Session missing or expired, logging in");
            let session = login().await?;
            *self.current.lock() = Some(session.clone());
            Ok(session)
        }

        /// Drops the cached session.
        pub(crate) fn invalidate(&self) {
            *self.current.lock() = None;
        }
    }
}
