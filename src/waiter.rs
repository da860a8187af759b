// Copyright 2020 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Waiting for a condition to become true.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{sleep_until, timeout_at, Instant};

use super::{Error, ErrorKind};

/// Default delay between two predicate calls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Polls a predicate until it is satisfied or a timeout is reached.
///
/// The predicate returns `Ok(true)` when the condition is met, `Ok(false)` when it has to be
/// checked again later, and an error to stop waiting. Errors are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    timeout: Duration,
    interval: Duration,
}

impl Waiter {
    /// Create a waiter with the given timeout and the default interval.
    pub fn new(timeout: Duration) -> Waiter {
        Waiter {
            timeout,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Change the delay between two predicate calls.
    pub fn with_interval(mut self, interval: Duration) -> Waiter {
        self.interval = interval;
        self
    }

    /// Timeout of the whole wait.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between two predicate calls.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the predicate to return `true`.
    ///
    /// The first call happens after one interval. A predicate call that is still running at the
    /// deadline is cancelled, and no calls are made after the deadline.
    pub async fn wait<F, Fut>(&self, mut predicate: F) -> Result<(), Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, Error>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempt = 0u32;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(attempt));
            }
            sleep_until(std::cmp::min(now + self.interval, deadline)).await;
            if Instant::now() >= deadline {
                return Err(self.timed_out(attempt));
            }

            attempt += 1;
            match timeout_at(deadline, predicate()).await {
                Ok(Ok(true)) => {
                    debug!("Condition satisfied after {} attempt(s)", attempt);
                    return Ok(());
                }
                Ok(Ok(false)) => debug!("Condition not satisfied yet, attempt {}", attempt),
                Ok(Err(err)) => return Err(err),
                Err(_) => return Err(self.timed_out(attempt)),
            }
        }
    }

    fn timed_out(&self, attempts: u32) -> Error {
        Error::new(
            ErrorKind::OperationTimedOut,
            format!(
                "Condition was not satisfied within {:?} ({} attempt(s))",
                self.timeout, attempts
            ),
        )
    }
}

impl From<Duration> for Waiter {
    fn from(value: Duration) -> Waiter {
        Waiter::new(value)
    }
}

/// Wait for the predicate with the default interval.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), oscloud::Error> {
/// use std::time::Duration;
///
/// use oscloud::dns::v2::zones::{self, ZoneStatus};
///
/// let session = oscloud::Session::from_env()?;
/// let dns = session.adapter(oscloud::services::DNS)?;
/// oscloud::wait_for(Duration::from_secs(300), || async {
///     let zone = zones::get(&dns, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3").await?;
///     Ok(zone.status == ZoneStatus::Active)
/// })
/// .await?;
/// # Ok(()) }
/// ```
pub async fn wait_for<F, Fut>(timeout: Duration, predicate: F) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    Waiter::new(timeout).wait(predicate).await
}

#[cfg(test)]
mod test {
    use std::future::pending;
    use std::time::Duration;

    use super::{wait_for, Waiter};
    use crate::{Error, ErrorKind};

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let mut calls = 0;
        wait_for(Duration::from_secs(5), || {
            calls += 1;
            async { Ok(true) }
        })
        .await
        .unwrap();
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_call() {
        let mut calls = 0;
        wait_for(Duration::from_secs(60), || {
            calls += 1;
            let done = calls == 3;
            async move { Ok(done) }
        })
        .await
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut calls = 0;
        let err = Waiter::new(Duration::from_secs(10))
            .with_interval(Duration::from_secs(1))
            .wait(|| {
                calls += 1;
                async { Ok(false) }
            })
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationTimedOut);
        assert_eq!(calls, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_propagated() {
        let mut calls = 0;
        let err = wait_for(Duration::from_secs(60), || {
            calls += 1;
            async { Err(Error::new(ErrorKind::OperationFailed, "Error has occurred")) }
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert_eq!(err.message(), "Error has occurred");
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_predicate() {
        let mut calls = 0;
        let err = Waiter::new(Duration::from_secs(3))
            .wait(|| {
                calls += 1;
                async {
                    pending::<()>().await;
                    Ok(true)
                }
            })
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationTimedOut);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_from_duration() {
        let waiter = Waiter::from(Duration::from_secs(30));
        assert_eq!(waiter.timeout(), Duration::from_secs(30));
        assert_eq!(waiter.interval(), Duration::from_secs(1));
    }
}
