//! One-shot refresh-and-retry state machine shared by every client.
//!
//! ```text
//! SENDING ──2xx──────────────▶ SUCCESS
//!    │    ──4xx/5xx/network──▶ FAIL
//!    └──401──▶ REFRESHING ──ok──▶ RETRYING ──▶ (terminal, any outcome)
//!                  │
//!                  └──err──▶ DEGRADED_TEARDOWN
//! ```
//!
//! At most one refresh and at most two sends per call. A 401 on the retry is
//! terminal. Writes use [`RetryPolicy::RefreshOnly`] so a request that may
//! have had side effects is never re-sent.

use std::fmt;
use std::future::Future;

use realty_auth::{SecretString, SessionError, SessionHandle};

use crate::outcome::RequestOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Sending,
    Refreshing,
    Retrying,
    DegradedTeardown,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sending => "SENDING",
            Self::Refreshing => "REFRESHING",
            Self::Retrying => "RETRYING",
            Self::DegradedTeardown => "DEGRADED_TEARDOWN",
        })
    }
}

/// What to do after a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Re-send once with the new credential (reads, exports).
    RetryOnce,
    /// Renew the session but do not re-send (writes).
    RefreshOnly,
}

#[derive(Debug)]
pub enum FlowOutcome {
    /// Outcome of the first send, or of the retry after a refresh.
    Completed {
        outcome: RequestOutcome,
        retried: bool,
    },
    /// 401, refresh succeeded, request not re-sent ([`RetryPolicy::RefreshOnly`]).
    Renewed,
    /// 401 and the refresh failed; teardown has already run.
    RefreshFailed(SessionError),
    /// No credential; nothing was sent.
    Unauthenticated,
}

/// Run `send` under the refresh state machine.
///
/// `send` is called with the credential to use; it must be safe to call
/// twice when `policy` is [`RetryPolicy::RetryOnce`].
pub async fn run<F, Fut>(
    session: &dyn SessionHandle,
    policy: RetryPolicy,
    endpoint: &str,
    send: F,
) -> FlowOutcome
where
    F: Fn(SecretString) -> Fut,
    Fut: Future<Output = RequestOutcome>,
{
    let Some(credential) = session.credential() else {
        tracing::debug!(endpoint, "no credential, request not sent");
        return FlowOutcome::Unauthenticated;
    };

    tracing::debug!(endpoint, state = %FlowState::Sending, "auth flow");
    let outcome = send(credential).await;
    if !matches!(outcome, RequestOutcome::Unauthorized) {
        return FlowOutcome::Completed {
            outcome,
            retried: false,
        };
    }

    tracing::debug!(endpoint, state = %FlowState::Refreshing, "auth flow");
    let fresh = match session.refresh().await {
        Ok(fresh) => fresh,
        Err(e) => {
            tracing::warn!(
                endpoint,
                state = %FlowState::DegradedTeardown,
                error = %e,
                "session refresh failed"
            );
            teardown(session, endpoint).await;
            return FlowOutcome::RefreshFailed(e);
        }
    };

    match policy {
        RetryPolicy::RefreshOnly => FlowOutcome::Renewed,
        RetryPolicy::RetryOnce => {
            tracing::debug!(endpoint, state = %FlowState::Retrying, "auth flow");
            FlowOutcome::Completed {
                outcome: send(fresh).await,
                retried: true,
            }
        }
    }
}

/// Best-effort sign-out. Failures are logged and swallowed.
async fn teardown(session: &dyn SessionHandle, endpoint: &str) {
    if let Err(e) = session.teardown().await {
        tracing::warn!(endpoint, error = %e, "session teardown failed");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing::{FakeSession, outcome_for};
    use std::sync::Mutex;

    /// Run the flow against a scripted list of statuses, returning the result
    /// and the credential each send used.
    async fn drive(
        session: &FakeSession,
        policy: RetryPolicy,
        statuses: &[u16],
    ) -> (FlowOutcome, Vec<String>) {
        let seen = Mutex::new(Vec::new());
        let script = Mutex::new(statuses.to_vec());
        let result = run(session, policy, "/t", |cred| {
            seen.lock().unwrap().push(cred.expose().to_owned());
            let status = script.lock().unwrap().remove(0);
            async move { outcome_for(status, "[]") }
        })
        .await;
        (result, seen.into_inner().unwrap())
    }

    #[tokio::test]
    async fn success_sends_once() {
        let session = FakeSession::new("t0");
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[200]).await;
        assert!(matches!(result, FlowOutcome::Completed { retried: false, .. }));
        assert_eq!(seen, ["t0"]);
        assert_eq!(session.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn client_error_is_not_refreshed() {
        let session = FakeSession::new("t0");
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[403, 200]).await;
        assert!(matches!(
            result,
            FlowOutcome::Completed {
                outcome: RequestOutcome::ClientError { .. },
                retried: false
            }
        ));
        assert_eq!(seen.len(), 1);
        assert_eq!(session.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_and_retries_with_new_credential() {
        let session = FakeSession::new("t0").refreshing_to("t1");
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[401, 200]).await;
        assert!(matches!(
            result,
            FlowOutcome::Completed {
                outcome: RequestOutcome::Ok(_),
                retried: true
            }
        ));
        assert_eq!(seen, ["t0", "t1"]);
        assert_eq!(session.refresh_calls(), 1);
        assert_eq!(session.teardown_calls(), 0);
    }

    #[tokio::test]
    async fn second_unauthorized_is_terminal() {
        let session = FakeSession::new("t0").refreshing_to("t1");
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[401, 401, 200]).await;
        assert!(matches!(
            result,
            FlowOutcome::Completed {
                outcome: RequestOutcome::Unauthorized,
                retried: true
            }
        ));
        assert_eq!(seen.len(), 2);
        assert_eq!(session.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_tears_down_without_retry() {
        let session = FakeSession::new("t0").failing_refresh().failing_teardown();
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[401, 200]).await;
        assert!(matches!(result, FlowOutcome::RefreshFailed(_)));
        assert_eq!(seen.len(), 1);
        assert_eq!(session.teardown_calls(), 1);
    }

    #[tokio::test]
    async fn refresh_only_never_resends() {
        let session = FakeSession::new("t0").refreshing_to("t1");
        let (result, seen) = drive(&session, RetryPolicy::RefreshOnly, &[401, 200]).await;
        assert!(matches!(result, FlowOutcome::Renewed));
        assert_eq!(seen.len(), 1);
        assert_eq!(session.refresh_calls(), 1);
        assert_eq!(session.credential().unwrap().expose(), "t1");
    }

    #[tokio::test]
    async fn missing_credential_sends_nothing() {
        let session = FakeSession::signed_out();
        let (result, seen) = drive(&session, RetryPolicy::RetryOnce, &[200]).await;
        assert!(matches!(result, FlowOutcome::Unauthenticated));
        assert!(seen.is_empty());
        assert_eq!(session.refresh_calls(), 0);
    }

    #[test]
    fn states_render_like_the_diagram() {
        assert_eq!(FlowState::DegradedTeardown.to_string(), "DEGRADED_TEARDOWN");
        assert_eq!(FlowState::Sending.to_string(), "SENDING");
    }
}
