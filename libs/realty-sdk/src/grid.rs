use std::sync::Arc;

use futures_core::Stream;
use realty_auth::SessionHandle;
use realty_query::{GridQuery, GridResponse, encode_query};

use crate::auth_flow::{self, FlowOutcome, RetryPolicy};
use crate::error::ApiError;
use crate::executor::{ApiRequest, RequestExecutor};
use crate::outcome::RequestOutcome;
use crate::pager::GridPager;

/// Read client for list endpoints.
///
/// Never fails: every failure (no session, expired session that could not be
/// renewed, backend error, network error, unparseable body, bad query) is
/// logged and returned as [`GridResponse::empty`].
#[derive(Clone)]
pub struct GridClient {
    executor: Arc<dyn RequestExecutor>,
    session: Arc<dyn SessionHandle>,
}

impl std::fmt::Debug for GridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridClient").finish_non_exhaustive()
    }
}

impl GridClient {
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, session: Arc<dyn SessionHandle>) -> Self {
        Self { executor, session }
    }

    pub async fn fetch_grid(&self, endpoint: &str, query: &GridQuery) -> GridResponse {
        match self.try_fetch(endpoint, query).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(endpoint, kind = ?e.kind(), error = %e, "grid read degraded to empty");
                GridResponse::empty()
            }
        }
    }

    /// Walk a paginated grid page by page, starting at `query.page` (or 1).
    ///
    /// Stops after the last page reported by `totalPages`, on an empty page,
    /// or after a bare (unpaginated) response.
    pub fn pages<'a>(
        &'a self,
        endpoint: &'a str,
        query: GridQuery,
    ) -> impl Stream<Item = GridResponse> + 'a {
        GridPager::new(query, move |q: GridQuery| async move {
            self.fetch_grid(endpoint, &q).await
        })
    }

    async fn try_fetch(&self, endpoint: &str, query: &GridQuery) -> Result<GridResponse, ApiError> {
        let encoded = encode_query(query)?;
        let request = ApiRequest::get(endpoint).with_query(encoded);
        let executor = &self.executor;
        let request = &request;

        let flow = auth_flow::run(
            self.session.as_ref(),
            RetryPolicy::RetryOnce,
            endpoint,
            |credential| async move { executor.execute(request, &credential).await },
        )
        .await;

        match flow {
            FlowOutcome::Completed {
                outcome: RequestOutcome::Ok(payload),
                ..
            } => serde_json::from_slice(&payload.body).map_err(|e| ApiError::MalformedResponse {
                message: e.to_string(),
            }),
            FlowOutcome::Completed { outcome, .. } => outcome.into_result().map(|_| GridResponse::empty()),
            FlowOutcome::RefreshFailed(_) | FlowOutcome::Renewed => {
                Err(ApiError::AuthExpired { renewed: false })
            }
            FlowOutcome::Unauthenticated => Err(ApiError::Unauthenticated),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing::{FakeExecutor, FakeSession, Reply};
    use futures_util::StreamExt;
    use realty_query::SortDir;
    use serde_json::json;

    fn client(executor: &Arc<FakeExecutor>, session: &Arc<FakeSession>) -> GridClient {
        GridClient::new(executor.clone(), session.clone())
    }

    fn paged(page: u64, total_pages: u64, rows: usize) -> Reply {
        let data: Vec<_> = (0..rows).map(|i| json!({"id": i})).collect();
        Reply::status(
            200,
            json!({
                "data": data,
                "total": 10,
                "page": page,
                "limit": rows,
                "totalPages": total_pages
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn returns_parsed_rows() {
        let executor = Arc::new(FakeExecutor::new([Reply::status(200, r#"[{"id":1},{"id":2}]"#)]));
        let session = Arc::new(FakeSession::new("t0"));

        let query = GridQuery::builder()
            .sort_by("price", SortDir::Desc)
            .page(1)
            .limit(2)
            .build();
        let grid = client(&executor, &session).fetch_grid("/properties", &query).await;

        assert_eq!(grid.rows().len(), 2);
        let call = &executor.calls()[0];
        assert_eq!(call.credential, "t0");
        assert_eq!(call.request.path, "/properties");
        assert_eq!(
            call.request.query.to_query_string(),
            "sortField=price&sort=desc&page=1&limit=2"
        );
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_transparently() {
        let executor = Arc::new(FakeExecutor::new([
            Reply::status(401, ""),
            paged(1, 1, 3),
        ]));
        let session = Arc::new(FakeSession::new("t0").refreshing_to("t1"));

        let grid = client(&executor, &session)
            .fetch_grid("/properties", &GridQuery::default())
            .await;

        assert_eq!(grid.rows().len(), 3);
        let creds: Vec<_> = executor.calls().into_iter().map(|c| c.credential).collect();
        assert_eq!(creds, ["t0", "t1"]);
        assert_eq!(session.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_degrades_and_tears_down() {
        let executor = Arc::new(FakeExecutor::new([Reply::status(401, "")]));
        let session = Arc::new(FakeSession::new("t0").failing_refresh().failing_teardown());

        let grid = client(&executor, &session)
            .fetch_grid("/properties", &GridQuery::default())
            .await;

        assert!(grid.is_empty());
        assert_eq!(executor.call_count(), 1);
        assert_eq!(session.teardown_calls(), 1);
    }

    #[tokio::test]
    async fn double_unauthorized_degrades_after_two_calls() {
        let executor = Arc::new(FakeExecutor::new([
            Reply::status(401, ""),
            Reply::status(401, ""),
        ]));
        let session = Arc::new(FakeSession::new("t0").refreshing_to("t1"));

        let grid = client(&executor, &session)
            .fetch_grid("/properties", &GridQuery::default())
            .await;

        assert!(grid.is_empty());
        assert_eq!(executor.call_count(), 2);
        assert_eq!(session.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn every_failure_degrades_to_empty() {
        for reply in [
            Reply::status(500, r#"{"message":"db down"}"#),
            Reply::status(404, ""),
            Reply::Network,
            Reply::status(200, "<html>not json</html>"),
            Reply::status(200, r#"{"rows": []}"#),
        ] {
            let executor = Arc::new(FakeExecutor::new([reply]));
            let session = Arc::new(FakeSession::new("t0"));
            let grid = client(&executor, &session)
                .fetch_grid("/properties", &GridQuery::default())
                .await;
            assert!(grid.is_empty());
            assert_eq!(executor.call_count(), 1);
            assert_eq!(session.refresh_calls(), 0);
        }
    }

    #[tokio::test]
    async fn no_session_sends_nothing() {
        let executor = Arc::new(FakeExecutor::default());
        let session = Arc::new(FakeSession::signed_out());

        let grid = client(&executor, &session)
            .fetch_grid("/properties", &GridQuery::default())
            .await;

        assert!(grid.is_empty());
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn unencodable_query_sends_nothing() {
        let executor = Arc::new(FakeExecutor::default());
        let session = Arc::new(FakeSession::new("t0"));

        let query = GridQuery::builder().filter("price", "100-200").build();
        let grid = client(&executor, &session).fetch_grid("/properties", &query).await;

        assert!(grid.is_empty());
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn pages_walks_until_total_pages() {
        let executor = Arc::new(FakeExecutor::new([paged(1, 3, 2), paged(2, 3, 2), paged(3, 3, 1)]));
        let session = Arc::new(FakeSession::new("t0"));
        let grid = client(&executor, &session);

        let query = GridQuery::builder().limit(2).build();
        let pages: Vec<_> = grid.pages("/properties", query).collect().await;

        assert_eq!(pages.len(), 3);
        let requested: Vec<_> = executor
            .calls()
            .iter()
            .map(|c| c.request.query.get("page").unwrap_or_default().to_owned())
            .collect();
        assert_eq!(requested, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn pages_stops_on_failure() {
        let executor = Arc::new(FakeExecutor::new([paged(1, 5, 2), Reply::status(500, "")]));
        let session = Arc::new(FakeSession::new("t0"));
        let grid = client(&executor, &session);

        let pages: Vec<_> = grid.pages("/properties", GridQuery::default()).collect().await;

        assert_eq!(pages.len(), 1);
        assert_eq!(executor.call_count(), 2);
    }
}
