use crate::domain::{DispatchJobStatus, DispatchRequest, DispatchService};
use crate::http::AUTH_TOKEN_HEADER;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::domain::{CallerIdentity, DomainError, DomainResult, IdentityProvider};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct MessageApiState {
    pub dispatch_service: Arc<DispatchService>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

/// Target selection parsed from the intake query string.
///
/// `unitId` and `filter` may repeat; empty values are dropped. `retained`
/// defaults to false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchParams {
    pub device_ids: Vec<String>,
    pub filter_names: Vec<String>,
    pub retained: bool,
}

impl DispatchParams {
    pub fn from_query(query: Option<&str>) -> DomainResult<Self> {
        let mut params = DispatchParams::default();
        let Some(query) = query else {
            return Ok(params);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "unitId" if !value.is_empty() => params.device_ids.push(value.into_owned()),
                "filter" if !value.is_empty() => params.filter_names.push(value.into_owned()),
                "retained" => params.retained = parse_flag(&value)?,
                _ => {}
            }
        }
        Ok(params)
    }

    pub fn into_request(self, message: Bytes) -> DispatchRequest {
        DispatchRequest {
            device_ids: self.device_ids,
            filter_names: self.filter_names,
            message,
            retained: self.retained,
        }
    }
}

fn parse_flag(value: &str) -> DomainResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(DomainError::InvalidRequest(format!(
            "retained must be true or false, got '{}'",
            other
        ))),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobAccepted {
    job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusResponse {
    job_id: String,
    status: DispatchJobStatus,
    submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

/// Domain errors rendered as JSON HTTP responses
struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            DomainError::DispatchJobNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidRequest(_)
            | DomainError::InvalidDeviceId(_)
            | DomainError::InvalidFilterName(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn message_router(state: MessageApiState) -> Router {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/jobs/{job_id}", get(get_job))
        .with_state(state)
}

async fn authenticate(state: &MessageApiState, headers: &HeaderMap) -> DomainResult<CallerIdentity> {
    let token = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| DomainError::Unauthenticated("missing token".to_string()))?;
    state.identity_provider.identity_from_token(token).await
}

async fn send_message(
    State(state): State<MessageApiState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let caller = authenticate(&state, &headers).await?;
    let params = DispatchParams::from_query(query.as_deref())?;

    debug!(
        owner_id = %caller.id,
        device_count = params.device_ids.len(),
        filter_count = params.filter_names.len(),
        retained = params.retained,
        "message received"
    );

    let owner_id = caller.id.clone();
    let job_id = state
        .dispatch_service
        .submit(caller, params.into_request(body))
        .await?;

    info!(owner_id = %owner_id, job_id = %job_id, "dispatch accepted");
    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

async fn get_job(
    State(state): State<MessageApiState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    let job = state.dispatch_service.job_status(&caller, &job_id).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        status: job.status,
        submitted_at: job.submitted_at,
        completed_at: job.completed_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchConfig, InMemoryDispatchJobStore};
    use axum::body::Body;
    use axum::http::Request;
    use common::domain::{
        MockDeviceInventory, MockDevicePublisher, MockFilterRepository, MockIdentityProvider,
    };
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn identity_provider() -> MockIdentityProvider {
        let mut mock_identity = MockIdentityProvider::new();
        mock_identity
            .expect_identity_from_token()
            .returning(|token| match token {
                "token-1" => Ok(CallerIdentity::new("user-1", "key-1")),
                "token-2" => Ok(CallerIdentity::new("user-2", "key-2")),
                _ => Err(DomainError::Unauthenticated("invalid token".to_string())),
            });
        mock_identity
    }

    fn router_with(publisher: MockDevicePublisher, identity: MockIdentityProvider) -> Router {
        let dispatch_service = DispatchService::new(
            Arc::new(MockDeviceInventory::new()),
            Arc::new(MockFilterRepository::new()),
            Arc::new(publisher),
            Arc::new(InMemoryDispatchJobStore::new(16)),
            DispatchConfig::default(),
        )
        .unwrap();

        message_router(MessageApiState {
            dispatch_service: Arc::new(dispatch_service),
            identity_provider: Arc::new(identity),
        })
    }

    fn post_message(uri: &str, token: Option<&str>, body: &'static str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_job_request(job_id: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/messages/jobs/{}", job_id))
            .header(AUTH_TOKEN_HEADER, token)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_params_drop_empty_entries() {
        let params =
            DispatchParams::from_query(Some("unitId=a&unitId=&unitId=b&filter=&filter=north"))
                .unwrap();

        assert_eq!(params.device_ids, vec!["a", "b"]);
        assert_eq!(params.filter_names, vec!["north"]);
        assert!(!params.retained);
    }

    #[test]
    fn test_params_decode_values_and_retained() {
        let params =
            DispatchParams::from_query(Some("filter=north%20wing&retained=true")).unwrap();

        assert_eq!(params.filter_names, vec!["north wing"]);
        assert!(params.retained);
        assert_eq!(DispatchParams::from_query(None).unwrap(), DispatchParams::default());
    }

    #[test]
    fn test_params_reject_bad_retained() {
        let result = DispatchParams::from_query(Some("retained=maybe"));
        assert!(matches!(result, Err(DomainError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_post_message_accepts_and_dispatches() {
        let mut mock_publisher = MockDevicePublisher::new();
        mock_publisher
            .expect_publish()
            .withf(|owner: &CallerIdentity, device_id: &str, message: &Bytes, retained: &bool| {
                owner.api_key == "key-1"
                    && device_id == "dev-a"
                    && message.as_ref() == b"hello"
                    && !*retained
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let app = router_with(mock_publisher, identity_provider());

        let response = app
            .clone()
            .oneshot(post_message(
                "/messages?unitId=dev-a&unitId=",
                Some("token-1"),
                "hello",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job_id = json_body(response).await["jobId"]
            .as_str()
            .unwrap()
            .to_string();

        let mut status = Value::Null;
        for _ in 0..50 {
            let response = app
                .clone()
                .oneshot(get_job_request(&job_id, "token-1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["jobId"], job_id.as_str());
            status = body["status"].clone();
            if status != "pending" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, "succeeded");

        let response = app
            .oneshot(get_job_request(&job_id, "token-1"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert!(body["submittedAt"].is_string());
        assert!(body["completedAt"].is_string());
    }

    #[tokio::test]
    async fn test_post_message_without_token_is_unauthorized() {
        let mut mock_identity = MockIdentityProvider::new();
        mock_identity.expect_identity_from_token().times(0);
        let app = router_with(MockDevicePublisher::new(), mock_identity);

        let response = app
            .oneshot(post_message("/messages?unitId=dev-a", None, "hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_message_with_rejected_token_is_unauthorized() {
        let app = router_with(MockDevicePublisher::new(), identity_provider());

        let response = app
            .oneshot(post_message("/messages?unitId=dev-a", Some("bogus"), "hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_message_with_bad_retained_is_bad_request() {
        let app = router_with(MockDevicePublisher::new(), identity_provider());

        let response = app
            .oneshot(post_message(
                "/messages?unitId=dev-a&retained=sometimes",
                Some("token-1"),
                "hello",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("retained"));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let app = router_with(MockDevicePublisher::new(), identity_provider());

        let response = app
            .oneshot(get_job_request("no-such-job", "token-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_job_of_another_owner_is_not_found() {
        let mut mock_publisher = MockDevicePublisher::new();
        mock_publisher.expect_publish().returning(|_, _, _, _| Ok(()));
        let app = router_with(mock_publisher, identity_provider());

        let response = app
            .clone()
            .oneshot(post_message("/messages?unitId=dev-a", Some("token-1"), "hello"))
            .await
            .unwrap();
        let job_id = json_body(response).await["jobId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(get_job_request(&job_id, "token-2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
