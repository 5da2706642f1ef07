/*
 * Responsibility
 * - Per-request authentication: open-path bypass -> bearer extraction ->
 *   remote validation -> identity propagation
 * - Attach identity when a token resolves to one; never reject a request
 *   just for carrying no credential (presence is downstream policy)
 * - Fail closed when the validator itself fails: the pipeline below this
 *   middleware never runs and the client gets a 401
 */
use axum::Router;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;

use crate::error::AppError;
use crate::middleware::auth::context;
use crate::state::AppState;

const BEARER: &str = "Bearer ";

/// Apply the authentication gateway to every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 from_fn cannot receive a State extractor on its own, so the
    // state is passed explicitly via from_fn_with_state.
    router.layer(middleware::from_fn_with_state(state, authenticate))
}

async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.open_paths.is_open(req.uri().path(), req.method()) {
        // Allow-listed: the validator is never consulted.
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER))
        .map(str::to_string);

    let Some(token) = token else {
        // No bearer credential: attach nothing and let downstream
        // authorization decide whether the endpoint tolerates it.
        return Ok(next.run(req).await);
    };

    // Suspends this request's task only; a timeout or transport failure
    // terminates the request as 401 before any handler runs. Cancelling
    // the request drops this future and abandons the in-flight call.
    let outcome = state.validator.validate_token(&token).await?;

    match outcome.identity() {
        Some(user) => {
            req.extensions_mut().insert(user.clone());
            Ok(context::scope(user, next.run(req)).await)
        }
        // The service answered, and the answer was "not valid" (or valid
        // with no id). The request continues unauthenticated rather than
        // being rejected here; endpoints that require an identity still
        // fail with 401 downstream.
        None => Ok(next.run(req).await),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::db::{Db, settings};
    use crate::middleware::auth::context::AuthUser;
    use crate::middleware::auth::open_paths::OpenPaths;
    use crate::middleware::error_responder;
    use crate::services::user_client::{TokenValidator, UserClientError, ValidateTokenResponse};
    use crate::state::AppState;

    enum Behavior {
        /// valid=true with id parsed from the token (default 42).
        Valid,
        /// valid=false with a full identity attached.
        Invalid,
        /// valid=true but no id.
        ValidWithoutId,
        /// Transport failure / timeout.
        Fail,
    }

    struct StubValidator {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubValidator {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenValidator for StubValidator {
        async fn validate_token(
            &self,
            token: &str,
        ) -> Result<ValidateTokenResponse, UserClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = token.parse::<i64>().unwrap_or(42);

            match self.behavior {
                Behavior::Valid => Ok(ValidateTokenResponse {
                    id: Some(id),
                    email: Some(format!("user{id}@example.com")),
                    valid: true,
                    expires_at: None,
                }),
                Behavior::Invalid => Ok(ValidateTokenResponse {
                    id: Some(id),
                    email: Some(format!("user{id}@example.com")),
                    valid: false,
                    expires_at: None,
                }),
                Behavior::ValidWithoutId => Ok(ValidateTokenResponse {
                    id: None,
                    email: None,
                    valid: true,
                    expires_at: None,
                }),
                Behavior::Fail => Err(UserClientError::Url(url::ParseError::EmptyHost)),
            }
        }
    }

    fn test_state(validator: Arc<dyn TokenValidator>, open_paths: &str) -> AppState {
        AppState::new(
            Db::connect_lazy(&settings::sample()).unwrap(),
            validator,
            OpenPaths::parse(open_paths).unwrap(),
        )
    }

    /// The ambient identity as downstream collaborators see it.
    async fn whoami() -> axum::Json<Option<AuthUser>> {
        axum::Json(context::find_current_user())
    }

    /// An endpoint whose policy requires an identity.
    async fn me(user: AuthUser) -> axum::Json<AuthUser> {
        axum::Json(user)
    }

    fn app(state: AppState) -> Router {
        let routes = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/v1/api/whoami", get(whoami))
            .route("/v1/api/me", get(me));
        let routes = apply(routes, state.clone());
        error_responder::apply(routes.with_state(state))
    }

    fn request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn open_path_never_consults_the_validator() {
        let validator = StubValidator::new(Behavior::Fail);
        let app = app(test_state(validator.clone(), "/health"));

        // Even with a token attached, an open path skips validation.
        let response = app
            .oneshot(request("/health", Some("Bearer abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn open_path_rule_with_glob_matches_the_health_scenario() {
        let validator = StubValidator::new(Behavior::Fail);
        let app = app(test_state(validator.clone(), "/public/**, /health"));

        let response = app.oneshot(request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn missing_credential_forwards_unauthenticated() {
        let validator = StubValidator::new(Behavior::Fail);
        let app = app(test_state(validator.clone(), ""));

        let response = app.oneshot(request("/v1/api/whoami", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn non_bearer_scheme_forwards_unauthenticated() {
        let validator = StubValidator::new(Behavior::Fail);
        let app = app(test_state(validator.clone(), ""));

        let response = app
            .oneshot(request("/v1/api/whoami", Some("Basic dXNlcjpwdw==")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn valid_token_attaches_the_resolved_identity() {
        let validator = StubValidator::new(Behavior::Valid);
        let app = app(test_state(validator.clone(), ""));

        let response = app
            .oneshot(request("/v1/api/whoami", Some("Bearer 42")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 42);
        assert_eq!(body["email"], "user42@example.com");
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn identity_reaches_the_extractor_through_extensions() {
        let validator = StubValidator::new(Behavior::Valid);
        let app = app(test_state(validator, ""));

        let response = app
            .oneshot(request("/v1/api/me", Some("Bearer 7")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], 7);
    }

    #[tokio::test]
    async fn invalid_token_continues_anonymously() {
        // valid=false resumes the pipeline with no identity attached;
        // rejection is left to downstream policy.
        let validator = StubValidator::new(Behavior::Invalid);
        let app = app(test_state(validator.clone(), ""));

        let response = app
            .oneshot(request("/v1/api/whoami", Some("Bearer 42")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn valid_without_id_continues_anonymously() {
        let validator = StubValidator::new(Behavior::ValidWithoutId);
        let app = app(test_state(validator, ""));

        let response = app
            .oneshot(request("/v1/api/whoami", Some("Bearer 42")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);
    }

    #[tokio::test]
    async fn validator_failure_terminates_the_request_with_401() {
        let validator = StubValidator::new(Behavior::Fail);
        let app = app(test_state(validator.clone(), ""));

        let response = app
            .oneshot(request("/v1/api/whoami", Some("Bearer abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid credentials");
        assert_eq!(body["path"], "/v1/api/whoami");
        assert_eq!(body["status"], "UNAUTHORIZED");
        assert!(body["timestamp"].is_string());
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn validator_failure_never_reaches_downstream() {
        use std::sync::atomic::AtomicBool;

        let ran = Arc::new(AtomicBool::new(false));
        let ran_probe = ran.clone();

        let validator = StubValidator::new(Behavior::Fail);
        let state = test_state(validator, "");
        let routes = Router::new().route(
            "/v1/api/orders",
            get(move || {
                let ran = ran_probe.clone();
                async move {
                    ran.store(true, Ordering::SeqCst);
                    "ok"
                }
            }),
        );
        let app = error_responder::apply(apply(routes, state.clone()).with_state(state));

        let response = app
            .oneshot(request("/v1/api/orders", Some("Bearer abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn endpoint_requiring_identity_rejects_anonymous_with_401() {
        let validator = StubValidator::new(Behavior::Valid);
        let app = app(test_state(validator, ""));

        let response = app.oneshot(request("/v1/api/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "UNAUTHORIZED");
        assert_eq!(body["path"], "/v1/api/me");
    }

    #[tokio::test]
    async fn concurrent_requests_see_only_their_own_identity() {
        let validator = StubValidator::new(Behavior::Valid);
        let app = app(test_state(validator, ""));

        let (first, second) = tokio::join!(
            app.clone()
                .oneshot(request("/v1/api/whoami", Some("Bearer 1"))),
            app.clone()
                .oneshot(request("/v1/api/whoami", Some("Bearer 2"))),
        );

        assert_eq!(body_json(first.unwrap()).await["id"], 1);
        assert_eq!(body_json(second.unwrap()).await["id"], 2);
    }
}
