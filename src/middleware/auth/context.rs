/*
 * Responsibility
 * - The resolved principal (AuthUser) and its request-scoped store
 * - The store is a task-local scoped to one request's future: it survives
 *   every await inside the request and is invisible to any other request,
 *   regardless of which worker threads the scheduler picks
 * - Handlers receive AuthUser via extractor; unrelated collaborators
 *   (audit stamping, ownership checks) read the ambient slot
 *
 * Note: task-locals do not cross tokio::spawn. Background tasks that need
 * the identity must be handed it explicitly.
 */
use std::future::Future;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use crate::error::AppError;

/// The authenticated principal for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

tokio::task_local! {
    static CURRENT_USER: AuthUser;
}

/// Run `fut` with `user` as the current identity. The gateway is the only
/// writer; everything downstream reads.
pub async fn scope<F>(user: AuthUser, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_USER.scope(user, fut).await
}

/// The current identity, if this request authenticated.
pub fn find_current_user() -> Option<AuthUser> {
    CURRENT_USER.try_with(|user| user.clone()).ok()
}

/// The current identity, or a 401 when the request carried none.
pub fn current_user() -> Result<AuthUser, AppError> {
    find_current_user().ok_or(AppError::Unauthorized)
}

/// Audit stamp: who is acting now. `None` for anonymous requests, so
/// audit columns stay nullable rather than inventing a system user.
pub fn current_auditor() -> Option<i64> {
    find_current_user().map(|user| user.id)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> AuthUser {
        AuthUser {
            id,
            email: format!("user{id}@example.com"),
        }
    }

    #[tokio::test]
    async fn absent_outside_any_scope() {
        assert_eq!(find_current_user(), None);
        assert!(matches!(current_user(), Err(AppError::Unauthorized)));
        assert_eq!(current_auditor(), None);
    }

    #[tokio::test]
    async fn present_for_the_whole_scoped_future() {
        scope(user(42), async {
            assert_eq!(find_current_user(), Some(user(42)));
            tokio::task::yield_now().await;
            assert_eq!(current_user().unwrap().id, 42);
            assert_eq!(current_auditor(), Some(42));
        })
        .await;

        // Dropped with the request.
        assert_eq!(find_current_user(), None);
    }

    #[tokio::test]
    async fn concurrent_requests_see_their_own_identity() {
        let a = tokio::spawn(scope(user(1), async {
            tokio::task::yield_now().await;
            find_current_user().map(|u| u.id)
        }));
        let b = tokio::spawn(scope(user(2), async {
            tokio::task::yield_now().await;
            find_current_user().map(|u| u.id)
        }));

        assert_eq!(a.await.unwrap(), Some(1));
        assert_eq!(b.await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_slot() {
        scope(user(7), async {
            let seen = tokio::spawn(async { find_current_user() }).await.unwrap();
            assert_eq!(seen, None);
        })
        .await;
    }
}
