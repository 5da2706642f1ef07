/*
 * Responsibility
 * - Ownership checks over the ambient identity, for handlers and services
 *   that gate access on "is the caller acting on their own resource"
 * - The gateway only attaches identity; the 403 decision lives here
 */
use crate::error::AppError;
use crate::middleware::auth::context;

/// The acting user's id, or `None` when the request is anonymous.
pub fn current_user_id() -> Option<i64> {
    context::find_current_user().map(|user| user.id)
}

pub fn is_authenticated() -> bool {
    current_user_id().is_some()
}

/// Whether the current user owns the resource. Anonymous callers and
/// ownerless resources never pass.
pub fn has_access_to_resource(resource_owner_id: Option<i64>) -> bool {
    match (current_user_id(), resource_owner_id) {
        (Some(current), Some(owner)) => {
            let has_access = current == owner;
            tracing::debug!(current, owner, has_access, "resource access check");
            has_access
        }
        (current, owner) => {
            tracing::debug!(?current, ?owner, "access denied: missing party");
            false
        }
    }
}

/// Fail with 403 unless the current user owns the resource.
pub fn require_resource_owner(resource_owner_id: Option<i64>) -> Result<(), AppError> {
    if has_access_to_resource(resource_owner_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("not the resource owner"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::context::{AuthUser, scope};

    fn user(id: i64) -> AuthUser {
        AuthUser {
            id,
            email: format!("user{id}@example.com"),
        }
    }

    #[tokio::test]
    async fn anonymous_callers_never_have_access() {
        assert!(!is_authenticated());
        assert!(!has_access_to_resource(Some(1)));
        assert!(matches!(
            require_resource_owner(Some(1)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn owners_pass_non_owners_do_not() {
        scope(user(1), async {
            assert!(is_authenticated());
            assert_eq!(current_user_id(), Some(1));

            assert!(has_access_to_resource(Some(1)));
            require_resource_owner(Some(1)).unwrap();

            assert!(!has_access_to_resource(Some(2)));
            assert!(require_resource_owner(Some(2)).is_err());
        })
        .await;
    }

    #[tokio::test]
    async fn ownerless_resources_are_denied() {
        scope(user(1), async {
            assert!(!has_access_to_resource(None));
            assert!(require_resource_owner(None).is_err());
        })
        .await;
    }
}
