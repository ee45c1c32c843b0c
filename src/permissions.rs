//! Pure authorization predicates. Nothing here touches the database or the
//! request; handlers load the target first and then consult the policy for
//! the action they are about to perform.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    pub fn is_read(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// What a resource demands of the caller for a given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AllowAny,
    Authenticated,
    OwnerOrStaff,
}

/// Posts: anyone may read, creating requires a login, everything else is
/// reserved for the owner (or staff).
pub fn post_policy(action: Action) -> Policy {
    match action {
        Action::List | Action::Retrieve => Policy::AllowAny,
        Action::Create => Policy::Authenticated,
        Action::Update | Action::PartialUpdate | Action::Destroy => Policy::OwnerOrStaff,
    }
}

/// The comment resource is open to any logged-in caller for every action.
pub fn comment_policy(_action: Action) -> Policy {
    Policy::Authenticated
}

/// The moderation view: listing is gated on thread ownership, but single-item
/// operations only require a login. The lookup set is still restricted to the
/// caller's own threads, so foreign comments resolve to not-found.
pub fn private_policy(action: Action) -> Policy {
    match action {
        Action::List => Policy::OwnerOrStaff,
        _ => Policy::Authenticated,
    }
}

#[derive(Debug, Error, Clone)]
pub enum PermissionError {
    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,
}

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        let status = match self {
            PermissionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            PermissionError::Forbidden => StatusCode::FORBIDDEN,
        };
        (status, self.to_string()).into_response()
    }
}

/// Evaluates a policy against the caller and (for ownership checks) the
/// target's owner.
pub fn check(
    policy: Policy,
    actor: Option<&User>,
    owner_id: Option<Uuid>,
) -> Result<(), PermissionError> {
    match policy {
        Policy::AllowAny => Ok(()),
        Policy::Authenticated => {
            actor.ok_or(PermissionError::NotAuthenticated)?;
            Ok(())
        }
        Policy::OwnerOrStaff => {
            let actor = actor.ok_or(PermissionError::NotAuthenticated)?;
            let owns = owner_id.map(|owner| owner == actor.id).unwrap_or(false);
            if owns || actor.is_staff {
                Ok(())
            } else {
                Err(PermissionError::Forbidden)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_user(is_staff: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            email: "someone@example.com".to_string(),
            password_hash: None,
            is_active: true,
            is_staff,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reads_on_posts_are_open() {
        assert_eq!(post_policy(Action::List), Policy::AllowAny);
        assert_eq!(post_policy(Action::Retrieve), Policy::AllowAny);
        assert!(check(Policy::AllowAny, None, None).is_ok());
    }

    #[test]
    fn owner_may_write() {
        let user = make_user(false);
        assert!(check(Policy::OwnerOrStaff, Some(&user), Some(user.id)).is_ok());
    }

    #[test]
    fn stranger_is_forbidden() {
        let user = make_user(false);
        let result = check(Policy::OwnerOrStaff, Some(&user), Some(Uuid::new_v4()));
        assert!(matches!(result, Err(PermissionError::Forbidden)));
    }

    #[test]
    fn staff_bypasses_ownership() {
        let staff = make_user(true);
        assert!(check(Policy::OwnerOrStaff, Some(&staff), Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn anonymous_write_is_not_authenticated() {
        let result = check(Policy::OwnerOrStaff, None, Some(Uuid::new_v4()));
        assert!(matches!(result, Err(PermissionError::NotAuthenticated)));

        let result = check(Policy::Authenticated, None, None);
        assert!(matches!(result, Err(PermissionError::NotAuthenticated)));
    }

    #[test]
    fn private_view_gates_only_listing_on_ownership() {
        assert_eq!(private_policy(Action::List), Policy::OwnerOrStaff);
        assert_eq!(private_policy(Action::Update), Policy::Authenticated);
        assert_eq!(private_policy(Action::Destroy), Policy::Authenticated);
        assert_eq!(private_policy(Action::Retrieve), Policy::Authenticated);
    }
}
