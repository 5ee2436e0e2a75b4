//! Route authorization guard.
//!
//! A pure function of route metadata and the session snapshot; it never
//! performs I/O and resolves synchronously from already-loaded state.

use super::session::SessionUser;
use crate::db::Role;

/// Authorization metadata declared on a route.
#[derive(Debug, Clone, Default)]
pub struct RouteSpec {
    /// `None` (or an empty list) means any authenticated user may enter.
    pub allowed_roles: Option<Vec<Role>>,
}

impl RouteSpec {
    /// A route with no role restriction.
    pub fn open() -> Self {
        Self {
            allowed_roles: None,
        }
    }

    /// A route restricted to the given roles.
    pub fn restricted_to(roles: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed_roles: Some(roles.into()),
        }
    }
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
}

/// Decide whether the current session may activate a route.
///
/// Unauthenticated users are sent to login regardless of the route's
/// restrictions; authenticated users with the wrong role are sent to the
/// unauthorized page.
pub fn can_activate(route: &RouteSpec, session: Option<&SessionUser>) -> RouteDecision {
    let Some(user) = session else {
        return RouteDecision::RedirectToLogin;
    };

    match &route.allowed_roles {
        None => RouteDecision::Allow,
        Some(allowed) if allowed.is_empty() => RouteDecision::Allow,
        Some(allowed) if allowed.contains(&user.role) => RouteDecision::Allow,
        Some(_) => RouteDecision::RedirectToUnauthorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn test_unauthenticated_always_redirects_to_login() {
        for route in [
            RouteSpec::open(),
            RouteSpec::restricted_to([Role::Admin]),
            RouteSpec::restricted_to(Vec::new()),
        ] {
            assert_eq!(can_activate(&route, None), RouteDecision::RedirectToLogin);
        }
    }

    #[test]
    fn test_admin_route_matrix() {
        let route = RouteSpec::restricted_to([Role::Admin]);

        assert_eq!(
            can_activate(&route, Some(&user(Role::Admin))),
            RouteDecision::Allow
        );
        assert_eq!(
            can_activate(&route, Some(&user(Role::Employee))),
            RouteDecision::RedirectToUnauthorized
        );
        assert_eq!(
            can_activate(&route, Some(&user(Role::Visitor))),
            RouteDecision::RedirectToUnauthorized
        );
    }

    #[test]
    fn test_unrestricted_route_allows_any_authenticated_role() {
        let route = RouteSpec::open();

        for role in [Role::Admin, Role::Employee, Role::Visitor] {
            assert_eq!(can_activate(&route, Some(&user(role))), RouteDecision::Allow);
        }
    }

    #[test]
    fn test_empty_allow_list_means_unrestricted() {
        let route = RouteSpec::restricted_to(Vec::new());
        assert_eq!(
            can_activate(&route, Some(&user(Role::Visitor))),
            RouteDecision::Allow
        );
    }

    #[test]
    fn test_multi_role_allow_list() {
        let route = RouteSpec::restricted_to([Role::Admin, Role::Employee]);

        assert_eq!(
            can_activate(&route, Some(&user(Role::Employee))),
            RouteDecision::Allow
        );
        assert_eq!(
            can_activate(&route, Some(&user(Role::Visitor))),
            RouteDecision::RedirectToUnauthorized
        );
    }
}
