use std::sync::LazyLock;

use crate::{models::Role, session::Session};

static DEFAULT_ROUTES: LazyLock<RouteTable> = LazyLock::new(RouteTable::default);

/// Evaluates a request against the portal's standard route table.
pub fn evaluate(path: &str, session: Option<&Session>) -> Decision {
    DEFAULT_ROUTES.evaluate(path, session)
}

/// Decision
///
/// Outcome of the access gate for one request. `RedirectTo` carries the path
/// placed in the `Location` header; no handler runs in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

/// PathClass
///
/// Where a request path sits in the route table. Every path falls in exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Authentication endpoints, reachable in any session state.
    AuthApi,
    /// Pages reachable without a session (login, reset request, static assets).
    Public,
    /// Requires a session with role ADMIN.
    AdminOnly,
    /// Requires a session with a recognised role.
    RoleAccessible,
    /// Not listed anywhere; guarded exactly like `RoleAccessible`.
    Unclassified,
}

impl PathClass {
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            PathClass::AdminOnly | PathClass::RoleAccessible | PathClass::Unclassified
        )
    }
}

/// RouteTable
///
/// Static path configuration consulted by the gate. Built once at startup and
/// shared read-only; the gate itself holds no other state.
///
/// Prefix entries match on whole path segments: `/dashboard` covers
/// `/dashboard` and `/dashboard/reports`, but not `/dashboards`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    pub login_path: String,
    pub admin_dashboard_path: String,
    pub public_dashboard_path: String,
    pub reset_entry_path: String,
    pub reset_request_path: String,
    /// Pages that bounce an already-authenticated user to their dashboard.
    pub landing_paths: Vec<String>,
    pub auth_api_prefixes: Vec<String>,
    /// Exact-match public pages.
    pub public_paths: Vec<String>,
    pub public_prefixes: Vec<String>,
    pub admin_prefixes: Vec<String>,
    pub role_prefixes: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let login = "/".to_string();
        let reset_request = "/reset-password".to_string();
        Self {
            login_path: login.clone(),
            admin_dashboard_path: "/admin-dashboard".to_string(),
            public_dashboard_path: "/dashboard".to_string(),
            reset_entry_path: "/set-new-password".to_string(),
            reset_request_path: reset_request.clone(),
            landing_paths: vec![login.clone()],
            auth_api_prefixes: strings(&[
                "/api/auth/login",
                "/api/auth/logout",
                "/api/auth/request-reset",
                "/api/auth/reset-password",
            ]),
            public_paths: vec![login, reset_request, "/health".to_string()],
            public_prefixes: strings(&["/assets"]),
            admin_prefixes: strings(&["/admin-dashboard", "/api/admin", "/api/users"]),
            role_prefixes: strings(&["/dashboard", "/set-new-password", "/loading", "/api/me"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// True when `path` equals `prefix` or continues it with a new segment.
fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn any_prefix(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| has_segment_prefix(path, p))
}

impl RouteTable {
    /// classify
    ///
    /// Assigns `path` to its class. Lists are checked in a fixed order (auth API,
    /// public, admin-only, role-accessible) so an overlapping entry resolves to
    /// the first class that lists it. Anything unlisted is `Unclassified`.
    pub fn classify(&self, path: &str) -> PathClass {
        if any_prefix(path, &self.auth_api_prefixes) {
            PathClass::AuthApi
        } else if self.public_paths.iter().any(|p| p == path)
            || any_prefix(path, &self.public_prefixes)
        {
            PathClass::Public
        } else if any_prefix(path, &self.admin_prefixes) {
            PathClass::AdminOnly
        } else if any_prefix(path, &self.role_prefixes) {
            PathClass::RoleAccessible
        } else {
            PathClass::Unclassified
        }
    }

    /// default_dashboard_for
    ///
    /// Home page for a role. An unrecognised role gets the login page, never an
    /// admin surface.
    pub fn default_dashboard_for(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin_dashboard_path,
            Role::Public => &self.public_dashboard_path,
            Role::Unknown => &self.login_path,
        }
    }

    /// evaluate
    ///
    /// The access decision for one request. Rules are tried in priority order and
    /// the first that fires decides:
    ///
    /// 1. auth API endpoints are always allowed;
    /// 2. a protected path without a session goes to login;
    /// 3. an admin-only path with a non-admin session goes to that role's dashboard;
    /// 4. any other protected path with an unrecognised role goes to login;
    /// 5. a session with a pending forced reset goes to the reset page, whatever
    ///    its role, unless it is already there;
    /// 6. the reset page with no pending reset goes to the dashboard;
    /// 7. a landing page with a settled session goes to the dashboard;
    /// 8. everything else is allowed.
    pub fn evaluate(&self, path: &str, session: Option<&Session>) -> Decision {
        let class = self.classify(path);

        if class == PathClass::AuthApi {
            return Decision::Allow;
        }

        let Some(session) = session else {
            return if class.is_protected() {
                self.redirect(&self.login_path)
            } else {
                Decision::Allow
            };
        };

        match class {
            PathClass::AdminOnly if session.role != Role::Admin => {
                return self.redirect(self.default_dashboard_for(session.role));
            }
            PathClass::RoleAccessible | PathClass::Unclassified
                if !session.role.is_recognised() =>
            {
                return self.redirect(&self.login_path);
            }
            _ => {}
        }

        // Past rules 3-4 an unrecognised role can only be on a public page, where
        // it is treated like an anonymous visitor.
        if !session.role.is_recognised() {
            return Decision::Allow;
        }

        let on_reset_page = path.starts_with(self.reset_entry_path.as_str());

        if session.must_reset_password {
            return if on_reset_page {
                Decision::Allow
            } else {
                self.redirect(&self.reset_entry_path)
            };
        }

        if path == self.reset_entry_path {
            return self.redirect(self.default_dashboard_for(session.role));
        }

        let dashboard = self.default_dashboard_for(session.role);
        if self.landing_paths.iter().any(|p| p == path) && dashboard != path {
            return self.redirect(dashboard);
        }

        Decision::Allow
    }

    fn redirect(&self, target: &str) -> Decision {
        Decision::RedirectTo(target.to_string())
    }
}
