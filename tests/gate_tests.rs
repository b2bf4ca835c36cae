use intranet_portal::{
    Decision, RouteTable, Session,
    gate::{PathClass, evaluate},
    models::Role,
};

// --- Fixtures ---

const AUTH_API: &[&str] = &[
    "/api/auth/login",
    "/api/auth/logout",
    "/api/auth/request-reset",
    "/api/auth/reset-password",
];

const ADMIN_ONLY: &[&str] = &[
    "/admin-dashboard",
    "/admin-dashboard/users",
    "/api/users",
    "/api/admin/users/3",
    "/api/admin/users/password",
];

const ROLE_ACCESSIBLE: &[&str] = &["/dashboard", "/dashboard/reports", "/loading", "/api/me"];

// Not listed anywhere: protected by default.
const UNCLASSIFIED: &[&str] = &["/reports", "/api/other", "/dashboards", "/admin-dashboardx"];

const PUBLIC: &[&str] = &["/", "/reset-password", "/health", "/assets/logo.jpg"];

const RESET_ENTRY: &[&str] = &["/set-new-password"];

fn session(role: Role, must_reset: bool) -> Session {
    Session {
        user_id: 7,
        email: "someone@example.com".to_string(),
        name: Some("Someone".to_string()),
        role,
        must_reset_password: must_reset,
    }
}

fn all_sessions() -> Vec<Option<Session>> {
    let mut out = vec![None];
    for role in [Role::Admin, Role::Public, Role::Unknown] {
        for must_reset in [false, true] {
            out.push(Some(session(role, must_reset)));
        }
    }
    out
}

fn protected_paths() -> impl Iterator<Item = &'static str> {
    ADMIN_ONLY
        .iter()
        .chain(ROLE_ACCESSIBLE)
        .chain(UNCLASSIFIED)
        .chain(RESET_ENTRY)
        .copied()
}

fn redirect(target: &str) -> Decision {
    Decision::RedirectTo(target.to_string())
}

// --- Classification ---

#[test]
fn test_classification_is_a_partition() {
    let routes = RouteTable::default();
    for p in AUTH_API {
        assert_eq!(routes.classify(p), PathClass::AuthApi, "{p}");
    }
    for p in PUBLIC {
        assert_eq!(routes.classify(p), PathClass::Public, "{p}");
    }
    for p in ADMIN_ONLY {
        assert_eq!(routes.classify(p), PathClass::AdminOnly, "{p}");
    }
    for p in ROLE_ACCESSIBLE {
        assert_eq!(routes.classify(p), PathClass::RoleAccessible, "{p}");
    }
    for p in UNCLASSIFIED {
        assert_eq!(routes.classify(p), PathClass::Unclassified, "{p}");
        assert!(routes.classify(p).is_protected());
    }
}

#[test]
fn test_prefixes_match_whole_segments_only() {
    let routes = RouteTable::default();
    assert_eq!(routes.classify("/dashboard/a/b"), PathClass::RoleAccessible);
    assert_eq!(routes.classify("/dashboards"), PathClass::Unclassified);
    assert_eq!(routes.classify("/api/auth/login-as"), PathClass::Unclassified);
    assert_eq!(routes.classify("/api/auth/other"), PathClass::Unclassified);
}

#[test]
fn test_default_dashboard_never_admin_for_unknown_role() {
    let routes = RouteTable::default();
    assert_eq!(routes.default_dashboard_for(Role::Admin), "/admin-dashboard");
    assert_eq!(routes.default_dashboard_for(Role::Public), "/dashboard");
    assert_eq!(routes.default_dashboard_for(Role::Unknown), "/");
}

// --- Rule 1: auth API passthrough ---

#[test]
fn test_auth_api_allows_every_session_state() {
    for p in AUTH_API {
        for s in all_sessions() {
            assert_eq!(evaluate(p, s.as_ref()), Decision::Allow, "{p} {s:?}");
        }
    }
}

// --- Rule 2: unauthenticated on protected path ---

#[test]
fn test_protected_paths_without_session_go_to_login() {
    for p in protected_paths() {
        assert_eq!(evaluate(p, None), redirect("/"), "{p}");
    }
}

#[test]
fn test_public_paths_without_session_are_allowed() {
    for p in PUBLIC {
        assert_eq!(evaluate(p, None), Decision::Allow, "{p}");
    }
}

// --- Rules 3 and 4: role checks ---

#[test]
fn test_admin_only_paths_send_public_users_to_their_dashboard() {
    let s = session(Role::Public, false);
    for p in ADMIN_ONLY {
        assert_eq!(evaluate(p, Some(&s)), redirect("/dashboard"), "{p}");
    }
}

#[test]
fn test_admin_only_paths_allow_admins() {
    let s = session(Role::Admin, false);
    for p in ADMIN_ONLY {
        assert_eq!(evaluate(p, Some(&s)), Decision::Allow, "{p}");
    }
}

#[test]
fn test_unknown_role_is_sent_to_login_from_every_protected_path() {
    for must_reset in [false, true] {
        let s = session(Role::Unknown, must_reset);
        for p in protected_paths() {
            assert_eq!(evaluate(p, Some(&s)), redirect("/"), "{p}");
        }
    }
}

#[test]
fn test_unknown_role_on_public_pages_is_treated_as_anonymous() {
    for must_reset in [false, true] {
        let s = session(Role::Unknown, must_reset);
        for p in PUBLIC {
            assert_eq!(evaluate(p, Some(&s)), Decision::Allow, "{p}");
        }
    }
}

#[test]
fn test_role_accessible_paths_allow_both_roles() {
    for role in [Role::Admin, Role::Public] {
        let s = session(role, false);
        for p in ROLE_ACCESSIBLE.iter().chain(UNCLASSIFIED) {
            assert_eq!(evaluate(p, Some(&s)), Decision::Allow, "{p} {role}");
        }
    }
}

// --- Rule 5: forced reset ---

#[test]
fn test_forced_reset_dominates_for_admins() {
    let s = session(Role::Admin, true);
    assert_eq!(
        evaluate("/admin-dashboard", Some(&s)),
        redirect("/set-new-password")
    );

    let non_reset = ADMIN_ONLY
        .iter()
        .chain(ROLE_ACCESSIBLE)
        .chain(UNCLASSIFIED)
        .chain(PUBLIC);
    for p in non_reset {
        assert_eq!(evaluate(p, Some(&s)), redirect("/set-new-password"), "{p}");
    }
}

#[test]
fn test_forced_reset_for_public_users() {
    let s = session(Role::Public, true);
    for p in ROLE_ACCESSIBLE.iter().chain(UNCLASSIFIED).chain(PUBLIC) {
        assert_eq!(evaluate(p, Some(&s)), redirect("/set-new-password"), "{p}");
    }
    // Rule 3 fires first on admin-only paths; the dashboard then bounces to the reset page.
    assert_eq!(evaluate("/admin-dashboard", Some(&s)), redirect("/dashboard"));
    assert_eq!(evaluate("/dashboard", Some(&s)), redirect("/set-new-password"));
}

#[test]
fn test_forced_reset_still_lets_auth_api_through() {
    let s = session(Role::Admin, true);
    for p in AUTH_API {
        assert_eq!(evaluate(p, Some(&s)), Decision::Allow, "{p}");
    }
}

// --- Rule 6: stale visit to the reset page ---

#[test]
fn test_reset_page_allowed_only_while_reset_is_pending() {
    for (role, dashboard) in [(Role::Admin, "/admin-dashboard"), (Role::Public, "/dashboard")] {
        let mut s = session(role, true);
        assert_eq!(evaluate("/set-new-password", Some(&s)), Decision::Allow);

        // The reset completes and the flag flips.
        s.must_reset_password = false;
        assert_eq!(evaluate("/set-new-password", Some(&s)), redirect(dashboard));
    }
}

// --- Rule 7: authenticated visit to the landing page ---

#[test]
fn test_landing_page_sends_settled_sessions_to_their_dashboard() {
    assert_eq!(
        evaluate("/", Some(&session(Role::Public, false))),
        redirect("/dashboard")
    );
    assert_eq!(
        evaluate("/", Some(&session(Role::Admin, false))),
        redirect("/admin-dashboard")
    );
}

#[test]
fn test_reset_request_page_is_not_a_landing_page() {
    let s = session(Role::Public, false);
    assert_eq!(evaluate("/reset-password", Some(&s)), Decision::Allow);
}

// --- Scenarios ---

#[test]
fn test_scenario_dashboard_without_session() {
    assert_eq!(evaluate("/dashboard", None), redirect("/"));
}

#[test]
fn test_no_redirect_points_back_at_its_own_path() {
    for p in AUTH_API
        .iter()
        .chain(PUBLIC)
        .chain(ADMIN_ONLY)
        .chain(ROLE_ACCESSIBLE)
        .chain(UNCLASSIFIED)
        .chain(RESET_ENTRY)
    {
        for s in all_sessions() {
            if let Decision::RedirectTo(target) = evaluate(p, s.as_ref()) {
                assert_ne!(&target, p, "self-redirect on {p} for {s:?}");
            }
        }
    }
}

#[test]
fn test_custom_route_table_is_honoured() {
    let mut routes = RouteTable::default();
    routes.public_dashboard_path = "/home".to_string();
    routes.role_prefixes.push("/home".to_string());

    let s = session(Role::Public, false);
    assert_eq!(routes.evaluate("/", Some(&s)), redirect("/home"));
    assert_eq!(routes.evaluate("/home", Some(&s)), Decision::Allow);
    assert_eq!(routes.evaluate("/home", None), redirect("/"));
}
