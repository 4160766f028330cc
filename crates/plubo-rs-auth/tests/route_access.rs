//! Permission decisions for a members area, across access modes and role setups.

use plubo_rs_auth::{
    AccessDecision, AccessPolicy, AnonymousUser, ForbiddenAction, PermissionChecker, Role,
    RoleRegistry, User,
};
use plubo_rs_core::{AccessMode, ArgumentMap, Resolvable, Settings};

fn members_area() -> AccessPolicy {
    AccessPolicy::new()
        .guest(false)
        .private(true)
        .redirect("/login")
        .allowed_caps(["read"])
}

fn roles() -> RoleRegistry {
    let mut registry = RoleRegistry::new();
    registry.register(Role::new("subscriber").with_capabilities(&["read"]));
    registry.register(Role::new("editor").with_capabilities(&["read", "edit_pages"]));
    registry.register(Role::new("administrator").with_capabilities(&["read", "manage_options"]));
    registry
}

fn subscriber() -> User {
    let roles = roles();
    let mut user = User::new("5", "sam");
    roles.assign(&mut user, "subscriber").unwrap();
    user
}

fn login_redirect() -> AccessDecision {
    AccessDecision::Forbidden(ForbiddenAction::Redirect {
        location: "/login".to_string(),
        status: 302,
    })
}

#[test]
fn test_guest_gating_under_each_mode() {
    let args = ArgumentMap::new();
    let cases = [
        (AccessMode::Public, true, true),
        (AccessMode::Public, false, true),
        (AccessMode::PrivateOnly, true, false),
        (AccessMode::PrivateOnly, false, true),
        (AccessMode::GuestAndMemberRules, true, false),
        (AccessMode::GuestAndMemberRules, false, false),
    ];
    for (mode, private, guest_allowed) in cases {
        let settings = Settings {
            access_mode: mode,
            ..Settings::default()
        };
        let checker = PermissionChecker::from_settings(&settings);
        let policy = AccessPolicy::new().guest(false).private(private).redirect("/login");

        let guest = checker.check(&policy, &args, &AnonymousUser);
        if guest_allowed {
            assert!(guest.is_allowed(), "mode {mode:?}, private {private}");
        } else {
            assert_eq!(guest, login_redirect(), "mode {mode:?}, private {private}");
        }
        assert!(checker.check(&policy, &args, &subscriber()).is_allowed());
    }
}

#[test]
fn test_capability_list_applies_even_without_gating() {
    let checker = PermissionChecker::new(AccessMode::Public);
    let args = ArgumentMap::new();
    assert_eq!(checker.check(&members_area(), &args, &AnonymousUser), login_redirect());
    assert!(checker.check(&members_area(), &args, &subscriber()).is_allowed());
}

#[test]
fn test_per_client_roles() {
    let registry = roles();
    let mut editor = User::new("2", "eda");
    registry.assign(&mut editor, "editor").unwrap();

    let policy = AccessPolicy::new().allowed_roles(Resolvable::resolver(|args: &ArgumentMap| {
        match args.get("client_id") {
            Some("1") => vec!["editor".to_string()],
            _ => vec!["administrator".to_string()],
        }
    }));
    let checker = PermissionChecker::new(AccessMode::GuestAndMemberRules);

    let mut args = ArgumentMap::new();
    args.insert("client_id", Some("1".to_string()));
    assert!(checker.check(&policy, &args, &editor).is_allowed());

    args.insert("client_id", Some("2".to_string()));
    assert_eq!(
        checker.check(&policy, &args, &editor),
        AccessDecision::Forbidden(ForbiddenAction::Status(403))
    );
}
