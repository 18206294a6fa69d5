//! C4: Permission Matcher.
//!
//! Collapsed to a four-rule predicate per §9 design notes rather than a
//! regex engine: exact / super-admin / admin-covers / single-side-wildcard.

/// Splits `action:resource`. Malformed permissions (not exactly one `:`)
/// are rejected by returning `None`.
fn split(perm: &str) -> Option<(&str, &str)> {
    let mut parts = perm.splitn(2, ':');
    let action = parts.next()?;
    let resource = parts.next()?;
    if resource.contains(':') {
        return None;
    }
    Some((action, resource))
}

/// Does a single user permission satisfy `required`?
fn matches_one(user_perm: &str, required: &str) -> bool {
    if user_perm == required {
        return true;
    }
    if user_perm == "*:*" {
        return true;
    }
    let (Some((u_action, u_resource)), Some((r_action, r_resource))) =
        (split(user_perm), split(required))
    else {
        return false;
    };

    if u_action == "admin" && u_resource == r_resource {
        return true;
    }
    if u_action == r_action && u_resource == "*" {
        return true;
    }
    if u_action == "*" && u_resource == r_resource {
        return true;
    }
    false
}

/// C4 operation: does any permission in `user_perms` satisfy `required`?
pub fn has(user_perms: &[String], required: &str) -> bool {
    user_perms.iter().any(|p| matches_one(p, required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(has(&["read:ping".to_string()], "read:ping"));
        assert!(!has(&["read:ping".to_string()], "write:ping"));
    }

    #[test]
    fn super_admin_matches_everything_well_formed() {
        assert!(has(&["*:*".to_string()], "create:x"));
        assert!(has(&["*:*".to_string()], "anything:goes"));
    }

    #[test]
    fn admin_covers_crud() {
        let perms = vec!["admin:x".to_string()];
        assert!(has(&perms, "create:x"));
        assert!(has(&perms, "read:x"));
        assert!(has(&perms, "update:x"));
        assert!(has(&perms, "delete:x"));
        assert!(!has(&perms, "create:y"));
    }

    #[test]
    fn single_side_wildcards() {
        assert!(has(&["read:*".to_string()], "read:ping"));
        assert!(!has(&["read:*".to_string()], "write:ping"));
        assert!(has(&["*:ping".to_string()], "read:ping"));
        assert!(!has(&["*:ping".to_string()], "read:pong"));
    }

    #[test]
    fn malformed_matches_nothing() {
        assert!(!has(&["not-a-permission".to_string()], "read:ping"));
        assert!(!has(&["a:b:c".to_string()], "read:ping"));
        assert!(!has(&["read:ping".to_string()], "not-a-permission"));
    }

    // The sixteen (user x required) pattern-shape combinations called out in
    // §9 design notes, with hand-derived expected outcomes.
    #[test]
    fn sixteen_combination_grid() {
        // (user_perm, required_perm, expected)
        let cases = [
            ("read:x", "read:x", true),
            ("read:x", "write:x", false),
            ("read:x", "read:y", false),
            ("read:x", "write:y", false),
            ("admin:x", "read:x", true),
            ("admin:x", "write:x", true),
            ("admin:x", "read:y", false),
            ("admin:x", "write:y", false),
            ("*:x", "read:x", true),
            ("*:x", "write:x", true),
            ("*:x", "read:y", false),
            ("*:x", "write:y", false),
            ("read:*", "read:x", true),
            ("read:*", "write:x", false),
            ("read:*", "read:y", true),
            ("read:*", "write:y", false),
        ];
        for (user, required, expected) in cases {
            assert_eq!(
                matches_one(user, required),
                expected,
                "user={user} required={required}"
            );
        }
    }

    proptest::proptest! {
        /// `has` must be reflexive: a permission string always satisfies
        /// itself, however the action/resource halves happen to be shaped.
        #[test]
        fn well_formed_permission_always_matches_itself(
            action in "[a-z]{1,8}",
            resource in "[a-z]{1,8}",
        ) {
            let perm = format!("{action}:{resource}");
            proptest::prop_assert!(has(&[perm.clone()], &perm));
        }

        /// `*:*` satisfies any well-formed `action:resource` requirement,
        /// regardless of which action/resource pair is requested.
        #[test]
        fn super_admin_matches_any_well_formed_requirement(
            action in "[a-z]{1,8}",
            resource in "[a-z]{1,8}",
        ) {
            let required = format!("{action}:{resource}");
            proptest::prop_assert!(has(&["*:*".to_string()], &required));
        }

        /// Any string without exactly one `:` never matches, no matter what
        /// is required of it.
        #[test]
        fn strings_without_single_colon_never_match(
            user_perm in "[a-z]{0,8}",
            required in "[a-z]{1,8}:[a-z]{1,8}",
        ) {
            proptest::prop_assert!(!has(&[user_perm], &required));
        }
    }
}
