use wildcard::{Scope, WildcardPermission};

fn perm(value: &str) -> WildcardPermission {
    WildcardPermission::parse(value).expect("permission should parse")
}

#[test]
fn limit_against_wildcard_is_identity() {
    for value in ["repository:read:42", "user:list", "repository:read,write", "*"] {
        let permission = perm(value);
        assert_eq!(permission.limit(&perm("*")), Some(permission.clone()));
        assert_eq!(permission.limit(&permission), Some(permission.clone()));
    }
}

#[test]
fn scope_limits_subject_permission_to_declared_entries() {
    let subject = perm("repository:read,write:42");

    let limited = Scope::new(["repository:*:42"]).limit(&subject).unwrap();
    assert_eq!(limited, vec![perm("repository:read,write:42")]);

    let limited = Scope::new(["repository:read:99"]).limit(&subject).unwrap();
    assert!(limited.is_empty());

    let limited = Scope::new(["user:*:*"]).limit(&subject).unwrap();
    assert!(limited.is_empty());
}

#[test]
fn scope_never_expands_privilege() {
    let subject = perm("repository:read:42");
    let scope = Scope::new(["repository:*:*", "repository:read,write:42", "user:*"]);

    for limited in scope.limit(&subject).unwrap() {
        assert!(subject.implies(&limited), "{subject} must imply {limited}");
    }
}

#[test]
fn limit_is_commutative_on_the_examples() {
    let pairs = [
        ("repository:read,write:42", "repository:*:42"),
        ("repository:read", "repository:*:7"),
        ("repository:read,write", "repository:write,delete"),
    ];
    for (left, right) in pairs {
        let left = perm(left);
        let right = perm(right);
        assert_eq!(left.limit(&right), right.limit(&left), "{left} vs {right}");
    }
}
