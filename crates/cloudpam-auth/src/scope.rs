use cloudpam_domain::UserRole;
use cloudpam_errors::{CoreError, CoreResult};

/// The least-privileged role tier that would naturally be granted this scope by default
/// (`spec.md` §4.7 role→capability tiers). Used only for scope-elevation prevention: a caller
/// may grant a scope to an API key only if that scope's natural owner is no more privileged than
/// the caller itself.
#[must_use]
pub fn required_tier(scope: &str) -> u8 {
    if scope == "*" {
        return UserRole::Admin.tier();
    }
    let Some((resource, action)) = scope.split_once(':') else {
        return UserRole::Admin.tier();
    };
    match (resource, action) {
        ("audit", "read") => UserRole::Auditor.tier(),
        (_, "read") => UserRole::Viewer.tier(),
        ("pools" | "accounts" | "discovery", "write" | "delete") => UserRole::Operator.tier(),
        _ => UserRole::Admin.tier(),
    }
}

/// `spec.md` §8 property 9: "create-key with any scope s.t. mapped role_level < caller.role_level
/// ⇒ Forbidden." Lower tier number is more privileged, so "mapped role more privileged than the
/// caller" is `required_tier(scope) < caller_role.tier()`.
pub fn check_elevation(caller_role: UserRole, scopes: &[String]) -> CoreResult<()> {
    let caller_tier = caller_role.tier();
    for scope in scopes {
        if required_tier(scope) < caller_tier {
            return Err(CoreError::forbidden(format!(
                "scope {scope} exceeds the caller's own privilege"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_cannot_grant_wildcard() {
        let err = check_elevation(UserRole::Operator, &["*".to_owned()]).unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));
    }

    #[test]
    fn operator_can_grant_its_own_scopes() {
        let scopes = vec!["pools:write".to_owned(), "accounts:read".to_owned()];
        assert!(check_elevation(UserRole::Operator, &scopes).is_ok());
    }

    #[test]
    fn viewer_cannot_grant_write_scopes() {
        let err = check_elevation(UserRole::Viewer, &["pools:write".to_owned()]).unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));
    }

    #[test]
    fn admin_can_grant_anything() {
        let scopes = vec!["*".to_owned(), "audit:read".to_owned()];
        assert!(check_elevation(UserRole::Admin, &scopes).is_ok());
    }
}
