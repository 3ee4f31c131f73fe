//! Organization-scoped read authorization.

use dashalert_common::types::SignedInUser;

use crate::error::{AlertError, Result};

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Decides whether `user` may read alerts of `org_id`.
///
/// Membership is the only criterion: admins, editors and viewers of the org
/// all read the same rows.
pub fn authorize_org_read(user: &SignedInUser, org_id: i64) -> Access {
    if user.org_id == org_id {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Like [`authorize_org_read`], but turns a denial into
/// [`AlertError::PermissionDenied`].
pub fn ensure_org_read(user: &SignedInUser, org_id: i64) -> Result<()> {
    match authorize_org_read(user, org_id) {
        Access::Allow => Ok(()),
        Access::Deny => Err(AlertError::PermissionDenied(format!(
            "user of org {} ({}) cannot read alerts of org {}",
            user.org_id, user.org_role, org_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashalert_common::error::ErrorKind;
    use dashalert_common::types::OrgRole;

    #[test]
    fn every_role_reads_its_own_org() {
        for role in [OrgRole::Admin, OrgRole::Editor, OrgRole::Viewer] {
            let user = SignedInUser::new(7, role);
            assert_eq!(authorize_org_read(&user, 7), Access::Allow);
            assert!(ensure_org_read(&user, 7).is_ok());
        }
    }

    #[test]
    fn other_org_is_denied_regardless_of_role() {
        for role in [OrgRole::Admin, OrgRole::Editor, OrgRole::Viewer] {
            let user = SignedInUser::new(1, role);
            assert_eq!(authorize_org_read(&user, 2), Access::Deny);
            let err = ensure_org_read(&user, 2).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        }
    }
}
