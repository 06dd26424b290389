//! Requester identity and capability checks.
//!
//! Every privileged decision in the upload pipeline goes through this module
//! so the rules live in one place instead of being scattered across handlers.

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserContext {
    pub user_id: Option<i64>,
    pub admin: bool,
    /// Whether the request arrived with a service API key.
    pub via_api: bool,
}

/// The party making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    User(UserContext),
}

impl Requester {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Requester::User(_))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Requester::User(ctx) if ctx.admin)
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Requester::User(ctx) if ctx.via_api)
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Requester::Anonymous => None,
            Requester::User(ctx) => ctx.user_id,
        }
    }

    /// Custom retention windows are an administrative knob.
    pub fn can_set_retain_hours(&self) -> bool {
        self.is_admin()
    }

    /// Pulling remote URLs server-side is reserved for API callers.
    pub fn can_ingest_from_url(&self) -> bool {
        self.is_api()
    }

    /// Avatar uploads can be disabled site-wide for regular users;
    /// admins may always upload them.
    pub fn can_upload_avatar(&self, uploaded_avatars_allowed: bool) -> bool {
        uploaded_avatars_allowed || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Requester {
        Requester::User(UserContext {
            user_id: Some(42),
            admin: false,
            via_api: false,
        })
    }

    fn admin() -> Requester {
        Requester::User(UserContext {
            user_id: Some(1),
            admin: true,
            via_api: false,
        })
    }

    fn api_user() -> Requester {
        Requester::User(UserContext {
            user_id: Some(7),
            admin: false,
            via_api: true,
        })
    }

    #[test]
    fn retain_hours_is_admin_only() {
        assert!(admin().can_set_retain_hours());
        assert!(!user().can_set_retain_hours());
        assert!(!api_user().can_set_retain_hours());
        assert!(!Requester::Anonymous.can_set_retain_hours());
    }

    #[test]
    fn url_ingestion_is_api_only() {
        assert!(api_user().can_ingest_from_url());
        assert!(!user().can_ingest_from_url());
        assert!(!admin().can_ingest_from_url());
    }

    #[test]
    fn avatar_policy_exempts_admins() {
        assert!(user().can_upload_avatar(true));
        assert!(!user().can_upload_avatar(false));
        assert!(admin().can_upload_avatar(false));
    }

    #[test]
    fn anonymous_has_no_identity() {
        assert!(!Requester::Anonymous.is_signed_in());
        assert_eq!(Requester::Anonymous.user_id(), None);
        assert_eq!(user().user_id(), Some(42));
    }
}
