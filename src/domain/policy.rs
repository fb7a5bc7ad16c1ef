//! Access policy evaluation for link resolution.
//!
//! A pure function of the record and the request context: no clock reads
//! (the context carries `now`), no store access, no side effects. The
//! resolver owns the mapping of [`Deny`] reasons to external responses.

use chrono::{DateTime, Utc};

use crate::domain::entities::Link;
use crate::utils::password;

/// Why resolution was denied.
///
/// Ordering of evaluation matters: lifecycle failures are reported before
/// credential failures so password-prompt behavior cannot be used to probe
/// for the existence of a deactivated or expired link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deny {
    Inactive,
    Expired,
    LimitReached,
    /// Request falls outside the record's geo/device allow-lists.
    NotTargeted,
    PasswordRequired,
    PasswordMismatch,
}

impl Deny {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Deny::Inactive => "inactive",
            Deny::Expired => "expired",
            Deny::LimitReached => "limit_reached",
            Deny::NotTargeted => "not_targeted",
            Deny::PasswordRequired => "password_required",
            Deny::PasswordMismatch => "password_mismatch",
        }
    }

    /// True for the variants that surface as 401 rather than 404.
    pub fn is_credential_failure(self) -> bool {
        matches!(self, Deny::PasswordRequired | Deny::PasswordMismatch)
    }
}

/// Request-side facts the policy may consult.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub now: DateTime<Utc>,
    /// Credential supplied by the client, if any.
    pub password: Option<String>,
    /// ISO 3166-1 alpha-2 country hint, uppercase.
    pub country: Option<String>,
    /// Device class derived from the User-Agent (`desktop`, `mobile`, ...).
    pub device: Option<String>,
}

impl RequestContext {
    pub fn anonymous(now: DateTime<Utc>) -> Self {
        Self {
            now,
            password: None,
            country: None,
            device: None,
        }
    }
}

/// Evaluates whether `link` may resolve for this request.
///
/// First failure wins, in order: inactive, expired, click limit, targeting,
/// password. Password comparison is Argon2 verification, constant-time by
/// construction.
pub fn evaluate(link: &Link, ctx: &RequestContext) -> Result<(), Deny> {
    if !link.is_active {
        return Err(Deny::Inactive);
    }

    if link.is_expired(ctx.now) {
        return Err(Deny::Expired);
    }

    if link.is_exhausted() {
        return Err(Deny::LimitReached);
    }

    if !list_allows(link.allowed_countries.as_deref(), ctx.country.as_deref()) {
        return Err(Deny::NotTargeted);
    }

    if !list_allows(link.allowed_devices.as_deref(), ctx.device.as_deref()) {
        return Err(Deny::NotTargeted);
    }

    if let Some(hash) = &link.password_hash {
        match &ctx.password {
            None => return Err(Deny::PasswordRequired),
            Some(supplied) => {
                if !password::verify(supplied, hash).unwrap_or(false) {
                    return Err(Deny::PasswordMismatch);
                }
            }
        }
    }

    Ok(())
}

/// An absent allow-list permits everyone; a present one requires a matching
/// hint. A request with no hint cannot match a restricted list.
fn list_allows(allowed: Option<&[String]>, hint: Option<&str>) -> bool {
    match allowed {
        None => true,
        Some(list) if list.is_empty() => true,
        Some(list) => hint.is_some_and(|h| list.iter().any(|a| a.eq_ignore_ascii_case(h))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn link() -> Link {
        Link {
            id: 1,
            code: "abc123".to_string(),
            destination_url: "https://example.com/".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            max_clicks: None,
            click_count: 0,
            last_clicked_at: None,
            password_hash: None,
            is_active: true,
            allowed_countries: None,
            allowed_devices: None,
            metadata: json!({}),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::anonymous(Utc::now())
    }

    #[test]
    fn test_unrestricted_link_allows() {
        assert_eq!(evaluate(&link(), &ctx()), Ok(()));
    }

    #[test]
    fn test_inactive_wins_over_everything() {
        let mut l = link();
        l.is_active = false;
        l.expires_at = Some(Utc::now() - Duration::hours(1));
        l.password_hash = Some("$argon2id$bogus".to_string());

        assert_eq!(evaluate(&l, &ctx()), Err(Deny::Inactive));
    }

    #[test]
    fn test_expired_at_exact_instant() {
        let mut l = link();
        let deadline = Utc::now();
        l.expires_at = Some(deadline);

        let at = RequestContext::anonymous(deadline);
        assert_eq!(evaluate(&l, &at), Err(Deny::Expired));

        let before = RequestContext::anonymous(deadline - Duration::seconds(1));
        assert_eq!(evaluate(&l, &before), Ok(()));
    }

    #[test]
    fn test_expired_reported_before_password() {
        let mut l = link();
        l.expires_at = Some(Utc::now() - Duration::minutes(1));
        l.password_hash = Some(password::hash("secret").unwrap());

        // No password prompt for a dead link.
        assert_eq!(evaluate(&l, &ctx()), Err(Deny::Expired));
    }

    #[test]
    fn test_limit_reached() {
        let mut l = link();
        l.max_clicks = Some(2);
        l.click_count = 2;
        assert_eq!(evaluate(&l, &ctx()), Err(Deny::LimitReached));
    }

    #[test]
    fn test_password_required_then_verified() {
        let mut l = link();
        l.password_hash = Some(password::hash("hunter2").unwrap());

        assert_eq!(evaluate(&l, &ctx()), Err(Deny::PasswordRequired));

        let mut wrong = ctx();
        wrong.password = Some("letmein".to_string());
        assert_eq!(evaluate(&l, &wrong), Err(Deny::PasswordMismatch));

        let mut right = ctx();
        right.password = Some("hunter2".to_string());
        assert_eq!(evaluate(&l, &right), Ok(()));
    }

    #[test]
    fn test_country_targeting() {
        let mut l = link();
        l.allowed_countries = Some(vec!["DE".to_string(), "AT".to_string()]);

        let mut de = ctx();
        de.country = Some("de".to_string());
        assert_eq!(evaluate(&l, &de), Ok(()));

        let mut us = ctx();
        us.country = Some("US".to_string());
        assert_eq!(evaluate(&l, &us), Err(Deny::NotTargeted));

        // No hint cannot satisfy a restricted list.
        assert_eq!(evaluate(&l, &ctx()), Err(Deny::NotTargeted));
    }

    #[test]
    fn test_device_targeting() {
        let mut l = link();
        l.allowed_devices = Some(vec!["mobile".to_string()]);

        let mut mobile = ctx();
        mobile.device = Some("mobile".to_string());
        assert_eq!(evaluate(&l, &mobile), Ok(()));

        let mut desktop = ctx();
        desktop.device = Some("desktop".to_string());
        assert_eq!(evaluate(&l, &desktop), Err(Deny::NotTargeted));
    }

    #[test]
    fn test_empty_allow_list_means_unrestricted() {
        let mut l = link();
        l.allowed_countries = Some(vec![]);
        assert_eq!(evaluate(&l, &ctx()), Ok(()));
    }

    #[test]
    fn test_targeting_checked_before_password() {
        let mut l = link();
        l.allowed_countries = Some(vec!["DE".to_string()]);
        l.password_hash = Some(password::hash("secret").unwrap());

        // Outside the allow-list the caller sees a generic denial, not a
        // password prompt.
        assert_eq!(evaluate(&l, &ctx()), Err(Deny::NotTargeted));
    }
}
