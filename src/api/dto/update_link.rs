//! DTO for the link update endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use serde_with::serde_as;
use validator::Validate;

use crate::domain::entities::LinkPatch;

/// Request body for `PATCH /api/links/{id}`.
///
/// All fields are optional; only provided fields are changed.
///
/// # `expires_at` semantics
///
/// - **Absent** (`expires_at` not in JSON) → leave existing value unchanged
/// - **`null`** → clear expiry (link never expires)
/// - **Timestamp** → set new expiry
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    /// Re-enable or disable the link.
    pub is_active: Option<bool>,

    /// Expiry timestamp. Absent = no change, null = clear, value = set.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    /// Replaces the stored metadata wholesale.
    pub metadata: Option<Value>,
}

impl From<UpdateLinkRequest> for LinkPatch {
    fn from(req: UpdateLinkRequest) -> Self {
        LinkPatch {
            is_active: req.is_active,
            expires_at: req.expires_at,
            metadata: req.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_expiry_means_no_change() {
        let req: UpdateLinkRequest = serde_json::from_str(r#"{"is_active": false}"#).unwrap();
        assert_eq!(req.is_active, Some(false));
        assert!(req.expires_at.is_none());
    }

    #[test]
    fn test_null_expiry_means_clear() {
        let req: UpdateLinkRequest = serde_json::from_str(r#"{"expires_at": null}"#).unwrap();
        assert_eq!(req.expires_at, Some(None));
    }

    #[test]
    fn test_timestamp_expiry_means_set() {
        let req: UpdateLinkRequest =
            serde_json::from_str(r#"{"expires_at": "2030-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(req.expires_at, Some(Some(_))));
    }
}
