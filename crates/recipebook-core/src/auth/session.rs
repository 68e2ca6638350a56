use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::AuthResult;

/// Fixed storage key the session record is persisted under
pub const SESSION_STORAGE_KEY: &str = "userData";

/// The signed-in user and their bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Session {
    pub email: String,
    pub user_id: String,
    pub token: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub token_expiry: DateTime<Utc>,
}

impl Session {
    /// Build a session whose token expires `expires_in_secs` after `issued_at`.
    ///
    /// `None` if the expiry is not representable.
    pub fn from_auth_result(result: &AuthResult, issued_at: DateTime<Utc>) -> Option<Self> {
        let token_expiry = Duration::try_seconds(result.expires_in_secs)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))?;

        Some(Self {
            email: result.email.clone(),
            user_id: result.user_id.clone(),
            token: result.token.clone(),
            token_expiry,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.token_expiry
    }

    /// Token present and not yet expired
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    /// Remaining lifetime; negative once expired
    pub fn time_until_expiry(&self) -> Duration {
        self.token_expiry - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

/// On-disk layout of a session.
///
/// Field names follow the record the web client kept in local storage,
/// so a record written by either side can be read by the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct SessionRecord {
    pub email: String,
    pub id: String,
    #[serde(rename = "_token")]
    pub token: String,
    #[serde(rename = "_tokenExpirationDate")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub token_expiration_date: DateTime<Utc>,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            email: session.email.clone(),
            id: session.user_id.clone(),
            token: session.token.clone(),
            token_expiration_date: session.token_expiry,
        }
    }
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Self {
            email: record.email,
            user_id: record.id,
            token: record.token,
            token_expiry: record.token_expiration_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str, expiry: DateTime<Utc>) -> Session {
        Session {
            email: "a@b.com".to_string(),
            user_id: "u1".to_string(),
            token: token.to_string(),
            token_expiry: expiry,
        }
    }

    #[test]
    fn test_from_auth_result_sets_expiry() {
        let issued_at = Utc::now();
        let result = AuthResult {
            email: "a@b.com".to_string(),
            user_id: "u1".to_string(),
            token: "tok1".to_string(),
            refresh_token: String::new(),
            expires_in_secs: 3600,
            registered: None,
        };

        let session = Session::from_auth_result(&result, issued_at).expect("representable expiry");
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.token, "tok1");
        assert_eq!(session.token_expiry, issued_at + Duration::seconds(3600));
        assert!(session.is_valid());
        assert!(session.minutes_until_expiry() >= 59);
    }

    #[test]
    fn test_from_auth_result_rejects_unrepresentable_expiry() {
        let mut result = AuthResult {
            email: "a@b.com".to_string(),
            user_id: "u1".to_string(),
            token: "tok1".to_string(),
            refresh_token: String::new(),
            expires_in_secs: i64::MAX,
            registered: None,
        };
        assert!(Session::from_auth_result(&result, Utc::now()).is_none());

        // In range for a duration, past the end of the calendar
        result.expires_in_secs = 10_000_000_000_000;
        assert!(Session::from_auth_result(&result, Utc::now()).is_none());
    }

    #[test]
    fn test_is_valid() {
        assert!(session("tok", Utc::now() + Duration::minutes(5)).is_valid());
        // Empty token
        assert!(!session("", Utc::now() + Duration::minutes(5)).is_valid());
        // Expired
        let expired = session("tok", Utc::now() - Duration::seconds(1));
        assert!(!expired.is_valid());
        assert_eq!(expired.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_record_field_names() {
        let expiry = DateTime::parse_from_rfc3339("2030-05-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let record = SessionRecord::from(&session("tok1", expiry));

        let value = serde_json::to_value(&record).expect("serializable");
        assert_eq!(value["email"], "a@b.com");
        assert_eq!(value["id"], "u1");
        assert_eq!(value["_token"], "tok1");
        assert_eq!(value["_tokenExpirationDate"], "2030-05-01T12:00:00Z");
    }

    #[test]
    fn test_parse_web_client_record() {
        // Written by JSON.stringify on the web client (millisecond ISO string)
        let json = r#"{"email":"a@b.com","id":"u1","_token":"tok1","_tokenExpirationDate":"2030-05-01T12:00:00.000Z"}"#;
        let record: SessionRecord = serde_json::from_str(json).expect("Failed to parse record");

        let session = Session::from(record);
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.token_expiry.to_rfc3339(), "2030-05-01T12:00:00+00:00");
    }
}
