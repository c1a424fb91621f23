//! Credential (idTag) entity and authorization classification.

use chrono::{DateTime, Utc};

/// Stored lifecycle state of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Active,
    Blocked,
    Expired,
}

/// Authorization outcome returned to a station, per OCPP 1.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdTagStatus {
    Accepted,
    Blocked,
    Expired,
    Invalid,
}

impl std::fmt::Display for IdTagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Accepted => "Accepted",
            Self::Blocked => "Blocked",
            Self::Expired => "Expired",
            Self::Invalid => "Invalid",
        };
        write!(f, "{}", s)
    }
}

/// RFID card / authorization token record.
#[derive(Debug, Clone)]
pub struct IdTag {
    pub tag: String,
    pub status: CredentialStatus,
    /// Missing bounds are open-ended.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub parent_tag: Option<String>,
}

impl IdTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: CredentialStatus::Active,
            valid_from: None,
            valid_until: None,
            parent_tag: None,
        }
    }

    /// Classify this credential for authorization at `now`.
    ///
    /// Order matters: a non-Active record is Blocked before any window
    /// check; an elapsed `valid_until` wins over a future `valid_from`.
    pub fn classify(&self, now: DateTime<Utc>) -> IdTagStatus {
        if self.status != CredentialStatus::Active {
            return IdTagStatus::Blocked;
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return IdTagStatus::Expired;
            }
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return IdTagStatus::Invalid;
            }
        }
        IdTagStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_unbounded_tag_is_accepted() {
        let tag = IdTag::new("TAG1");
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Accepted);
    }

    #[test]
    fn non_active_status_is_blocked() {
        let mut tag = IdTag::new("TAG1");
        tag.status = CredentialStatus::Blocked;
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Blocked);

        // A record already marked Expired also classifies as Blocked:
        // the stored status overrides window checks.
        tag.status = CredentialStatus::Expired;
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Blocked);
    }

    #[test]
    fn elapsed_valid_until_is_expired() {
        let mut tag = IdTag::new("TAG1");
        tag.valid_until = Some(Utc::now() - Duration::hours(1));
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Expired);
    }

    #[test]
    fn future_valid_from_is_invalid() {
        let mut tag = IdTag::new("TAG1");
        tag.valid_from = Some(Utc::now() + Duration::hours(1));
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Invalid);
    }

    #[test]
    fn inside_validity_window_is_accepted() {
        let mut tag = IdTag::new("TAG1");
        tag.valid_from = Some(Utc::now() - Duration::hours(1));
        tag.valid_until = Some(Utc::now() + Duration::hours(1));
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Accepted);
    }

    #[test]
    fn expired_window_wins_over_future_window() {
        let mut tag = IdTag::new("TAG1");
        tag.valid_from = Some(Utc::now() + Duration::hours(2));
        tag.valid_until = Some(Utc::now() - Duration::hours(2));
        assert_eq!(tag.classify(Utc::now()), IdTagStatus::Expired);
    }
}
