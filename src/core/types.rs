use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One launched token as reported by the pulse feed.
///
/// `token_id` is the identity used for deduplication; two records with the
/// same id are the same token even if other fields differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: i64,
    pub name: String,
    pub ticker: String,
    pub token_address: String,
    /// Creation time exactly as the feed sent it
    pub token_created_at: String,
    pub description: Option<String>,
    /// Parsed creation instant, `None` when the raw string is not ISO-8601
    #[serde(skip)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl Token {
    pub fn new(
        token_id: i64,
        name: impl Into<String>,
        ticker: impl Into<String>,
        token_address: impl Into<String>,
        token_created_at: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let token_created_at = token_created_at.into();
        let created_at = parse_timestamp(&token_created_at);
        Self {
            token_id,
            name: name.into(),
            ticker: ticker.into(),
            token_address: token_address.into(),
            token_created_at,
            description: description.filter(|d| !d.is_empty()),
            created_at,
        }
    }

    /// Time elapsed between creation and `now`, if the creation time is known
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now.signed_duration_since(created))
    }

    /// True when the creation instant is known and strictly younger than `threshold`
    pub fn is_newly_created_at(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        match self.age_at(now) {
            Some(age) => age < threshold,
            None => false,
        }
    }
}

/// Parse an ISO-8601 timestamp. A trailing `Z` is UTC; timestamps without an
/// offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_created(raw: &str) -> Token {
        Token::new(1, "Alpha", "ALP", "addr", raw, None)
    }

    #[test]
    fn test_parse_trailing_z() {
        let token = token_created("2025-01-15T10:30:00Z");
        let created = token.created_at.unwrap();
        assert_eq!(created.offset().local_minus_utc(), 0);
        assert_eq!(created.to_rfc3339(), "2025-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_explicit_offset_and_fraction() {
        let token = token_created("2025-01-15T18:30:00.123456+08:00");
        let created = token.created_at.unwrap();
        assert_eq!(created.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(created.with_timezone(&Utc).to_rfc3339(), "2025-01-15T10:30:00.123456+00:00");
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let token = token_created("2025-01-15T10:30:00");
        assert_eq!(
            token.created_at.unwrap().with_timezone(&Utc).to_rfc3339(),
            "2025-01-15T10:30:00+00:00"
        );
    }

    #[test]
    fn test_unparsable_timestamp_keeps_raw() {
        let token = token_created("yesterday-ish");
        assert!(token.created_at.is_none());
        assert_eq!(token.token_created_at, "yesterday-ish");
        assert!(!token.is_newly_created_at(Duration::minutes(30), Utc::now()));
    }

    #[test]
    fn test_newly_created_window_is_strict() {
        let now = Utc::now();
        let threshold = Duration::minutes(30);

        let fresh = token_created(&(now - Duration::minutes(10)).to_rfc3339());
        let stale = token_created(&(now - Duration::minutes(60)).to_rfc3339());
        let edge = token_created(&(now - threshold).to_rfc3339());

        assert!(fresh.is_newly_created_at(threshold, now));
        assert!(!stale.is_newly_created_at(threshold, now));
        assert!(!edge.is_newly_created_at(threshold, now));
    }

    #[test]
    fn test_empty_description_is_absent() {
        let token = Token::new(7, "n", "t", "a", "", Some(String::new()));
        assert!(token.description.is_none());
        assert!(token.created_at.is_none());
    }
}
