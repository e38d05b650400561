use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::ParseError;
use crate::core::types::Token;

/// Outcome of parsing one fetched batch
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    /// Accepted tokens, in feed order
    pub tokens: Vec<Token>,
    /// Items dropped because they carried no usable identity
    pub rejected: usize,
}

/// Turns raw pulse feed items into validated [`Token`]s
pub struct TokenRecordParser;

impl TokenRecordParser {
    /// Parse one feed item of the form `{"token": {"id": .., "name": .., ...}}`.
    ///
    /// Only `id` is mandatory. Missing descriptive fields become empty strings
    /// and an unparsable `token_created_at` leaves the creation instant unknown.
    pub fn parse(item: &Value) -> Result<Token, ParseError> {
        let token = item
            .get("token")
            .and_then(|t| t.as_object())
            .ok_or(ParseError::MissingToken)?;

        let token_id = match token.get("id") {
            None | Some(Value::Null) => return Err(ParseError::MissingField("id")),
            Some(raw) => Self::parse_id(raw)?,
        };

        let text = |field: &str| -> String {
            token
                .get(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let description = token
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_string);

        Ok(Token::new(
            token_id,
            text("name"),
            text("ticker"),
            text("token_address"),
            text("token_created_at"),
            description,
        ))
    }

    /// Parse a whole batch. Rejected items are logged and counted, never fatal.
    pub fn parse_batch(items: &[Value]) -> ParsedBatch {
        let mut batch = ParsedBatch {
            tokens: Vec::with_capacity(items.len()),
            rejected: 0,
        };

        for (index, item) in items.iter().enumerate() {
            match Self::parse(item) {
                Ok(token) => {
                    if token.created_at.is_none() {
                        debug!(
                            token_id = token.token_id,
                            raw = %token.token_created_at,
                            "Creation time unknown"
                        );
                    }
                    batch.tokens.push(token);
                }
                Err(e) => {
                    warn!(index = index, error = %e, "Skipping malformed feed item");
                    batch.rejected += 1;
                }
            }
        }

        batch
    }

    /// Accepts JSON integers, integral floats, and numeric strings
    fn parse_id(raw: &Value) -> Result<i64, ParseError> {
        match raw {
            Value::Number(n) => {
                if let Some(id) = n.as_i64() {
                    return Ok(id);
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(ParseError::InvalidId(n.to_string())),
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ParseError::InvalidId(s.clone())),
            other => Err(ParseError::InvalidId(other.to_string())),
        }
    }
}
