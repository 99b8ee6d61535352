use std::fmt;
use uuid::Uuid;

/// Per-request correlation id attached to log lines and echoed as `x-request-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

pub const REQUEST_ID_HEADER: &str = "x-request-id";

impl CorrelationId {
    pub fn new() -> Self { Self(Uuid::new_v4().to_string()) }

    /// Reuse an inbound id when it is printable and reasonably short; otherwise mint one.
    pub fn from_opt_str(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some(v) if !v.is_empty() && v.len() <= 128 && v.chars().all(|c| c.is_ascii_graphic()) => {
                Self(v.to_string())
            }
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for CorrelationId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_upstream_ids_and_replaces_junk() {
        assert_eq!(CorrelationId::from_opt_str(Some("abc-123")).as_str(), "abc-123");
        let fresh = CorrelationId::from_opt_str(Some("has space"));
        assert!(Uuid::parse_str(fresh.as_str()).is_ok());
        let fresh = CorrelationId::from_opt_str(None);
        assert!(Uuid::parse_str(fresh.as_str()).is_ok());
    }
}
