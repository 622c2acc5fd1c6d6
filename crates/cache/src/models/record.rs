use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use time::UtcDateTime;

const KIND_LIVENESS: &str = "liveness";
const KIND_HTTPS: &str = "https";
const KIND_PACKAGE: &str = "package";

/// What a rule learned about a key the last time it asked the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Status of a link probe, with the redirect target when one was given.
    /// A status of `0` means the request never got a response.
    Liveness { status: u16, redirect_to: Option<String> },
    /// Whether the `https://` equivalent of a plain-HTTP URL is reachable.
    Https { found: bool },
    /// Whether a CDN URL pins a version that some registry tag points to.
    Package { current: bool },
}
impl Outcome {
    /// Positive outcomes are retained for the longer expiry window.
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Liveness { status, redirect_to } => (200..300).contains(status) && redirect_to.is_none(),
            Self::Https { found } => *found,
            Self::Package { current } => *current,
        }
    }
}

/// A single persisted cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub outcome: Outcome,
    /// Wall-clock time of the write, to the second.
    pub time: UtcDateTime,
}
impl Record {
    /// Stamp a new record with the current time.
    pub fn new(key: impl Into<String>, outcome: Outcome) -> Self {
        Self::at(key, outcome, UtcDateTime::now())
    }

    pub fn at(key: impl Into<String>, outcome: Outcome, time: UtcDateTime) -> Self {
        Self { key: key.into(), outcome, time }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ResultRow {
    pub(crate) key: String,
    pub(crate) kind: String,
    pub(crate) positive: bool,
    #[sqlx(default)]
    pub(crate) status: Option<i64>,
    #[sqlx(default)]
    pub(crate) redirect_to: Option<String>,
    #[sqlx(default)]
    pub(crate) flag: Option<bool>,
    pub(crate) time: i64,
}
impl From<&Record> for ResultRow {
    fn from(record: &Record) -> Self {
        let (kind, status, redirect_to, flag) = match &record.outcome {
            Outcome::Liveness { status, redirect_to } => {
                (KIND_LIVENESS, Some(i64::from(*status)), redirect_to.clone(), None)
            },
            Outcome::Https { found } => (KIND_HTTPS, None, None, Some(*found)),
            Outcome::Package { current } => (KIND_PACKAGE, None, None, Some(*current)),
        };
        Self {
            key: record.key.clone(),
            kind: kind.to_string(),
            positive: record.outcome.is_positive(),
            status,
            redirect_to,
            flag,
            time: record.time.unix_timestamp(),
        }
    }
}
impl TryFrom<ResultRow> for Record {
    type Error = Error;
    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let outcome = match row.kind.as_str() {
            KIND_LIVENESS => Outcome::Liveness {
                status: row
                    .status
                    .ok_or_raise(|| ErrorKind::InvalidData("status"))
                    .and_then(|status| u16::try_from(status).or_raise(|| ErrorKind::InvalidData("status")))?,
                redirect_to: row.redirect_to,
            },
            KIND_HTTPS => Outcome::Https { found: row.flag.ok_or_raise(|| ErrorKind::InvalidData("found"))? },
            KIND_PACKAGE => Outcome::Package { current: row.flag.ok_or_raise(|| ErrorKind::InvalidData("current"))? },
            _ => exn::bail!(ErrorKind::InvalidData("kind")),
        };
        Ok(Self {
            key: row.key,
            outcome,
            time: UtcDateTime::from_unix_timestamp(row.time).or_raise(|| ErrorKind::InvalidData("time"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Outcome::Liveness { status: 200, redirect_to: None }, true)]
    #[case(Outcome::Liveness { status: 299, redirect_to: None }, true)]
    #[case(Outcome::Liveness { status: 301, redirect_to: Some("https://example.com/".to_string()) }, false)]
    #[case(Outcome::Liveness { status: 404, redirect_to: None }, false)]
    #[case(Outcome::Liveness { status: 0, redirect_to: None }, false)]
    #[case(Outcome::Https { found: true }, true)]
    #[case(Outcome::Https { found: false }, false)]
    #[case(Outcome::Package { current: true }, true)]
    #[case(Outcome::Package { current: false }, false)]
    fn test_positivity(#[case] outcome: Outcome, #[case] expected: bool) {
        assert_eq!(outcome.is_positive(), expected);
    }

    #[test]
    fn test_row_to_model() {
        let row = ResultRow {
            key: "https://example.com/old".to_string(),
            kind: "liveness".to_string(),
            positive: false,
            status: Some(301),
            redirect_to: Some("https://example.com/new".to_string()),
            flag: None,
            time: 1_700_000_000,
        };
        let record = Record::try_from(row).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Liveness { status: 301, redirect_to: Some("https://example.com/new".to_string()) }
        );
        assert_eq!(record.time.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_model_to_row() {
        let record = Record::new("https://cdn.example/pkg@1.0.0/x.js", Outcome::Package { current: true });
        let row = ResultRow::from(&record);
        assert_eq!(row.kind, "package");
        assert_eq!(row.flag, Some(true));
        assert_eq!(row.status, None);
        assert!(row.positive);
    }

    #[rstest]
    #[case("liveness", None, None)]
    #[case("https", None, None)]
    #[case("mystery", Some(200), Some(true))]
    #[case("liveness", Some(70_000), None)]
    fn test_invalid_rows(#[case] kind: &str, #[case] status: Option<i64>, #[case] flag: Option<bool>) {
        let row = ResultRow {
            key: "k".to_string(),
            kind: kind.to_string(),
            positive: false,
            status,
            redirect_to: None,
            flag,
            time: 0,
        };
        assert!(Record::try_from(row).is_err());
    }
}
