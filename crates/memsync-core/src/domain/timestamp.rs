//! Lenient timestamp parsing for state files written by older producers.
//!
//! Current writers emit RFC 3339 with an offset. Older ones wrote naive
//! local-time ISO strings (`2025-01-15T10:30:00.123456`) and sometimes epoch
//! seconds. A timestamp that cannot be read is dropped rather than failing
//! the whole file, since a failed parse would discard every pending entry.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawTimestamp {
    fn resolve(self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Text(text) => parse_timestamp(&text),
            RawTimestamp::Int(secs) => DateTime::from_timestamp(secs, 0),
            RawTimestamp::Float(secs) => DateTime::from_timestamp(secs as i64, 0),
        }
    }
}

/// Parse RFC 3339, or a naive ISO timestamp interpreted as local time.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;

    // a wall-clock time skipped by a DST jump has no local instant
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    )
}

/// `deserialize_with` for `Option<DateTime<Utc>>` fields. Use with `#[serde(default)]`.
pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(raw) => {
            let original = describe(&raw);
            let resolved = raw.resolve();
            if resolved.is_none() {
                tracing::warn!(value = %original, "unreadable timestamp in state file, ignoring it");
            }
            resolved
        }
        None => None,
    })
}

/// `deserialize_with` for required `DateTime<Utc>` fields.
pub(crate) fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawTimestamp::deserialize(deserializer)?;
    let original = describe(&raw);
    raw.resolve()
        .ok_or_else(|| de::Error::custom(format!("unreadable timestamp {original}")))
}

fn describe(raw: &RawTimestamp) -> String {
    match raw {
        RawTimestamp::Text(text) => format!("{text:?}"),
        RawTimestamp::Int(secs) => secs.to_string(),
        RawTimestamp::Float(secs) => secs.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Stamp {
        #[serde(default, deserialize_with = "optional")]
        at: Option<DateTime<Utc>>,
    }

    fn local(text: &str) -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").unwrap();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    }

    #[rstest]
    #[case::rfc3339(r#"{"at": "2025-01-15T10:30:00+00:00"}"#, Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()))]
    #[case::rfc3339_offset(r#"{"at": "2025-01-15T19:30:00+09:00"}"#, Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()))]
    #[case::epoch_int(r#"{"at": 1736937000}"#, Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()))]
    #[case::epoch_float(r#"{"at": 1736937000.75}"#, Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()))]
    #[case::null(r#"{"at": null}"#, None)]
    #[case::missing(r#"{}"#, None)]
    #[case::garbage(r#"{"at": "yesterday-ish"}"#, None)]
    fn optional_accepts_every_known_shape(
        #[case] json: &str,
        #[case] expected: Option<DateTime<Utc>>,
    ) {
        let stamp: Stamp = serde_json::from_str(json).unwrap();
        assert_eq!(stamp.at, expected);
    }

    #[test]
    fn naive_iso_is_read_as_local_time() {
        let stamp: Stamp = serde_json::from_str(r#"{"at": "2025-01-15T10:30:00.123456"}"#).unwrap();
        assert_eq!(stamp.at, Some(local("2025-01-15T10:30:00.123456")));

        let at = stamp.at.unwrap().with_timezone(&Local).naive_local();
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn space_separated_naive_form_parses() {
        assert_eq!(
            parse_timestamp("2025-01-15 10:30:00"),
            Some(local("2025-01-15T10:30:00"))
        );
    }

    #[test]
    fn required_rejects_garbage() {
        #[derive(Debug, Deserialize)]
        struct Required {
            #[allow(dead_code)]
            #[serde(deserialize_with = "required")]
            at: DateTime<Utc>,
        }

        assert!(serde_json::from_str::<Required>(r#"{"at": "2025-01-15T10:30:00"}"#).is_ok());
        assert!(serde_json::from_str::<Required>(r#"{"at": "soon"}"#).is_err());
    }
}
