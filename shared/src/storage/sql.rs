//! Helpers shared by the `ClickHouse` store implementations.
//!
//! Timestamps are stored as `Int64` nanoseconds since the Unix epoch in every
//! telemetry table.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;

/// Converts a timestamp to the nanosecond representation used in the tables.
///
/// Saturates to `i64::MIN`/`i64::MAX` outside the representable range.
/// Stored rows are always in range: model validation rejects the rest.
pub(crate) fn to_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(if ts.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Converts a stored nanosecond value back to a timestamp.
pub(crate) fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Escapes a string literal for inclusion between single quotes.
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Incrementally built `WHERE` clause.
///
/// Starts as `WHERE 1=1` so conditions can always be appended with `AND`.
#[derive(Debug, Clone)]
pub(crate) struct WhereClause {
    sql: String,
}

impl WhereClause {
    pub(crate) fn new() -> Self {
        Self {
            sql: String::from(" WHERE 1=1"),
        }
    }

    /// Appends `column = 'value'`.
    pub(crate) fn eq(&mut self, column: &str, value: &str) -> &mut Self {
        let _ = write!(self.sql, " AND {column} = {}", quote(value));
        self
    }

    /// Appends the `[start, end)` timestamp range filter.
    pub(crate) fn time_range(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> &mut Self {
        if let Some(start) = start {
            let _ = write!(self.sql, " AND timestamp >= {}", to_nanos(start));
        }
        if let Some(end) = end {
            let _ = write!(self.sql, " AND timestamp < {}", to_nanos(end));
        }
        self
    }

    /// Appends a raw condition.
    pub(crate) fn raw(&mut self, condition: &str) -> &mut Self {
        let _ = write!(self.sql, " AND {condition}");
        self
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.sql
    }
}

/// Formats the `ORDER BY ... LIMIT ... OFFSET ...` tail of a row query.
///
/// Without a limit every matching row is returned.
pub(crate) fn page(limit: Option<usize>, offset: Option<usize>) -> String {
    let mut sql = String::from(" ORDER BY timestamp DESC");
    match (limit, offset) {
        (Some(limit), offset) => {
            let _ = write!(sql, " LIMIT {limit} OFFSET {}", offset.unwrap_or(0));
        }
        (None, Some(offset)) => {
            let _ = write!(sql, " OFFSET {offset} ROWS");
        }
        (None, None) => {}
    }
    sql
}

#[derive(clickhouse::Row, serde::Deserialize)]
struct ServiceRow {
    service: String,
}

/// Fetches the sorted distinct non-empty service names of a table.
pub(crate) async fn distinct_services(
    client: Arc<clickhouse::Client>,
    table: &'static str,
) -> Result<Vec<String>, clickhouse::error::Error> {
    let rows: Vec<ServiceRow> = client
        .query(&format!(
            "SELECT DISTINCT service FROM {table} WHERE service != '' ORDER BY service"
        ))
        .fetch_all::<ServiceRow>()
        .await?;
    Ok(rows.into_iter().map(|row| row.service).collect())
}

/// Runs an async `ClickHouse` call from the synchronous store interface.
///
/// Requires a multi-threaded Tokio runtime.
pub(crate) fn block_on<F, T, E>(future: F, map_err: impl FnOnce(String) -> E) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
{
    tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current()
            .block_on(future)
            .map_err(|e| map_err(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("o'brien"), "'o''brien'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_where_clause_building() {
        let start = DateTime::from_timestamp_nanos(1_000);
        let end = DateTime::from_timestamp_nanos(2_000);

        let mut clause = WhereClause::new();
        clause
            .eq("service", "api")
            .time_range(Some(start), Some(end))
            .raw("duration > 2000");

        assert_eq!(
            clause.as_str(),
            " WHERE 1=1 AND service = 'api' AND timestamp >= 1000 AND timestamp < 2000 AND duration > 2000"
        );
    }

    #[test]
    fn test_page_tail() {
        assert_eq!(page(None, None), " ORDER BY timestamp DESC");
        assert_eq!(page(Some(10), None), " ORDER BY timestamp DESC LIMIT 10 OFFSET 0");
        assert_eq!(page(Some(10), Some(5)), " ORDER BY timestamp DESC LIMIT 10 OFFSET 5");
        assert_eq!(page(None, Some(5)), " ORDER BY timestamp DESC OFFSET 5 ROWS");
    }

    #[test]
    fn test_nanos_saturate_outside_range() {
        let far_future = DateTime::parse_from_rfc3339("2300-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ancient = DateTime::parse_from_rfc3339("1500-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(to_nanos(far_future), i64::MAX);
        assert_eq!(to_nanos(ancient), i64::MIN);
    }

    #[test]
    fn test_far_future_end_keeps_rows() {
        let far_future = DateTime::parse_from_rfc3339("2300-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut clause = WhereClause::new();
        clause.time_range(None, Some(far_future));

        assert_eq!(
            clause.as_str(),
            format!(" WHERE 1=1 AND timestamp < {}", i64::MAX)
        );
    }

    #[test]
    fn test_nanos_roundtrip() {
        let ts = Utc::now();
        assert_eq!(from_nanos(to_nanos(ts)), ts);
    }
}
