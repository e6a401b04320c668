use crate::types::Row;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, FilterRange, FilterWhereInfo, SortDirection, SqlResult, SqlValue};

/// Predicates, ordering and row window for one store statement.
///
/// The same filter renders to SQL for `PgStore`, to query pairs for `RestStore`,
/// and is evaluated directly against rows by `MemoryStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    where_data: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    range: Option<FilterRange>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.where_data.push(FilterWhereInfo { column, data: value.into() });
        self
    }

    pub fn order(mut self, column: &'static str, sort: SortDirection) -> Self {
        self.order_data.push(FilterOrderInfo { column, sort });
        self
    }

    /// Inclusive row range `[from, to]`, zero-based. An inverted range selects nothing.
    pub fn range(mut self, from: i64, to: i64) -> Self {
        let offset = from.max(0);
        let limit = to.saturating_sub(offset).saturating_add(1).max(0);
        self.range = Some(FilterRange { offset, limit });
        self
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.where_data
    }

    pub fn window(&self) -> Option<FilterRange> {
        self.range
    }

    pub fn matches(&self, row: &Row) -> bool {
        FilterWhere::matches(&self.where_data, row)
    }

    /// Filters, sorts and windows rows in memory.
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Row> {
        let mut out: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).cloned().collect();
        if !self.order_data.is_empty() {
            out.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        }
        match self.range {
            Some(FilterRange { offset, limit }) => out
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => out,
        }
    }

    /// `SELECT row_to_json(t) AS row FROM "table" AS t ...`, one JSON row per record.
    pub fn to_select_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        validate_identifier(table_name)
            .map_err(|_| FilterError::InvalidTableName(table_name.to_string()))?;

        let (where_clause, params) = FilterWhere::generate(&self.where_data, None, 1)?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause()?;

        let query = [
            format!("SELECT row_to_json(t) AS row FROM \"{}\" AS t", table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    /// WHERE body only, columns qualified by `qualifier`, placeholders from `start_index`.
    pub fn to_where_sql(&self, qualifier: &str, start_index: usize) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(&self.where_data, Some(qualifier), start_index)?;
        Ok(SqlResult { query, params })
    }

    /// PostgREST query pairs for this filter.
    pub fn to_rest_params(&self) -> Vec<(String, String)> {
        let mut pairs = FilterWhere::rest_params(&self.where_data);
        if let Some(order) = FilterOrder::rest_param(&self.order_data) {
            pairs.push(order);
        }
        if let Some(FilterRange { offset, limit }) = self.range {
            pairs.push(("offset".to_string(), offset.to_string()));
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    fn build_limit_clause(&self) -> Result<String, FilterError> {
        match self.range {
            Some(FilterRange { offset, limit }) => {
                if offset < 0 || limit < 0 {
                    return Err(FilterError::InvalidRange(format!("offset {} limit {}", offset, limit)));
                }
                Ok(format!("LIMIT {} OFFSET {}", limit, offset))
            }
            None => Ok(String::new()),
        }
    }
}

/// Identifiers are interpolated into SQL, so only `[a-z_][a-z0-9_]*` is accepted.
pub(crate) fn validate_identifier(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn rows() -> Vec<Row> {
        (0..5)
            .map(|i| {
                json!({
                    "user_id": if i == 2 { "other" } else { "me" },
                    "kind": if i % 2 == 0 { "click" } else { "view" },
                    "ts": format!("2024-01-0{}T00:00:00Z", i + 1),
                })
                .as_object()
                .unwrap()
                .clone()
            })
            .collect()
    }

    #[test]
    fn select_sql_has_all_clauses() {
        let user = Uuid::new_v4();
        let sql = Filter::new()
            .eq("user_id", user)
            .eq("kind", "click")
            .order("ts", SortDirection::Desc)
            .range(10, 19)
            .to_select_sql("events")
            .unwrap();

        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM \"events\" AS t WHERE \"user_id\" = $1 AND \"kind\" = $2 ORDER BY \"ts\" DESC LIMIT 10 OFFSET 10"
        );
        assert_eq!(sql.params, vec![SqlValue::Uuid(user), SqlValue::Text("click".into())]);
    }

    #[test]
    fn inverted_range_selects_nothing() {
        let filter = Filter::new().range(5, 2);
        assert_eq!(filter.window(), Some(FilterRange { offset: 5, limit: 0 }));
        assert!(filter.apply(rows().iter()).is_empty());
    }

    #[test]
    fn range_at_the_end_of_i64_does_not_overflow() {
        let filter = Filter::new().range(i64::MAX - 1, i64::MAX);
        assert_eq!(filter.window(), Some(FilterRange { offset: i64::MAX - 1, limit: 2 }));

        let filter = Filter::new().range(-5, i64::MAX);
        assert_eq!(filter.window(), Some(FilterRange { offset: 0, limit: i64::MAX }));
        assert_eq!(filter.apply(rows().iter()).len(), rows().len());
    }

    #[test]
    fn apply_filters_sorts_and_windows() {
        let all = rows();
        let out = Filter::new()
            .eq("user_id", "me")
            .order("ts", SortDirection::Desc)
            .range(0, 1)
            .apply(all.iter());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["ts"], "2024-01-05T00:00:00Z");
        assert_eq!(out[1]["ts"], "2024-01-04T00:00:00Z");
    }

    #[test]
    fn rest_params_include_window() {
        let pairs = Filter::new()
            .eq("kind", "click")
            .order("ts", SortDirection::Desc)
            .range(0, 49)
            .to_rest_params();
        assert!(pairs.contains(&("kind".to_string(), "eq.click".to_string())));
        assert!(pairs.contains(&("order".to_string(), "ts.desc".to_string())));
        assert!(pairs.contains(&("offset".to_string(), "0".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "50".to_string())));
    }

    #[test]
    fn validates_identifiers() {
        assert!(validate_identifier("user_id").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("Events").is_err());
        assert!(validate_identifier("a\"b").is_err());
    }
}
