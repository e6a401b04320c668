use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::Row;

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(infos.len());
        for info in infos {
            validate_identifier(info.column)
                .map_err(|_| FilterError::InvalidColumn(info.column.to_string()))?;
            parts.push(format!("\"{}\" {}", info.column, info.sort.to_sql()));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    /// PostgREST `order=ts.desc,name.asc`.
    pub fn rest_param(infos: &[FilterOrderInfo]) -> Option<(String, String)> {
        if infos.is_empty() {
            return None;
        }

        let value = infos
            .iter()
            .map(|i| format!("{}.{}", i.column, i.sort.to_rest()))
            .collect::<Vec<_>>()
            .join(",");
        Some(("order".to_string(), value))
    }

    pub fn compare(infos: &[FilterOrderInfo], a: &Row, b: &Row) -> Ordering {
        for info in infos {
            let ord = compare_values(a.get(info.column), b.get(info.column));
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

// Nulls sort last ascending, like Postgres.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn generates_order_by() {
        let infos = vec![FilterOrderInfo { column: "ts", sort: SortDirection::Desc }];
        assert_eq!(FilterOrder::generate(&infos).unwrap(), "ORDER BY \"ts\" DESC");
        assert_eq!(FilterOrder::generate(&[]).unwrap(), "");
    }

    #[test]
    fn rest_param_joins_columns() {
        let infos = vec![
            FilterOrderInfo { column: "ts", sort: SortDirection::Desc },
            FilterOrderInfo { column: "kind", sort: SortDirection::Asc },
        ];
        assert_eq!(
            FilterOrder::rest_param(&infos),
            Some(("order".to_string(), "ts.desc,kind.asc".to_string()))
        );
    }

    #[test]
    fn compares_timestamps_chronologically() {
        // Offsets differ, so lexical order would be wrong.
        let early = row(json!({ "ts": "2024-01-01T10:00:00+02:00" }));
        let late = row(json!({ "ts": "2024-01-01T09:00:00Z" }));
        let desc = vec![FilterOrderInfo { column: "ts", sort: SortDirection::Desc }];
        assert_eq!(FilterOrder::compare(&desc, &late, &early), Ordering::Less);
    }

    #[test]
    fn nulls_sort_last_ascending() {
        let a = row(json!({ "importance": null }));
        let b = row(json!({ "importance": 3 }));
        let asc = vec![FilterOrderInfo { column: "importance", sort: SortDirection::Asc }];
        assert_eq!(FilterOrder::compare(&asc, &a, &b), Ordering::Greater);
    }
}
