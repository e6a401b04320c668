use crate::types::Row;

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::{FilterWhereInfo, SqlValue};

pub struct FilterWhere;

impl FilterWhere {
    /// Builds `"a" = $n AND "b" = $n+1`. `qualifier` prefixes each column when the
    /// statement joins another relation with the same column names.
    pub fn generate(
        infos: &[FilterWhereInfo],
        qualifier: Option<&str>,
        start_index: usize,
    ) -> Result<(String, Vec<SqlValue>), FilterError> {
        let mut parts = Vec::with_capacity(infos.len());
        let mut params = Vec::with_capacity(infos.len());

        for (i, info) in infos.iter().enumerate() {
            validate_identifier(info.column)
                .map_err(|_| FilterError::InvalidColumn(info.column.to_string()))?;
            let column = match qualifier {
                Some(q) => format!("\"{}\".\"{}\"", q, info.column),
                None => format!("\"{}\"", info.column),
            };
            parts.push(format!("{} = ${}", column, start_index + i));
            params.push(info.data.clone());
        }

        Ok((parts.join(" AND "), params))
    }

    /// PostgREST horizontal filters: `column=eq.value`.
    pub fn rest_params(infos: &[FilterWhereInfo]) -> Vec<(String, String)> {
        infos
            .iter()
            .map(|info| (info.column.to_string(), format!("eq.{}", info.data.to_rest_literal())))
            .collect()
    }

    /// Evaluates every predicate against a row. A missing column never matches.
    pub fn matches(infos: &[FilterWhereInfo], row: &Row) -> bool {
        infos.iter().all(|info| match row.get(info.column) {
            Some(value) => *value == info.data.to_json(),
            None => false,
        })
    }
}
