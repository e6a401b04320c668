use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::config::StoreConfig;
use crate::database::store::{expect_row, Store, StoreError};
use crate::filter::Filter;
use crate::types::{Operation, Row, Table};

/// The hosted store's PostgREST endpoint (`{url}/rest/v1/{table}`).
///
/// Requests carry the anon key as `apikey` and the service-role key as the
/// bearer, so row-level policies are bypassed and the filters sent here are
/// the only ownership check.
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
    anon_key: String,
    service_role_key: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&format!("{}/rest/v1/", config.url.trim_end_matches('/')))
            .map_err(|e| StoreError::Config(format!("store url '{}': {}", config.url, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    pub fn endpoint(&self, table: Table) -> Result<Url, StoreError> {
        self.base
            .join(table.as_str())
            .map_err(|e| StoreError::Config(e.to_string()))
    }

    fn request(&self, method: Method, table: Table) -> Result<RequestBuilder, StoreError> {
        Ok(self
            .client
            .request(method, self.endpoint(table)?)
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.service_role_key))
            .header("Prefer", "return=representation"))
    }

    async fn read_rows(response: Response, table: Table, operation: Operation) -> Result<Vec<Row>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected { table, operation, status: status.as_u16(), body });
        }
        let values: Vec<Value> = response.json().await?;
        values.into_iter().map(expect_row).collect()
    }
}

#[async_trait]
impl Store for RestStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Vec<Row>, StoreError> {
        let response = self.request(Method::POST, table)?.json(&row).send().await?;
        Self::read_rows(response, table, Operation::Insert).await
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter.to_rest_params());
        let response = self.request(Method::GET, table)?.query(&params).send().await?;
        Self::read_rows(response, table, Operation::Select).await
    }

    async fn update(&self, table: Table, changes: Row, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        if filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table, operation: Operation::Update });
        }
        let response = self
            .request(Method::PATCH, table)?
            .query(&filter.to_rest_params())
            .json(&changes)
            .send()
            .await?;
        Self::read_rows(response, table, Operation::Update).await
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        if filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table, operation: Operation::Delete });
        }
        let response = self
            .request(Method::DELETE, table)?
            .query(&filter.to_rest_params())
            .send()
            .await?;
        let removed = Self::read_rows(response, table, Operation::Delete).await?;
        Ok(removed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn endpoints_live_under_rest_v1() {
        let mut config = AppConfig::development().store;
        config.url = "https://abc.supabase.co/".to_string();
        let store = RestStore::new(&config).unwrap();
        assert_eq!(store.endpoint(Table::Events).unwrap().as_str(), "https://abc.supabase.co/rest/v1/events");
        assert_eq!(store.endpoint(Table::Memories).unwrap().as_str(), "https://abc.supabase.co/rest/v1/memories");
    }

    #[test]
    fn placeholder_url_still_builds() {
        let config = AppConfig::development().store;
        assert!(RestStore::new(&config).is_ok());
    }

    #[test]
    fn rejects_unparseable_url() {
        let mut config = AppConfig::development().store;
        config.url = "not a url".to_string();
        assert!(matches!(RestStore::new(&config), Err(StoreError::Config(_))));
    }
}
