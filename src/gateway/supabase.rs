//! Gateway backed by the hosted REST, realtime and auth services

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::{ChangeFeed, Gateway, Query, RowId};
use crate::auth::Auth;
use crate::config::ClinicConfig;
use crate::error::Result;
use crate::postgrest::{PostgrestClient, SortOrder};
use crate::realtime::RealtimeClient;

/// Talks to the backend described by a [`ClinicConfig`]
#[derive(Clone)]
pub struct SupabaseGateway {
    config: ClinicConfig,
    http: Client,
    auth: Auth,
    realtime: RealtimeClient,
}

impl SupabaseGateway {
    pub fn new(config: ClinicConfig) -> Self {
        let http = Client::new();
        let base = config.base_url();
        let auth = Auth::new(
            &base,
            &config.anon_key,
            http.clone(),
            config.options.request_timeout,
        );
        let realtime = RealtimeClient::new(
            &base,
            &config.anon_key,
            &config.options.db_schema,
            config.options.heartbeat_interval,
        );
        Self {
            config,
            http,
            auth,
            realtime,
        }
    }

    /// Reads the configuration from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClinicConfig::from_env()?))
    }

    /// The session holder used for admin requests
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    /// REST client for `table`, carrying the admin token when signed in
    fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(
            &self.config.base_url(),
            &self.config.anon_key,
            table,
            self.http.clone(),
        )
        .with_timeout(self.config.options.request_timeout);
        match self.auth.access_token() {
            Some(token) => client.with_auth(&token),
            None => client,
        }
    }
}

#[async_trait]
impl Gateway for SupabaseGateway {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let mut select = self.from(table).select(&query.select_clause());
        for (column, value) in &query.filters {
            select = select.eq(column, value.clone());
        }
        if let Some(order) = &query.order {
            let direction = if order.ascending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };
            select = select.order(&order.column, direction);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        debug!("select {} {:?}", table, select.params());
        select.execute::<Value>().await
    }

    async fn count(&self, table: &str) -> Result<u64> {
        self.from(table).count().execute().await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        debug!("insert {} row(s) into {}", rows.len(), table);
        self.from(table).insert(rows).execute::<Value>().await
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<()> {
        debug!("update {} id={}", table, id);
        self.from(table)
            .update(patch)
            .eq("id", id.to_value())
            .execute()
            .await
    }

    async fn delete(&self, table: &str, id: &RowId) -> Result<()> {
        debug!("delete {} id={}", table, id);
        self.from(table).delete().eq("id", id.to_value()).execute().await
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed> {
        self.realtime.set_auth(self.auth.access_token());
        let subscription = self.realtime.subscribe_table(table).await?;
        let (receiver, mut guard) = subscription.into_parts();
        Ok(ChangeFeed::new(receiver, move || guard.leave()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Order;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> SupabaseGateway {
        SupabaseGateway::new(ClinicConfig::new(&server.uri(), "anon").unwrap())
    }

    #[tokio::test]
    async fn select_maps_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/blog_posts"))
            .and(query_param("select", "id,title,summary"))
            .and(query_param("is_published", "eq.true"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let query = Query::all()
            .columns(&["id", "title", "summary"])
            .eq("is_published", true)
            .order_by(Order::desc("created_at"));
        let rows = gateway(&server).await.select("blog_posts", &query).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 1})]);
    }

    #[tokio::test]
    async fn update_targets_one_row() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/clinic_info"))
            .and(query_param("id", "eq.abc"))
            .and(header("Prefer", "return=minimal"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server)
            .await
            .update("clinic_info", &RowId::from("abc"), json!({"value": "x"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_insert_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .insert("appointments", vec![json!({"patient_name": "Jane"})])
            .await
            .unwrap_err();
        assert!(err.is_gateway());
    }
}
