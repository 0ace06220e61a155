//! PostgREST (Supabase-style) gateway implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::instrument;

use trainboard_core::gateway::{DataGateway, SnapshotScope};
use trainboard_core::model::{
    AnswerRecord, Class, FeedbackRecord, Module, Profile, ProgressRecord,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

const PROFILE_COLUMNS: &str = "id,name,email,role,active";
const MODULE_COLUMNS: &str = "id,title,status";
const PROGRESS_COLUMNS: &str = "user_id,module_id,status,score_percent,completed_at";
const ANSWER_COLUMNS: &str = "user_id,module_id,question_id,is_correct";
const FEEDBACK_COLUMNS: &str = "user_id,module_id,rating,comment";
const CLASS_COLUMNS: &str = "id,name,member_ids";

// Stable sort keys, so limit/offset pages neither skip nor repeat rows.
const BY_ID: &str = "id.asc";
const BY_USER_MODULE: &str = "user_id.asc,module_id.asc";
const BY_USER_MODULE_QUESTION: &str = "user_id.asc,module_id.asc,question_id.asc";

/// Reads record sets over the PostgREST HTTP interface.
pub struct PostgrestGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl PostgrestGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        if config.base_url.is_empty() {
            return Err(GatewayError::NotConfigured("base_url".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn table_url(&self, table: &str) -> Result<reqwest::Url, GatewayError> {
        let raw = format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table);
        reqwest::Url::parse(&raw).map_err(|e| GatewayError::NotConfigured(format!("base_url: {e}")))
    }

    /// Fetch every row of `table` matching `filters`, page by page in
    /// `order`.
    ///
    /// The server may cap a page below `page_size`, so a short page does not
    /// end the read. Paging stops once the exact count from `Content-Range`
    /// is reached, or at the first empty page when the count is missing.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        order: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, GatewayError> {
        let page_size = self.config.page_size.max(1);
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut url = self.table_url(table)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("select", columns);
                for (column, filter) in filters {
                    query.append_pair(column, filter);
                }
                query.append_pair("order", order);
                query.append_pair("limit", &page_size.to_string());
                query.append_pair("offset", &offset.to_string());
            }

            let response = self
                .client
                .get(url)
                .header("apikey", &self.config.api_key)
                .header("authorization", format!("Bearer {}", self.config.api_key))
                .header("accept-profile", &self.config.schema)
                .header("accept", "application/json")
                .header("prefer", "count=exact")
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        GatewayError::Timeout(self.config.timeout_secs)
                    } else {
                        GatewayError::NetworkError(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                let body = response.text().await.unwrap_or_default();
                return Err(GatewayError::AuthenticationFailed(body));
            }
            if status >= 400 {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or(body);
                return Err(GatewayError::ApiError {
                    table: table.to_string(),
                    status,
                    message,
                });
            }

            let total = response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(content_range_total);
            let body = response
                .text()
                .await
                .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
            let page: Vec<T> = serde_json::from_str(&body).map_err(|e| GatewayError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            })?;

            let fetched = page.len();
            rows.extend(page);
            offset += fetched;
            if fetched == 0 || total.is_some_and(|total| offset >= total) {
                break;
            }
        }

        tracing::debug!(table, rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

/// Total row count from a `Content-Range` value such as `0-24/3573` or
/// `*/0`. `None` when the server did not count (`0-24/*`).
pub fn content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// A PostgREST `in.(...)` filter over `values`, quoting values that contain
/// reserved characters.
pub fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| {
            if v.contains([',', '(', ')', '"', ':', ' ', '\\']) {
                format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                v.clone()
            }
        })
        .collect();
    format!("in.({})", quoted.join(","))
}

fn scope_filters(scope: &SnapshotScope) -> Vec<(&'static str, String)> {
    let mut filters = Vec::new();
    if let Some(ids) = &scope.user_ids {
        filters.push(("user_id", in_filter(ids)));
    }
    if let Some(ids) = &scope.module_ids {
        filters.push(("module_id", in_filter(ids)));
    }
    filters
}

fn id_filters(ids: Option<&[String]>) -> Vec<(&'static str, String)> {
    ids.map(|ids| vec![("id", in_filter(ids))]).unwrap_or_default()
}

#[async_trait]
impl DataGateway for PostgrestGateway {
    fn name(&self) -> &str {
        "postgrest"
    }

    #[instrument(skip(self, ids), fields(ids = ids.map_or(0, |i| i.len())))]
    async fn fetch_profiles(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Profile>> {
        Ok(self
            .select(&self.config.tables.profiles, PROFILE_COLUMNS, BY_ID, &id_filters(ids))
            .await?)
    }

    #[instrument(skip(self, ids), fields(ids = ids.map_or(0, |i| i.len())))]
    async fn fetch_modules(&self, ids: Option<&[String]>) -> anyhow::Result<Vec<Module>> {
        Ok(self
            .select(&self.config.tables.modules, MODULE_COLUMNS, BY_ID, &id_filters(ids))
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_progress(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<ProgressRecord>> {
        Ok(self
            .select(
                &self.config.tables.progress,
                PROGRESS_COLUMNS,
                BY_USER_MODULE,
                &scope_filters(scope),
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_answers(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<AnswerRecord>> {
        Ok(self
            .select(
                &self.config.tables.answers,
                ANSWER_COLUMNS,
                BY_USER_MODULE_QUESTION,
                &scope_filters(scope),
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_feedback(&self, scope: &SnapshotScope) -> anyhow::Result<Vec<FeedbackRecord>> {
        Ok(self
            .select(
                &self.config.tables.feedback,
                FEEDBACK_COLUMNS,
                BY_USER_MODULE,
                &scope_filters(scope),
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_classes(&self) -> anyhow::Result<Vec<Class>> {
        Ok(self
            .select(&self.config.tables.classes, CLASS_COLUMNS, BY_ID, &[])
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainboard_core::model::ProgressStatus;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> PostgrestGateway {
        PostgrestGateway::new(GatewayConfig::new(&server.uri(), "test-key")).unwrap()
    }

    #[test]
    fn in_filter_quotes_reserved_characters() {
        assert_eq!(in_filter(&["a".into(), "b".into()]), "in.(a,b)");
        assert_eq!(in_filter(&["x,y".into()]), "in.(\"x,y\")");
        assert_eq!(in_filter(&[]), "in.()");
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(content_range_total("0-24/3573"), Some(3573));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn missing_base_url_is_rejected() {
        assert!(matches!(
            PostgrestGateway::new(GatewayConfig::default()),
            Err(GatewayError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn fetches_progress_with_batched_filter() {
        let server = MockServer::start().await;

        let body = serde_json::json!([
            {"user_id": "u1", "module_id": "m1", "status": "completed",
             "score_percent": 80, "completed_at": "2025-10-02T09:30:00.123456+00:00"},
            {"user_id": "u2", "module_id": "m1", "status": "em_andamento",
             "score_percent": null, "completed_at": null}
        ]);

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_module_progress"))
            .and(query_param("user_id", "in.(u1,u2)"))
            .and(query_param("order", "user_id.asc,module_id.asc"))
            .and(header("apikey", "test-key"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-range", "0-1/2")
                    .set_body_json(&body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let scope = SnapshotScope {
            user_ids: Some(vec!["u1".into(), "u2".into()]),
            module_ids: None,
        };
        let rows = gateway(&server).fetch_progress(&scope).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score_percent, Some(80.0));
        assert!(rows[0].completed_at.is_some());
        assert_eq!(rows[1].status, ProgressStatus::InProgress);
    }

    #[tokio::test]
    async fn pages_until_exact_count() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/modules"))
            .and(query_param("order", "id.asc"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-range", "0-1/3")
                    .set_body_json(serde_json::json!([
                        {"id": "m1", "title": "Ética", "status": "published"},
                        {"id": "m2", "title": "Segurança", "status": "publicado"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/modules"))
            .and(query_param("order", "id.asc"))
            .and(query_param("offset", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-range", "2-2/3")
                    .set_body_json(serde_json::json!([
                        {"id": "m3", "title": "LGPD", "status": "draft"}
                    ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = GatewayConfig::new(&server.uri(), "test-key");
        config.page_size = 2;
        let gateway = PostgrestGateway::new(config).unwrap();

        let modules = gateway.fetch_modules(None).await.unwrap();
        let ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn server_row_cap_does_not_truncate() {
        let server = MockServer::start().await;
        let row = |user: &str| {
            serde_json::json!({"user_id": user, "module_id": "m1", "status": "completed",
                               "score_percent": 90, "completed_at": null})
        };

        // The server returns at most 2 rows whatever limit is asked for, and
        // sends no count.
        for (offset, body) in [
            ("0", serde_json::json!([row("u1"), row("u2")])),
            ("2", serde_json::json!([row("u3")])),
            ("3", serde_json::json!([])),
        ] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/user_module_progress"))
                .and(query_param("order", "user_id.asc,module_id.asc"))
                .and(query_param("limit", "5"))
                .and(query_param("offset", offset))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut config = GatewayConfig::new(&server.uri(), "test-key");
        config.page_size = 5;
        let gateway = PostgrestGateway::new(config).unwrap();

        let rows = gateway.fetch_progress(&SnapshotScope::all()).await.unwrap();
        let users: Vec<&str> = rows.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn empty_count_stops_after_one_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/classes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-range", "*/0")
                    .set_body_json(serde_json::json!([])),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert!(gateway(&server).fetch_classes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = gateway(&server).fetch_profiles(None).await.unwrap_err();
        assert!(err.to_string().contains("authentication"));
    }

    #[tokio::test]
    async fn api_error_carries_backend_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/module_feedbacks"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "column module_feedbacks.rating does not exist"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .fetch_feedback(&SnapshotScope::all())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("HTTP 400"));
        assert!(msg.contains("does not exist"));
    }

    #[tokio::test]
    async fn malformed_rows_are_decode_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/classes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1}
            ])))
            .mount(&server)
            .await;

        let err = gateway(&server).fetch_classes().await.unwrap_err();
        assert!(err.to_string().contains("failed to decode classes"));
    }
}
