//! Scene catalog backed by the public BigQuery Sentinel-2 index.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use imagery_common::{BoundingBox, Coordinate, ImageryError, ImageryResult};

use crate::auth::TokenSource;

/// One scene returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// `gs://` URL of the scene's `IMG_DATA` directory.
    pub base_url: String,
    /// Acquisition time, if the catalog reported one.
    pub sensing_time: Option<DateTime<Utc>>,
}

/// Where to look for scenes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneQuery {
    /// Scenes whose footprint contains the coordinate.
    Point(Coordinate),
    /// Scenes whose footprint lies entirely within the box.
    Area(BoundingBox),
}

/// Catalog of scenes, most recent first.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Find at most `limit` scenes matching the query, ordered by sensing time descending.
    async fn find_scenes(&self, query: &SceneQuery, limit: usize) -> ImageryResult<Vec<Scene>>;
}

/// Configuration for the BigQuery catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Project billed for the query.
    pub project_id: String,
    /// Fully-qualified index table.
    pub table: String,
    /// BigQuery REST base URL
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            table: "bigquery-public-data.cloud_storage_geo_index.sentinel_2_index".to_string(),
            api_base: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Catalog client using the BigQuery `jobs.query` REST endpoint.
pub struct BigQueryCatalog {
    client: Client,
    config: CatalogConfig,
    tokens: TokenSource,
}

impl BigQueryCatalog {
    pub fn new(config: CatalogConfig, tokens: TokenSource) -> ImageryResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ImageryError::upstream("catalog", format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }
}

#[async_trait]
impl CatalogClient for BigQueryCatalog {
    #[instrument(skip(self), fields(project = %self.config.project_id))]
    async fn find_scenes(&self, query: &SceneQuery, limit: usize) -> ImageryResult<Vec<Scene>> {
        let url = format!(
            "{}/projects/{}/queries",
            self.config.api_base, self.config.project_id
        );
        let body = build_query_request(&self.config.table, query, limit, self.config.timeout);
        let token = self.tokens.bearer(&self.client).await?;

        debug!(url = %url, "Querying scene catalog");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImageryError::upstream("catalog", e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ImageryError::upstream("catalog", e.to_string()))?;

        if !status.is_success() {
            return Err(ImageryError::upstream(
                "catalog",
                format!("HTTP {}: {}", status, text),
            ));
        }

        let scenes = parse_query_response(&text)?;
        info!(count = scenes.len(), "Number of rows");
        Ok(scenes)
    }
}

const SELECT_SCENES: &str = "SELECT CONCAT(BASE_URL, '/GRANULE/', GRANULE_ID, '/IMG_DATA') AS URL, SENSING_TIME";

/// Build the SQL text for a scene query against `table`.
pub fn build_sql(table: &str, query: &SceneQuery) -> String {
    let filter = match query {
        SceneQuery::Point(_) => {
            "SOUTH_LAT < @LAT AND @LAT < NORTH_LAT AND WEST_LON < @LNG AND @LNG < EAST_LON"
        }
        SceneQuery::Area(_) => {
            "@SOUTH_LAT <= SOUTH_LAT AND NORTH_LAT <= @NORTH_LAT \
             AND @WEST_LON <= WEST_LON AND EAST_LON <= @EAST_LON"
        }
    };

    format!(
        "{} FROM `{}` WHERE {} ORDER BY SENSING_TIME DESC LIMIT @LIMIT",
        SELECT_SCENES, table, filter
    )
}

fn float_param(name: &str, value: f64) -> serde_json::Value {
    json!({
        "name": name,
        "parameterType": { "type": "FLOAT64" },
        "parameterValue": { "value": value.to_string() },
    })
}

/// Build the `jobs.query` request body with named parameters.
pub fn build_query_request(
    table: &str,
    query: &SceneQuery,
    limit: usize,
    timeout: Duration,
) -> serde_json::Value {
    let mut params = match query {
        SceneQuery::Point(coord) => vec![float_param("LAT", coord.lat), float_param("LNG", coord.lng)],
        SceneQuery::Area(bbox) => vec![
            float_param("SOUTH_LAT", bbox.south),
            float_param("NORTH_LAT", bbox.north),
            float_param("WEST_LON", bbox.west),
            float_param("EAST_LON", bbox.east),
        ],
    };
    params.push(json!({
        "name": "LIMIT",
        "parameterType": { "type": "INT64" },
        "parameterValue": { "value": limit.to_string() },
    }));

    json!({
        "query": build_sql(table, query),
        "useLegacySql": false,
        "parameterMode": "NAMED",
        "queryParameters": params,
        "timeoutMs": timeout.as_millis() as u64,
        "requestId": Uuid::new_v4().to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Option<String>,
}

/// Reduce a `jobs.query` response to scenes, preserving row order.
pub fn parse_query_response(body: &str) -> ImageryResult<Vec<Scene>> {
    let response: QueryResponse = serde_json::from_str(body)?;

    if !response.job_complete {
        return Err(ImageryError::upstream(
            "catalog",
            "query did not complete within the timeout",
        ));
    }

    response
        .rows
        .into_iter()
        .map(|row| {
            let mut cells = row.f.into_iter();
            let base_url = cells
                .next()
                .and_then(|c| c.v)
                .ok_or_else(|| ImageryError::upstream("catalog", "row without URL"))?;
            let sensing_time = cells.next().and_then(|c| c.v).and_then(|v| parse_timestamp(&v));
            Ok(Scene {
                base_url,
                sensing_time,
            })
        })
        .collect()
}

/// BigQuery returns TIMESTAMP cells as floating-point epoch seconds.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let secs: f64 = value.parse().ok()?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos.min(999_999_999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_sql_uses_strict_containment() {
        let coord = Coordinate::new(37.4, -122.1).unwrap();
        let sql = build_sql("t.d.idx", &SceneQuery::Point(coord));
        assert!(sql.contains("SOUTH_LAT < @LAT AND @LAT < NORTH_LAT"));
        assert!(sql.contains("FROM `t.d.idx`"));
        assert!(sql.ends_with("ORDER BY SENSING_TIME DESC LIMIT @LIMIT"));
    }

    #[test]
    fn test_area_sql_requires_full_containment() {
        let bbox = BoundingBox::new(37.0, 38.0, -123.0, -122.0).unwrap();
        let sql = build_sql("t.d.idx", &SceneQuery::Area(bbox));
        assert!(sql.contains("@SOUTH_LAT <= SOUTH_LAT"));
        assert!(sql.contains("EAST_LON <= @EAST_LON"));
    }

    #[test]
    fn test_request_binds_named_parameters() {
        let coord = Coordinate::new(1.5, 2.5).unwrap();
        let body = build_query_request("t", &SceneQuery::Point(coord), 3, Duration::from_secs(10));
        assert_eq!(body["parameterMode"], "NAMED");
        assert_eq!(body["useLegacySql"], false);
        let params = body["queryParameters"].as_array().unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0]["name"], "LAT");
        assert_eq!(params[0]["parameterValue"]["value"], "1.5");
        assert_eq!(params[2]["name"], "LIMIT");
        assert_eq!(params[2]["parameterValue"]["value"], "3");
        assert_eq!(body["timeoutMs"], 10_000);
    }

    #[test]
    fn test_parse_rows_in_order() {
        let body = r#"{
            "jobComplete": true,
            "rows": [
                {"f": [{"v": "gs://bucket/tiles/a/GRANULE/g1/IMG_DATA"}, {"v": "1.7040672E9"}]},
                {"f": [{"v": "gs://bucket/tiles/b/GRANULE/g2/IMG_DATA"}, {"v": null}]}
            ]
        }"#;
        let scenes = parse_query_response(body).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].base_url, "gs://bucket/tiles/a/GRANULE/g1/IMG_DATA");
        assert_eq!(scenes[0].sensing_time.unwrap().timestamp(), 1_704_067_200);
        assert!(scenes[1].sensing_time.is_none());
    }

    #[test]
    fn test_parse_empty_result() {
        let scenes = parse_query_response(r#"{"jobComplete": true}"#).unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_incomplete_job_is_upstream_error() {
        let err = parse_query_response(r#"{"jobComplete": false}"#).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(parse_query_response("not json").is_err());
    }
}
