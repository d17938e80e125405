//! Imagery search handlers.
//!
//! Every route answers a JSON array of candidates, each candidate being the
//! list of its band-file references. Input is fully validated before any
//! upstream call is made.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use imagery_common::{BoundingBox, Coordinate, ImageryResult, TileCandidate};

use super::common::error_response;
use crate::pipeline::RankingOptions;
use crate::state::AppState;

/// Ranking parameters shared by the search routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankParams {
    pub rank_by_band: Option<String>,
    pub rank_by_value: Option<String>,
}

impl RankParams {
    fn options(&self) -> ImageryResult<RankingOptions> {
        RankingOptions::parse(self.rank_by_band.as_deref(), self.rank_by_value.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct PointParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
    #[serde(flatten)]
    pub rank: RankParams,
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub address: Option<String>,
    #[serde(flatten)]
    pub rank: RankParams,
}

#[derive(Debug, Deserialize)]
pub struct AreaParams {
    pub south: Option<String>,
    pub north: Option<String>,
    pub west: Option<String>,
    pub east: Option<String>,
    #[serde(flatten)]
    pub rank: RankParams,
}

#[derive(Debug, Deserialize)]
pub struct BandAverageParams {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BandAverageResponse {
    pub path: String,
    pub average: f64,
}

fn respond(result: ImageryResult<Vec<TileCandidate>>) -> Response {
    match result {
        Ok(candidates) => {
            info!(count = candidates.len(), "Returning candidates");
            Json(candidates).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /images?lat=&lng=[&rankByBand=][&rankByValue=]
#[instrument(skip(state))]
pub async fn images_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> Response {
    counter!("imagery_requests_total", "route" => "images").increment(1);

    let request = Coordinate::parse(
        params.lat.as_deref().unwrap_or(""),
        params.lng.as_deref().unwrap_or(""),
    )
    .and_then(|coord| Ok((coord, params.rank.options()?)));

    let (coord, options) = match request {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    respond(state.pipeline.images_at_point(coord, &options).await)
}

/// GET /imagesFromAddress?address=[&rankByBand=][&rankByValue=]
#[instrument(skip(state))]
pub async fn images_from_address_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AddressParams>,
) -> Response {
    counter!("imagery_requests_total", "route" => "imagesFromAddress").increment(1);

    let options = match params.rank.options() {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };
    let address = params.address.as_deref().unwrap_or("");

    respond(state.pipeline.images_for_address(address, &options).await)
}

/// GET /imagesInArea?south=&north=&west=&east=[&rankByBand=][&rankByValue=]
#[instrument(skip(state))]
pub async fn images_in_area_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AreaParams>,
) -> Response {
    counter!("imagery_requests_total", "route" => "imagesInArea").increment(1);

    let request = BoundingBox::parse(
        params.south.as_deref().unwrap_or(""),
        params.north.as_deref().unwrap_or(""),
        params.west.as_deref().unwrap_or(""),
        params.east.as_deref().unwrap_or(""),
    )
    .and_then(|bbox| Ok((bbox, params.rank.options()?)));

    let (bbox, options) = match request {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    respond(state.pipeline.images_in_area(bbox, &options).await)
}

/// GET /bandAverage?path=gs://bucket/...B04.jp2
#[instrument(skip(state))]
pub async fn band_average_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<BandAverageParams>,
) -> Response {
    counter!("imagery_requests_total", "route" => "bandAverage").increment(1);

    let path = params.path.unwrap_or_default();
    match state.pipeline.band_average(&path).await {
        Ok(average) => Json(BandAverageResponse { path, average }).into_response(),
        Err(e) => error_response(&e),
    }
}
