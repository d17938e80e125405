//! Ranking of tile candidates by distance to a target color.

use std::str::FromStr;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use imagery_common::{distance, Band, BandVector, Color, ImageryResult, TileCandidate};

use crate::resolver::IntensityResolver;

/// What candidates are ranked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankTarget {
    /// An explicit color. Only bands whose channel is non-zero are resolved.
    Color(Color),
    /// A single band; the target is that band's pure-channel color and only
    /// that band's files are resolved.
    Band(Band),
}

impl RankTarget {
    /// Parse a band-selection target (`B02`, `green`, ...).
    pub fn parse_band(value: &str) -> ImageryResult<Self> {
        Ok(RankTarget::Band(Band::from_str(value)?))
    }

    /// Parse an explicit-color target (`ff0000`).
    pub fn parse_color(value: &str) -> ImageryResult<Self> {
        Ok(RankTarget::Color(Color::from_hex(value)?))
    }

    pub fn color(&self) -> Color {
        match self {
            RankTarget::Color(color) => *color,
            RankTarget::Band(band) => band.canonical_color(),
        }
    }

    pub fn target_vector(&self) -> BandVector {
        BandVector::target(self.color())
    }

    /// Whether files of `band` need decoding for this target.
    pub fn resolves(&self, band: Band) -> bool {
        match self {
            RankTarget::Color(color) => color.channel(band) > 0,
            RankTarget::Band(selected) => *selected == band,
        }
    }
}

/// One band file to decode, remembered by its place in the input.
#[derive(Debug, Clone)]
struct ResolveJob {
    candidate: usize,
    position: usize,
    band: Band,
    reference: String,
}

/// Orders tile candidates by visual similarity to a target.
pub struct RankingEngine {
    resolver: Arc<IntensityResolver>,
    cap: Option<i64>,
}

impl RankingEngine {
    /// `cap` is the saturation ceiling applied to samples while ranking.
    pub fn new(resolver: Arc<IntensityResolver>, cap: Option<i64>) -> Self {
        Self { resolver, cap }
    }

    /// Order `candidates` by ascending distance to `target`.
    ///
    /// Band files that fail to resolve contribute zero on their axis; the
    /// failure is logged and ranking continues.
    pub async fn rank(&self, candidates: Vec<TileCandidate>, target: &RankTarget) -> Vec<TileCandidate> {
        info!(target = %target.color(), candidates = candidates.len(), "Ranking candidates");

        let vectors = self.resolve_vectors(&candidates, target).await;
        order_by_distance(candidates, &vectors, &target.target_vector())
    }

    /// Un-clamped mean intensity of a single band file.
    pub async fn average(&self, reference: &str) -> ImageryResult<f64> {
        self.resolver.resolve(reference, None).await
    }

    /// Resolve one band vector per candidate.
    ///
    /// Files are decoded concurrently, but results are applied in input
    /// order, so when a candidate lists a band more than once the last
    /// listed file determines that axis whatever the completion order.
    pub async fn resolve_vectors(
        &self,
        candidates: &[TileCandidate],
        target: &RankTarget,
    ) -> Vec<BandVector> {
        let jobs: Vec<ResolveJob> = candidates
            .iter()
            .enumerate()
            .flat_map(move |(candidate, references)| {
                references
                    .iter()
                    .enumerate()
                    .flat_map(move |(position, reference)| {
                        Band::ALL
                            .into_iter()
                            .filter(move |band| band.matches(reference) && target.resolves(*band))
                            .map(move |band| ResolveJob {
                                candidate,
                                position,
                                band,
                                reference: reference.clone(),
                            })
                    })
            })
            .collect();

        debug!(jobs = jobs.len(), "Resolving band intensities");

        let resolver = &self.resolver;
        let cap = self.cap;
        let mut results: Vec<(ResolveJob, ImageryResult<f64>)> = stream::iter(jobs)
            .map(move |job| async move {
                let value = resolver.resolve(&job.reference, cap).await;
                (job, value)
            })
            .buffer_unordered(self.resolver.max_concurrent())
            .collect()
            .await;

        results.sort_by_key(|(job, _)| (job.candidate, job.position));

        let mut vectors = vec![BandVector::ZERO; candidates.len()];
        for (job, value) in results {
            vectors[job.candidate][job.band] = match value {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        reference = %job.reference,
                        band = %job.band,
                        error = %e,
                        "Failed to resolve band intensity, using zero"
                    );
                    0.0
                }
            };
        }

        vectors
    }
}

/// Stable sort of candidates by ascending distance of their vectors to `target`.
///
/// Candidates at equal distance keep their input order.
pub fn order_by_distance(
    candidates: Vec<TileCandidate>,
    vectors: &[BandVector],
    target: &BandVector,
) -> Vec<TileCandidate> {
    let mut scored: Vec<(f64, TileCandidate)> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| {
            let vector = vectors.get(i).copied().unwrap_or(BandVector::ZERO);
            let dist = distance(target, &vector);
            debug!(candidate = i, dist, "Candidate distance");
            (dist, candidate)
        })
        .collect();

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}
