use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;

pub const REQUESTS_TOTAL: &str = "product_service_requests_total";
pub const REQUEST_DURATION: &str = "product_service_request_duration_seconds";

/// Upper bounds (seconds) of the latency histogram; `+Inf` is implicit.
pub const DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub type SharedMetrics = Arc<RwLock<MetricsStore>>;

#[derive(Debug, Clone, Default)]
struct Histogram {
    /// Per-bucket (non-cumulative) counts; the last slot is `+Inf`.
    buckets: [u64; DURATION_BUCKETS.len() + 1],
    sum: f64,
    count: u64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        let slot = DURATION_BUCKETS
            .iter()
            .position(|bound| seconds <= *bound)
            .unwrap_or(DURATION_BUCKETS.len());
        self.buckets[slot] += 1;
        self.sum += seconds;
        self.count += 1;
    }
}

/// Request counters keyed by (method, endpoint, status) and latency histograms
/// keyed by (method, endpoint).
#[derive(Debug, Default)]
pub struct MetricsStore {
    requests: BTreeMap<(String, String, String), u64>,
    durations: BTreeMap<(String, String), Histogram>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMetrics {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn record(&mut self, method: &str, endpoint: &str, status: &str, elapsed: Duration) {
        *self
            .requests
            .entry((method.to_string(), endpoint.to_string(), status.to_string()))
            .or_default() += 1;
        self.durations
            .entry((method.to_string(), endpoint.to_string()))
            .or_default()
            .observe(elapsed.as_secs_f64());
    }

    pub fn request_count(&self, method: &str, endpoint: &str, status: &str) -> u64 {
        self.requests
            .get(&(method.to_string(), endpoint.to_string(), status.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Render every series in the text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {REQUESTS_TOTAL} Total requests");
        let _ = writeln!(out, "# TYPE {REQUESTS_TOTAL} counter");
        for ((method, endpoint, status), count) in &self.requests {
            let _ = writeln!(
                out,
                "{REQUESTS_TOTAL}{{method=\"{}\",endpoint=\"{}\",status=\"{}\"}} {count}",
                escape(method),
                escape(endpoint),
                escape(status),
            );
        }

        let _ = writeln!(out, "# HELP {REQUEST_DURATION} Request duration");
        let _ = writeln!(out, "# TYPE {REQUEST_DURATION} histogram");
        for ((method, endpoint), histogram) in &self.durations {
            let labels = format!(
                "method=\"{}\",endpoint=\"{}\"",
                escape(method),
                escape(endpoint)
            );
            let mut cumulative = 0;
            for (bound, count) in DURATION_BUCKETS.iter().zip(&histogram.buckets) {
                cumulative += count;
                let _ = writeln!(
                    out,
                    "{REQUEST_DURATION}_bucket{{{labels},le=\"{bound}\"}} {cumulative}"
                );
            }
            let _ = writeln!(
                out,
                "{REQUEST_DURATION}_bucket{{{labels},le=\"+Inf\"}} {}",
                histogram.count
            );
            let _ = writeln!(out, "{REQUEST_DURATION}_sum{{{labels}}} {}", histogram.sum);
            let _ = writeln!(out, "{REQUEST_DURATION}_count{{{labels}}} {}", histogram.count);
        }

        out
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Middleware recording one counter increment and one latency observation per
/// request. `endpoint` is the matched route template, empty when nothing matched.
pub async fn track_requests(
    State(metrics): State<SharedMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();

    let response = next.run(req).await;

    let status = response.status().canonical_reason().unwrap_or("");
    metrics
        .write()
        .await
        .record(&method, &endpoint, status, start.elapsed());

    response
}
