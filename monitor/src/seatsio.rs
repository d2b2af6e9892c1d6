//! seats.io report client.
//!
//! Calls the "by category label" event report:
//!
//! ```text
//! GET {base_url}/reports/events/{event_key}/byCategoryLabel
//! Authorization: Basic base64("{secret_key}:")
//! ```
//!
//! The body maps each category label to the list of objects in that
//! category. Counts are summed per label and labels keep the order the
//! service returned them in.

use reqwest::{Client, StatusCode, Url};
use seatwatch_core::availability::EventKey;
use seatwatch_core::report::{AvailabilityReportClient, CategoryReport, ReportError, ReportResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

/// EU region API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api-eu.seatsio.net";

/// One object in a category as reported by seats.io
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportItem {
    #[serde(default)]
    num_booked: Option<u64>,
    #[serde(default)]
    num_held: Option<u64>,
    #[serde(default)]
    capacity: Option<u64>,
}

/// seats.io client for event reports.
#[derive(Clone)]
pub struct SeatsioReportClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl SeatsioReportClient {
    /// Creates a client for the EU region
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Uses another region or a test server
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Report URL for `key`, with the key percent-encoded as one path segment
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Unavailable`] if the base URL is not a valid
    /// http(s) URL.
    pub fn report_url(&self, key: &EventKey) -> Result<Url, ReportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ReportError::Unavailable(format!("invalid base url: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| ReportError::Unavailable("invalid base url".to_string()))?
            .pop_if_empty()
            .extend(["reports", "events", key.as_str(), "byCategoryLabel"]);

        Ok(url)
    }

    async fn request(&self, key: &EventKey) -> ReportResult {
        let url = self.report_url(key)?;
        tracing::debug!(event_key = %key, %url, "Requesting category report");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| ReportError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ReportError::Unavailable(e.to_string()))?;
                decode_category_report(&body)
            },
            StatusCode::NOT_FOUND => Err(ReportError::UnknownEvent(key.clone())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ReportError::Unavailable(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body.trim()
                )))
            },
        }
    }
}

impl AvailabilityReportClient for SeatsioReportClient {
    fn fetch_report(
        &self,
        key: &EventKey,
    ) -> Pin<Box<dyn Future<Output = ReportResult> + Send + '_>> {
        let key = key.clone();
        Box::pin(async move { self.request(&key).await })
    }
}

/// Decodes a "by category label" report body.
///
/// A count is `None` only when no object in the category reports it.
///
/// # Errors
///
/// Returns [`ReportError::Malformed`] if the body is not an object of arrays
/// of report objects.
pub fn decode_category_report(body: &str) -> ReportResult {
    let labels: Map<String, Value> =
        serde_json::from_str(body).map_err(|e| ReportError::Malformed(e.to_string()))?;

    labels
        .into_iter()
        .map(|(category, items)| {
            let items: Vec<ReportItem> = serde_json::from_value(items)
                .map_err(|e| ReportError::Malformed(format!("category '{category}': {e}")))?;

            Ok(CategoryReport {
                booked: sum(items.iter().map(|item| item.num_booked)),
                held: sum(items.iter().map(|item| item.num_held)),
                capacity: sum(items.iter().map(|item| item.capacity)),
                category,
            })
        })
        .collect()
}

fn sum(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values
        .flatten()
        .fold(None, |total, value| Some(total.unwrap_or(0).saturating_add(value)))
}
