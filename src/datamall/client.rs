//! HTTP client for the DataMall incident dataset.
//!
//! Uses reqwest with the `AccountKey` header. The dataset answers with
//! `{ "odata.metadata": ..., "value": [ ... ] }`; anything without `value`
//! (maintenance pages, auth errors rendered as JSON) is a fetch failure.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FeedError;
use crate::incident::RawIncident;
use crate::poller::IncidentFeed;

const DATAMALL_INCIDENTS_URL: &str =
    "http://datamall2.mytransport.sg/ltaodataservice/TrafficIncidents";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DataMallClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl DataMallClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_url(api_key, DATAMALL_INCIDENTS_URL)
    }

    pub fn with_url(api_key: &str, url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("DataMall: falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            api_key: api_key.to_string(),
            url: url.to_string(),
        }
    }

    /// Fetch the current incident list.
    pub async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, FeedError> {
        let resp = self
            .client
            .get(&self.url)
            .header("AccountKey", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status { status, body });
        }

        let json: serde_json::Value = resp.json().await?;
        parse_incidents(json)
    }
}

#[async_trait]
impl IncidentFeed for DataMallClient {
    async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, FeedError> {
        DataMallClient::fetch_incidents(self).await
    }
}

/// Pull the record list out of a DataMall response body.
pub fn parse_incidents(mut json: serde_json::Value) -> Result<Vec<RawIncident>, FeedError> {
    let value = json
        .get_mut("value")
        .map(serde_json::Value::take)
        .ok_or(FeedError::MissingData("value"))?;
    Ok(serde_json::from_value(value)?)
}
