use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::snapshot::{parse_batch, JobId, StatsBatch};

/// Where fresh snapshots come from: one batched request per poll cycle.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_stats(&self, ids: &[JobId]) -> Result<StatsBatch>;
}

pub fn join_ids(ids: &[JobId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

/// Live-stats endpoint over HTTP.
pub struct HttpStatsSource {
    client: Client,
    endpoint: Url,
}

impl HttpStatsSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let base = Url::parse(&cfg.base_url).with_context(|| format!("invalid LIVE_BASE_URL {}", cfg.base_url))?;
        let endpoint = base
            .join(&cfg.stats_path)
            .with_context(|| format!("invalid LIVE_STATS_PATH {}", cfg.stats_path))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self { client, endpoint })
    }

    pub fn request_url(&self, ids: &[JobId]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("ids", &join_ids(ids));
        url
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch_stats(&self, ids: &[JobId]) -> Result<StatsBatch> {
        let resp = self.client.get(self.request_url(ids)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("live-stats API error: {}", status.as_u16()));
        }
        let body = resp.text().await?;
        parse_batch(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[3, 1, 2]), "3,1,2");
        assert_eq!(join_ids(&[]), "");
    }

    #[test]
    fn test_request_url_carries_id_list() {
        let cfg = Config { base_url: "http://bench.local:8000".into(), ..Default::default() };
        let src = HttpStatsSource::new(&cfg).unwrap();
        let url = src.request_url(&[12, 7]);
        assert_eq!(url.path(), "/api/live-stats/");
        let ids: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(ids, vec![("ids".to_string(), "12,7".to_string())]);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let cfg = Config { base_url: "not a url".into(), ..Default::default() };
        assert!(HttpStatsSource::new(&cfg).is_err());
    }
}
