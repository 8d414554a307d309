//! Scripted stats source for offline runs.
//!
//! Serves one canned response body per fetch, in order. A `null` in the
//! script stands for a failed request on that tick. Once the script runs
//! out every further fetch fails, which the poll loop treats like any other
//! network error.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use crate::snapshot::{parse_batch, JobId, StatsBatch};
use crate::source::StatsSource;

#[derive(Debug, Default)]
pub struct ReplayStatsSource {
    script: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<Vec<JobId>>>,
}

impl ReplayStatsSource {
    pub fn new(script: Vec<Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script from a JSON array: objects are response bodies, `null` is a
    /// failing tick.
    pub fn from_json(text: &str) -> Result<Self> {
        let steps: Vec<Value> = serde_json::from_str(text).context("replay script must be a JSON array")?;
        let script = steps
            .into_iter()
            .map(|step| match step {
                Value::Null => None,
                body => Some(body.to_string()),
            })
            .collect();
        Ok(Self::new(script))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read replay script {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Id lists of every fetch so far, in call order.
    pub fn requests(&self) -> Vec<Vec<JobId>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StatsSource for ReplayStatsSource {
    async fn fetch_stats(&self, ids: &[JobId]) -> Result<StatsBatch> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(ids.to_vec());
        }
        let step = self
            .script
            .lock()
            .map_err(|_| anyhow!("replay script lock poisoned"))?
            .pop_front();
        match step {
            Some(Some(body)) => parse_batch(&body),
            Some(None) => Err(anyhow!("scripted fetch failure")),
            None => Err(anyhow!("replay script exhausted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records_ids() {
        let src = ReplayStatsSource::from_json(
            r#"[{"stats":{}}, null, {"stats":{"1":{"games":2,"wins":1,"draws":1,"losses":0,
               "LL":0,"LD":0,"DD":1,"DW":0,"WW":0}}}]"#,
        )
        .unwrap();

        assert!(src.fetch_stats(&[1]).await.unwrap().is_empty());
        assert!(src.fetch_stats(&[1]).await.is_err());
        let batch = src.fetch_stats(&[1, 2]).await.unwrap();
        assert_eq!(batch.entries[0].1.games, 2);
        assert!(src.fetch_stats(&[1]).await.is_err());

        assert_eq!(src.requests(), vec![vec![1], vec![1], vec![1, 2], vec![1]]);
    }

    #[test]
    fn test_script_must_be_array() {
        assert!(ReplayStatsSource::from_json(r#"{"stats":{}}"#).is_err());
    }
}
