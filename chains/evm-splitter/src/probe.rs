//! Concurrent latency probe over candidate RPC endpoints.

use anyhow::Result;
use clap::ValueEnum;
use ethers::prelude::*;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

const RECOMMENDED_NODES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub url: String,
    pub response_time_ms: f64,
    pub block_height: u64,
}

/// Probes every endpoint by reading its latest block number.
pub async fn probe_nodes(endpoints: &[String], timeout: Duration) -> Vec<NodeResult> {
    probe_with(endpoints, timeout, fetch_block_height).await
}

/// Runs `check` against every endpoint concurrently, each under its own
/// timeout. Failed or timed-out endpoints are dropped; the rest come back
/// fastest first.
pub async fn probe_with<F, Fut>(endpoints: &[String], timeout: Duration, check: F) -> Vec<NodeResult>
where
    F: Fn(String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<u64>> + Send + 'static,
{
    let mut set = JoinSet::new();

    for url in endpoints {
        let url = url.clone();
        let check = check.clone();
        set.spawn(async move {
            let start = Instant::now();
            match tokio::time::timeout(timeout, check(url.clone())).await {
                Ok(Ok(block_height)) => Some(NodeResult {
                    url,
                    response_time_ms: start.elapsed().as_micros() as f64 / 1000.0,
                    block_height,
                }),
                Ok(Err(e)) => {
                    debug!("{} failed: {}", url, e);
                    None
                }
                Err(_) => {
                    debug!("{} timed out after {:?}", url, timeout);
                    None
                }
            }
        });
    }

    let mut results = Vec::with_capacity(endpoints.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => warn!("Probe task panicked: {}", e),
        }
    }

    results.sort_by(|a, b| a.response_time_ms.total_cmp(&b.response_time_ms));
    results
}

async fn fetch_block_height(url: String) -> Result<u64> {
    let provider = Provider::<Http>::try_from(url.as_str())?;
    Ok(provider.get_block_number().await?.as_u64())
}

pub fn render(results: &[NodeResult], format: OutputFormat, stats: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(results, stats)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
        OutputFormat::Csv => render_csv(results),
    }
}

pub fn render_text(results: &[NodeResult], stats: bool) -> String {
    if results.is_empty() {
        return "No healthy nodes found".to_string();
    }

    let mut out = String::from("\nNode Response Times (sorted by speed):\n");
    out.push_str(&"-".repeat(80));
    out.push('\n');
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:2}. {:<45} {:8.2}ms  Block: {}\n",
            i + 1,
            r.url,
            r.response_time_ms,
            r.block_height
        ));
    }

    if stats {
        let total: f64 = results.iter().map(|r| r.response_time_ms).sum();
        let fastest = &results[0];
        let slowest = &results[results.len() - 1];

        out.push_str("\nStatistics:\n");
        out.push_str(&format!("Average Response Time: {:.2}ms\n", total / results.len() as f64));
        out.push_str(&format!("Fastest Node: {} ({:.2}ms)\n", fastest.url, fastest.response_time_ms));
        out.push_str(&format!("Slowest Node: {} ({:.2}ms)\n", slowest.url, slowest.response_time_ms));

        out.push_str(&format!("\nRecommended Nodes (Top {}):\n", RECOMMENDED_NODES));
        for (i, r) in results.iter().take(RECOMMENDED_NODES).enumerate() {
            out.push_str(&format!("{}. {} ({:.2}ms)\n", i + 1, r.url, r.response_time_ms));
        }
    }

    out
}

pub fn render_csv(results: &[NodeResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Rank", "URL", "Response Time (ms)", "Block Height"])?;
    for (i, r) in results.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            r.url.clone(),
            format!("{:.2}", r.response_time_ms),
            r.block_height.to_string(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(url: &str, ms: f64, block: u64) -> NodeResult {
        NodeResult {
            url: url.to_string(),
            response_time_ms: ms,
            block_height: block,
        }
    }

    async fn scripted(url: String) -> Result<u64> {
        match url.as_str() {
            "slow" => {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Ok(100)
            }
            "fast" => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(101)
            }
            "hung" => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(0)
            }
            _ => anyhow::bail!("connection refused"),
        }
    }

    #[tokio::test]
    async fn test_probe_sorts_and_drops_failures() {
        let endpoints: Vec<String> = ["slow", "broken", "fast", "hung"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let start = Instant::now();
        let results = probe_with(&endpoints, Duration::from_millis(300), scripted).await;

        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["fast", "slow"]);
        assert_eq!(results[0].block_height, 101);
        // Probes overlap; the hung endpoint is cut off by its timeout
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_empty_list() {
        assert!(probe_with(&[], Duration::from_millis(10), scripted).await.is_empty());
    }

    #[test]
    fn test_render_text_with_stats() {
        let results = vec![
            node("https://a", 10.0, 1),
            node("https://b", 20.0, 1),
            node("https://c", 30.0, 1),
            node("https://d", 40.0, 1),
        ];
        let text = render_text(&results, true);
        assert!(text.contains("Average Response Time: 25.00ms"));
        assert!(text.contains("Fastest Node: https://a (10.00ms)"));
        assert!(text.contains("Slowest Node: https://d (40.00ms)"));
        assert!(text.contains("3. https://c"));
        assert!(!text.contains("4. https://d ("));
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(render_text(&[], true), "No healthy nodes found");
    }

    #[test]
    fn test_render_csv_and_json() {
        let results = vec![node("https://a", 12.5, 77)];
        let csv = render(&results, OutputFormat::Csv, false).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Rank,URL,Response Time (ms),Block Height"));
        assert_eq!(lines.next(), Some("1,https://a,12.50,77"));

        let json = render(&results, OutputFormat::Json, false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["block_height"], 77);
    }
}
