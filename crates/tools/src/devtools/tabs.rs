//! Discovery of inspectable browser targets.
//!
//! Chrome-family browsers expose an HTTP endpoint (`/json`) listing every
//! debuggable target together with its per-target WebSocket URL.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tabscout_core::{DevtoolsConfig, Error, Result};
use tracing::debug;

/// Immutable snapshot of one inspectable target from a discovery call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescriptor {
    #[serde(default)]
    pub id: String,
    /// Target type as reported by the browser ("page", "iframe",
    /// "service_worker", ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Per-target duplex endpoint. Absent for targets that already have
    /// a debugger attached.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub ws_url: Option<String>,
}

impl TargetDescriptor {
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// HTTP-based discovery and filtering of inspectable targets.
pub struct TabDirectory {
    client: reqwest::Client,
    discovery_url: String,
}

impl TabDirectory {
    pub fn new(config: &DevtoolsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            discovery_url: config.discovery_url(),
        }
    }

    /// List all open targets in discovery order.
    pub async fn list_targets(&self) -> Result<Vec<TargetDescriptor>> {
        let resp = self
            .client
            .get(&self.discovery_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                Error::Discovery(format!("failed to reach {}: {}", self.discovery_url, e))
            })?;

        if !resp.status().is_success() {
            return Err(Error::Discovery(format!(
                "{} returned {}",
                self.discovery_url,
                resp.status()
            )));
        }

        let targets: Vec<TargetDescriptor> = resp
            .json()
            .await
            .map_err(|e| Error::Discovery(format!("malformed target list: {}", e)))?;

        debug!(count = targets.len(), "discovered targets");
        Ok(targets)
    }

    /// List only page targets (tabs), skipping iframes and workers.
    pub async fn list_pages(&self) -> Result<Vec<TargetDescriptor>> {
        Ok(self
            .list_targets()
            .await?
            .into_iter()
            .filter(TargetDescriptor::is_page)
            .collect())
    }

    /// Resolve a single target by index, URL pattern, or title pattern.
    pub async fn resolve_target(
        &self,
        url_pattern: Option<&str>,
        title_pattern: Option<&str>,
        index: Option<usize>,
    ) -> Result<TargetDescriptor> {
        let targets = self.list_targets().await?;
        select_target(targets, url_pattern, title_pattern, index)
    }
}

/// Pick one target from a discovery snapshot.
///
/// Exactly one strategy applies per call: an explicit index wins, then a
/// case-insensitive URL substring, then a case-insensitive title substring,
/// then the first target. A given strategy that matches nothing is
/// `NotFound`; the remaining strategies are not tried.
pub fn select_target(
    targets: Vec<TargetDescriptor>,
    url_pattern: Option<&str>,
    title_pattern: Option<&str>,
    index: Option<usize>,
) -> Result<TargetDescriptor> {
    if let Some(index) = index {
        return targets
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::NotFound(format!("no target at index {}", index)));
    }

    if let Some(pattern) = url_pattern {
        let pattern = pattern.to_lowercase();
        return targets
            .into_iter()
            .find(|t| t.url.to_lowercase().contains(&pattern))
            .ok_or_else(|| Error::NotFound(format!("no target with URL matching '{}'", pattern)));
    }

    if let Some(pattern) = title_pattern {
        let pattern = pattern.to_lowercase();
        return targets
            .into_iter()
            .find(|t| t.title.to_lowercase().contains(&pattern))
            .ok_or_else(|| {
                Error::NotFound(format!("no target with title matching '{}'", pattern))
            });
    }

    targets
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound("no targets open".to_string()))
}

/// Find all page targets matching any of the given URL/title patterns,
/// deduplicated, in discovery order.
pub fn match_patterns(targets: &[TargetDescriptor], patterns: &[String]) -> Vec<TargetDescriptor> {
    let mut matched: Vec<TargetDescriptor> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.to_lowercase();
        for target in targets {
            if target.url.to_lowercase().contains(&pattern)
                || target.title.to_lowercase().contains(&pattern)
            {
                if !matched.iter().any(|m| m.id == target.id) {
                    matched.push(target.clone());
                }
            }
        }
    }
    matched
}
