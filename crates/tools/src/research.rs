//! Multi-source research over open browser tabs.
//!
//! Pulls content from tabs matched by URL/title patterns (through the
//! content cache), then builds comparison, fact-check, timeline, or
//! reference reports with the analysis pipeline.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use tabscout_core::{Error, Result};
use tracing::{debug, warn};

use crate::analysis::{claim_keywords, extract_keywords, rank_sources, score_sentiment};
use crate::devtools::{extract_page_content, PageContent, ProtocolSession, TabDirectory, TargetDescriptor};
use crate::devtools::tabs::match_patterns;
use crate::{safe_truncate, Tool, ToolContext, ToolSchema};

const PREVIEW_CHARS: usize = 500;
const KEYWORDS_PER_SOURCE: usize = 5;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());
static MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(19\d{2}|20\d{2})\b",
    )
    .unwrap()
});

pub struct ResearchTool;

#[async_trait]
impl Tool for ResearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "research",
            description: "Multi-source research over open browser tabs. Compare sources, fact-check a claim, build a chronological overview, or extract references and links.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["compare", "fact_check", "timeline", "references"],
                        "description": "Action: compare (rank and analyze sources), fact_check (verify a claim), timeline (dates mentioned per source), references (links per source)"
                    },
                    "patterns": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "URL or title patterns selecting tabs (e.g. ['github', 'docs']). Empty uses the first open tabs."
                    },
                    "claim": {
                        "type": "string",
                        "description": "For fact_check: the claim to verify across sources"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("");
        if !["compare", "fact_check", "timeline", "references"].contains(&action) {
            return Err(Error::Validation(format!(
                "Invalid action '{}'. Valid: compare, fact_check, timeline, references",
                action
            )));
        }
        if action == "fact_check"
            && params
                .get("claim")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .is_none()
        {
            return Err(Error::Validation(
                "'claim' is required for the fact_check action".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("compare");
        let patterns: Vec<String> = params
            .get("patterns")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let sources = gather_sources(&ctx, &patterns).await?;

        match action {
            "compare" => Ok(report_compare(&sources)),
            "fact_check" => {
                let claim = params["claim"].as_str().unwrap();
                Ok(report_fact_check(&sources, claim))
            }
            "timeline" => Ok(report_timeline(&sources)),
            _ => Ok(report_references(&sources)),
        }
    }
}

/// Resolve tabs for the given patterns and pull their content, going
/// through the cache. Tabs that fail to yield content are skipped.
async fn gather_sources(ctx: &ToolContext, patterns: &[String]) -> Result<Vec<PageContent>> {
    let directory = TabDirectory::new(&ctx.config.devtools);
    let pages = directory.list_pages().await?;

    let mut tabs = if patterns.is_empty() {
        pages
    } else {
        match_patterns(&pages, patterns)
    };
    tabs.truncate(ctx.config.research.max_sources);

    if tabs.is_empty() {
        return Err(Error::NotFound(
            "no open tabs matched the given patterns".to_string(),
        ));
    }

    let mut sources = Vec::with_capacity(tabs.len());
    for tab in &tabs {
        match tab_content(ctx, tab).await {
            Ok(content) => sources.push(content),
            Err(e) => warn!(url = %tab.url, error = %e, "skipping tab"),
        }
    }

    if sources.is_empty() {
        return Err(Error::Tool(
            "no content could be extracted from the matched tabs".to_string(),
        ));
    }
    Ok(sources)
}

/// Content for one tab, served from the cache when fresh. The session is
/// closed on every path before the extraction outcome is inspected.
async fn tab_content(ctx: &ToolContext, tab: &TargetDescriptor) -> Result<PageContent> {
    if !tab.url.is_empty() {
        if let Some(hit) = ctx.cache.get(&tab.url) {
            debug!(url = %tab.url, "using cached content");
            return Ok(hit);
        }
    }

    let mut session = ProtocolSession::open(tab, &ctx.config.devtools).await?;
    let extracted = extract_page_content(&mut session).await;
    session.close().await;
    let content = extracted?;

    if !tab.url.is_empty() {
        ctx.cache.put(&tab.url, content.clone());
    }
    Ok(content)
}

fn report_compare(sources: &[PageContent]) -> Value {
    let by_url: HashMap<&str, &PageContent> =
        sources.iter().map(|c| (c.url.as_str(), c)).collect();

    let ranked: Vec<Value> = rank_sources(sources, None)
        .into_iter()
        .map(|r| {
            let content = by_url[r.url.as_str()];
            json!({
                "title": r.title,
                "url": r.url,
                "credibility": r.credibility,
                "sentiment": score_sentiment(&content.text),
                "keywords": extract_keywords(&content.text, KEYWORDS_PER_SOURCE),
                "preview": safe_truncate(&content.text, PREVIEW_CHARS),
            })
        })
        .collect();

    json!({ "action": "compare", "count": ranked.len(), "sources": ranked })
}

fn report_fact_check(sources: &[PageContent], claim: &str) -> Value {
    let keywords = claim_keywords(claim);
    let matches: Vec<Value> = rank_sources(sources, Some(&keywords))
        .into_iter()
        .map(|r| {
            json!({
                "title": r.title,
                "url": r.url,
                "credibility": r.credibility,
                "overlap": r.overlap,
                "combined": r.combined,
            })
        })
        .collect();

    json!({
        "action": "fact_check",
        "claim": claim,
        "keywords": keywords,
        "count": matches.len(),
        "matches": matches,
        "note": "keyword-based matching; review sources manually for accuracy",
    })
}

fn report_timeline(sources: &[PageContent]) -> Value {
    let entries: Vec<Value> = sources
        .iter()
        .filter_map(|content| {
            let (years, month_years) = extract_dates(&content.text);
            if years.is_empty() && month_years.is_empty() {
                return None;
            }
            Some(json!({
                "title": content.title,
                "url": content.url,
                "years": years,
                "dates": month_years,
            }))
        })
        .collect();

    json!({ "action": "timeline", "count": entries.len(), "sources": entries })
}

fn report_references(sources: &[PageContent]) -> Value {
    let mut total_links = 0usize;
    let entries: Vec<Value> = sources
        .iter()
        .map(|content| {
            total_links += content.links.len();
            json!({
                "title": content.title,
                "url": content.url,
                "links": content.links,
            })
        })
        .collect();

    json!({
        "action": "references",
        "count": entries.len(),
        "total_links": total_links,
        "sources": entries,
    })
}

/// Years and Month-Year mentions in a text, deduplicated and capped.
fn extract_dates(text: &str) -> (Vec<String>, Vec<String>) {
    let mut years: Vec<String> = Vec::new();
    for m in YEAR_RE.find_iter(text) {
        let year = m.as_str().to_string();
        if !years.contains(&year) {
            years.push(year);
        }
    }
    years.sort();
    years.truncate(10);

    let mut month_years: Vec<String> = Vec::new();
    for caps in MONTH_YEAR_RE.captures_iter(text) {
        let date = format!("{} {}", &caps[1], &caps[2]);
        if !month_years.contains(&date) {
            month_years.push(date);
        }
    }
    month_years.truncate(5);

    (years, month_years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = ResearchTool;
        assert_eq!(tool.schema().name, "research");
    }

    #[test]
    fn test_validate() {
        let tool = ResearchTool;
        assert!(tool.validate(&json!({"action": "compare"})).is_ok());
        assert!(tool
            .validate(&json!({"action": "fact_check", "claim": "rust is fast"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "fact_check"})).is_err());
        assert!(tool.validate(&json!({"action": "fact_check", "claim": "  "})).is_err());
        assert!(tool.validate(&json!({"action": "summarize"})).is_err());
    }

    #[test]
    fn test_extract_dates() {
        let text = "Founded in 1998, rewritten in 2015. Shipped March 2015 and again March 2015, then October 2021.";
        let (years, dates) = extract_dates(text);
        assert_eq!(years, vec!["1998", "2015", "2021"]);
        assert_eq!(dates, vec!["March 2015", "October 2021"]);
    }

    #[test]
    fn test_extract_dates_ignores_other_numbers() {
        let (years, dates) = extract_dates("port 9222, 300 seconds, build 1847");
        assert!(years.is_empty());
        assert!(dates.is_empty());
    }

    fn source(title: &str, url: &str, text: &str) -> PageContent {
        PageContent {
            title: title.to_string(),
            url: url.to_string(),
            text: text.to_string(),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_report_compare_ranks_by_credibility() {
        let sources = [
            source("Forum", "http://forum.example.com/thread", "great discussion"),
            source("Wiki", "https://en.wikipedia.org/wiki/Rust", "reference text"),
        ];
        let report = report_compare(&sources);
        assert_eq!(report["count"], 2);
        assert_eq!(report["sources"][0]["title"], "Wiki");
        assert_eq!(report["sources"][0]["credibility"]["band"], "high");
    }

    #[test]
    fn test_report_fact_check_shape() {
        let sources = [source(
            "Wiki",
            "https://en.wikipedia.org/wiki/Fox",
            "the quick brown fox",
        )];
        let report = report_fact_check(&sources, "the quick brown fox");
        assert_eq!(report["claim"], "the quick brown fox");
        assert_eq!(report["keywords"], json!(["quick", "brown"]));
        assert_eq!(report["count"], 1);
        assert_eq!(report["matches"][0]["overlap"], 1.0);
    }
}
