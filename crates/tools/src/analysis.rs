//! Text analysis over extracted page content.
//!
//! Keyword extraction, sentiment scoring, source-credibility scoring, and
//! composite ranking for comparison and fact-check reports. Every function
//! here is pure and total over string input; malformed URLs degrade to a
//! neutral score instead of failing.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::devtools::PageContent;

/// Tokens shorter than this never count as keywords.
const MIN_KEYWORD_LEN: usize = 4;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "also", "because", "been", "before", "being",
        "below", "between", "both", "could", "does", "doing", "during", "each", "from",
        "have", "having", "here", "into", "just", "more", "most", "once", "only", "onto",
        "other", "over", "same", "should", "some", "such", "than", "that", "their", "them",
        "then", "there", "these", "they", "this", "those", "through", "under", "until",
        "very", "were", "what", "when", "where", "which", "while", "will", "with", "would",
        "your", "yours",
    ]
    .into_iter()
    .collect()
});

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "accurate", "benefit", "benefits", "best", "better", "breakthrough", "effective",
        "excellent", "gain", "gains", "good", "great", "growth", "improve", "improved",
        "improvement", "positive", "promising", "reliable", "robust", "strong", "succeed",
        "success", "successful", "win", "wins",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "concern", "concerns", "decline", "fail", "failed", "fails", "failure",
        "false", "flaw", "flaws", "inaccurate", "ineffective", "loss", "losses",
        "misleading", "negative", "poor", "problem", "problems", "risk", "risks",
        "unreliable", "weak", "worse", "worst",
    ]
    .into_iter()
    .collect()
});

/// Trusted-domain substrings with their fixed trust values. First match
/// wins, so more specific entries come before generic ones.
const TRUSTED_DOMAINS: &[(&str, f64)] = &[
    ("nih.gov", 0.95),
    ("nature.com", 0.95),
    ("sciencedirect.com", 0.9),
    ("wikipedia.org", 0.9),
    ("britannica.com", 0.9),
    ("rust-lang.org", 0.9),
    (".gov", 0.9),
    ("arxiv.org", 0.85),
    ("ieee.org", 0.85),
    ("acm.org", 0.85),
    ("reuters.com", 0.85),
    ("apnews.com", 0.85),
    ("mozilla.org", 0.85),
    (".edu", 0.85),
    ("bbc.co", 0.8),
    ("github.com", 0.7),
    ("stackoverflow.com", 0.7),
];

/// URL surface patterns nudging the score up or down.
const POSITIVE_URL_KEYWORDS: &[&str] = &[
    "research", "study", "journal", "official", "docs", "documentation",
];
const NEGATIVE_URL_KEYWORDS: &[&str] = &[
    "blog", "forum", "opinion", "rumor", "gossip", "clickbait", "sponsored",
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Top `top_n` keywords by descending frequency, ties broken by first
/// occurrence. Tokens are case-folded, at least four characters long, and
/// not stop words.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text) {
        if token.chars().count() < MIN_KEYWORD_LEN || STOP_WORDS.contains(token.as_str()) {
            continue;
        }
        if !counts.contains_key(&token) {
            order.push(token.clone());
        }
        *counts.entry(token).or_insert(0) += 1;
    }

    // Stable sort keeps first-occurrence order among equal counts.
    let mut ranked = order;
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
    ranked.truncate(top_n);
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// In [0, 1], rounded to two decimals.
    pub confidence: f64,
    pub positive_hits: usize,
    pub negative_hits: usize,
}

/// Score text against the fixed positive/negative lexicons. Hits count
/// with multiplicity. No hits at all reads as neutral at 0.5; a tie reads
/// as neutral with confidence |pos - neg| / (pos + neg).
pub fn score_sentiment(text: &str) -> SentimentResult {
    let mut positive_hits = 0usize;
    let mut negative_hits = 0usize;

    for token in tokenize(text) {
        if POSITIVE_WORDS.contains(token.as_str()) {
            positive_hits += 1;
        } else if NEGATIVE_WORDS.contains(token.as_str()) {
            negative_hits += 1;
        }
    }

    if positive_hits == 0 && negative_hits == 0 {
        return SentimentResult {
            label: SentimentLabel::Neutral,
            confidence: 0.5,
            positive_hits,
            negative_hits,
        };
    }

    let label = match positive_hits.cmp(&negative_hits) {
        Ordering::Greater => SentimentLabel::Positive,
        Ordering::Less => SentimentLabel::Negative,
        Ordering::Equal => SentimentLabel::Neutral,
    };
    let total = (positive_hits + negative_hits) as f64;
    let confidence = (positive_hits as f64 - negative_hits as f64).abs() / total;

    SentimentResult {
        label,
        confidence: (confidence * 100.0).round() / 100.0,
        positive_hits,
        negative_hits,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityBand {
    High,
    Medium,
    Low,
}

impl CredibilityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CredibilityScore {
    /// Clamped to [0, 1].
    pub score: f64,
    pub band: CredibilityBand,
    pub domain: String,
}

/// Heuristic trust estimate from a URL's domain and surface patterns.
///
/// Base 0.5; a trusted-domain substring replaces the base with its fixed
/// trust value; each positive URL keyword adds 0.05 (capped at 1.0), each
/// negative keyword subtracts 0.10 (floored at 0.0), and a secure scheme
/// adds 0.05. Malformed URLs degrade to 0.5 with the raw input as domain.
pub fn score_credibility(url: &str) -> CredibilityScore {
    let parsed = match url::Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => parsed,
        _ => {
            return CredibilityScore {
                score: 0.5,
                band: CredibilityBand::Medium,
                domain: url.to_string(),
            };
        }
    };

    let domain = parsed.host_str().unwrap_or_default().to_lowercase();
    let url_lower = url.to_lowercase();
    let mut score = 0.5f64;

    for (substring, trust) in TRUSTED_DOMAINS {
        if domain.contains(substring) {
            score = *trust;
            break;
        }
    }

    for keyword in POSITIVE_URL_KEYWORDS {
        if url_lower.contains(keyword) {
            score = (score + 0.05).min(1.0);
        }
    }
    for keyword in NEGATIVE_URL_KEYWORDS {
        if url_lower.contains(keyword) {
            score = (score - 0.10).max(0.0);
        }
    }
    if parsed.scheme() == "https" {
        score = (score + 0.05).min(1.0);
    }

    let score = score.clamp(0.0, 1.0);
    CredibilityScore {
        score,
        band: CredibilityBand::from_score(score),
        domain,
    }
}

/// Keywords of a claim: case-folded tokens longer than three characters.
pub fn claim_keywords(claim: &str) -> Vec<String> {
    tokenize(claim)
        .into_iter()
        .filter(|t| t.chars().count() > 3)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedSource {
    pub title: String,
    pub url: String,
    pub credibility: CredibilityScore,
    /// Fraction of claim keywords found in the source text. Zero in
    /// comparison mode.
    pub overlap: f64,
    /// Sort key: credibility alone for comparison, a 0.6/0.4 blend of
    /// credibility and keyword overlap for fact-checking.
    pub combined: f64,
}

/// Rank cached sources for a report.
///
/// Without claim keywords, sources sort descending by credibility. With
/// them, only sources whose text contains at least half of the keywords
/// survive, sorted descending by `0.6 * credibility + 0.4 * overlap`.
pub fn rank_sources(entries: &[PageContent], claim_keywords: Option<&[String]>) -> Vec<RankedSource> {
    let mut ranked: Vec<RankedSource> = entries
        .iter()
        .filter_map(|entry| {
            let credibility = score_credibility(&entry.url);
            let (overlap, combined) = match claim_keywords {
                None => (0.0, credibility.score),
                Some(keywords) => {
                    let text = entry.text.to_lowercase();
                    let matched = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
                    if matched * 2 < keywords.len() {
                        return None;
                    }
                    let overlap = if keywords.is_empty() {
                        0.0
                    } else {
                        matched as f64 / keywords.len() as f64
                    };
                    (overlap, 0.6 * credibility.score + 0.4 * overlap)
                }
            };
            Some(RankedSource {
                title: entry.title.clone(),
                url: entry.url.clone(),
                credibility,
                overlap,
                combined,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.combined.partial_cmp(&a.combined).unwrap_or(Ordering::Equal));
    ranked
}
