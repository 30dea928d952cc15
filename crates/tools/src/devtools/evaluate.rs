//! Script evaluation in a target's execution context.
//!
//! Thin layer over `Runtime.evaluate` that separates in-page exceptions
//! (`Evaluation`) from transport/protocol failures (`Protocol`), plus the
//! extraction scripts that produce the `PageContent` payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabscout_core::{Error, Result};

use super::session::ProtocolSession;

/// One hyperlink pulled from a page.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PageLink {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
}

/// Content extracted from one page. Open shape: only `title`, `url` and
/// `text` are relied upon downstream.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub links: Vec<PageLink>,
}

/// Extracts title, URL, main-content text and the first 20 links.
pub const EXTRACT_CONTENT_JS: &str = r#"
(function() {
    const main = document.querySelector('main, article, .content, [role="main"]') || document.body;
    return {
        title: document.title,
        url: window.location.href,
        text: main.innerText || main.textContent,
        links: Array.from(document.querySelectorAll('a[href]')).slice(0, 20).map(a => ({
            text: a.innerText.trim(),
            url: a.href
        }))
    };
})();
"#;

/// Readability-style extraction: strips chrome (nav, footer, ads), walks a
/// priority list of main-content selectors, and normalizes whitespace.
pub const CLEAN_TEXT_JS: &str = r#"
(function() {
    const excludeSelectors = 'script, style, nav, footer, .ad, .advertisement, .sidebar, .menu, .header, [class*="nav"], [class*="sidebar"], [id*="sidebar"]';
    const clone = document.cloneNode(true);
    clone.querySelectorAll(excludeSelectors).forEach(el => el.remove());

    const selectors = [
        'main', 'article', '[role="main"]', '.main-content', '.post-content',
        '.entry-content', '.article-content', '.content', '#content', '.post', 'body'
    ];

    let main = null;
    for (const selector of selectors) {
        main = clone.querySelector(selector);
        if (main && main.innerText && main.innerText.length > 100) {
            break;
        }
    }
    if (!main) main = clone.body;

    const text = main.innerText || main.textContent;
    return text
        .replace(/\n\s*\n\s*\n+/g, '\n\n')
        .replace(/[ \t]+/g, ' ')
        .trim();
})();
"#;

/// Hyperlinks with visible text, capped at 100.
pub const EXTRACT_LINKS_JS: &str = r#"
Array.from(document.querySelectorAll('a[href]'))
    .map(a => ({ text: a.innerText.trim(), url: a.href }))
    .filter(link => link.text && link.url)
    .slice(0, 100);
"#;

/// Image sources with dimensions, capped at 50.
pub const EXTRACT_IMAGES_JS: &str = r#"
Array.from(document.querySelectorAll('img[src]'))
    .map(img => ({ alt: img.alt, src: img.src, width: img.width, height: img.height }))
    .slice(0, 50);
"#;

/// Unique email addresses in the page text.
pub const EXTRACT_EMAILS_JS: &str = r#"
(function() {
    const text = document.body.innerText;
    const emailRegex = /[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}/g;
    const emails = text.match(emailRegex) || [];
    return [...new Set(emails)];
})();
"#;

/// Unique price mentions, multi-currency.
pub const EXTRACT_PRICES_JS: &str = r#"
(function() {
    const text = document.body.innerText;
    const currencyRegex = /[$€£¥₹₩₽]\s?\d+(?:,\d{3})*(?:[.,]\d{2})?|R\$\s?\d+(?:,\d{3})*(?:\.\d{2})?|CN¥\s?\d+/g;
    const prices = text.match(currencyRegex) || [];
    return [...new Set(prices)];
})();
"#;

/// Header row and up to 10 body rows for the first 5 tables.
pub const EXTRACT_TABLES_JS: &str = r#"
Array.from(document.querySelectorAll('table')).slice(0, 5).map(table => {
    const headers = Array.from(table.querySelectorAll('th')).map(th => th.innerText.trim());
    const rows = Array.from(table.querySelectorAll('tr')).slice(1).map(tr =>
        Array.from(tr.querySelectorAll('td')).map(td => td.innerText.trim())
    );
    return { headers, rows: rows.slice(0, 10) };
});
"#;

/// Script summarizing the first element matching `selector`: tag, id,
/// classes, attributes, text snippet, child count. Returns null when
/// nothing matches. The selector is embedded as a JSON string literal so
/// arbitrary quoting cannot break out of the script.
pub fn inspect_element_js(selector: &str) -> String {
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"
(function() {{
    const el = document.querySelector({quoted});
    if (!el) return null;
    const attrs = {{}};
    for (const a of el.attributes) attrs[a.name] = a.value;
    return {{
        tag: el.tagName.toLowerCase(),
        id: el.id,
        classes: Array.from(el.classList),
        attributes: attrs,
        text: (el.innerText || '').trim().slice(0, 200),
        childCount: el.children.length
    }};
}})();
"#
    )
}

/// Evaluate an expression in the target and return the unwrapped value.
pub async fn evaluate(session: &mut ProtocolSession, expression: &str) -> Result<Value> {
    let raw = session
        .send(
            "Runtime.evaluate",
            json!({ "expression": expression, "returnByValue": true }),
        )
        .await?;
    unwrap_evaluation(raw)
}

/// Pull the standard content payload out of the connected target.
pub async fn extract_page_content(session: &mut ProtocolSession) -> Result<PageContent> {
    let value = evaluate(session, EXTRACT_CONTENT_JS).await?;
    let content: PageContent = serde_json::from_value(value)?;
    Ok(content)
}

/// Separate a successful evaluation from an in-page exception.
///
/// A present `exceptionDetails` means the script ran and threw; that is an
/// `Evaluation` error carrying the exception's display text, not a
/// protocol failure.
pub fn unwrap_evaluation(raw: Value) -> Result<Value> {
    if let Some(details) = raw.get("exceptionDetails") {
        let text = details
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .or_else(|| details.get("text").and_then(Value::as_str))
            .unwrap_or("unknown JavaScript error");
        return Err(Error::Evaluation(text.to_string()));
    }

    Ok(raw
        .get("result")
        .and_then(|r| r.get("value"))
        .cloned()
        .unwrap_or(Value::Null))
}
