//! Status text preparation.
//!
//! Turns an [`Item`] into the text posted to the destination:
//!   1. optional removal of configured disclaimer boilerplate,
//!   2. expansion of shortlinks through a [`LinkResolver`],
//!   3. a footer pointing back at the source post.
//!
//! Link expansion never fails the whole preparation. A link that cannot be
//! resolved stays in the text as-is.

use std::collections::HashMap;
use std::sync::LazyLock;

use futures::future::join_all;
use regex::{Captures, Regex};
use tracing::{debug, error};

use crate::contract::LinkResolver;
use crate::item::Item;

pub const DEFAULT_SHORTENERS: [&str; 2] = ["t.co", "ift.tt"];
pub const DEFAULT_FOOTER_LABEL: &str = "Источник:";

/// Text preparation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextConfig {
    /// Hostnames of link shortening services whose links get expanded.
    pub shorteners: Vec<String>,
    /// Label placed in front of the source URL in the footer.
    pub footer_label: String,
    /// Boilerplate strings removed (case-insensitively) before anything else.
    /// Empty by default.
    pub disclaimers: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            shorteners: DEFAULT_SHORTENERS.iter().map(|s| s.to_string()).collect(),
            footer_label: DEFAULT_FOOTER_LABEL.to_string(),
            disclaimers: Vec::new(),
        }
    }
}

/// Compiled form of a [`TextConfig`], shared by all bridges of a director.
#[derive(Debug, Clone)]
pub struct TextPreparer {
    shortlink: Option<Regex>,
    disclaimers: Vec<Regex>,
    footer_label: String,
}

impl TextPreparer {
    pub fn new(config: &TextConfig) -> Self {
        let hosts: Vec<String> = config
            .shorteners
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(regex::escape)
            .collect();
        // Escaped literals and a fixed character class: always a valid pattern.
        let shortlink = (!hosts.is_empty()).then(|| {
            Regex::new(&format!(r"https://(?:{})/[a-zA-Z0-9]+", hosts.join("|")))
                .expect("escaped shortener pattern compiles")
        });
        let disclaimers = config
            .disclaimers
            .iter()
            .filter(|d| !d.trim().is_empty())
            .map(|d| {
                Regex::new(&format!("(?i){}", regex::escape(d)))
                    .expect("escaped disclaimer pattern compiles")
            })
            .collect();
        Self {
            shortlink,
            disclaimers,
            footer_label: config.footer_label.clone(),
        }
    }

    /// Produce the final status text for `item`.
    pub async fn prepare<R>(&self, item: &Item, resolver: &R) -> String
    where
        R: LinkResolver + ?Sized,
    {
        let text = self.strip_disclaimers(item.text());
        let text = self.expand_links(&text, resolver).await;
        format!("{}\n\n{} {}", text, self.footer_label, item.source_url())
    }

    /// Shortlinks found in `text`, deduplicated, in first-appearance order.
    pub fn find_shortlinks(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.shortlink else {
            return Vec::new();
        };
        let mut links: Vec<String> = Vec::new();
        for m in pattern.find_iter(text) {
            if !links.iter().any(|l| l == m.as_str()) {
                links.push(m.as_str().to_string());
            }
        }
        links
    }

    async fn expand_links<R>(&self, text: &str, resolver: &R) -> String
    where
        R: LinkResolver + ?Sized,
    {
        let Some(pattern) = &self.shortlink else {
            return text.to_string();
        };
        let links = self.find_shortlinks(text);
        if links.is_empty() {
            return text.to_string();
        }

        let resolutions = join_all(links.iter().map(|link| resolve_or_keep(link, resolver))).await;
        let replacements: HashMap<&str, String> = links
            .iter()
            .map(String::as_str)
            .zip(resolutions)
            .collect();

        pattern
            .replace_all(text, |caps: &Captures| {
                let link = &caps[0];
                replacements
                    .get(link)
                    .cloned()
                    .unwrap_or_else(|| link.to_string())
            })
            .into_owned()
    }

    /// Remove every configured disclaimer, repeating until none is left since a
    /// removal can splice together a fresh occurrence.
    pub fn strip_disclaimers(&self, text: &str) -> String {
        if self.disclaimers.is_empty() {
            return text.to_string();
        }
        let mut current = text.to_string();
        let mut stripped = false;
        loop {
            let mut changed = false;
            for pattern in &self.disclaimers {
                if pattern.is_match(&current) {
                    current = pattern.replace_all(&current, "").into_owned();
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            stripped = true;
        }
        if stripped {
            debug!("Removed disclaimer text from item");
            collapse_whitespace(&current)
        } else {
            current
        }
    }
}

impl Default for TextPreparer {
    fn default() -> Self {
        Self::new(&TextConfig::default())
    }
}

async fn resolve_or_keep<R>(link: &str, resolver: &R) -> String
where
    R: LinkResolver + ?Sized,
{
    match resolver.resolve(link).await {
        Ok(target) => {
            debug!(link, target = %target, "Unshortened link");
            target
        }
        Err(e) => {
            error!(link, error = %e, "Failed to unshorten link");
            link.to_string()
        }
    }
}

static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static TRAILING_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_whitespace(text: &str) -> String {
    let text = SPACE_RUNS.replace_all(text, " ");
    let text = TRAILING_SPACES.replace_all(&text, "\n");
    let text = NEWLINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
