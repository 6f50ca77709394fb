//! URL removal for mirrored text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::transport::{Message, MessageEntity};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("URL pattern is valid")
});

/// Characters that usually end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')'];

/// Replacement text and entities for a stripped message.
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedText {
    pub text: String,
    pub entities: Vec<MessageEntity>,
}

/// Removes URLs from text, keeping whitelisted domains.
#[derive(Debug, Clone, Default)]
pub struct UrlStripper {
    whitelist: Vec<String>,
}

impl UrlStripper {
    pub fn new(whitelist: Vec<String>) -> Self {
        Self {
            whitelist: whitelist
                .into_iter()
                .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Remove every non-whitelisted URL from `text`.
    pub fn strip_text(&self, text: &str) -> String {
        URL_PATTERN
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                let url = matched.trim_end_matches(TRAILING_PUNCTUATION);
                let tail = &matched[url.len()..];
                if self.is_whitelisted(url) {
                    matched.to_string()
                } else {
                    tail.to_string()
                }
            })
            .into_owned()
    }

    /// Stripped text and entities for `message`, or `None` when nothing changes.
    ///
    /// Entity offsets are only valid for the original text, so entities are
    /// dropped when the text itself changed. Otherwise only `text_link`
    /// targets are stripped, and links left empty are removed.
    pub fn strip(&self, message: &Message) -> Option<StrippedText> {
        let original = message.text.as_deref().unwrap_or_default();
        let text = self.strip_text(original);

        if text != original {
            return Some(StrippedText {
                text,
                entities: Vec::new(),
            });
        }

        let mut changed = false;
        let mut entities = Vec::with_capacity(message.entities.len());
        for entity in &message.entities {
            let Some(url) = entity.url.as_deref() else {
                entities.push(entity.clone());
                continue;
            };
            let stripped = self.strip_text(url);
            if stripped == url {
                entities.push(entity.clone());
                continue;
            }
            changed = true;
            if !stripped.trim().is_empty() {
                entities.push(MessageEntity {
                    url: Some(stripped),
                    ..entity.clone()
                });
            }
        }

        changed.then_some(StrippedText { text, entities })
    }

    fn is_whitelisted(&self, url: &str) -> bool {
        let host = host_of(url);
        self.whitelist
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

fn host_of(url: &str) -> String {
    let lower = url.to_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let host = rest
        .split(['/', '?', '#', ':'])
        .next()
        .unwrap_or_default();
    host.trim_start_matches("www.").to_string()
}
