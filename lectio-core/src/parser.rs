//! Flattening nested chapter payloads into verse lists
//!
//! API.Bible returns chapter JSON as paragraphs of nodes:
//!
//! ```text
//! data.content: [ para { items: [ verse{attrs.number}, text, text, verse, text, ... ] }, ... ]
//! ```
//!
//! A verse marker opens a verse; every text node after it, across paragraph
//! boundaries, belongs to that verse until the next marker.

use crate::fetcher::RawContent;
use crate::key::Verse;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Turns raw fetched content into an ordered verse list.
///
/// Must be deterministic and side-effect-free. An empty result means "no
/// usable content"; the cache reports it as a parse error.
pub trait ContentParser: Debug + Send + Sync {
    fn parse(&self, raw: &RawContent) -> Vec<Verse>;
}

impl<T: ContentParser + ?Sized> ContentParser for std::sync::Arc<T> {
    fn parse(&self, raw: &RawContent) -> Vec<Verse> {
        (**self).parse(raw)
    }
}

impl<T: ContentParser + ?Sized> ContentParser for &T {
    fn parse(&self, raw: &RawContent) -> Vec<Verse> {
        (**self).parse(raw)
    }
}

/// Parser for API.Bible `content-type=json` chapter responses.
///
/// Accepts the full response envelope (`{"data": {"content": [...]}}`), a
/// bare `{"content": [...]}` object, or the content array itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiBibleParser;

impl ApiBibleParser {
    pub fn new() -> Self {
        Self
    }
}

impl ContentParser for ApiBibleParser {
    fn parse(&self, raw: &RawContent) -> Vec<Verse> {
        let Some(content) = content_array(raw) else {
            return Vec::new();
        };

        let mut acc = VerseAccumulator::default();
        for para in content {
            if let Some(items) = para.get("items").and_then(Value::as_array) {
                for node in items {
                    acc.visit(node);
                }
            }
        }
        acc.finish()
    }
}

fn content_array(raw: &Value) -> Option<&Vec<Value>> {
    match raw {
        Value::Array(items) => Some(items),
        Value::Object(_) => raw
            .pointer("/data/content")
            .or_else(|| raw.get("content"))
            .and_then(Value::as_array),
        _ => None,
    }
}

/// `attrs.number` is usually a string ("16"), sometimes a span ("3-4").
fn verse_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .trim()
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|digits| digits.parse::<u32>().ok()),
        _ => None,
    }
    .filter(|n| *n > 0)
}

#[derive(Default)]
struct VerseAccumulator {
    // Some(n) while inside verse n; None before the first marker or after
    // an unusable one.
    current: Option<u32>,
    text: String,
    verses: BTreeMap<u32, String>,
}

impl VerseAccumulator {
    fn visit(&mut self, node: &Value) {
        let marker = node.get("name").and_then(Value::as_str) == Some("verse");
        let number = node.pointer("/attrs/number").filter(|n| !n.is_null());

        if let (true, Some(number)) = (marker, number) {
            self.flush();
            self.current = verse_number(number);
            return;
        }

        match node.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() && self.current.is_some() => self.text.push_str(text),
            _ => {
                if let Some(items) = node.get("items").and_then(Value::as_array) {
                    for child in items {
                        self.visit(child);
                    }
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Some(number) = self.current.take() {
            let text = self.text.trim();
            if !text.is_empty() {
                self.verses
                    .entry(number)
                    .and_modify(|existing| {
                        existing.push(' ');
                        existing.push_str(text);
                    })
                    .or_insert_with(|| text.to_string());
            }
        }
        self.text.clear();
    }

    fn finish(mut self) -> Vec<Verse> {
        self.flush();
        self.verses
            .into_iter()
            .map(|(number, text)| Verse { number, text })
            .collect()
    }
}
