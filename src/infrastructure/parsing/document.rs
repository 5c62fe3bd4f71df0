//! The fetched page: parsed tree plus the raw markup
//!
//! A `RawDocument` is read-only after construction. Readers borrow it and
//! never mutate it.

use std::collections::HashSet;

use scraper::html::Select;
use scraper::{Html, Selector};
use tracing::debug;

use super::{ParsingError, ParsingResult};

/// Tags whose text never reaches the visible page
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

pub struct RawDocument {
    url: String,
    markup: String,
    tree: Html,
}

impl RawDocument {
    /// Parse one page body. Only an empty or tag-less body is a failure;
    /// garbled markup is repaired by the HTML parser.
    pub fn parse(url: &str, markup: impl Into<String>) -> ParsingResult<Self> {
        let markup = markup.into();
        if markup.trim().is_empty() || !markup.contains('<') {
            return Err(ParsingError::EmptyDocument { url: url.to_string() });
        }

        let tree = Html::parse_document(&markup);
        debug!("Parsed document {} ({} bytes, {} parser errors)", url, markup.len(), tree.errors.len());

        Ok(Self {
            url: url.to_string(),
            markup,
            tree,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> Select<'a, 'b> {
        self.tree.select(selector)
    }

    /// Visible text, one trimmed line per text node, skipping script-like
    /// tags and anything under the `excluded` regions.
    pub fn visible_text(&self, excluded: &[Selector]) -> String {
        let excluded_ids: HashSet<_> = excluded
            .iter()
            .flat_map(|selector| self.tree.select(selector))
            .map(|element| element.id())
            .collect();

        let mut lines = Vec::new();
        for node in self.tree.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            let hidden = node.ancestors().any(|ancestor| {
                excluded_ids.contains(&ancestor.id())
                    || ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| INVISIBLE_TAGS.contains(&el.name()))
            });
            if !hidden {
                lines.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }
        lines.join("\n")
    }
}

impl std::fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocument")
            .field("url", &self.url)
            .field("markup_len", &self.markup.len())
            .finish_non_exhaustive()
    }
}
