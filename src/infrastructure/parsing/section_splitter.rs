//! Header-to-boundary content splitter
//!
//! Finds every header anchor in the page text, orders them by position and
//! assigns each section the text up to the next anchor. The splitter knows
//! nothing about individual sections: adding one means appending a
//! [`SectionHeader`], never a new branch here.

use std::collections::BTreeSet;

use crate::domain::constants::limits::SECTION_MAX_LEN;
use crate::domain::product::ContentSections;
use crate::infrastructure::config::SectionHeader;

/// Header lines longer than this are body text that happens to start
/// with a header word.
const MAX_HEADER_LINE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionSplit {
    pub sections: ContentSections,
    /// Keys whose header appeared at least once, content or not
    pub headers_seen: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct SectionSplitter {
    headers: Vec<SectionHeader>,
    terminators: Vec<String>,
    noise: Vec<String>,
}

/// One header occurrence. `key == None` marks a terminator.
#[derive(Debug)]
struct Anchor<'h> {
    line: usize,
    key: Option<&'h str>,
    /// Text after the header on the same line
    inline: String,
}

impl SectionSplitter {
    pub fn new(headers: Vec<SectionHeader>, terminators: Vec<String>, noise: Vec<String>) -> Self {
        let fold_all = |items: Vec<String>| -> Vec<String> { items.iter().map(|s| fold_case(s)).collect() };
        let headers = headers
            .into_iter()
            .map(|h| SectionHeader {
                key: h.key,
                markers: fold_all(h.markers),
            })
            .collect();
        Self {
            headers,
            terminators: fold_all(terminators),
            noise: fold_all(noise),
        }
    }

    pub fn split(&self, page_text: &str) -> SectionSplit {
        let lines: Vec<&str> = page_text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let anchors = self.find_anchors(&lines);

        let mut split = SectionSplit::default();
        for (index, anchor) in anchors.iter().enumerate() {
            let Some(key) = anchor.key else { continue };
            split.headers_seen.insert(key.to_string());
            if !split.sections.get(key).is_empty() {
                continue;
            }

            let end = anchors.get(index + 1).map_or(lines.len(), |next| next.line);
            let mut body: Vec<&str> = Vec::new();
            if !anchor.inline.is_empty() {
                body.push(&anchor.inline);
            }
            body.extend(&lines[anchor.line + 1..end]);

            let content = self.clean(&body.join("\n"));
            if !content.is_empty() {
                split.sections.set(key, content);
            }
        }

        // Keep the declared order and an entry for every header
        let mut ordered = ContentSections::new();
        for header in &self.headers {
            ordered.set(&header.key, split.sections.get(&header.key));
        }
        split.sections = ordered;
        split
    }

    fn find_anchors(&self, lines: &[&str]) -> Vec<Anchor<'_>> {
        let mut anchors = Vec::new();
        for (line_index, line) in lines.iter().enumerate() {
            if line.chars().count() > MAX_HEADER_LINE_CHARS {
                continue;
            }
            let folded = fold_case(line);

            if self.terminators.iter().any(|t| starts_with_word(&folded, t)) {
                anchors.push(Anchor { line: line_index, key: None, inline: String::new() });
                continue;
            }

            // Longest marker wins so "дозировка и начин на употреба" beats "начин на употреба"
            let best = self
                .headers
                .iter()
                .flat_map(|h| h.markers.iter().map(move |m| (h.key.as_str(), m.as_str())))
                .filter(|(_, marker)| starts_with_word(&folded, marker))
                .max_by_key(|(_, marker)| marker.len());

            if let Some((key, marker)) = best {
                let rest = &line[marker.len()..];
                let inline = rest.trim_start_matches(|c: char| c == ':' || c == '?' || c.is_whitespace());
                anchors.push(Anchor {
                    line: line_index,
                    key: Some(key),
                    inline: inline.trim().to_string(),
                });
            }
        }
        anchors
    }

    /// Cut boilerplate and cap the length
    fn clean(&self, content: &str) -> String {
        let folded = fold_case(content);
        let cut = self
            .noise
            .iter()
            .filter_map(|n| folded.find(n.as_str()))
            .min()
            .unwrap_or(content.len());
        content[..cut].trim().chars().take(SECTION_MAX_LEN).collect()
    }
}

/// `marker` opens `line` and ends on a word boundary, so "Съставът е..."
/// is body text and not a "Състав" header.
fn starts_with_word(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .is_some_and(|rest| rest.chars().next().is_none_or(|c| !c.is_alphanumeric()))
}

/// Lowercase without changing byte offsets: characters whose lowercase form
/// has a different UTF-8 length are left as they are.
pub fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) if l.len_utf8() == c.len_utf8() => l,
                _ => c,
            }
        })
        .collect()
}
