//! arXiv Atom feed parsing.
//!
//! The arXiv API returns Atom XML. This module walks the event stream with
//! a small state machine, accumulating one entry at a time and dropping
//! entries that lack an identifier or title.

use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use regex::Regex;

use crate::paper::PaperRecord;

/// Modern arXiv identifiers: `2212.04356`, optionally `arXiv:`-prefixed
/// and version-suffixed.
fn new_style_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"(?:arXiv:)?(\d{4}\.\d{4,5})(?:v\d+)?").expect("static regex is valid")
    })
}

/// Pre-2007 identifiers: `cond-mat/0211002` and the like.
fn old_style_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"(?:arXiv:)?([a-z\-]+(?:\.[A-Z]{2})?/\d{7})").expect("static regex is valid")
    })
}

/// Extracts a bare arXiv identifier (version suffix stripped) from an
/// entry `<id>` URL or any string embedding one.
#[must_use]
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    if let Some(caps) = new_style_id().captures(text) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    old_style_id()
        .captures(text)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Parses an arXiv Atom feed into paper records.
///
/// Entries missing an identifier or a title are dropped; the function
/// itself never fails on malformed XML, it simply stops at the first
/// unreadable event.
#[must_use]
pub fn parse_feed(xml: &str) -> Vec<PaperRecord> {
    let mut reader = Reader::from_str(xml);
    let mut parser = AtomParser::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.handle_start(e),
            Ok(Event::Empty(ref e)) => parser.handle_empty(e),
            Ok(Event::Text(ref e)) => parser.handle_text(e),
            Ok(Event::End(ref e)) => parser.handle_end(e),
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    parser.records
}

/// Per-entry accumulator for XML parsing state.
#[derive(Default)]
struct EntryAccum {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
    category: Option<String>,
}

impl EntryAccum {
    fn clear(&mut self) {
        self.id.clear();
        self.title.clear();
        self.summary.clear();
        self.published.clear();
        self.authors.clear();
        self.pdf_url = None;
        self.category = None;
    }

    fn push_text(&mut self, tag: &str, text: &str, in_author: bool) {
        match tag {
            "id" => self.id.push_str(text),
            "title" => self.title.push_str(text),
            "summary" => self.summary.push_str(text),
            "published" => self.published.push_str(text),
            "name" if in_author => self.authors.push(text.trim().to_string()),
            _ => {}
        }
    }

    fn into_record(self) -> Option<PaperRecord> {
        let arxiv_id = extract_arxiv_id(&self.id)?;
        let title = normalize_whitespace(&self.title);
        if title.is_empty() {
            return None;
        }
        // arXiv publishes full timestamps; the date prefix is all we keep.
        let published = self.published.chars().take(10).collect();
        Some(PaperRecord {
            title,
            authors: self.authors,
            published,
            summary: normalize_whitespace(&self.summary),
            arxiv_id,
            pdf_url: self.pdf_url,
            category: self.category,
        })
    }
}

/// Atom XML state machine for parsing arXiv feeds.
struct AtomParser {
    records: Vec<PaperRecord>,
    accum: EntryAccum,
    current_tag: String,
    in_entry: bool,
    in_author: bool,
}

impl AtomParser {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            accum: EntryAccum::default(),
            current_tag: String::new(),
            in_entry: false,
            in_author: false,
        }
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        match tag.as_str() {
            "entry" => {
                self.in_entry = true;
                self.accum.clear();
            }
            "author" if self.in_entry => {
                self.in_author = true;
            }
            "link" if self.in_entry => {
                if let Some(href) = extract_pdf_href(e) {
                    self.accum.pdf_url = Some(href);
                }
            }
            "arxiv:primary_category" if self.in_entry => {
                self.accum.category = extract_term(e);
            }
            _ if self.in_entry => {
                self.current_tag = tag;
            }
            _ => {}
        }
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>) {
        if !self.in_entry {
            return;
        }
        let name = e.name();
        let tag = String::from_utf8_lossy(name.as_ref());
        match tag.as_ref() {
            "link" => {
                if let Some(href) = extract_pdf_href(e) {
                    self.accum.pdf_url = Some(href);
                }
            }
            "arxiv:primary_category" => {
                self.accum.category = extract_term(e);
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, e: &BytesText<'_>) {
        if !self.in_entry {
            return;
        }
        let text = e.unescape().unwrap_or_default().to_string();
        self.accum
            .push_text(&self.current_tag.clone(), &text, self.in_author);
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>) {
        let name = e.name();
        let tag = String::from_utf8_lossy(name.as_ref());
        match tag.as_ref() {
            "entry" => {
                let finished = std::mem::take(&mut self.accum);
                if let Some(record) = finished.into_record() {
                    self.records.push(record);
                }
                self.in_entry = false;
                self.current_tag.clear();
            }
            "author" => {
                self.in_author = false;
            }
            _ => {
                self.current_tag.clear();
            }
        }
    }
}

/// Extracts the PDF href from a `<link>` element, if it is the PDF link.
fn extract_pdf_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = String::new();
    let mut is_pdf = false;
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref());
        let val = String::from_utf8_lossy(&attr.value);
        if key == "title" && val == "pdf" {
            is_pdf = true;
        }
        if key == "href" {
            href = val.to_string();
        }
    }
    (is_pdf && !href.is_empty()).then_some(href)
}

/// Extracts the `term` attribute from a category element.
fn extract_term(e: &BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"term" {
            let val = String::from_utf8_lossy(&attr.value).to_string();
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Collapses consecutive whitespace (newlines, tabs, spaces) into a single space.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
