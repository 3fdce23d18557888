//! State weather bulletin (PDF) adapter
//!
//! Downloads the bulletin document, extracts its text, cuts out the part
//! around the location name and has it summarized into a short forecast.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{BulletinRecord, FeedKind, Location};

use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::FeedAdapter;
use crate::error::{AppError, AppResult};
use crate::external::{Summarizer, TextExtractor};
use crate::repository::Repository;

/// Bytes kept on each side of the location name
pub const SNIPPET_WINDOW: usize = 400;

/// Lines used when the location name does not appear in the text
pub const FALLBACK_LINES: usize = 5;

const PDF_MAGIC: &[u8] = b"%PDF";

pub struct BulletinAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    base_url: String,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
}

impl BulletinAdapter {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        location: Location,
        base_url: String,
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            pipeline,
            location,
            base_url,
            extractor,
            summarizer,
        }
    }

    fn document_url(&self) -> AppResult<String> {
        let source = self.location.document_source.as_deref().ok_or_else(|| {
            AppError::MissingConfig(format!("no document source for {}", self.location.name))
        })?;
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            source.trim_start_matches('/')
        ))
    }
}

#[async_trait]
impl FeedAdapter for BulletinAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::Bulletin, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::Bulletin
    }

    async fn fetch(&self) -> AppResult<usize> {
        let url = self.document_url()?;
        self.pipeline.ingest(self, &url, &self.location.name).await
    }
}

#[async_trait]
impl FeedFormat for BulletinAdapter {
    type Decoded = Vec<u8>;
    type Record = BulletinRecord;

    fn feed(&self) -> FeedKind {
        FeedKind::Bulletin
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn archive_extension(&self, _decoded: &Vec<u8>) -> Option<&'static str> {
        Some("pdf")
    }

    fn decode(&self, body: &[u8]) -> AppResult<Vec<u8>> {
        if !body.starts_with(PDF_MAGIC) {
            return Err(AppError::Decode("bulletin body is not a PDF document".to_string()));
        }
        Ok(body.to_vec())
    }

    async fn transform(&self, document: Vec<u8>, raw: RawRef) -> AppResult<Vec<BulletinRecord>> {
        let text = self.extractor.extract_text(&document).await?;
        let snippet = extract_forecast_snippet(&text, &self.location.name);
        tracing::debug!(
            location = %self.location.name,
            text_len = text.len(),
            snippet_len = snippet.len(),
            "Bulletin snippet selected"
        );

        let summary = self
            .summarizer
            .summarize(&forecast_prompt(&self.location.name, snippet))
            .await?;

        Ok(vec![BulletinRecord {
            location: self.location.name.clone(),
            raw_payload_id: Some(raw.id),
            issued_at: raw.fetched_at,
            text: summary,
        }])
    }

    async fn persist(&self, repo: &dyn Repository, records: Vec<BulletinRecord>) -> AppResult<usize> {
        for record in &records {
            repo.insert_bulletin(record).await?;
        }
        Ok(records.len())
    }
}

/// Cut the part of a bulletin that talks about `name`.
///
/// Takes a window of [`SNIPPET_WINDOW`] bytes on each side of the first
/// case-insensitive occurrence, widened to whole lines. Falls back to the
/// first [`FALLBACK_LINES`] lines when the name does not occur.
pub fn extract_forecast_snippet<'a>(text: &'a str, name: &str) -> &'a str {
    let haystack = text.to_ascii_lowercase();
    let needle = name.to_ascii_lowercase();

    let Some(index) = haystack.find(&needle) else {
        return first_lines(text, FALLBACK_LINES);
    };

    let bytes = text.as_bytes();
    let mut start = index.saturating_sub(SNIPPET_WINDOW);
    let mut end = (index + needle.len() + SNIPPET_WINDOW).min(bytes.len());

    while start > 0 && !is_line_break(bytes[start - 1]) {
        start -= 1;
    }
    while end < bytes.len() && !is_line_break(bytes[end]) {
        end += 1;
    }

    // Both ends sit next to an ASCII line break or at the text bounds
    &text[start..end]
}

/// Instruction sent to the summarizer around the snippet
pub fn forecast_prompt(name: &str, snippet: &str) -> String {
    format!(
        "The following is an excerpt from an IMD state weather bulletin. \
         Give the forecast for {} in one or two sentences, keeping any rainfall \
         warnings:\n\n{}",
        name, snippet
    )
}

fn first_lines(text: &str, count: usize) -> &str {
    match text.match_indices('\n').nth(count.saturating_sub(1)) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn is_line_break(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn offset_in(text: &str, snippet: &str) -> usize {
        snippet.as_ptr() as usize - text.as_ptr() as usize
    }

    #[test]
    fn test_short_text_is_kept_whole() {
        let text = "State forecast\nVadodara: heavy rain likely at isolated places\nSurat: dry\n";
        assert_eq!(extract_forecast_snippet(text, "vadodara"), text);
    }

    #[test]
    fn test_snippet_window_is_bounded() {
        let filler = "x".repeat(60);
        let mut lines: Vec<String> = (0..40).map(|_| filler.clone()).collect();
        lines[20] = "Vadodara heavy rain".to_string();
        let text = lines.join("\n");

        let snippet = extract_forecast_snippet(&text, "VADODARA");
        assert!(snippet.contains("Vadodara heavy rain"));
        assert!(snippet.starts_with('x') && snippet.ends_with('x'));
        // window plus at most one partial line widened on each side
        assert!(snippet.len() <= 2 * SNIPPET_WINDOW + "Vadodara".len() + 2 * 61);
        assert!(snippet.len() < text.len());
    }

    #[test]
    fn test_snippet_fallback_first_lines() {
        let text = "l1\nl2\nl3\nl4\nl5\nl6\nl7";
        assert_eq!(extract_forecast_snippet(text, "pune"), "l1\nl2\nl3\nl4\nl5");
        assert_eq!(extract_forecast_snippet("only line", "pune"), "only line");
    }

    #[test]
    fn test_snippet_stops_at_carriage_returns() {
        let filler: Vec<String> = (0..12).map(|_| "y".repeat(50)).collect();
        let text = format!(
            "{}\r\nPune: thunderstorm\r\n{}",
            filler.join("\r\n"),
            filler.join("\r\n")
        );
        let snippet = extract_forecast_snippet(&text, "pune");
        assert!(snippet.contains("Pune: thunderstorm"));
        assert!(snippet.len() < text.len());
        assert!(!snippet.ends_with('\r'));
    }

    #[test]
    fn test_snippet_never_splits_multibyte_characters() {
        let filler = "भारी वर्षा ".repeat(10);
        let mut lines: Vec<String> = (0..10).map(|_| filler.clone()).collect();
        lines.push("Vadodara: heavy rain".to_string());
        lines.extend((0..10).map(|_| filler.clone()));
        let text = lines.join("\n");

        let snippet = extract_forecast_snippet(&text, "vadodara");
        assert!(snippet.contains("Vadodara: heavy rain"));
        assert!(snippet.starts_with('भ'));
        assert!(snippet.len() < text.len());
    }

    #[test]
    fn test_prompt_contains_snippet() {
        let prompt = forecast_prompt("vadodara", "Vadodara: heavy rain");
        assert!(prompt.contains("vadodara"));
        assert!(prompt.ends_with("Vadodara: heavy rain"));
    }

    #[test]
    fn test_decode_requires_pdf_magic() {
        assert!(b"%PDF-1.7\n".starts_with(PDF_MAGIC));
        assert!(!b"<html>".starts_with(PDF_MAGIC));
    }

    proptest! {
        #[test]
        fn prop_snippet_lands_on_line_boundaries(
            lines in proptest::collection::vec("[a-zA-Z ]{0,120}", 1..30),
            insert_at in 0usize..30,
            crlf in any::<bool>(),
        ) {
            let mut lines = lines;
            let at = insert_at.min(lines.len());
            lines.insert(at, "Rain at Vadodara today".to_string());
            let text = lines.join(if crlf { "\r\n" } else { "\n" });

            let snippet = extract_forecast_snippet(&text, "vadodara");
            let start = offset_in(&text, snippet);
            let end = start + snippet.len();
            let bytes = text.as_bytes();

            prop_assert!(start == 0 || is_line_break(bytes[start - 1]));
            prop_assert!(end == bytes.len() || is_line_break(bytes[end]));
            prop_assert!(snippet.to_ascii_lowercase().contains("vadodara"));
        }
    }
}
