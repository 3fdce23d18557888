//! External integrations
//!
//! Upstream feed transport plus the two bulletin collaborators: document text
//! extraction and language-model summarization.

pub mod http;
pub mod summarizer;
pub mod text_extraction;

pub use http::{FeedClient, FeedResponse};
pub use summarizer::{ChatCompletionSummarizer, Summarizer};
pub use text_extraction::{PdfToTextExtractor, TextExtractor};
