//! Pipeline stages for benchmark-table extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and gives every
//! failure an unambiguous owner in [`crate::error::CrawlError`].
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ encode ──▶ completion ──▶ table
//! (URL→file) (base64)   (LLM call)    (CSV parse)
//! ```
//!
//! 1. [`fetch`]      — download the document URL to a temp file
//! 2. [`encode`]     — read the file and base64-encode it for the API body
//! 3. [`completion`] — request the tabular extraction; the only stage with
//!    provider I/O
//! 4. [`table`]      — parse the completion text as a delimited table
//!
//! Normalization and merge live outside the pipeline, in
//! [`crate::sources`] and [`crate::store`] — they operate on tables and
//! records, not on documents.

pub mod completion;
pub mod encode;
pub mod fetch;
pub mod table;
