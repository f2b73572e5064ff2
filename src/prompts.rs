//! The extraction prompt sent with every document.
//!
//! Kept in one module so prompt changes never touch transport or parsing
//! code, and so tests can inspect the exact instruction text without a live
//! provider. Callers can override it via
//! [`crate::config::CrawlConfig::prompt`].

/// Default instruction asking the model for the paper's main benchmark
/// table as bare CSV.
///
/// The `source` column contract matters downstream: a URL when the paper
/// provides one, the cited paper's title otherwise, and a dash when neither
/// exists — the normalizer filters on exactly those shapes.
pub const EXTRACTION_PROMPT: &str = r#"Please extract the main benchmark table from this PDF document.
- Include the name of the benchmarks as rows and the names of the models evaluated as columns.
- Present the table data in a clear tabular format.
- The columns should be: | name (of benchmark) | test_type (e.g. 5-shot) | models (each model gets its own column) | source |
- The `source` column should contain the url of the benchmark from the references. If no url is provided in the paper, please provide the title of the paper which the benchmark references. If this is also unavailable, put a dash (-).

Please maintain the exact numerical values from the original table. Respond with the table and nothing else, in a csv format."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_required_columns() {
        assert!(EXTRACTION_PROMPT.contains("name"));
        assert!(EXTRACTION_PROMPT.contains("source"));
        assert!(EXTRACTION_PROMPT.contains("csv"));
    }
}
