//! Scheme knowledge base loader.
//!
//! The knowledge base is an externally authored JSON document describing
//! government agricultural schemes. It is loaded once at startup and treated
//! as opaque: the only consumer is the prompt composer, which embeds the
//! pretty-printed text verbatim. A load failure disables chat; it never
//! aborts the process.

use anyhow::{Context, Result};
use std::path::Path;

/// The scheme document plus its prompt-ready serialization.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    /// Parsed document. Kept for inspection (`sahayaka check`); the prompt
    /// path only uses the text form.
    pub document: serde_json::Value,
    /// Pretty-printed JSON, embedded verbatim into every chat prompt.
    pub text: String,
}

impl KnowledgeBase {
    /// Read and parse the scheme document, producing both the structured
    /// value and its pretty-printed text.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schemes file: {}", path.display()))?;

        let document: serde_json::Value =
            serde_json::from_str(&raw).with_context(|| "Failed to parse schemes file as JSON")?;

        let text = serde_json::to_string_pretty(&document)
            .context("Failed to serialize schemes document")?;

        Ok(Self { document, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_produces_pretty_text() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"schemes":[{"name":"PM-KISAN","benefit":"income support"}]}"#)
            .unwrap();

        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert!(kb.document.get("schemes").is_some());
        // Pretty-printing spreads the document over multiple lines.
        assert!(kb.text.contains('\n'));
        assert!(kb.text.contains("PM-KISAN"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(KnowledgeBase::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(KnowledgeBase::load(Path::new("/nonexistent/schemes.json")).is_err());
    }
}
