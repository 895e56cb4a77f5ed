//! Serializes retrieved documents into the context block handed to the
//! answer generator.

use crate::types::Document;

/// Returned in place of an empty context, and used as the answer when
/// retrieval comes back empty.
pub const NO_LITERATURE_FOUND: &str = "No relevant medical literature found.";

/// Separator line closing each document block.
pub const BLOCK_DELIMITER: &str = "---";

fn format_document(index: usize, doc: &Document) -> String {
    format!(
        "\n[Document {index}]\nPMID: {}\nTitle: {}\nJournal: {}\nSpecialty: {}\n\nAbstract:\n{}\n\n{BLOCK_DELIMITER}",
        doc.pmid, doc.title, doc.journal, doc.specialty, doc.abstract_text
    )
}

/// Format documents in order, numbering them from 1.
///
/// Never returns an empty string: no documents yields `NO_LITERATURE_FOUND`.
pub fn format_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_LITERATURE_FOUND.to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format_document(i + 1, doc))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pmid: &str, title: &str) -> Document {
        Document {
            pmid: pmid.into(),
            title: title.into(),
            abstract_text: format!("Abstract of {title}."),
            journal: "NEJM".into(),
            specialty: "oncology".into(),
            publication_date: "2020-01-01".into(),
            similarity_score: 0.7,
        }
    }

    #[test]
    fn test_empty_yields_sentinel() {
        assert_eq!(format_context(&[]), NO_LITERATURE_FOUND);
    }

    #[test]
    fn test_single_document_block() {
        let context = format_context(&[doc("42", "Checkpoint inhibitors")]);
        assert_eq!(
            context,
            "\n[Document 1]\nPMID: 42\nTitle: Checkpoint inhibitors\nJournal: NEJM\nSpecialty: oncology\n\nAbstract:\nAbstract of Checkpoint inhibitors.\n\n---"
        );
    }

    #[test]
    fn test_order_is_preserved_and_numbered() {
        let context = format_context(&[doc("2", "Second"), doc("1", "First")]);
        let first = context.find("PMID: 2").unwrap();
        let second = context.find("PMID: 1").unwrap();
        assert!(first < second);
        assert!(context.contains("[Document 1]\nPMID: 2"));
        assert!(context.contains("[Document 2]\nPMID: 1"));
        assert_eq!(context.matches(BLOCK_DELIMITER).count(), 2);
    }

    #[test]
    fn test_deterministic() {
        let docs = vec![doc("7", "A"), doc("8", "B")];
        assert_eq!(format_context(&docs), format_context(&docs));
    }
}
