use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

use crate::markdown;

/// Chunk boundaries are a pure function of the document and this config;
/// re-running ingestion with the same parameters reproduces the same chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            overlap_chars: 200,
        }
    }
}

/// A chunk with positional metadata but no embedding yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub source_file: String,
    pub chapter: String,
    pub section: Option<String>,
    pub heading_path: Vec<String>,
    pub chunk_index: usize,
    pub text: String,
}

impl ChunkerConfig {
    fn splitter(&self) -> Result<TextSplitter<text_splitter::Characters>, AppError> {
        if self.max_chars == 0 {
            return Err(AppError::Validation(
                "chunk_max_chars must be positive".into(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(AppError::Validation(format!(
                "chunk_overlap_chars ({}) must be smaller than chunk_max_chars ({})",
                self.overlap_chars, self.max_chars
            )));
        }

        let chunk_config = ChunkConfig::new(self.max_chars)
            .with_overlap(self.overlap_chars)
            .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;

        Ok(TextSplitter::new(chunk_config))
    }

    /// Splits one source document into overlapping chunks. Frontmatter is
    /// dropped; chapter/section labels come from the document's headings,
    /// falling back to the file stem when a document has no H1. Trailing
    /// content shorter than the target size still becomes a final chunk;
    /// empty chunks are never emitted.
    pub fn chunk_document(
        &self,
        content: &str,
        source_file: &str,
    ) -> Result<Vec<DocumentChunk>, AppError> {
        let body = markdown::strip_frontmatter(content);
        let (chapter, section) = markdown::extract_chapter_and_section(body);
        let heading_path = markdown::heading_path(body);

        let file_stem = source_file
            .strip_suffix(".md")
            .unwrap_or(source_file)
            .to_string();
        let chapter = chapter.unwrap_or_else(|| file_stem.clone());
        let heading_path = if heading_path.is_empty() {
            vec![file_stem]
        } else {
            heading_path
        };

        let splitter = self.splitter()?;
        let chunks = splitter
            .chunks(body)
            .map(str::to_owned)
            .filter(|chunk| !chunk.trim().is_empty())
            .enumerate()
            .map(|(chunk_index, text)| DocumentChunk {
                source_file: source_file.to_string(),
                chapter: chapter.clone(),
                section: section.clone(),
                heading_path: heading_path.clone(),
                chunk_index,
                text,
            })
            .collect();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize, overlap: usize) -> ChunkerConfig {
        ChunkerConfig {
            max_chars: max,
            overlap_chars: overlap,
        }
    }

    #[test]
    fn test_chunks_cover_document_without_gaps() {
        let paragraphs: Vec<String> = (0..40)
            .map(|i| format!("Paragraph {i} talks about topic number {i} in some detail."))
            .collect();
        let doc = format!("# Coverage\n\n{}", paragraphs.join("\n\n"));

        let chunks = config(200, 40)
            .chunk_document(&doc, "coverage.md")
            .expect("chunking failed");
        assert!(chunks.len() > 1);

        // No chunk is empty or oversized.
        for chunk in &chunks {
            assert!(!chunk.text.trim().is_empty());
            assert!(chunk.text.chars().count() <= 200);
        }

        // Consecutive chunks overlap or touch: stripping up to the overlap
        // from the front of each later chunk must still reconstruct a
        // substring chain of the original document.
        let mut cursor = 0;
        for chunk in &chunks {
            let pos = doc[cursor..]
                .find(chunk.text.trim_end())
                .map(|p| p + cursor)
                .expect("chunk text not found in document order");
            assert!(pos <= cursor + 200, "gap between consecutive chunks");
            cursor = pos;
        }

        // Trailing content survives: the last chunk ends where the doc ends.
        let last = chunks.last().expect("no chunks");
        assert!(doc.trim_end().ends_with(last.text.trim_end()));
    }

    #[test]
    fn test_undersized_trailing_content_is_kept() {
        let doc = "# Tiny\n\nshort tail";
        let chunks = config(1000, 100)
            .chunk_document(doc, "tiny.md")
            .expect("chunking failed");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("short tail"));
    }

    #[test]
    fn test_deterministic_boundaries() {
        let doc = format!("# Det\n\n{}", "lorem ipsum dolor sit amet. ".repeat(100));
        let a = config(300, 50).chunk_document(&doc, "det.md").expect("chunk");
        let b = config(300, 50).chunk_document(&doc, "det.md").expect("chunk");
        assert_eq!(a, b);
    }

    #[test]
    fn test_metadata_attached_to_every_chunk() {
        let doc = "---\ntitle: x\n---\n# Chapter 2: Retrieval\n\n## Vector Search\n\nbody text here";
        let chunks = config(50, 10)
            .chunk_document(doc, "chapter-2.md")
            .expect("chunking failed");

        assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source_file, "chapter-2.md");
            assert_eq!(chunk.chapter, "Chapter 2: Retrieval");
            assert_eq!(chunk.section.as_deref(), Some("Vector Search"));
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[test]
    fn test_headingless_document_falls_back_to_file_stem() {
        let chunks = config(100, 10)
            .chunk_document("prose without any headings", "appendix-a.md")
            .expect("chunking failed");
        assert_eq!(chunks[0].chapter, "appendix-a");
        assert_eq!(chunks[0].heading_path, vec!["appendix-a".to_string()]);
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let chunks = config(100, 10)
            .chunk_document("   \n\n", "empty.md")
            .expect("chunking failed");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(config(0, 0).chunk_document("text", "x.md").is_err());
        assert!(config(100, 100).chunk_document("text", "x.md").is_err());
    }
}
