//! Text processing module for TTS: sentence splitting and chunking.

pub mod chunker;

pub use chunker::chunk_document;

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the document (0-based), defines merge order
    pub index: usize,
    /// The text content, never blank
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }

    /// 1-based number used in file names and user-facing messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunk_creation() {
        let chunk = TextChunk::new(2, "Héllo world".to_string());
        assert_eq!(chunk.index, 2);
        assert_eq!(chunk.number(), 3);
        assert_eq!(chunk.char_len(), 11);
        assert_eq!(chunk.text, "Héllo world");
    }
}
