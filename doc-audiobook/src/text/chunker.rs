//! Text chunking for TTS processing.
//!
//! Text is cut after every sentence terminator (`.`, `?` or `!` followed by a
//! space), sentences are packed greedily up to the size limit, and anything
//! still oversized is sliced at exact character offsets.

use super::TextChunk;

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Smallest chunk size a user may select.
pub const MIN_CHUNK_SIZE: usize = 500;

/// Largest chunk size a user may select.
pub const MAX_CHUNK_SIZE: usize = 2000;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '?', '!'];

/// Split text into sentence-terminated segments.
///
/// Each segment keeps its terminator and the following space, so the
/// segments concatenate back to the input exactly.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        if c == ' ' && prev.is_some_and(|p| SENTENCE_TERMINATORS.contains(&p)) {
            let end = i + c.len_utf8();
            segments.push(&text[start..end]);
            start = end;
        }
        prev = Some(c);
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Split text into chunks of at most `max_size` characters.
///
/// # Arguments
/// * `text` - The text to chunk
/// * `max_size` - Maximum chunk size in characters
///
/// # Returns
/// Trimmed, non-empty chunks in document order.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        // Close the running chunk when this sentence would overflow it
        if current_len + sentence_len > max_size && !current.is_empty() {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }

        current.push_str(sentence);
        current_len += sentence_len;
    }

    // Don't forget the last chunk
    push_trimmed(&mut chunks, &current);

    // A single sentence can still be longer than the limit
    let mut final_chunks = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.chars().count() > max_size {
            final_chunks.extend(
                hard_split(&chunk, max_size)
                    .into_iter()
                    .filter(|part| !part.trim().is_empty()),
            );
        } else {
            final_chunks.push(chunk);
        }
    }

    final_chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Hard split text at exact character positions (last resort).
fn hard_split(text: &str, max_length: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_length)
        .map(|slice| slice.iter().collect())
        .collect()
}

/// Process a document's text into indexed TTS-ready chunks.
pub fn chunk_document(text: &str, max_size: usize) -> Vec<TextChunk> {
    chunk_text(text, max_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk::new(index, text))
        .collect()
}
