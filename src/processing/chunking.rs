//! Sentence-based chunking with sentence-granular overlap.
//!
//! Text is split into sentence-like units at `.`, `!`, or `?` followed by whitespace. Sentences
//! are accumulated greedily into a chunk while its estimated token count stays within the
//! target size. When a chunk is emitted, the next one is seeded with the trailing sentences of
//! the emitted chunk whose combined estimate fits the overlap budget, so context carries across
//! boundaries.
//!
//! Sentences are never split: a sentence larger than the target becomes a chunk of its own that
//! exceeds the target.

use super::types::ChunkingError;

/// One segment of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the document's chunk sequence.
    pub index: usize,
    /// Chunk contents: its sentences joined by single spaces.
    pub text: String,
}

/// Greedy sentence chunker configured with a target size and overlap, in estimated tokens.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    target_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    /// Build a chunker; `target_size` must be non-zero.
    pub fn new(target_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if target_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            target_size,
            overlap,
        })
    }

    /// Split `text` into ordered, overlapping chunks. Blank input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0usize;

        for sentence in sentences {
            let sentence_size = estimate_tokens(sentence);

            if current_size + sentence_size > self.target_size && !current.is_empty() {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: current.join(" "),
                });
                let (seed, seed_size) = self.overlap_seed(&current);
                current = seed;
                current_size = seed_size;
            }

            current.push(sentence);
            current_size += sentence_size;
        }

        if !current.is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                text: current.join(" "),
            });
        }

        chunks
    }

    /// Walk backward through the sentences just emitted, keeping whole sentences while the
    /// running estimate stays within the overlap budget.
    ///
    /// The seed never carries every sentence of the emitted chunk.
    fn overlap_seed<'a>(&self, emitted: &[&'a str]) -> (Vec<&'a str>, usize) {
        let mut seed = Vec::new();
        let mut seed_size = 0usize;
        for sentence in emitted.iter().rev() {
            if seed.len() + 1 == emitted.len() {
                break;
            }
            let size = estimate_tokens(sentence);
            if seed_size + size > self.overlap {
                break;
            }
            seed.push(*sentence);
            seed_size += size;
        }
        seed.reverse();
        (seed, seed_size)
    }
}

/// Chunk `text` with the given target size and overlap.
pub fn chunk_text(
    text: &str,
    target_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    Ok(SentenceChunker::new(target_size, overlap)?.chunk(text))
}

/// Split text at sentence-ending punctuation followed by whitespace.
///
/// Returned sentences are trimmed; empty fragments are dropped. Text without sentence-ending
/// punctuation is a single sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let boundary = offset + ch.len_utf8();
        if let Some(&(_, next)) = chars.peek()
            && next.is_whitespace()
        {
            push_trimmed(&mut sentences, &text[start..boundary]);
            start = boundary;
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, fragment: &'a str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

/// Approximate token count as a quarter of the character count, rounded up.
pub(crate) fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
