//! Chunk codec
//!
//! Splits a serialized record into byte-bounded slices and joins them back.
//! Boundaries always fall on UTF-8 character boundaries, so every chunk is a
//! valid string on its own and concatenation restores the original bytes.

/// Number of chunks needed for `byte_len` bytes at `max_chunk_bytes` each
#[must_use]
pub fn chunk_count(byte_len: usize, max_chunk_bytes: usize) -> usize {
    if max_chunk_bytes == 0 {
        return 0;
    }
    byte_len.div_ceil(max_chunk_bytes)
}

/// Split `serialized` into chunks of at most `max_chunk_bytes` bytes
///
/// A character wider than `max_chunk_bytes` is emitted as its own chunk.
/// Returns an empty list for empty input or a zero limit.
#[must_use]
pub fn encode(serialized: &str, max_chunk_bytes: usize) -> Vec<String> {
    if max_chunk_bytes == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(chunk_count(serialized.len(), max_chunk_bytes));
    let mut rest = serialized;

    while !rest.is_empty() {
        let mut end = max_chunk_bytes.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // first character alone is wider than the limit
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head.to_string());
        rest = tail;
    }

    chunks
}

/// Join chunks in index order
#[must_use]
pub fn decode<S: AsRef<str>>(chunks: &[S]) -> String {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = String::with_capacity(total);
    for chunk in chunks {
        out.push_str(chunk.as_ref());
    }
    out
}
