//! Outbound reply composition.
//!
//! The platform caps a text message at 5000 characters, so long research
//! results are delivered as an ordered run of labeled messages.

/// Platform per-message character limit.
pub const MAX_MESSAGE_CHARS: usize = 5000;

const RESULT_LABEL: &str = "Research result:\n\n";
const CONTINUED_LABEL: &str = "Research result (continued):\n\n";

/// Split result text into labeled, platform-sized messages.
///
/// Slices are contiguous, in input order, and counted in characters so
/// multi-byte text never splits mid-character. Stripping the labels and
/// concatenating the slices reproduces the input exactly.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::from(RESULT_LABEL);
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(current);
            current = String::from(CONTINUED_LABEL);
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    chunks.push(current);
    chunks
}

/// [`chunk`] at the platform limit.
pub fn chunk_result(text: &str) -> Vec<String> {
    chunk(text, MAX_MESSAGE_CHARS)
}
