//! Reading time estimation

use super::ContentBlock;

/// Average reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace-separated words in every heading and body block
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let heading = block.heading.split_whitespace().count();
            let body: usize = block
                .body
                .iter()
                .map(|item| item.text().split_whitespace().count())
                .sum();
            heading + body
        })
        .sum()
}

/// Estimated minutes to read at `words_per_minute`, rounded up
pub fn reading_time(content: &[ContentBlock], words_per_minute: usize) -> usize {
    count_words(content).div_ceil(words_per_minute.max(1))
}
