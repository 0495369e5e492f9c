//! Preflight token estimation.
//!
//! Counts are a budgeting aid shown before anything is sent to an agent, not
//! a billing-accurate figure. Roughly four bytes of source text per token.

const BYTES_PER_TOKEN: usize = 4;

pub fn count(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_tokens() {
        assert_eq!(count(""), 0);
    }

    #[test]
    fn rounds_partial_tokens_up() {
        assert_eq!(count("abc"), 1);
        assert_eq!(count("abcd"), 1);
        assert_eq!(count("abcde"), 2);
    }
}
