use anyhow::Result;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

/// Local token counting, used to size the large-context prompt before it
/// is sent.
pub struct Tokenizer {
    encoder: CoreBPE,
}

impl Tokenizer {
    pub fn new(model: &str) -> Result<Self> {
        let encoder = if model.contains("gpt-4o") {
            o200k_base()?
        } else {
            // cl100k is a reasonable default for everything else; counts
            // only need to be close, not exact
            cl100k_base()?
        };

        Ok(Self { encoder })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        // Counts tokens in the raw text only. Chat format markers and role
        // indicators add protocol overhead on top, so the prompt_tokens the
        // server reports will run a little higher than this.
        self.encoder.encode_with_special_tokens(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_counting() {
        let tokenizer = Tokenizer::new("Kimi-K2.5").unwrap();

        let count = tokenizer.count_tokens("Hello, world!");
        assert!(count > 0);

        // Tokens and words are usually different
        let text = "This is a test";
        let word_count = text.split_whitespace().count();
        let token_count = tokenizer.count_tokens(text);
        println!("Words: {}, Tokens: {}", word_count, token_count);
    }

    #[test]
    fn longer_text_counts_more_tokens() {
        let tokenizer = Tokenizer::new("Kimi-K2.5").unwrap();
        let short = tokenizer.count_tokens("one sentence");
        let long = tokenizer.count_tokens("one sentence repeated ".repeat(50).as_str());
        assert!(long > short);
    }
}
