//! Fixed prompt material for every category in the suite.

use base64::Engine;
use base64::engine::general_purpose;

use crate::tokenizer::Tokenizer;

/// Prompt for the generation-speed runs. Long enough to produce a steady
/// stream of output tokens.
pub const SPEED_PROMPT: &str = "Write a detailed explanation of how neural networks learn through backpropagation. Include the mathematical concepts involved.";

/// Paragraph repeated to build the large-context prompt.
pub const CONTEXT_PARAGRAPH: &str = "The history of artificial intelligence is a fascinating journey through decades of research, breakthroughs, and setbacks. From the early days at Dartmouth in 1956 to the modern era of large language models, the field has evolved dramatically.";

/// Question appended after the repeated paragraphs.
pub const CONTEXT_QUESTION: &str =
    "\n\nBased on the text above, provide a brief 2-sentence summary.";

pub const BINARY_SEARCH_PROMPT: &str = "Write a Python function for binary search that returns the index of the target element, or -1 if not found. Include type hints.";

/// Snippet handed to the debug task. The second recursive call is wrong.
pub const BUGGY_FIBONACCI: &str = r#"
def fibonacci(n):
    if n <= 1:
        return n
    return fibonacci(n-1) + fibonacci(n-3)  # Bug here

print(fibonacci(10))  # Should print 55
"#;

pub const QUICKSORT_PROMPT: &str =
    "Explain the quicksort algorithm. What is its average and worst-case time complexity?";

pub const VISION_QUESTION: &str = "What color is this image?";

pub const MATH_PROMPT: &str = "A train travels at 60 mph for 2 hours, then at 80 mph for 1.5 hours. What is the total distance traveled? Show your work.";

pub const LOGIC_PROMPT: &str = "If all roses are flowers, and some flowers fade quickly, can we conclude that some roses fade quickly? Explain your reasoning.";

/// Question, expected answer substring, short label for the report.
pub const FACTUAL_QUESTIONS: [(&str, &str, &str); 5] = [
    (
        "What is the speed of light in meters per second?",
        "299792458",
        "speed of light",
    ),
    (
        "What is the chemical formula for water?",
        "H2O",
        "water formula",
    ),
    ("Who wrote Romeo and Juliet?", "Shakespeare", "shakespeare"),
    (
        "What is the largest planet in our solar system?",
        "Jupiter",
        "largest planet",
    ),
    ("What year did World War II end?", "1945", "WWII end"),
];

/// A complete 1x1 red PNG, used to probe vision support.
pub const RED_PIXEL_PNG: [u8; 70] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, // 8-bit RGB
    0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, // IDAT chunk
    0x54, 0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, // compressed red pixel
    0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x05, 0xFE, //
    0xD4, 0xEF, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, // IEND chunk
    0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82, //
];

/// Debug-task prompt wrapping the buggy snippet in a fenced block.
pub fn debug_prompt() -> String {
    format!(
        "Find and fix the bug in this code:\n```python\n{}\n```",
        BUGGY_FIBONACCI
    )
}

/// The probe PNG as a data: URL in the OpenAI image_url format.
pub fn red_pixel_data_url() -> String {
    let encoded = general_purpose::STANDARD.encode(RED_PIXEL_PNG);
    format!("data:image/png;base64,{}", encoded)
}

/// Repeat the context paragraph until the prompt holds at least
/// `target_tokens` tokens, then append the summary question.
pub fn large_context_prompt(tokenizer: &Tokenizer, target_tokens: usize) -> String {
    let paragraph = format!("{}\n", CONTEXT_PARAGRAPH);
    let per_repeat = tokenizer.count_tokens(&paragraph).max(1);
    let repeats = target_tokens.div_ceil(per_repeat);

    let mut text = paragraph.repeat(repeats);
    // BPE merges across paragraph boundaries can leave the estimate a few
    // tokens short; top up until the target holds
    while tokenizer.count_tokens(&text) < target_tokens {
        text.push_str(&paragraph);
    }

    text.push_str(CONTEXT_QUESTION);
    text
}
