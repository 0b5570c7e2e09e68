/// System prompt for structuring pasted recipe text.
///
/// The prompts are loaded from text files at compile time using the
/// `include_str!` macro, making them easy to edit without dealing with
/// Rust string syntax.
pub const TEXT_EXTRACTION_PROMPT: &str = include_str!("text_prompt.txt");

/// System prompt for reading a recipe out of a photo.
pub const IMAGE_EXTRACTION_PROMPT: &str = include_str!("image_prompt.txt");
