//! Prompt text sent to the generation service.

use notably_store::{NoteFormat, truncate_chars};

/// Instruction paired with an image for text extraction.
pub const IMAGE_EXTRACTION_PROMPT: &str =
    "Extract all text from this image. Be thorough and capture everything visible.";

/// Characters of source content shown to the title prompt.
pub const TITLE_CONTEXT_CHARS: usize = 500;

const COMPLETENESS_WITH_INSTRUCTIONS: &str = "IMPORTANT: Include ALL information from the document. Do not truncate or summarize briefly. Be thorough and comprehensive, capturing every detail, concept, and piece of information present in the content.";

const COMPLETENESS_DEFAULT: &str = "IMPORTANT: Include ALL information from the document. Do not truncate or summarize briefly. Be thorough and comprehensive, capturing every detail, concept, example, date, number, and piece of information present. This is not a summary - it should be complete notes that preserve all the information from the original content.";

/// Structural instruction for each format.
pub fn format_instruction(format: NoteFormat) -> &'static str {
    match format {
        NoteFormat::BulletPoints => {
            "Create organized bullet points with clear hierarchy and categories."
        }
        NoteFormat::Outline => {
            "Create a structured outline with main topics and subtopics using numbers and letters."
        }
        NoteFormat::Paragraph => "Write clear, well-organized paragraphs.",
    }
}

/// How a format is named inside the revision prompt.
pub fn format_phrase(format: NoteFormat) -> &'static str {
    match format {
        NoteFormat::BulletPoints => "bullet points",
        NoteFormat::Outline => "outline",
        NoteFormat::Paragraph => "paragraphs",
    }
}

/// Ask for a 5-8 word title based on the head of `content`.
pub fn title_prompt(content: &str) -> String {
    format!(
        "Generate a short, descriptive title (5-8 words max) for notes about this content: {}... Only return the title, nothing else.",
        truncate_chars(content, TITLE_CONTEXT_CHARS)
    )
}

/// Ask for full notes of `content` in `format`.
///
/// Non-blank custom instructions replace the default lead-in.
pub fn summary_prompt(
    content: &str,
    format: NoteFormat,
    custom_instructions: Option<&str>,
) -> String {
    let instruction = format_instruction(format);
    match custom_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => format!(
            "{custom}\n\n{instruction}\n\n{COMPLETENESS_WITH_INSTRUCTIONS}\n\nContent:\n{content}"
        ),
        None => format!(
            "Create comprehensive, detailed notes from the following content. {instruction}\n\n{COMPLETENESS_DEFAULT}\n\nContent:\n{content}"
        ),
    }
}

/// Ask for the whole note rewritten per `instruction`.
pub fn revision_prompt(summary: &str, instruction: &str, format: NoteFormat) -> String {
    format!(
        "Current note content:\n{summary}\n\nUser request: {instruction}\n\nPlease modify the note according to the user's request. Return the full updated note content in the same format ({}). Only return the updated note, nothing else.",
        format_phrase(format)
    )
}
