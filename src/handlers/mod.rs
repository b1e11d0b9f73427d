//! LLM-backed implementations of the pipeline's collaborators.

use crate::{
    language::Language,
    process::InterpreterType,
    prompt::{self, PromptKind},
};

pub mod code;
pub mod decide;
pub mod evaluate;
pub mod goals;
pub mod judge;
pub mod refactor;
pub mod regenerate;

/// System prompt shared by initial generation and regeneration.
pub(crate) fn code_system_prompt(language: Language, interpreter: InterpreterType) -> String {
    let libraries = match interpreter {
        InterpreterType::Python => PromptKind::PythonLibraries,
        InterpreterType::R => PromptKind::RLibraries,
    };
    prompt::render(
        language,
        PromptKind::GenerateCodeSystem,
        &[
            ("programming_language", interpreter.display_name()),
            ("library_instruction", prompt::prompt_text(language, libraries)),
        ],
    )
}
