//! Instruction template wrapped around every patient note.
//!
//! The template is a wire format shared with the fine-tuned model: the exact
//! tokens and the lack of separators around the note must not change.

pub const SYSTEM_PROMPT: &str = "You are a resourceful medical assistant. Please ensure your answers are unbiased. Make sure the answers are from the text provided.";

pub const TASK_DESC: &str =
    "Extract phrases from this text which may help understand the patient's medical condition.";

/// Closes the instruction block; the model's answer follows it.
pub const INST_CLOSE: &str = "[/INST]";

pub fn build_prompt(note: &str) -> String {
    format!(
        "<s>[INST]<<SYS>>{sys}<<SYS>>Patient Note:{note}{task}{close}",
        sys = SYSTEM_PROMPT,
        note = note,
        task = TASK_DESC,
        close = INST_CLOSE,
    )
}
