// Recover the JSON array from free-form model output.
//
// Heuristic, not a parser: takes the span from the first '[' to the last ']'.
// This recovers arrays wrapped in prose, markdown fences or trailing
// commentary, at the cost of occasionally grabbing an unintended bracketed
// span (e.g. "[note]" in a preamble). The validator then reports MalformedJson
// for such spans rather than guessing further.

use super::ExtractionError;

/// Return the substring from the first `[` to the last `]`, inclusive.
pub fn extract_json_array(text: &str) -> Result<&str, ExtractionError> {
    let start = text.find('[').ok_or(ExtractionError::NoJsonArrayFound)?;
    let end = text.rfind(']').ok_or(ExtractionError::NoJsonArrayFound)?;

    if start >= end {
        return Err(ExtractionError::NoJsonArrayFound);
    }

    let span = &text[start..=end];
    if span.len() < text.len() {
        tracing::debug!(
            raw_len = text.len(),
            span_len = span.len(),
            "Trimmed non-JSON text around model array"
        );
    }
    Ok(span)
}
