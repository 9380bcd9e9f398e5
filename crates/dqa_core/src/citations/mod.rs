use crate::domain::{AnswerMessage, FormattedResult};
use crate::error::{AppError, ErrorKind};

/// Replace each annotation's source text with `[i]` and collect `[i] filename` citations.
///
/// Annotations are processed in the order the vendor returned them. Only the first occurrence
/// of each annotation's text is replaced, so identical text earlier in the answer wins.
/// Annotations without a file citation still consume their index, leaving gaps in the list.
pub fn format_message<F>(message: &AnswerMessage, mut resolve_filename: F) -> Result<FormattedResult, AppError>
where
    F: FnMut(&str) -> Result<String, AppError>,
{
    let content = message.first_text().ok_or_else(|| {
        AppError::new("FORMAT_NO_TEXT_CONTENT", "Answer message has no text content")
            .with_kind(ErrorKind::Formatting)
            .with_details(format!("message_id={}", message.id))
    })?;

    let mut response = content.value.clone();
    let mut citations: Vec<String> = Vec::new();

    for (index, annotation) in content.annotations.iter().enumerate() {
        if !annotation.text.is_empty() {
            response = response.replacen(annotation.text.as_str(), &format!("[{index}]"), 1);
        }
        if let Some(file_id) = annotation.cited_file_id() {
            let filename = resolve_filename(file_id)?;
            citations.push(format!("[{index}] {filename}"));
        }
    }

    Ok(FormattedResult { response, citations })
}
