use crate::config::UploadConfig;
use crate::error::{VtrackError, VtrackResult};
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> VtrackResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(VtrackError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("email") => "Invalid email format".to_string(),
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Checks an upload against the configured limits and returns the stored
/// file type (lowercase extension, `jpeg` folded into `jpg`).
pub fn validate_upload(file_name: &str, size: usize, config: &UploadConfig) -> VtrackResult<String> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| VtrackError::validation("file", "File name has no extension"))?;

    if !config.allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(VtrackError::validation(
            "file",
            format!("File type '{}' is not allowed", extension),
        ));
    }

    if size > config.max_file_size {
        return Err(VtrackError::validation(
            "file",
            format!("File exceeds the {} byte limit", config.max_file_size),
        ));
    }

    Ok(if extension == "jpeg" { "jpg".to_string() } else { extension })
}
