use crate::api::error::AppError;
use crate::services::file_type::FileType;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;

pub fn validate_content_size(size: usize, max_size: usize) -> Result<()> {
    if size == 0 {
        return Err(ValidationError {
            code: "EMPTY_FILE",
            message: "File content is empty".to_string(),
        });
    }
    if size > max_size {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds maximum allowed size of {} bytes",
                size, max_size
            ),
        });
    }
    Ok(())
}

/// Reduces a client supplied name to a safe display name.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    // Get only the filename component (remove any path)
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.is_empty() {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.starts_with('.') {
        return Err(ValidationError {
            code: "HIDDEN_FILE",
            message: "Hidden files (starting with '.') are not allowed".to_string(),
        });
    }

    Ok(sanitized)
}

/// Rejects content whose magic bytes identify a different type than declared.
/// Content with no recognizable signature (plain text, CSV) is accepted.
pub fn verify_declared_type(declared: FileType, content: &[u8]) -> Result<()> {
    let Some(kind) = infer::get(content) else {
        return Ok(());
    };

    if FileType::from_mime(kind.mime_type()) == Some(declared) {
        return Ok(());
    }

    tracing::warn!(
        "Declared type {} contradicts detected content {}",
        declared,
        kind.mime_type()
    );
    Err(ValidationError {
        code: "TYPE_MISMATCH",
        message: format!(
            "Content looks like {} but was declared as {}",
            kind.mime_type(),
            declared
        ),
    })
}
