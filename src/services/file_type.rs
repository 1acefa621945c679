use crate::api::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Recognized file types. Anything else is rejected at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Csv,
    Pdf,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Image, FileType::Csv, FileType::Pdf];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Csv => "csv",
            FileType::Pdf => "pdf",
        }
    }

    /// Maps an upload's MIME type onto a file type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(FileType::Pdf),
            "text/csv" | "application/csv" => Some(FileType::Csv),
            m if m.starts_with("image/") => Some(FileType::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(FileType::Image),
            "csv" => Ok(FileType::Csv),
            "pdf" => Ok(FileType::Pdf),
            other => Err(AppError::Validation(format!(
                "Unrecognized file type '{}'",
                other
            ))),
        }
    }
}

/// Type restriction of a query. `All` is the same as no restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(FileType),
}

impl FromStr for TypeFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(TypeFilter::All)
        } else {
            s.parse().map(TypeFilter::Only)
        }
    }
}

impl TypeFilter {
    pub fn as_type(&self) -> Option<FileType> {
        match self {
            TypeFilter::All => None,
            TypeFilter::Only(t) => Some(*t),
        }
    }
}
