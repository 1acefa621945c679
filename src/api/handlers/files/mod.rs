pub mod events;
pub mod list;
pub mod manage;
pub mod types;
pub mod upload;

// Re-export all types
pub use types::*;

// Re-export all handlers
pub use events::file_events;
pub use list::list_files;
pub use manage::{delete_file, purge_file, restore_file, toggle_favourite};
pub use upload::upload_file;

use crate::api::error::AppError;
use crate::services::tenant::{Principal, Scope, resolve_scope};
use axum::Extension;

/// Mutating routes need both an identity and a scope to act in.
pub(crate) fn require_principal(
    principal: Option<Extension<Principal>>,
) -> Result<(Principal, Scope), AppError> {
    let Some(Extension(principal)) = principal else {
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    };
    let scope = resolve_scope(Some(&principal))
        .ok_or_else(|| AppError::Unauthorized("No scope for this identity".to_string()))?;
    Ok((principal, scope))
}
