//! Rendering collaborator
//!
//! Markup rendering is external to Trellis. The snapshot exporter only needs
//! the deployment form of an entity: source text suitable for re-import,
//! without runtime expansion.

use crate::errors::ExError;
use crate::model::Entity;

/// Produces the text form of a renderable entity
pub trait Renderer {
    /// Render the deployment form of `entity`; `Ok(None)` means nothing to write
    ///
    /// # Errors
    ///
    /// Implementations return an error when rendering fails.
    fn render_deployment(&self, entity: &Entity) -> Result<Option<String>, ExError>;
}

/// Returns the stored content verbatim
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredContentRenderer;

impl Renderer for StoredContentRenderer {
    fn render_deployment(&self, entity: &Entity) -> Result<Option<String>, ExError> {
        Ok(entity.content_text().map(str::to_string))
    }
}
