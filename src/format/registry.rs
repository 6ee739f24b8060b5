//! Format registry for discovering and accessing export formats.

use std::collections::HashMap;

use crate::format::formats::{AnnotatedImageFormat, CocoFormat, DocumentFormat, LabelsFormat};
use crate::format::traits::ExportFormat;

/// Registry of available export formats.
///
/// All built-in formats are registered on creation.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn ExportFormat>>,
    native: LabelsFormat,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: HashMap::new(),
            native: LabelsFormat,
        };

        registry.register(Box::new(LabelsFormat));
        registry.register(Box::new(CocoFormat));
        registry.register(Box::new(DocumentFormat));
        registry.register(Box::new(AnnotatedImageFormat));

        registry
    }

    /// Register a format implementation.
    pub fn register(&mut self, format: Box<dyn ExportFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn ExportFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Get all registered formats.
    pub fn all(&self) -> Vec<&dyn ExportFormat> {
        self.formats.values().map(|f| f.as_ref()).collect()
    }

    /// Get all format IDs, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The native labels format.
    pub fn native(&self) -> &dyn ExportFormat {
        &self.native
    }

    /// Formats that can read their own output back.
    pub fn import_formats(&self) -> Vec<&dyn ExportFormat> {
        self.all()
            .into_iter()
            .filter(|f| f.supports_import())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
