//! Updated document export: the invoice JSON with OCR results merged in.

use crate::format::error::FormatError;
use crate::format::traits::{ExportData, ExportFormat, ExportResult};

/// Pretty-printed invoice document.
pub struct DocumentFormat;

impl ExportFormat for DocumentFormat {
    fn id(&self) -> &'static str {
        "document"
    }

    fn display_name(&self) -> &'static str {
        "Updated document (JSON)"
    }

    fn suffix(&self) -> &'static str {
        "-updated.json"
    }

    fn export_to_bytes(
        &self,
        data: &ExportData<'_>,
    ) -> Result<(Vec<u8>, ExportResult), FormatError> {
        let json = data.document.to_json_pretty()?;
        Ok((json.into_bytes(), ExportResult::new()))
    }
}
