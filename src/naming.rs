//! Download filename derivation.
//!
//! A compressed result is offered as `<original-base-name>-compressed.<ext>`,
//! where `<ext>` follows the selected output format rather than the source:
//! - `holiday.png` + WEBP → `holiday-compressed.webp`
//! - `scan.final.jpeg` + JPEG → `scan.final-compressed.jpg`
//! - `README` + PNG → `README-compressed.png`

use crate::types::OutputFormat;

/// Base name used when the original name is empty or only an extension.
const FALLBACK_BASE: &str = "image";

/// Strip any directory part and the last extension from a file name.
///
/// Pickers on some platforms hand over full paths, so both `/` and `\` are
/// treated as separators. A leading dot (`.hidden`) is part of the name, not
/// an extension marker.
pub fn base_name(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Build the download name for a result encoded as `format`.
pub fn compressed_file_name(original: &str, format: OutputFormat) -> String {
    let base = base_name(original);
    let base = if base.is_empty() { FALLBACK_BASE } else { base };
    format!("{}-compressed.{}", base, format.extension())
}
