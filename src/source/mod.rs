//! PDF adapter producing the in-memory document model.

mod content;
mod detect;
mod images;
mod options;
mod pdf_loader;

pub use detect::{detect_version_from_bytes, detect_version_from_path, is_pdf_bytes};
pub use options::{ErrorMode, LoadOptions, PageSelection};
pub use pdf_loader::PdfLoader;
