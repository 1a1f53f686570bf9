mod pdf_file;

pub use pdf_file::{NewPdfFile, PdfFile};
