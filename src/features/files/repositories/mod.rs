mod pdf_file_repository;

pub use pdf_file_repository::{PdfFileRepository, PgPdfFileRepository};
