use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page index {0} out of bounds ({1} pages)")]
    PageIndexOutOfBounds(i64, usize),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("parse error at byte {0}: {1}")]
    Parse(usize, String),

    #[error("invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("compression error: {0}")]
    Compression(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        let error = PdfError::PageIndexOutOfBounds(-5, 4);
        assert_eq!(error.to_string(), "page index -5 out of bounds (4 pages)");

        let error = PdfError::InvalidReference(999, 0);
        assert_eq!(error.to_string(), "invalid object reference: 999 0 R");

        let error = PdfError::TypeMismatch("only pages can be inserted".to_string());
        assert_eq!(error.to_string(), "type mismatch: only pages can be inserted");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error = PdfError::from(io_error);

        match pdf_error {
            PdfError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_all_error_variants_display() {
        let errors = vec![
            PdfError::PageIndexOutOfBounds(0, 0),
            PdfError::TypeMismatch("test".to_string()),
            PdfError::InvalidOperation("test".to_string()),
            PdfError::Parse(12, "unexpected token".to_string()),
            PdfError::InvalidStructure("missing trailer".to_string()),
            PdfError::InvalidReference(1, 0),
            PdfError::Compression("deflate failed".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
