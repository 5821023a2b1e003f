//! CPF/CNPJ normalization.
//!
//! Every document that enters the pipeline goes through [`normalize`] first,
//! so the rest of the crate only ever sees digit-only strings.

use crate::errors::AppError;
use crate::models::{Document, DocumentKind};

/// Strips every non-digit character.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Classifies a canonical digit string by length.
pub fn classify(digits: &str) -> Option<DocumentKind> {
    match digits.len() {
        DocumentKind::CPF_LEN => Some(DocumentKind::Cpf),
        DocumentKind::CNPJ_LEN => Some(DocumentKind::Cnpj),
        _ => None,
    }
}

/// Canonicalizes and classifies a raw CPF or CNPJ.
///
/// `"123.456.789-09"` becomes a CPF `12345678909`; `"11.222.333/0001-81"` a
/// CNPJ `11222333000181`. Any other digit count is rejected with
/// [`AppError::InvalidDocument`] carrying that count.
pub fn normalize(raw: &str) -> Result<Document, AppError> {
    let digits = digits_only(raw);
    match classify(&digits) {
        Some(kind) => Ok(Document { kind, digits }),
        None => Err(AppError::InvalidDocument {
            length: digits.len(),
        }),
    }
}
