//! Discovery of related documents inside a provider record.
//!
//! A CNPJ record points at the people behind it (the MEI owner embedded in
//! the official name, the shareholders list); a CPF record points at the
//! companies the person is tied to. Provider payloads have no fixed schema,
//! so every lookup here tolerates missing fields and wrong types and simply
//! finds nothing.

use crate::document::digits_only;
use crate::models::{DocumentKind, FetchedRecord};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"));

/// Documents of the opposite kind referenced by `record`, deduplicated,
/// in order of first appearance.
pub fn extract_related(kind: DocumentKind, record: &FetchedRecord) -> Vec<String> {
    let candidates = match kind {
        DocumentKind::Cnpj => extract_cpfs_from_cnpj(record),
        DocumentKind::Cpf => extract_cnpjs_from_cpf(record),
    };
    dedup_in_order(candidates)
}

fn extract_cpfs_from_cnpj(record: &FetchedRecord) -> Vec<String> {
    let Some(result) = first_result(record) else {
        return Vec::new();
    };

    let mut cpfs = Vec::new();

    // MEI companies carry the owner's CPF inside the official name
    if let Some(official_name) = result
        .get("BasicData")
        .and_then(|b| b.get("OfficialName"))
        .and_then(Value::as_str)
    {
        if let Some(cpf) = embedded_cpf(official_name) {
            cpfs.push(cpf);
        }
    }

    cpfs.extend(tax_ids(result, "Shareholders", "TaxIdNumber", DocumentKind::Cpf));
    cpfs
}

fn extract_cnpjs_from_cpf(record: &FetchedRecord) -> Vec<String> {
    let Some(result) = first_result(record) else {
        return Vec::new();
    };

    let mut cnpjs = tax_ids(result, "Companies", "TaxIdNumber", DocumentKind::Cnpj);
    cnpjs.extend(tax_ids(
        result,
        "EconomicRelationships",
        "CompanyTaxId",
        DocumentKind::Cnpj,
    ));
    cnpjs
}

fn first_result(record: &FetchedRecord) -> Option<&Value> {
    record.get("Result")?.as_array()?.first()
}

/// First standalone run of exactly eleven digits.
// Stricter than taking the first 11 digits of any longer run: a 14-digit CNPJ in the name is not a CPF.
fn embedded_cpf(text: &str) -> Option<String> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|run| run.len() == DocumentKind::CPF_LEN)
        .map(str::to_string)
}

/// Canonical tax ids of `kind` found in `result[list_field][*][id_field]`.
fn tax_ids(result: &Value, list_field: &str, id_field: &str, kind: DocumentKind) -> Vec<String> {
    result
        .get(list_field)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get(id_field).and_then(Value::as_str))
                .map(digits_only)
                .filter(|digits| digits.len() == kind.digit_len())
                .collect()
        })
        .unwrap_or_default()
}

fn dedup_in_order(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|doc| seen.insert(doc.clone()))
        .collect()
}
