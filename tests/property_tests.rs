/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
mod common;

use common::{cpf_record, FakeFetcher};
use proptest::prelude::*;
use rust_complyance_api::document::{digits_only, normalize};
use rust_complyance_api::errors::AppError;
use rust_complyance_api::expansion::{Expander, ExpansionOptions};
use rust_complyance_api::extraction::extract_related;
use rust_complyance_api::models::{DocumentKind, SkipReason};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

// Property: normalization never panics and agrees with the digit count
proptest! {
    #[test]
    fn normalize_never_panics(raw in "\\PC*") {
        let _ = normalize(&raw);
    }

    #[test]
    fn normalize_accepts_exactly_11_or_14_digits(raw in "[0-9 ./-]{0,30}") {
        let digits = digits_only(&raw);
        match normalize(&raw) {
            Ok(doc) => {
                prop_assert_eq!(&doc.digits, &digits);
                prop_assert_eq!(doc.digits.len(), doc.kind.digit_len());
            }
            Err(AppError::InvalidDocument { length }) => {
                prop_assert_eq!(length, digits.len());
                prop_assert!(length != 11 && length != 14);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn formatting_does_not_change_the_document(digits in "[0-9]{11}") {
        let formatted = format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        );
        let plain = normalize(&digits).unwrap();
        let pretty = normalize(&formatted).unwrap();
        prop_assert_eq!(plain, pretty);
    }

    #[test]
    fn cnpj_formatting_is_recognised(digits in "[0-9]{14}") {
        let formatted = format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        );
        let doc = normalize(&formatted).unwrap();
        prop_assert_eq!(doc.kind, DocumentKind::Cnpj);
        prop_assert_eq!(doc.digits, digits);
    }
}

// Property: extraction never panics on arbitrary JSON and yields canonical, unique ids
proptest! {
    #[test]
    fn extraction_yields_unique_canonical_ids(
        ids in prop::collection::vec("[0-9]{10,15}", 0..12),
        company_side in any::<bool>()
    ) {
        let record = if company_side {
            json!({ "Result": [{
                "Shareholders": ids.iter().map(|id| json!({ "TaxIdNumber": id })).collect::<Vec<_>>()
            }]})
        } else {
            json!({ "Result": [{
                "Companies": ids.iter().map(|id| json!({ "TaxIdNumber": id })).collect::<Vec<_>>()
            }]})
        };
        let kind = if company_side { DocumentKind::Cnpj } else { DocumentKind::Cpf };

        let related = extract_related(kind, &record);

        let unique: HashSet<&String> = related.iter().collect();
        prop_assert_eq!(unique.len(), related.len());
        for id in &related {
            prop_assert_eq!(id.len(), kind.opposite().digit_len());
            prop_assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn extraction_tolerates_odd_shapes(text in "\\PC{0,40}", n in any::<i64>()) {
        let record = json!({ "Result": [{
            "BasicData": { "OfficialName": n },
            "Shareholders": text,
            "Companies": [null, n, { "TaxIdNumber": n }],
            "EconomicRelationships": { "CompanyTaxId": text }
        }]});
        let _ = extract_related(DocumentKind::Cnpj, &record);
        let _ = extract_related(DocumentKind::Cpf, &record);
    }
}

// Property: expansion stays bounded and never fetches a document twice
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn expansion_is_bounded_and_duplicate_free(
        suffixes in prop::collection::vec(0u32..20, 0..15),
        concurrency in 1usize..8
    ) {
        let companies: Vec<String> = suffixes
            .iter()
            .map(|s| format!("112223330001{:02}", s))
            .collect();
        let refs: Vec<&str> = companies.iter().map(String::as_str).collect();
        let fetcher = Arc::new(
            FakeFetcher::new().with_record("11144477735", cpf_record("X", &refs)),
        );
        let expander = Expander::new(
            fetcher.clone(),
            ExpansionOptions { max_related: 5, concurrency },
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let expansion = runtime.block_on(expander.expand("11144477735")).unwrap();

        let distinct: Vec<&String> = {
            let mut seen = HashSet::new();
            companies.iter().filter(|c| seen.insert(*c)).collect()
        };

        prop_assert!(expansion.aggregate.related.len() <= 5);
        prop_assert_eq!(
            expansion.aggregate.related.len(),
            distinct.len().min(5)
        );
        prop_assert_eq!(
            expansion
                .skipped
                .iter()
                .filter(|s| s.reason == SkipReason::LimitExceeded)
                .count(),
            distinct.len().saturating_sub(5)
        );

        let calls = fetcher.calls();
        let unique: HashSet<&(DocumentKind, String)> = calls.iter().collect();
        prop_assert_eq!(unique.len(), calls.len());
        prop_assert_eq!(calls.len(), 1 + distinct.len().min(5));
    }
}
