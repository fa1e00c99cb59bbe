//! Property-based tests for the field bag and document set records.

use proptest::prelude::*;
use std::collections::BTreeMap;

use crate::{DocumentKind, ExtractedFields, ExtractedTestRow, SpecificationEntry};

fn arb_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Coa),
        Just(DocumentKind::Msds),
        Just(DocumentKind::Tds),
    ]
}

prop_compose! {
    fn arb_value()(value in "[A-Za-z0-9][A-Za-z0-9 %.\\-]{0,23}") -> String {
        value
    }
}

prop_compose! {
    fn arb_test_row()(
        test_item in arb_value(),
        specification in arb_value(),
        result in arb_value(),
        document_type in arb_kind(),
    ) -> ExtractedTestRow {
        ExtractedTestRow { test_item, method: None, specification, result, document_type }
    }
}

prop_compose! {
    fn arb_fields()(
        product_name in proptest::option::of(arb_value()),
        cas_number in proptest::option::of("[1-9][0-9]{1,6}-[0-9]{2}-[0-9]"),
        inci_name in proptest::option::of(arb_value()),
        test_results in proptest::collection::vec(arb_test_row(), 0..5),
        specifications in proptest::collection::vec((arb_value(), arb_value()), 0..5),
        safety in proptest::collection::btree_map("[a-z]{2,8}", arb_value(), 0..3),
    ) -> ExtractedFields {
        ExtractedFields {
            product_name,
            cas_number,
            inci_name,
            test_results,
            specifications: specifications
                .into_iter()
                .map(|(name, value)| SpecificationEntry { name, value })
                .collect(),
            safety_data: safety,
            ..Default::default()
        }
    }
}

proptest! {
    #[test]
    fn extracted_fields_survive_json_storage(fields in arb_fields()) {
        let stored = serde_json::to_string(&fields).unwrap();
        let loaded: ExtractedFields = serde_json::from_str(&stored).unwrap();
        prop_assert_eq!(loaded, fields);
    }

    #[test]
    fn merging_an_empty_bag_changes_nothing(fields in arb_fields()) {
        let mut merged = fields.clone();
        merged.merge(ExtractedFields::default());
        prop_assert_eq!(merged, fields);
    }

    #[test]
    fn merge_never_loses_a_present_value(base in arb_fields(), later in arb_fields()) {
        let mut merged = base.clone();
        merged.merge(later.clone());

        if base.product_name.is_some() || later.product_name.is_some() {
            prop_assert!(merged.product_name.is_some());
        }
        let expected_keys: BTreeMap<_, _> = base.safety_data.iter()
            .chain(later.safety_data.iter())
            .collect();
        prop_assert_eq!(merged.safety_data.len(), expected_keys.len());
    }
}
