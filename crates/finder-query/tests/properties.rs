mod common;
use common::*;

use std::sync::Arc;

use finder_query::{
    ColumnDescription, ColumnOption, ColumnOptionsMode, FindOptions, Pagination, QueryToken,
    QueryTokenType, SubTokensOptions, TypeReference, can_have_min, disable_grouping,
    enable_grouping, has_aggregate, is_prefix, to_query_token,
};
use proptest::prelude::*;

fn all_options() -> SubTokensOptions {
    SubTokensOptions::CAN_AGGREGATE | SubTokensOptions::CAN_ANY_ALL | SubTokensOptions::CAN_ELEMENT
}

/// Walks the schema picking one sub-token per step.
fn walk(choices: &[usize]) -> Arc<QueryToken> {
    let schema = order_schema();
    let mut current: Option<Arc<QueryToken>> = None;
    for choice in choices {
        let subs = schema.sub_tokens(current.as_ref(), all_options());
        if subs.is_empty() {
            break;
        }
        current = Some(Arc::clone(&subs[choice % subs.len()]));
    }
    current.unwrap()
}

fn arb_token() -> impl Strategy<Value = Arc<QueryToken>> {
    prop::collection::vec(0usize..64, 1..5).prop_map(|choices| walk(&choices))
}

fn arb_columns() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(
        vec![
            "Id", "Status", "Amount", "Customer", "Lines", "CreatedOn", "Notes", "Priority",
            "Customer.Name", "Lines.Element.Quantity", "Lines.Element.Product",
        ],
        1..6,
    )
    .prop_map(|cols| cols.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn aggregate_flag_is_inherited(token in arb_token()) {
        let expected = if token.query_token_type == Some(QueryTokenType::Aggregate) {
            true
        } else {
            has_aggregate(token.parent.as_deref())
        };
        prop_assert_eq!(has_aggregate(Some(token.as_ref())), expected);
    }

    #[test]
    fn full_key_extends_parent(token in arb_token()) {
        match token.parent() {
            Some(parent) => {
                prop_assert_eq!(&token.full_key, &format!("{}.{}", parent.full_key, token.key));
                prop_assert!(is_prefix(parent, &token));
            }
            None => prop_assert_eq!(&token.full_key, &token.key),
        }
    }

    #[test]
    fn prefix_is_reflexive_and_antisymmetric(a in arb_token(), b in arb_token()) {
        prop_assert!(is_prefix(&a, &a));
        if is_prefix(&a, &b) && is_prefix(&b, &a) {
            prop_assert_eq!(&a.full_key, &b.full_key);
        }
    }

    #[test]
    fn column_token_keeps_name(name in "[A-Z][A-Za-z0-9]{0,12}") {
        let token = to_query_token(&ColumnDescription::new(name.clone(), TypeReference::new("string"), None));
        prop_assert_eq!(&token.key, &name);
        prop_assert_eq!(&token.full_key, &name);
    }

    #[test]
    fn grouping_round_trip_restores_surviving_columns(columns in arb_columns()) {
        let schema = order_schema();
        let fo = columns.iter().fold(
            FindOptions::new(QUERY).columns_mode(ColumnOptionsMode::Replace),
            |fo, c| fo.column(ColumnOption::new(c.clone())),
        );
        let mut fop = parse(&fo);
        let survivors: Vec<String> = fop
            .column_options
            .iter()
            .filter_map(|c| c.token.as_ref())
            .filter(|t| can_have_min(&t.type_ref) || t.is_groupable)
            .map(|t| t.full_key.clone())
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(enable_grouping(&mut fop, &schema)).unwrap();
        disable_grouping(&mut fop, schema.description());

        prop_assert_eq!(column_keys(&fop), survivors);
    }

    #[test]
    fn pages_cover_all_elements(per_page in 1u32..100, total in 0u64..10_000) {
        let pagination = Pagination::paginate(per_page, 1);
        let pages = pagination.total_pages(total);
        prop_assert!(pages >= 1);
        prop_assert!(pages * u64::from(per_page) >= total);

        let last = Pagination::paginate(per_page, pages as u32);
        prop_assert!(last.start_element_index() <= total.max(1));
    }
}
