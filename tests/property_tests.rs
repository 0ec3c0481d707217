//! Property-based tests for line validation and partial-update diffing.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use return_orders::entities::return_order_line;
use return_orders::models::aggregate::check_line_quantities;
use return_orders::models::diff::{diff_line, LinePatch};
use rust_decimal::Decimal;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn line_strategy() -> impl Strategy<Value = return_order_line::Model> {
    (
        "[A-Z]{3}[0-9]{3}",
        "[a-z ]{0,12}",
        1i32..500,
        proptest::option::of(0i32..500),
        price_strategy(),
        proptest::option::of("[A-Z]{3}[0-9]{3}"),
    )
        .prop_flat_map(|(sku, item_name, qty, check_qty, price, alter_sku)| {
            (1..=qty).prop_map(move |return_qty| return_order_line::Model {
                order_no: "PROP-1".into(),
                sku: sku.clone(),
                line_no: 1,
                item_name: item_name.clone(),
                qty,
                return_qty,
                check_qty,
                price,
                alter_sku: alter_sku.clone(),
                tracking_no: None,
                create_by: "alice".into(),
                create_date: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
                update_by: None,
                update_date: None,
            })
        })
}

fn patch_strategy() -> impl Strategy<Value = LinePatch> {
    (
        proptest::option::of("[a-z ]{0,12}"),
        proptest::option::of(1i32..500),
        proptest::option::of(1i32..500),
        proptest::option::of(proptest::option::of(0i32..500)),
        proptest::option::of(price_strategy()),
    )
        .prop_map(|(item_name, qty, return_qty, check_qty, price)| LinePatch {
            sku: "ignored".into(),
            item_name,
            qty,
            return_qty,
            check_qty,
            price,
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn quantity_check_accepts_exactly_the_valid_range(
        qty in -5i32..200,
        return_qty in -5i32..200,
        cents in -1_000i64..1_000,
    ) {
        let price = Decimal::new(cents, 2);
        let expected = return_qty > 0 && return_qty <= qty && price >= Decimal::ZERO;
        let result = check_line_quantities("SKU", qty, return_qty, None, price);
        prop_assert_eq!(result.is_ok(), expected);
    }

    #[test]
    fn negative_checked_quantity_is_always_rejected(check in i32::MIN..0) {
        prop_assert!(check_line_quantities("SKU", 5, 1, Some(check), Decimal::ONE).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn patch_mirroring_the_row_produces_no_changes(line in line_strategy()) {
        let patch = LinePatch {
            sku: line.sku.clone(),
            item_name: Some(line.item_name.clone()),
            qty: Some(line.qty),
            return_qty: Some(line.return_qty),
            check_qty: Some(line.check_qty),
            price: Some(line.price),
            alter_sku: Some(line.alter_sku.clone()),
            tracking_no: Some(line.tracking_no.clone()),
        };
        prop_assert!(diff_line(&line, &patch).is_empty());
    }

    #[test]
    fn merged_line_reflects_every_proposed_value(
        line in line_strategy(),
        patch in patch_strategy(),
    ) {
        let changes = diff_line(&line, &patch);
        let merged = changes.merged_into(&line);

        prop_assert_eq!(&merged.item_name, patch.item_name.as_ref().unwrap_or(&line.item_name));
        prop_assert_eq!(merged.qty, patch.qty.unwrap_or(line.qty));
        prop_assert_eq!(merged.return_qty, patch.return_qty.unwrap_or(line.return_qty));
        prop_assert_eq!(merged.check_qty, patch.check_qty.unwrap_or(line.check_qty));
        prop_assert_eq!(merged.price, patch.price.unwrap_or(line.price));

        // Identity and audit columns are never touched by a diff.
        prop_assert_eq!(&merged.sku, &line.sku);
        prop_assert_eq!(merged.line_no, line.line_no);
        prop_assert_eq!(&merged.create_by, &line.create_by);
        prop_assert_eq!(merged.update_date, line.update_date);

        // Applying the same patch again is a no-op.
        prop_assert!(diff_line(&merged, &patch).is_empty());
    }
}
