//! Property-based tests for the stock figures and input parsing.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use chrono::{Duration, TimeZone, Utc};
use inventory_tracker::{
    services::stock_status::{classify, StockStatus},
    validation::{parse_date, parse_number},
};
use proptest::prelude::*;
use serde_json::json;

fn quantity_strategy() -> impl Strategy<Value = f64> {
    (0u32..100_000).prop_map(|q| f64::from(q) / 4.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn status_bands_follow_the_minimum(quantity in quantity_strategy(), min in quantity_strategy()) {
        let status = classify(quantity, min);
        let expected = if quantity <= min * 0.5 {
            StockStatus::Critical
        } else if quantity <= min {
            StockStatus::Low
        } else {
            StockStatus::Stable
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn more_stock_never_worsens_status(quantity in quantity_strategy(), extra in quantity_strategy(), min in quantity_strategy()) {
        // Critical < Low < Stable
        prop_assert!(classify(quantity + extra, min) >= classify(quantity, min));
    }

    #[test]
    fn anything_above_the_minimum_is_stable(min in quantity_strategy(), extra in 1u32..1_000) {
        prop_assert_eq!(classify(min + f64::from(extra), min), StockStatus::Stable);
    }
}

proptest! {
    #[test]
    fn numeric_strings_parse_like_numbers(n in -1_000_000i64..1_000_000) {
        prop_assert_eq!(parse_number(&json!(n)), Some(n as f64));
        prop_assert_eq!(parse_number(&json!(n.to_string())), Some(n as f64));
    }

    #[test]
    fn non_numeric_strings_are_rejected(s in "[a-zA-Z ]{1,12}") {
        // "inf" and "nan" spellings parse as floats but are not finite
        prop_assert_eq!(parse_number(&json!(s)), None);
    }

    #[test]
    fn bare_dates_are_midnight_utc(offset in 0i64..20_000) {
        let day = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset);
        let raw = day.format("%Y-%m-%d").to_string();
        prop_assert_eq!(parse_date(&raw), Some(day));
    }
}
