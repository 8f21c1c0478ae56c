//! Derived item figures. Nothing here touches the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::entities::item;

const MS_PER_DAY: i64 = 86_400_000;

/// Stock level relative to the item's minimum.
///
/// Variants are declared from most to least urgent, so the derived `Ord`
/// sorts critical items first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StockStatus {
    Critical,
    Low,
    Stable,
}

impl StockStatus {
    pub fn is_alert(self) -> bool {
        matches!(self, StockStatus::Critical | StockStatus::Low)
    }
}

pub fn total_value(item: &item::Model) -> f64 {
    item.quantity * item.cost_per_unit
}

/// Boundaries resolve to the more urgent side: `quantity == minStock` is low,
/// `quantity == minStock / 2` is critical.
pub fn stock_status(item: &item::Model) -> StockStatus {
    classify(item.quantity, item.min_stock)
}

pub fn classify(quantity: f64, min_stock: f64) -> StockStatus {
    if quantity <= min_stock * 0.5 {
        StockStatus::Critical
    } else if quantity <= min_stock {
        StockStatus::Low
    } else {
        StockStatus::Stable
    }
}

/// Whole days until expiry, rounded up. Negative once expired.
pub fn days_until_expiry(item: &item::Model, now: DateTime<Utc>) -> Option<i64> {
    item.expiry_date.map(|expiry| {
        let ms = (expiry - now).num_milliseconds();
        // ceil for both signs
        ms.div_euclid(MS_PER_DAY) + i64::from(ms.rem_euclid(MS_PER_DAY) != 0)
    })
}

pub fn is_expiring_within(item: &item::Model, now: DateTime<Utc>, days: i64) -> bool {
    matches!(days_until_expiry(item, now), Some(d) if (0..=days).contains(&d))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::entities::{Category, Location, Supplier, Unit};
    use uuid::Uuid;

    pub fn item(quantity: f64, min_stock: f64, cost_per_unit: f64) -> item::Model {
        let now = Utc::now();
        item::Model {
            id: Uuid::new_v4(),
            name: "Chicken Wings".to_string(),
            quantity,
            unit: Unit::Case,
            min_stock,
            supplier: Supplier::Sysco,
            category: Category::Freezer,
            location: Location::WalkInFreezer,
            cost_per_unit,
            expiry_date: None,
            notes: None,
            is_active: true,
            is_nightly: false,
            last_restocked: now,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::item;
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(0.0, 10.0, StockStatus::Critical)]
    #[case(5.0, 10.0, StockStatus::Critical)]
    #[case(5.5, 10.0, StockStatus::Low)]
    #[case(10.0, 10.0, StockStatus::Low)]
    #[case(10.5, 10.0, StockStatus::Stable)]
    #[case(0.0, 0.0, StockStatus::Critical)]
    #[case(1.0, 0.0, StockStatus::Stable)]
    fn status_boundaries(#[case] quantity: f64, #[case] min: f64, #[case] expected: StockStatus) {
        assert_eq!(stock_status(&item(quantity, min, 1.0)), expected);
    }

    #[test]
    fn total_value_with_zero_cost_is_zero() {
        assert_eq!(total_value(&item(12.0, 5.0, 0.0)), 0.0);
        assert_eq!(total_value(&item(4.0, 5.0, 2.5)), 10.0);
    }

    #[test]
    fn status_strings_are_lowercase() {
        assert_eq!(StockStatus::Critical.to_string(), "critical");
        assert_eq!(StockStatus::from_str("low").unwrap(), StockStatus::Low);
        assert_eq!(
            serde_json::to_value(StockStatus::Stable).unwrap(),
            serde_json::json!("stable")
        );
        assert!(StockStatus::Critical < StockStatus::Low);
    }

    #[test]
    fn days_until_expiry_rounds_up() {
        let now = Utc::now();
        let mut model = item(1.0, 1.0, 1.0);
        assert_eq!(days_until_expiry(&model, now), None);

        model.expiry_date = Some(now + Duration::hours(1));
        assert_eq!(days_until_expiry(&model, now), Some(1));

        model.expiry_date = Some(now + Duration::days(2));
        assert_eq!(days_until_expiry(&model, now), Some(2));

        model.expiry_date = Some(now - Duration::hours(36));
        assert_eq!(days_until_expiry(&model, now), Some(-1));
        assert!(!is_expiring_within(&model, now, 7));
    }

    #[test]
    fn expiring_window_is_inclusive() {
        let now = Utc::now();
        let mut model = item(1.0, 1.0, 1.0);
        model.expiry_date = Some(now + Duration::days(7));
        assert!(is_expiring_within(&model, now, 7));
        model.expiry_date = Some(now + Duration::days(7) + Duration::minutes(1));
        assert!(!is_expiring_within(&model, now, 7));
    }
}
