//! Closed value sets shared by the entities, the request validator and the
//! JSON surface. Each set is declared once here; the database, serde and the
//! validator all read the strings from the `ActiveEnum` definitions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Unit {
    #[sea_orm(string_value = "kg")]
    Kg,
    #[sea_orm(string_value = "lb")]
    Lb,
    #[sea_orm(string_value = "g")]
    G,
    #[sea_orm(string_value = "oz")]
    Oz,
    #[sea_orm(string_value = "L")]
    L,
    #[sea_orm(string_value = "ml")]
    Ml,
    #[sea_orm(string_value = "gal")]
    Gal,
    #[sea_orm(string_value = "box")]
    Boxed,
    #[sea_orm(string_value = "case")]
    Case,
    #[sea_orm(string_value = "each")]
    Each,
    #[sea_orm(string_value = "dozen")]
    Dozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Supplier {
    #[sea_orm(string_value = "Sysco")]
    Sysco,
    #[sea_orm(string_value = "Saputo")]
    Saputo,
    #[sea_orm(string_value = "GFS")]
    Gfs,
    #[sea_orm(string_value = "US Foods")]
    UsFoods,
    #[sea_orm(string_value = "Local Farm")]
    LocalFarm,
    #[sea_orm(string_value = "Costco")]
    Costco,
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Category {
    #[sea_orm(string_value = "Freezer")]
    Freezer,
    #[sea_orm(string_value = "Cooler")]
    Cooler,
    #[sea_orm(string_value = "Sauces")]
    Sauces,
    #[sea_orm(string_value = "Dry Goods")]
    DryGoods,
    #[sea_orm(string_value = "Meat")]
    Meat,
    #[sea_orm(string_value = "Produce")]
    Produce,
    #[sea_orm(string_value = "Dairy")]
    Dairy,
    #[sea_orm(string_value = "Frozen")]
    Frozen,
    #[default]
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Location {
    #[default]
    #[sea_orm(string_value = "Main Storage")]
    MainStorage,
    #[sea_orm(string_value = "Walk-in Cooler")]
    WalkInCooler,
    #[sea_orm(string_value = "Walk-in Freezer")]
    WalkInFreezer,
    #[sea_orm(string_value = "Dry Storage")]
    DryStorage,
    #[sea_orm(string_value = "Bar")]
    Bar,
    #[sea_orm(string_value = "Kitchen Prep")]
    KitchenPrep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ActivityAction {
    #[sea_orm(string_value = "LOGIN")]
    Login,
    #[sea_orm(string_value = "LOGOUT")]
    Logout,
    #[sea_orm(string_value = "ITEM_CREATED")]
    ItemCreated,
    #[sea_orm(string_value = "ITEM_UPDATED")]
    ItemUpdated,
    #[sea_orm(string_value = "ITEM_DELETED")]
    ItemDeleted,
    #[sea_orm(string_value = "USER_CREATED")]
    UserCreated,
    #[sea_orm(string_value = "USER_UPDATED")]
    UserUpdated,
    #[sea_orm(string_value = "USER_DELETED")]
    UserDeleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[default]
    #[sea_orm(string_value = "user")]
    User,
}

/// Serde and lookup helpers driven by the `string_value`s above.
macro_rules! string_value_enum {
    ($($ty:ident),+ $(,)?) => {$(
        impl $ty {
            /// Every accepted wire value, in declaration order.
            pub fn allowed_values() -> Vec<String> {
                <$ty as sea_orm::Iterable>::iter().map(|v| v.to_value()).collect()
            }

            pub fn parse(raw: &str) -> Option<Self> {
                <$ty as ActiveEnum>::try_from_value(&raw.to_string()).ok()
            }

            pub fn as_string(&self) -> String {
                self.to_value()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_value())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_value())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $ty::parse(&raw).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} `{}`",
                        stringify!($ty),
                        raw
                    ))
                })
            }
        }
    )+};
}

string_value_enum!(Unit, Supplier, Category, Location, ActivityAction, Role);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip_through_serde() {
        let json = serde_json::to_string(&Supplier::UsFoods).unwrap();
        assert_eq!(json, "\"US Foods\"");
        let back: Location = serde_json::from_str("\"Walk-in Freezer\"").unwrap();
        assert_eq!(back, Location::WalkInFreezer);
        assert!(serde_json::from_str::<Unit>("\"bushel\"").is_err());
    }

    #[test]
    fn lookups_are_case_sensitive() {
        assert_eq!(Category::parse("Freezer"), Some(Category::Freezer));
        assert_eq!(Category::parse("freezer"), None);
        assert_eq!(Unit::parse("box"), Some(Unit::Boxed));
    }

    #[test]
    fn defaults_match_item_defaults() {
        assert_eq!(Category::default(), Category::Other);
        assert_eq!(Location::default(), Location::MainStorage);
        assert_eq!(Role::default(), Role::User);
        assert_eq!(Unit::allowed_values().len(), 11);
    }
}
