pub mod activity_log;
pub mod enums;
pub mod item;
pub mod user;

pub use enums::{ActivityAction, Category, Location, Role, Supplier, Unit};
