// Pure stock figures shared by every item read
pub mod stock_status;

// Inventory
pub mod items;
pub mod nightly;

// Accounts and audit
pub mod activity_log;
pub mod users;

// Shared construction of the service set
pub mod factory;
