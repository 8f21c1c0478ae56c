use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{
        activity_log::ActivityLogService, items::ItemService, nightly::NightlyService,
        users::UserService,
    },
};

/// Service instances sharing one connection pool
#[derive(Clone)]
pub struct ServiceContainer {
    pub items: ItemService,
    pub nightly: NightlyService,
    pub activity: ActivityLogService,
    pub users: UserService,
}

impl ServiceContainer {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            items: ItemService::new(db_pool.clone()),
            nightly: NightlyService::new(db_pool.clone()),
            activity: ActivityLogService::new(db_pool.clone()),
            users: UserService::new(db_pool),
        }
    }
}
