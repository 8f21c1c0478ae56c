use crate::{
    entities::{activity_log, ActivityAction},
    errors::ServiceError,
};
use chrono::{DateTime, Local, Timelike, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Who performed an action. Copied into every entry.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Optional context attached to an entry.
#[derive(Debug, Clone, Default)]
pub struct LogDetails {
    pub item_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub changes: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl LogDetails {
    pub fn item(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            item_id: Some(id),
            item_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<ActivityAction>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionCount {
    #[schema(value_type = String, example = "ITEM_UPDATED")]
    pub action: ActivityAction,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total: u64,
    pub today: u64,
    pub by_type: Vec<ActionCount>,
    #[schema(value_type = Vec<Object>)]
    pub recent: Vec<activity_log::Model>,
}

/// Append-only audit trail.
#[derive(Clone)]
pub struct ActivityLogService {
    db_pool: Arc<DatabaseConnection>,
}

impl ActivityLogService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Writes one entry. Failures are logged and counted, never returned:
    /// the mutation being audited has already happened.
    #[instrument(skip(self, details), fields(user_id = %actor.user_id))]
    pub async fn record(&self, actor: &Actor, action: ActivityAction, details: LogDetails) {
        let entry = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(actor.user_id),
            user_name: Set(actor.name.clone()),
            user_email: Set(actor.email.clone()),
            action: Set(action),
            item_name: Set(details.item_name),
            item_id: Set(details.item_id),
            changes: Set(details.changes),
            ip_address: Set(details.ip_address),
            user_agent: Set(details.user_agent),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = entry.insert(&*self.db_pool).await {
            error!(action = %action, error = %e, "failed to write activity log entry");
            counter!("inventory_activity_log_write_failures", 1);
        }
    }

    /// Newest first, with the total number of matching entries.
    #[instrument(skip(self))]
    pub async fn query(
        &self,
        filter: ActivityFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<activity_log::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut select = activity_log::Entity::find();
        if let Some(user_id) = filter.user_id {
            select = select.filter(activity_log::Column::UserId.eq(user_id));
        }
        if let Some(action) = filter.action {
            select = select.filter(activity_log::Column::Action.eq(action));
        }

        let paginator = select
            .order_by_desc(activity_log::Column::CreatedAt)
            .paginate(db, limit.max(1));

        let total = paginator.num_items().await?;
        let page_index = page.saturating_sub(1);
        let in_range = page_index
            .checked_mul(limit.max(1))
            .is_some_and(|offset| offset < total);
        let entries = if in_range {
            paginator.fetch_page(page_index).await?
        } else {
            Vec::new()
        };

        Ok((entries, total))
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<ActivityStats, ServiceError> {
        let db = &*self.db_pool;

        let total = activity_log::Entity::find().count(db).await?;

        let today = activity_log::Entity::find()
            .filter(activity_log::Column::CreatedAt.gte(local_midnight()))
            .count(db)
            .await?;

        let mut by_type: Vec<ActionCount> = activity_log::Entity::find()
            .select_only()
            .column(activity_log::Column::Action)
            .column_as(Expr::col(activity_log::Column::Id).count(), "count")
            .group_by(activity_log::Column::Action)
            .into_tuple::<(ActivityAction, i64)>()
            .all(db)
            .await?
            .into_iter()
            .map(|(action, count)| ActionCount {
                action,
                count: count.max(0) as u64,
            })
            .collect();
        by_type.sort_by(|a, b| b.count.cmp(&a.count));

        let recent = activity_log::Entity::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await?;

        Ok(ActivityStats {
            total,
            today,
            by_type,
            recent,
        })
    }
}

/// Start of the current day in the server's local timezone.
fn local_midnight() -> DateTime<Utc> {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| {
            let now = Utc::now();
            now - chrono::Duration::seconds(i64::from(now.time().num_seconds_from_midnight()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midnight_is_not_in_the_future() {
        let midnight = local_midnight();
        assert!(midnight <= Utc::now());
        assert!(Utc::now() - midnight <= chrono::Duration::hours(25));
    }

    #[test]
    fn details_builder_sets_item_and_client() {
        let id = Uuid::new_v4();
        let details = LogDetails::item(id, "Ranch")
            .changes(serde_json::json!({"quantity": {"old": 1, "new": 2}}))
            .client(Some("10.0.0.1".into()), None);
        assert_eq!(details.item_id, Some(id));
        assert_eq!(details.item_name.as_deref(), Some("Ranch"));
        assert_eq!(details.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(details.changes.is_some());
    }
}
