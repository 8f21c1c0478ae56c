use crate::{
    entities::item,
    errors::ServiceError,
    services::items::describe,
    validation::parse_number,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountResult {
    pub item_id: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "updated")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CountSummary {
    pub successful: u64,
    pub failed: u64,
    pub updated: u64,
    /// Reconciliation never creates items.
    pub created: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Reconciliation {
    pub results: Vec<CountResult>,
    pub summary: CountSummary,
}

impl Reconciliation {
    pub fn message(&self) -> String {
        format!(
            "Nightly count completed: {} success, {} failed",
            self.summary.successful, self.summary.failed
        )
    }
}

/// Nightly count list and end-of-day reconciliation.
#[derive(Clone)]
pub struct NightlyService {
    db_pool: Arc<DatabaseConnection>,
}

impl NightlyService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Active items flagged for the nightly count, by category then name.
    #[instrument(skip(self))]
    pub async fn nightly_list(&self) -> Result<Vec<item::Model>, ServiceError> {
        let items = item::Entity::find()
            .filter(item::Column::IsActive.eq(true))
            .filter(item::Column::IsNightly.eq(true))
            .order_by_asc(item::Column::Category)
            .order_by_asc(item::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(items)
    }

    /// Sets counted quantities from `[{itemId, newQuantity}]`.
    ///
    /// Entries are applied one after another, each as a single UPDATE, and
    /// fail independently. Nothing is written to the activity log.
    #[instrument(skip(self, counts))]
    pub async fn reconcile_counts(&self, counts: &Value) -> Result<Reconciliation, ServiceError> {
        let entries = match counts.as_array() {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Err(ServiceError::BadRequest("Invalid count data".into())),
        };

        let mut results = Vec::with_capacity(entries.len());
        let mut summary = CountSummary::default();

        for entry in entries {
            let item_id = entry.get("itemId").cloned().unwrap_or(Value::Null);
            let result = match self.apply_count(entry).await {
                Ok(()) => {
                    summary.successful += 1;
                    summary.updated += 1;
                    CountResult {
                        item_id,
                        success: true,
                        action: Some("updated".to_string()),
                        error: None,
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    CountResult {
                        item_id,
                        success: false,
                        action: None,
                        error: Some(describe(&e)),
                    }
                }
            };
            results.push(result);
        }

        info!(
            successful = summary.successful,
            failed = summary.failed,
            "end-of-day count reconciled"
        );
        Ok(Reconciliation { results, summary })
    }

    async fn apply_count(&self, entry: &Value) -> Result<(), ServiceError> {
        let id = entry
            .get("itemId")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| ServiceError::BadRequest("Invalid item id".into()))?;

        let quantity = entry
            .get("newQuantity")
            .and_then(parse_number)
            .filter(|q| *q >= 0.0)
            .ok_or_else(|| ServiceError::BadRequest("Quantity must be a positive number".into()))?;

        let now = Utc::now();
        let outcome = item::Entity::update_many()
            .col_expr(item::Column::Quantity, Expr::value(quantity))
            .col_expr(item::Column::LastRestocked, Expr::value(now))
            .col_expr(item::Column::UpdatedAt, Expr::value(now))
            .filter(item::Column::Id.eq(id))
            .filter(item::Column::IsActive.eq(true))
            .exec(&*self.db_pool)
            .await?;

        if outcome.rows_affected == 0 {
            return Err(ServiceError::not_found("Item"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_reports_success_and_failure_counts() {
        let outcome = Reconciliation {
            results: vec![],
            summary: CountSummary {
                successful: 3,
                failed: 1,
                updated: 3,
                created: 0,
            },
        };
        assert_eq!(outcome.message(), "Nightly count completed: 3 success, 1 failed");
    }

    #[test]
    fn results_serialize_in_camel_case() {
        let result = CountResult {
            item_id: Value::String("abc".into()),
            success: false,
            action: None,
            error: Some("Item not found".into()),
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["itemId"], "abc");
        assert!(json.get("action").is_none());
    }
}
