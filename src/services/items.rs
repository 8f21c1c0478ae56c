use crate::{
    entities::{item, Category, Location, Supplier, Unit},
    errors::ServiceError,
    services::stock_status::{self, StockStatus},
    validation::{validate, Mode, ITEM_SCHEMA},
};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::{cmp::Ordering, collections::BTreeMap, str::FromStr, sync::Arc};
use strum::EnumString;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fields accepted on create and update, already validated and normalized.
///
/// `expiry_date` and `notes` are nullable: the outer `Option` says whether
/// the field was sent, the inner one whether it was cleared.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub min_stock: Option<f64>,
    pub supplier: Option<Supplier>,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub cost_per_unit: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    pub is_nightly: Option<bool>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ItemFields {
    /// Runs the item schema over a raw JSON body.
    pub fn from_payload(payload: &Value, mode: Mode) -> Result<Self, ServiceError> {
        let accepted = validate(ITEM_SCHEMA, payload, mode, Utc::now())
            .map_err(ServiceError::ValidationError)?;
        serde_json::from_value(Value::Object(accepted))
            .map_err(|e| ServiceError::InternalError(format!("normalized item fields: {}", e)))
    }
}

/// Item as returned by every read: stored fields plus derived figures.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: Uuid,
    #[schema(example = "Chicken Wings")]
    pub name: String,
    pub quantity: f64,
    #[schema(value_type = String, example = "case")]
    pub unit: Unit,
    pub min_stock: f64,
    #[schema(value_type = String, example = "Sysco")]
    pub supplier: Supplier,
    #[schema(value_type = String, example = "Freezer")]
    pub category: Category,
    #[schema(value_type = String, example = "Walk-in Freezer")]
    pub location: Location,
    pub cost_per_unit: f64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub is_nightly: bool,
    pub last_restocked: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_value: f64,
    pub stock_status: StockStatus,
    pub days_until_expiry: Option<i64>,
}

impl ItemView {
    pub fn new(model: item::Model, now: DateTime<Utc>) -> Self {
        let total_value = stock_status::total_value(&model);
        let stock_status = stock_status::stock_status(&model);
        let days_until_expiry = stock_status::days_until_expiry(&model, now);
        Self {
            id: model.id,
            name: model.name,
            quantity: model.quantity,
            unit: model.unit,
            min_stock: model.min_stock,
            supplier: model.supplier,
            category: model.category,
            location: model.location,
            cost_per_unit: model.cost_per_unit,
            expiry_date: model.expiry_date,
            notes: model.notes,
            is_active: model.is_active,
            is_nightly: model.is_nightly,
            last_restocked: model.last_restocked,
            created_at: model.created_at,
            updated_at: model.updated_at,
            total_value,
            stock_status,
            days_until_expiry,
        }
    }
}

impl From<item::Model> for ItemView {
    fn from(model: item::Model) -> Self {
        Self::new(model, Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum SortKey {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "quantity")]
    Quantity,
    #[strum(serialize = "status")]
    Status,
    #[strum(serialize = "value")]
    Value,
    #[strum(serialize = "createdAt")]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for SortSpec {
    type Err = strum::ParseError;

    /// `name` sorts ascending, `-name` descending.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (descending, key) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        Ok(Self {
            key: key.parse()?,
            descending,
        })
    }
}

impl SortSpec {
    fn compare(&self, a: &item::Model, b: &item::Model) -> Ordering {
        let ordering = match self.key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Quantity => a.quantity.total_cmp(&b.quantity),
            SortKey::Status => stock_status::stock_status(a).cmp(&stock_status::stock_status(b)),
            SortKey::Value => {
                stock_status::total_value(a).total_cmp(&stock_status::total_value(b))
            }
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemFilter {
    pub category: Option<Category>,
    pub supplier: Option<Supplier>,
    pub search: Option<String>,
    pub status: Option<StockStatus>,
    pub sort: SortSpec,
    pub page: u64,
    pub limit: u64,
    pub include_inactive: bool,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            category: None,
            supplier: None,
            search: None,
            status: None,
            sort: SortSpec::default(),
            page: 1,
            limit: 100,
            include_inactive: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<ItemView>,
    /// Matching items across all pages, after the status filter.
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkUpdateResult {
    pub id: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ItemView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub count: u64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_items: u64,
    pub total_value: f64,
    /// Low plus critical.
    pub low_stock: u64,
    pub critical: u64,
    pub stable: u64,
    pub by_category: BTreeMap<String, GroupTotals>,
    pub by_supplier: BTreeMap<String, GroupTotals>,
    pub expiring_within7_days: u64,
}

/// Reads and writes inventory items.
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DatabaseConnection>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Validates `payload` and inserts a new active item.
    #[instrument(skip(self, payload))]
    pub async fn create(&self, payload: &Value) -> Result<item::Model, ServiceError> {
        let fields = ItemFields::from_payload(payload, Mode::Create)?;
        let now = Utc::now();

        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(fields.name, "name", "Item name is required")?),
            quantity: Set(required(fields.quantity, "quantity", "Quantity is required")?),
            unit: Set(required(fields.unit, "unit", "Unit is required")?),
            min_stock: Set(fields.min_stock.unwrap_or(5.0)),
            supplier: Set(required(fields.supplier, "supplier", "Supplier is required")?),
            category: Set(fields.category.unwrap_or_default()),
            location: Set(fields.location.unwrap_or_default()),
            cost_per_unit: Set(fields.cost_per_unit.unwrap_or(0.0)),
            expiry_date: Set(fields.expiry_date.flatten()),
            notes: Set(fields.notes.flatten()),
            is_active: Set(true),
            is_nightly: Set(fields.is_nightly.unwrap_or(false)),
            last_restocked: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db_pool).await?;
        info!(item_id = %created.id, name = %created.name, "item created");
        Ok(created)
    }

    /// Active item by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<item::Model, ServiceError> {
        item::Entity::find_by_id(id)
            .filter(item::Column::IsActive.eq(true))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))
    }

    /// Item by id regardless of the active flag.
    #[instrument(skip(self))]
    pub async fn find_any(&self, id: Uuid) -> Result<Option<item::Model>, ServiceError> {
        Ok(item::Entity::find_by_id(id).one(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ItemFilter) -> Result<ItemPage, ServiceError> {
        let mut select = item::Entity::find();
        if !filter.include_inactive {
            select = select.filter(item::Column::IsActive.eq(true));
        }
        if let Some(category) = filter.category {
            select = select.filter(item::Column::Category.eq(category));
        }
        if let Some(supplier) = filter.supplier {
            select = select.filter(item::Column::Supplier.eq(supplier));
        }

        let mut items = select.all(&*self.db_pool).await?;

        if let Some(needle) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let needle = needle.to_lowercase();
            items.retain(|item| item.name.to_lowercase().contains(&needle));
        }
        if let Some(status) = filter.status {
            items.retain(|item| stock_status::stock_status(item) == status);
        }

        items.sort_by(|a, b| filter.sort.compare(a, b));

        let limit = filter.limit.max(1);
        let page = filter.page.max(1);
        let total = items.len() as u64;
        let pages = total.div_ceil(limit);
        let now = Utc::now();
        // pages past the addressable range are simply empty
        let offset = (page - 1)
            .checked_mul(limit)
            .and_then(|offset| usize::try_from(offset).ok())
            .unwrap_or(usize::MAX);

        let items = items
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|model| ItemView::new(model, now))
            .collect();

        Ok(ItemPage {
            items,
            total,
            page,
            pages,
        })
    }

    /// Applies the fields present in `payload` to an active item.
    ///
    /// Returns the stored record and a `{field: {old, new}}` map of the
    /// fields whose value actually changed.
    #[instrument(skip(self, payload))]
    pub async fn update(
        &self,
        id: Uuid,
        payload: &Value,
    ) -> Result<(item::Model, Value), ServiceError> {
        let fields = ItemFields::from_payload(payload, Mode::Patch)?;
        let current = self.get(id).await?;

        let mut diff = Map::new();
        let mut active: item::ActiveModel = current.clone().into();

        macro_rules! apply {
            ($field:ident, $key:literal, $value:expr) => {
                if let Some(new) = $value {
                    if current.$field != new {
                        diff.insert($key.to_string(), json!({"old": current.$field, "new": new}));
                        active.$field = Set(new);
                    }
                }
            };
        }

        apply!(name, "name", fields.name);
        apply!(quantity, "quantity", fields.quantity);
        apply!(unit, "unit", fields.unit);
        apply!(min_stock, "minStock", fields.min_stock);
        apply!(supplier, "supplier", fields.supplier);
        apply!(category, "category", fields.category);
        apply!(location, "location", fields.location);
        apply!(cost_per_unit, "costPerUnit", fields.cost_per_unit);
        apply!(expiry_date, "expiryDate", fields.expiry_date);
        apply!(notes, "notes", fields.notes);
        apply!(is_nightly, "isNightly", fields.is_nightly);

        let updated = active.update(&*self.db_pool).await?;
        info!(item_id = %id, changed = diff.len(), "item updated");
        Ok((updated, Value::Object(diff)))
    }

    /// Marks an active item inactive and returns it as it was before.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<item::Model, ServiceError> {
        let snapshot = self.get(id).await?;

        let mut active: item::ActiveModel = snapshot.clone().into();
        active.is_active = Set(false);
        active.update(&*self.db_pool).await?;

        info!(item_id = %id, "item soft-deleted");
        Ok(snapshot)
    }

    /// Applies `[{id, ...fields}]` entry by entry. One entry failing never
    /// affects another; only an empty or non-list batch is an error.
    #[instrument(skip(self, updates))]
    pub async fn bulk_update(&self, updates: &Value) -> Result<Vec<BulkUpdateResult>, ServiceError> {
        let entries = match updates.as_array() {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Err(ServiceError::BadRequest("Invalid bulk update data".into())),
        };

        let results = join_all(entries.iter().map(|entry| self.bulk_entry(entry))).await;

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "bulk update finished with failures");
        }
        Ok(results)
    }

    async fn bulk_entry(&self, entry: &Value) -> BulkUpdateResult {
        let raw_id = entry.get("id").cloned().unwrap_or(Value::Null);

        let outcome = match raw_id.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
            Some(id) => {
                let mut fields = entry.as_object().cloned().unwrap_or_default();
                fields.remove("id");
                self.update(id, &Value::Object(fields)).await
            }
            None => Err(ServiceError::BadRequest("Invalid item id".into())),
        };

        match outcome {
            Ok((model, _)) => BulkUpdateResult {
                id: raw_id,
                success: true,
                data: Some(model.into()),
                error: None,
            },
            Err(e) => BulkUpdateResult {
                id: raw_id,
                success: false,
                data: None,
                error: Some(describe(&e)),
            },
        }
    }

    /// Active items at or below their minimum.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<item::Model>, ServiceError> {
        let mut items = self.active_items().await?;
        items.retain(|item| stock_status::stock_status(item).is_alert());
        Ok(items)
    }

    /// Active items expiring between now and `days` from now, soonest first.
    #[instrument(skip(self))]
    pub async fn expiring_soon(&self, days: i64) -> Result<Vec<item::Model>, ServiceError> {
        let now = Utc::now();
        let horizon = now + Duration::days(days);

        let items = item::Entity::find()
            .filter(item::Column::IsActive.eq(true))
            .filter(item::Column::ExpiryDate.gte(now))
            .filter(item::Column::ExpiryDate.lte(horizon))
            .order_by_asc(item::Column::ExpiryDate)
            .all(&*self.db_pool)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<InventoryStats, ServiceError> {
        let items = self.active_items().await?;
        Ok(summarize(&items, Utc::now()))
    }

    async fn active_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        Ok(item::Entity::find()
            .filter(item::Column::IsActive.eq(true))
            .all(&*self.db_pool)
            .await?)
    }
}

fn required<T>(value: Option<T>, field: &str, message: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::invalid_field(field, message))
}

/// Per-entry error text for batch results.
pub(crate) fn describe(error: &ServiceError) -> String {
    match error {
        ServiceError::ValidationError(fields) => fields
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.response_message(),
    }
}

fn summarize(items: &[item::Model], now: DateTime<Utc>) -> InventoryStats {
    let mut stats = InventoryStats {
        total_items: items.len() as u64,
        total_value: 0.0,
        low_stock: 0,
        critical: 0,
        stable: 0,
        by_category: BTreeMap::new(),
        by_supplier: BTreeMap::new(),
        expiring_within7_days: 0,
    };

    for item in items {
        let value = stock_status::total_value(item);
        stats.total_value += value;

        match stock_status::stock_status(item) {
            StockStatus::Critical => {
                stats.critical += 1;
                stats.low_stock += 1;
            }
            StockStatus::Low => stats.low_stock += 1,
            StockStatus::Stable => stats.stable += 1,
        }

        if stock_status::is_expiring_within(item, now, 7) {
            stats.expiring_within7_days += 1;
        }

        for (groups, key) in [
            (&mut stats.by_category, item.category.as_string()),
            (&mut stats.by_supplier, item.supplier.as_string()),
        ] {
            let group = groups.entry(key).or_default();
            group.count += 1;
            group.total_value += value;
        }
    }

    stats
}
