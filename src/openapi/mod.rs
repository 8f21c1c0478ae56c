use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Tracker API",
        version = "1.0.0",
        description = r#"
# Restaurant Inventory Tracker

Track stock levels for a kitchen: items with par levels, suppliers and storage
locations, a nightly count list, end-of-day reconciliation, low-stock and
expiry alerts, and an audited admin surface.

## Authentication

Every `/api/items` and `/api/admin` endpoint requires a JWT obtained from
`/api/auth/signup` or `/api/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Validation failed",
  "errors": [{ "field": "unit", "message": "Invalid unit" }],
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "items", description = "Inventory items, alerts and statistics"),
        (name = "nightly", description = "Nightly count list and end-of-day reconciliation"),
        (name = "auth", description = "Signup, login and token verification"),
        (name = "admin", description = "User management and the activity log")
    ),
    paths(
        // Items
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::create_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::items::low_stock_items,
        crate::handlers::items::expiring_soon_items,
        crate::handlers::items::inventory_stats,
        crate::handlers::items::bulk_update_items,

        // Nightly
        crate::handlers::nightly::nightly_list,
        crate::handlers::nightly::end_of_day_count,

        // Auth
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::verify,
        crate::handlers::auth::logout,

        // Admin
        crate::handlers::admin::list_users,
        crate::handlers::admin::update_user,
        crate::handlers::admin::delete_user,
        crate::handlers::admin::list_activity_logs,
        crate::handlers::admin::admin_stats,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::errors::FieldError,
            crate::services::stock_status::StockStatus,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_surface() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Inventory Tracker API"));
        assert!(json.contains("/api/items/end-of-day-count"));
        assert!(json.contains("/api/admin/activity-logs"));
        assert!(json.contains("bearer_auth"));
    }
}
