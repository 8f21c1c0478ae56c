use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_items_table::Migration),
            Box::new(m20240101_000003_create_activity_logs_table::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("user"),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        IsActive,
        LastLogin,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Items::Quantity).double().not_null().default(0.0))
                        .col(ColumnDef::new(Items::Unit).string_len(32).not_null())
                        .col(ColumnDef::new(Items::MinStock).double().not_null().default(5.0))
                        .col(ColumnDef::new(Items::Supplier).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Items::Category)
                                .string_len(32)
                                .not_null()
                                .default("Other"),
                        )
                        .col(
                            ColumnDef::new(Items::Location)
                                .string_len(32)
                                .not_null()
                                .default("Main Storage"),
                        )
                        .col(
                            ColumnDef::new(Items::CostPerUnit)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(Items::ExpiryDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Items::Notes).string_len(500).null())
                        .col(
                            ColumnDef::new(Items::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Items::IsNightly)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Items::LastRestocked)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_active_category")
                        .table(Items::Table)
                        .col(Items::IsActive)
                        .col(Items::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_active_nightly")
                        .table(Items::Table)
                        .col(Items::IsActive)
                        .col(Items::IsNightly)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_expiry_date")
                        .table(Items::Table)
                        .col(Items::ExpiryDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Items {
        Table,
        Id,
        Name,
        Quantity,
        Unit,
        MinStock,
        Supplier,
        Category,
        Location,
        CostPerUnit,
        ExpiryDate,
        Notes,
        IsActive,
        IsNightly,
        LastRestocked,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_activity_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_activity_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to users: entries outlive the actor.
            manager
                .create_table(
                    Table::create()
                        .table(ActivityLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActivityLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityLogs::UserId).uuid().not_null())
                        .col(ColumnDef::new(ActivityLogs::UserName).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::UserEmail).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::Action).string_len(32).not_null())
                        .col(ColumnDef::new(ActivityLogs::ItemName).string().null())
                        .col(ColumnDef::new(ActivityLogs::ItemId).uuid().null())
                        .col(ColumnDef::new(ActivityLogs::Changes).json().null())
                        .col(ColumnDef::new(ActivityLogs::IpAddress).string().null())
                        .col(ColumnDef::new(ActivityLogs::UserAgent).string().null())
                        .col(
                            ColumnDef::new(ActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activity_logs_user_created")
                        .table(ActivityLogs::Table)
                        .col(ActivityLogs::UserId)
                        .col(ActivityLogs::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activity_logs_action_created")
                        .table(ActivityLogs::Table)
                        .col(ActivityLogs::Action)
                        .col(ActivityLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ActivityLogs {
        Table,
        Id,
        UserId,
        UserName,
        UserEmail,
        Action,
        ItemName,
        ItemId,
        Changes,
        IpAddress,
        UserAgent,
        CreatedAt,
    }
}
