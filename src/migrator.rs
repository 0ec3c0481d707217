use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_cancel_records_table::Migration),
            Box::new(m20240601_000002_create_return_orders_table::Migration),
            Box::new(m20240601_000003_create_return_order_lines_table::Migration),
        ]
    }
}

mod m20240601_000001_create_cancel_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_cancel_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CancelRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CancelRecords::CancelId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CancelRecords::RefId).string().not_null())
                        .col(ColumnDef::new(CancelRecords::CancelBy).string().not_null())
                        .col(
                            ColumnDef::new(CancelRecords::CancelDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CancelRecords::Remark).string().null())
                        .col(
                            ColumnDef::new(CancelRecords::CancelStatus)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cancel_records_ref_id")
                        .table(CancelRecords::Table)
                        .col(CancelRecords::RefId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CancelRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum CancelRecords {
        Table,
        CancelId,
        RefId,
        CancelBy,
        CancelDate,
        Remark,
        CancelStatus,
    }
}

mod m20240601_000002_create_return_orders_table {
    use super::m20240601_000001_create_cancel_records_table::CancelRecords;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_return_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReturnOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReturnOrders::OrderNo)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ReturnOrders::SoNo).string().not_null())
                        .col(ColumnDef::new(ReturnOrders::SrNo).string().null())
                        .col(ColumnDef::new(ReturnOrders::TrackingNo).string().null())
                        .col(ColumnDef::new(ReturnOrders::CustomerId).string().not_null())
                        .col(ColumnDef::new(ReturnOrders::ChannelId).integer().not_null())
                        .col(ColumnDef::new(ReturnOrders::WarehouseId).integer().not_null())
                        .col(ColumnDef::new(ReturnOrders::Logistic).string().not_null())
                        .col(ColumnDef::new(ReturnOrders::Reason).string().not_null())
                        .col(ColumnDef::new(ReturnOrders::SoStatusId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::MkpStatusId).integer().null())
                        .col(
                            ColumnDef::new(ReturnOrders::StatusReturnId)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(ReturnOrders::StatusConfId)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(ReturnOrders::OptStatusId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::AxStatusId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::PlatfStatusId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::StatusCheckId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::CancelId).integer().null())
                        .col(ColumnDef::new(ReturnOrders::CreateBy).string().not_null())
                        .col(
                            ColumnDef::new(ReturnOrders::CreateDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReturnOrders::UpdateBy).string().null())
                        .col(
                            ColumnDef::new(ReturnOrders::UpdateDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ReturnOrders::ConfirmBy).string().null())
                        .col(
                            ColumnDef::new(ReturnOrders::ConfirmDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ReturnOrders::CheckBy).string().null())
                        .col(
                            ColumnDef::new(ReturnOrders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_return_orders_cancel_id")
                                .from(ReturnOrders::Table, ReturnOrders::CancelId)
                                .to(CancelRecords::Table, CancelRecords::CancelId)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReturnOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum ReturnOrders {
        Table,
        OrderNo,
        SoNo,
        SrNo,
        TrackingNo,
        CustomerId,
        ChannelId,
        WarehouseId,
        Logistic,
        Reason,
        SoStatusId,
        MkpStatusId,
        StatusReturnId,
        StatusConfId,
        OptStatusId,
        AxStatusId,
        PlatfStatusId,
        StatusCheckId,
        CancelId,
        CreateBy,
        CreateDate,
        UpdateBy,
        UpdateDate,
        ConfirmBy,
        ConfirmDate,
        CheckBy,
        Version,
    }
}

mod m20240601_000003_create_return_order_lines_table {
    use super::m20240601_000002_create_return_orders_table::ReturnOrders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_return_order_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReturnOrderLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ReturnOrderLines::OrderNo).string().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::Sku).string().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::LineNo).integer().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::ItemName).string().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::Qty).integer().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::ReturnQty).integer().not_null())
                        .col(ColumnDef::new(ReturnOrderLines::CheckQty).integer().null())
                        .col(
                            ColumnDef::new(ReturnOrderLines::Price)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReturnOrderLines::AlterSku).string().null())
                        .col(ColumnDef::new(ReturnOrderLines::TrackingNo).string().null())
                        .col(ColumnDef::new(ReturnOrderLines::CreateBy).string().not_null())
                        .col(
                            ColumnDef::new(ReturnOrderLines::CreateDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReturnOrderLines::UpdateBy).string().null())
                        .col(
                            ColumnDef::new(ReturnOrderLines::UpdateDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ReturnOrderLines::OrderNo)
                                .col(ReturnOrderLines::Sku),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_return_order_lines_order_no")
                                .from(ReturnOrderLines::Table, ReturnOrderLines::OrderNo)
                                .to(ReturnOrders::Table, ReturnOrders::OrderNo)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReturnOrderLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ReturnOrderLines {
        Table,
        OrderNo,
        Sku,
        LineNo,
        ItemName,
        Qty,
        ReturnQty,
        CheckQty,
        Price,
        AlterSku,
        TrackingNo,
        CreateBy,
        CreateDate,
        UpdateBy,
        UpdateDate,
    }
}
