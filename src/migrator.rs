use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_requisition_tables::Migration),
            Box::new(m20240301_000002_create_purchase_order_tables::Migration),
            Box::new(m20240301_000003_create_approval_comments_table::Migration),
            Box::new(m20240301_000004_create_document_sequences_table::Migration),
            Box::new(m20240301_000005_add_procurement_indexes::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_requisition_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_requisition_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::requisition::Model
            manager
                .create_table(
                    Table::create()
                        .table(Requisitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Requisitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::RequisitionNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Requisitions::CompanyId).uuid().not_null())
                        .col(
                            ColumnDef::new(Requisitions::RequisitionType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requisitions::ProjectId).uuid())
                        .col(ColumnDef::new(Requisitions::ProjectName).string())
                        .col(
                            ColumnDef::new(Requisitions::RequisitionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::RequiredByDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requisitions::ApproverId).uuid())
                        .col(
                            ColumnDef::new(Requisitions::IsLocked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Requisitions::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requisitions::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(Requisitions::ModifiedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Requisitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requisitions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RequisitionLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequisitionLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::RequisitionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RequisitionLines::ItemId).uuid())
                        .col(ColumnDef::new(RequisitionLines::ItemName).string().not_null())
                        .col(ColumnDef::new(RequisitionLines::Unit).string_len(32).not_null())
                        .col(ColumnDef::new(RequisitionLines::BoqQty).decimal())
                        .col(
                            ColumnDef::new(RequisitionLines::RequestedQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::Rate)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::Position)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequisitionLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_requisition_lines_requisition")
                                .from(RequisitionLines::Table, RequisitionLines::RequisitionId)
                                .to(Requisitions::Table, Requisitions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RequisitionLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Requisitions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Requisitions {
        Table,
        Id,
        RequisitionNumber,
        CompanyId,
        RequisitionType,
        ItemType,
        ProjectId,
        ProjectName,
        RequisitionDate,
        RequiredByDate,
        Status,
        ApproverId,
        IsLocked,
        TotalAmount,
        CreatedBy,
        ModifiedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum RequisitionLines {
        Table,
        Id,
        RequisitionId,
        ItemId,
        ItemName,
        Unit,
        BoqQty,
        RequestedQty,
        Rate,
        Amount,
        Position,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_purchase_order_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_purchase_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::purchase_order::Model
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::PoNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::CompanyId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::PurchaseType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::SupplierName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::ProjectId).uuid())
                        .col(ColumnDef::new(PurchaseOrders::ProjectName).string())
                        .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::DeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::DeliveryLocation)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::ModeOfPayment)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::ApproverId).uuid())
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(PurchaseOrders::ModifiedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::ItemId).uuid())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::ItemName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Unit)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::BoqQty).decimal())
                        .col(ColumnDef::new(PurchaseOrderLines::BalanceQty).decimal())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::PurchaseQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Rate)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::RequisitionId).uuid())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::RequisitionNumber).string_len(32),
                        )
                        .col(ColumnDef::new(PurchaseOrderLines::RequisitionLineId).uuid())
                        .col(ColumnDef::new(PurchaseOrderLines::DeliveryDate).date())
                        .col(
                            ColumnDef::new(PurchaseOrderLines::ReceivedQty)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::Position)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_lines_po")
                                .from(
                                    PurchaseOrderLines::Table,
                                    PurchaseOrderLines::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderRequisitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::RequisitionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::RequisitionNumber)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::RequisitionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderRequisitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_requisitions_po")
                                .from(
                                    PurchaseOrderRequisitions::Table,
                                    PurchaseOrderRequisitions::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(PurchaseOrderRequisitions::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrderLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        CompanyId,
        PurchaseType,
        ItemType,
        SupplierId,
        SupplierName,
        ProjectId,
        ProjectName,
        OrderDate,
        DeliveryDate,
        DeliveryLocation,
        ModeOfPayment,
        Status,
        ApproverId,
        TotalAmount,
        CreatedBy,
        ModifiedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderLines {
        Table,
        Id,
        PurchaseOrderId,
        ItemId,
        ItemName,
        Unit,
        BoqQty,
        BalanceQty,
        PurchaseQty,
        Rate,
        Amount,
        RequisitionId,
        RequisitionNumber,
        RequisitionLineId,
        DeliveryDate,
        ReceivedQty,
        Position,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderRequisitions {
        Table,
        Id,
        PurchaseOrderId,
        RequisitionId,
        RequisitionNumber,
        RequisitionDate,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240301_000003_create_approval_comments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_approval_comments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ApprovalComments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ApprovalComments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::DocumentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::DocumentKind)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::AuthorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::Comment)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ApprovalComments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ApprovalComments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ApprovalComments {
        Table,
        Id,
        DocumentId,
        DocumentKind,
        Status,
        AuthorId,
        Comment,
        CreatedAt,
    }
}

mod m20240301_000004_create_document_sequences_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_document_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentSequences::Kind)
                                .string_len(32)
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentSequences::NextValue)
                                .big_integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DocumentSequences {
        Table,
        Kind,
        NextValue,
    }
}

mod m20240301_000005_add_procurement_indexes {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_add_procurement_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requisitions_company_status")
                        .table(Requisitions::Table)
                        .col(Requisitions::CompanyId)
                        .col(Requisitions::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_po_lines_requisition_line")
                        .table(PurchaseOrderLines::Table)
                        .col(PurchaseOrderLines::RequisitionLineId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_approval_comments_document")
                        .table(ApprovalComments::Table)
                        .col(ApprovalComments::DocumentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_requisitions_company_status")
                        .table(Requisitions::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_po_lines_requisition_line")
                        .table(PurchaseOrderLines::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_approval_comments_document")
                        .table(ApprovalComments::Table)
                        .to_owned(),
                )
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Requisitions {
        Table,
        CompanyId,
        Status,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderLines {
        Table,
        RequisitionLineId,
    }

    #[derive(DeriveIden)]
    enum ApprovalComments {
        Table,
        DocumentId,
    }
}
