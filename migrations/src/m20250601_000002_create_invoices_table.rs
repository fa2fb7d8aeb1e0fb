use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250601_000002_create_invoices_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Invoices::InvoiceNumber)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Invoices::InvoiceType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceDate).date().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Invoices::SenderName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::SenderAddress).text().not_null())
                    .col(
                        ColumnDef::new(Invoices::SenderGstin)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::SenderContact)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::ReceiverName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::ReceiverAddress).text().not_null())
                    .col(
                        ColumnDef::new(Invoices::ReceiverGstin)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::ReceiverContact)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::Subtotal)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::CgstRate)
                            .decimal_len(5, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::CgstAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::SgstRate)
                            .decimal_len(5, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::SgstAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::IgstRate)
                            .decimal_len(5, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::IgstAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::RoundOff)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::Total)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::TotalInWords).text().not_null())
                    .col(ColumnDef::new(Invoices::Notes).text().null())
                    .col(
                        ColumnDef::new(Invoices::InventorySynced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Invoices::SyncOutcome).json().null())
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_type_number")
                    .table(Invoices::Table)
                    .col(Invoices::InvoiceType)
                    .col(Invoices::InvoiceNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    InvoiceType,
    InvoiceDate,
    Status,
    SenderName,
    SenderAddress,
    SenderGstin,
    SenderContact,
    ReceiverName,
    ReceiverAddress,
    ReceiverGstin,
    ReceiverContact,
    Subtotal,
    CgstRate,
    CgstAmount,
    SgstRate,
    SgstAmount,
    IgstRate,
    IgstAmount,
    RoundOff,
    Total,
    TotalInWords,
    Notes,
    InventorySynced,
    SyncOutcome,
    CreatedAt,
    UpdatedAt,
}
