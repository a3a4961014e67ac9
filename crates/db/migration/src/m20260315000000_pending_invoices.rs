use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(PendingInvoices::Table)
                    .col(
                        ColumnDef::new(PendingInvoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PendingInvoices::Uuid).uuid().not_null())
                    .col(
                        ColumnDef::new(PendingInvoices::TaskId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingInvoices::Attempts)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(PendingInvoices::LastError).text())
                    .col(ColumnDef::new(PendingInvoices::ResolvedAt).timestamp())
                    .col(
                        ColumnDef::new(PendingInvoices::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PendingInvoices::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pending_invoices_uuid")
                    .table(PendingInvoices::Table)
                    .col(PendingInvoices::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pending_invoices_task_id")
                    .table(PendingInvoices::Table)
                    .col(PendingInvoices::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingInvoices::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum PendingInvoices {
    Table,
    Id,
    Uuid,
    TaskId,
    Attempts,
    LastError,
    ResolvedAt,
    CreatedAt,
    UpdatedAt,
}
