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
                    .table(UserProfile::Table)
                    .col(pk_id_col(UserProfile::Id))
                    .col(uuid_col(UserProfile::Uuid))
                    .col(
                        ColumnDef::new(UserProfile::DisplayName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserProfile::Email).string())
                    .col(ColumnDef::new(UserProfile::ActiveTaskId).big_integer())
                    .col(timestamp_col(UserProfile::CreatedAt))
                    .col(timestamp_col(UserProfile::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Clients::Table)
                    .col(pk_id_col(Clients::Id))
                    .col(uuid_col(Clients::Uuid))
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string())
                    .col(ColumnDef::new(Clients::Phone).string())
                    .col(timestamp_col(Clients::CreatedAt))
                    .col(timestamp_col(Clients::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clients_uuid")
                    .table(Clients::Table)
                    .col(Clients::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(
                        ColumnDef::new(Projects::ClientId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(
                        ColumnDef::new(Projects::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("pending")),
                    )
                    .col(
                        ColumnDef::new(Projects::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Projects::DueDate).timestamp())
                    .col(ColumnDef::new(Projects::HourlyRate).double().not_null())
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_client_id")
                    .table(Projects::Table)
                    .col(Projects::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(ColumnDef::new(Tasks::ProjectId).big_integer().not_null())
                    .col(ColumnDef::new(Tasks::Name).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("pending")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(
                        ColumnDef::new(Tasks::TimeTakenSeconds)
                            .big_integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(Tasks::StartedAt).timestamp())
                    .col(ColumnDef::new(Tasks::InvoiceId).big_integer())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_project_id")
                    .table(Tasks::Table)
                    .col(Tasks::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Invoices::Table)
                    .col(pk_id_col(Invoices::Id))
                    .col(uuid_col(Invoices::Uuid))
                    .col(ColumnDef::new(Invoices::TaskId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::ClientId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::TimeTakenSeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::HourlyRate).double().not_null())
                    .col(ColumnDef::new(Invoices::TotalCost).double().not_null())
                    .col(
                        ColumnDef::new(Invoices::TemplateType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::Url).text().not_null())
                    .col(
                        ColumnDef::new(Invoices::Emailed)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(Invoices::CreatedAt))
                    .col(timestamp_col(Invoices::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_invoices_uuid")
                    .table(Invoices::Table)
                    .col(Invoices::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_invoices_task_id")
                    .table(Invoices::Table)
                    .col(Invoices::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(QuotaUsage::Table)
                    .col(pk_id_col(QuotaUsage::Id))
                    .col(
                        ColumnDef::new(QuotaUsage::Month)
                            .string_len(7)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotaUsage::AiCount)
                            .big_integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(
                        ColumnDef::new(QuotaUsage::EmailCount)
                            .big_integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(
                        ColumnDef::new(QuotaUsage::IsSubscribed)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(QuotaUsage::CreatedAt))
                    .col(timestamp_col(QuotaUsage::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(ErrorLogs::Table)
                    .col(pk_id_col(ErrorLogs::Id))
                    .col(uuid_col(ErrorLogs::Uuid))
                    .col(
                        ColumnDef::new(ErrorLogs::Service)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ErrorLogs::Message).text().not_null())
                    .col(timestamp_col(ErrorLogs::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_error_logs_created_at")
                    .table(ErrorLogs::Table)
                    .col(ErrorLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ErrorLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuotaUsage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfile::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum UserProfile {
    Table,
    Id,
    Uuid,
    DisplayName,
    Email,
    ActiveTaskId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    Uuid,
    Name,
    Email,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    ClientId,
    Name,
    Description,
    Status,
    Priority,
    DueDate,
    HourlyRate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ProjectId,
    Name,
    Description,
    Status,
    Priority,
    DueDate,
    TimeTakenSeconds,
    StartedAt,
    InvoiceId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    Uuid,
    TaskId,
    ProjectId,
    ClientId,
    TimeTakenSeconds,
    HourlyRate,
    TotalCost,
    TemplateType,
    Url,
    Emailed,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum QuotaUsage {
    Table,
    Id,
    Month,
    AiCount,
    EmailCount,
    IsSubscribed,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ErrorLogs {
    Table,
    Id,
    Uuid,
    Service,
    Message,
    CreatedAt,
}
