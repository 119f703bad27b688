use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按依赖顺序建表
        manager
            .create_table(
                Table::create()
                    .table(Metrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metrics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metrics::ServiceName).string_len(100).not_null())
                    .col(ColumnDef::new(Metrics::MetricType).string_len(50).not_null())
                    .col(ColumnDef::new(Metrics::MetricValue).double().not_null())
                    .col(ColumnDef::new(Metrics::Unit).string_len(50))
                    .col(ColumnDef::new(Metrics::Timestamp).date_time().not_null())
                    .col(ColumnDef::new(Metrics::Hostname).string_len(255))
                    .col(ColumnDef::new(Metrics::Environment).string_len(50))
                    .col(ColumnDef::new(Metrics::Version).string_len(50))
                    .col(ColumnDef::new(Metrics::Tags).text())
                    .col(ColumnDef::new(Metrics::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alerts::AlertId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alerts::ServiceName).string_len(100).not_null())
                    .col(ColumnDef::new(Alerts::AlertType).string_len(100).not_null())
                    .col(ColumnDef::new(Alerts::Severity).string_len(20).not_null())
                    .col(ColumnDef::new(Alerts::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(ColumnDef::new(Alerts::Description).text())
                    .col(ColumnDef::new(Alerts::ThresholdValue).double())
                    .col(ColumnDef::new(Alerts::CurrentValue).double())
                    .col(ColumnDef::new(Alerts::TriggeredAt).date_time().not_null())
                    .col(ColumnDef::new(Alerts::ResolvedAt).date_time())
                    .col(ColumnDef::new(Alerts::DurationSeconds).big_integer())
                    .col(ColumnDef::new(Alerts::Hostname).string_len(255))
                    .col(ColumnDef::new(Alerts::Environment).string_len(50))
                    .col(ColumnDef::new(Alerts::Metadata).text())
                    .col(ColumnDef::new(Alerts::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AlertRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlertRules::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AlertRules::RuleName)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AlertRules::ServiceName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AlertRules::MetricType).string_len(50).not_null())
                    .col(ColumnDef::new(AlertRules::ThresholdValue).double().not_null())
                    .col(
                        ColumnDef::new(AlertRules::ComparisonOperator)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertRules::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AlertRules::Severity).string_len(20).not_null())
                    .col(
                        ColumnDef::new(AlertRules::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(AlertRules::Description).text())
                    .col(ColumnDef::new(AlertRules::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(AlertRules::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // Descending and composite indexes; identical SQL works on both
        // Postgres and SQLite.
        manager.get_connection().execute_unprepared(INDEX_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertRules::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alerts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Metrics::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

const INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_metrics_service_ts ON metrics (service_name, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_metrics_type_ts ON metrics (metric_type, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_metrics_service_type ON metrics (service_name, metric_type);
CREATE INDEX IF NOT EXISTS idx_metrics_ts ON metrics (timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_metrics_environment ON metrics (environment);
CREATE INDEX IF NOT EXISTS idx_alerts_service ON alerts (service_name);
CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts (status);
CREATE INDEX IF NOT EXISTS idx_alerts_severity ON alerts (severity);
CREATE INDEX IF NOT EXISTS idx_alerts_triggered_at ON alerts (triggered_at DESC);
CREATE INDEX IF NOT EXISTS idx_alerts_service_status ON alerts (service_name, status);
CREATE INDEX IF NOT EXISTS idx_alerts_alert_type ON alerts (alert_type);
CREATE INDEX IF NOT EXISTS idx_alert_rules_service_metric ON alert_rules (service_name, metric_type);
";

#[derive(DeriveIden)]
enum Metrics {
    Table,
    Id,
    ServiceName,
    MetricType,
    MetricValue,
    Unit,
    Timestamp,
    Hostname,
    Environment,
    Version,
    Tags,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    AlertId,
    ServiceName,
    AlertType,
    Severity,
    Status,
    Message,
    Description,
    ThresholdValue,
    CurrentValue,
    TriggeredAt,
    ResolvedAt,
    DurationSeconds,
    Hostname,
    Environment,
    Metadata,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AlertRules {
    Table,
    Id,
    RuleName,
    ServiceName,
    MetricType,
    ThresholdValue,
    ComparisonOperator,
    DurationMinutes,
    Severity,
    Enabled,
    Description,
    CreatedAt,
    UpdatedAt,
}
