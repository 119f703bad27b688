use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub alert_id: String,
    pub service_name: String,
    pub alert_type: String,
    pub severity: String,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub threshold_value: Option<f64>,
    pub current_value: Option<f64>,
    pub triggered_at: DateTime,
    pub resolved_at: Option<DateTime>,
    pub duration_seconds: Option<i64>,
    pub hostname: Option<String>,
    pub environment: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub metadata: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
