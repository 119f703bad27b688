pub mod alert;
pub mod alert_rule;
pub mod metric;
