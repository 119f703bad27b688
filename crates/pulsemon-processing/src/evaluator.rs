//! Pure threshold evaluation. No state, no side effects.

/// Floating-point tolerance for the EQ operator.
const EQ_EPSILON: f64 = 1e-3;

/// Evaluates whether a metric value violates a threshold under the given
/// comparison operator (GT, GTE, LT, LTE, EQ).
///
/// Returns `false` when any input is missing or the operator is unknown.
pub fn evaluate(value: Option<f64>, threshold: Option<f64>, operator: &str) -> bool {
    let (Some(value), Some(threshold)) = (value, threshold) else {
        tracing::warn!(?value, ?threshold, operator, "Invalid evaluation parameters");
        return false;
    };

    match operator.to_ascii_uppercase().as_str() {
        "GT" => value > threshold,
        "GTE" => value >= threshold,
        "LT" => value < threshold,
        "LTE" => value <= threshold,
        "EQ" => (value - threshold).abs() < EQ_EPSILON,
        other => {
            tracing::warn!(operator = other, "Unknown comparison operator");
            false
        }
    }
}
