//! Tools shipped with the built-in agents.
//!
//! Session tools feed the derivation engine; the rest belong to the
//! specialist and demo agents in [`crate::agents`].

mod assistant;
mod calculator;
mod session;
mod weather;

pub use assistant::{echo_tool, get_secret_tool, ADMIN_PASSWORD};
pub use calculator::{calculate_tool, evaluate_expression};
pub use session::{remember_fact_tool, set_mode_tool};
pub use weather::{convert_to_celsius_tool, weather_tool};

/// Turn a float into a JSON number, keeping whole values integral.
pub(crate) fn json_number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Value::from(value)
    }
}
