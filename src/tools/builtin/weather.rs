//! Simulated weather lookups.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;

use super::json_number;
use crate::tools::{AgentTool, AgentToolParameters};

const CONDITIONS: [&str; 3] = ["sunny", "cloudy", "rainy"];

/// `weather { location }`: a random reading between 62 and 82 °F.
pub fn weather_tool() -> AgentTool {
    AgentTool::new(
        "weather",
        "Get current weather for a location",
        AgentToolParameters::object()
            .string("location", "City name", true)
            .build(),
        |args, _ctx| async move {
            let location = args.get_str("location")?.to_string();
            let (temperature, conditions) = {
                let mut rng = rand::thread_rng();
                let temperature = 72 + rng.gen_range(0..21) - 10;
                let conditions = CONDITIONS.choose(&mut rng).copied().unwrap_or("sunny");
                (temperature, conditions)
            };
            Ok(json!({
                "location": location,
                "temperature": temperature,
                "conditions": conditions,
                "unit": "fahrenheit",
            }))
        },
    )
}

/// Rounds halves toward positive infinity, so -2.5 becomes -2.
pub(crate) fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    ((fahrenheit - 32.0) * 5.0 / 9.0 + 0.5).floor()
}

/// `convertToCelsius { fahrenheit }` -> `{ fahrenheit, celsius }`.
pub fn convert_to_celsius_tool() -> AgentTool {
    AgentTool::new(
        "convertToCelsius",
        "Convert Fahrenheit to Celsius",
        AgentToolParameters::object()
            .number("fahrenheit", "Temperature in Fahrenheit", true)
            .build(),
        |args, _ctx| async move {
            let fahrenheit = args.get_f64("fahrenheit")?;
            Ok(json!({
                "fahrenheit": json_number(fahrenheit),
                "celsius": json_number(fahrenheit_to_celsius(fahrenheit)),
            }))
        },
    )
}
