use serde_json::Value;

use super::definitions::{sql_executor_tool, weather_api_tool};
use crate::modules::agent::tool::string_arg;
use crate::modules::agent::{FnToolExecutor, ToolOutput, ToolRegistry};
use crate::modules::sql::QueryExecutor;
use crate::modules::weather::WeatherClient;

/// Create a tool registry with the local chat agent tools
pub fn create_tool_registry(executor: QueryExecutor, weather: WeatherClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(FnToolExecutor::new(sql_executor_tool(), move |args: Value| {
        let executor = executor.clone();
        async move {
            let query = match string_arg(&args, "query") {
                Ok(query) => query,
                Err(output) => return output,
            };

            tracing::info!("Executing SQL Tool with query: {}", query);
            let result = executor.execute(&query).await;
            let content = result.to_json_string();

            if result.is_error() {
                ToolOutput::error(content)
            } else {
                ToolOutput::success(content)
            }
        }
    }));

    registry.register(FnToolExecutor::new(weather_api_tool(), move |args: Value| {
        let weather = weather.clone();
        async move {
            let location = match string_arg(&args, "location") {
                Ok(location) => location,
                Err(output) => return output,
            };

            let result = weather.fetch(&location).await;
            if result.is_error() {
                ToolOutput::error(result.into_text())
            } else {
                ToolOutput::success(result.into_text())
            }
        }
    }));

    registry
}
