use crate::modules::agent::ToolDefinition;

pub const SQL_EXECUTOR_TOOL: &str = "sql_executor";
pub const WEATHER_API_TOOL: &str = "weather_api";

/// Create the `sql_executor` tool definition
pub fn sql_executor_tool() -> ToolDefinition {
    ToolDefinition::builder(SQL_EXECUTOR_TOOL)
        .description(
            "Executes a SQL query on the PostgreSQL database and returns the result rows \
             as a JSON array of objects. Use this tool when you need to query the database.",
        )
        .string_param("query", "The SQL query string to execute.")
        .build()
}

/// Create the `weather_api` tool definition
pub fn weather_api_tool() -> ToolDefinition {
    ToolDefinition::builder(WEATHER_API_TOOL)
        .description(
            "Calls a public weather API (wttr.in) to get current weather information for \
             the given location. Use this tool when you need to retrieve weather data.",
        )
        .string_param(
            "location",
            "The location for which to get the current weather.",
        )
        .build()
}
