use anyhow::Context;
use std::env;
use std::str::FromStr;

/// URL for accessing the PostgreSQL database (should contain a database name in the path)
pub const DB_URL: &str = "DATABASE_URL";
/// Upper bound on pooled database connections. Defaults to 10.
pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
/// Address and port the HTTP server listens on. Defaults to 0.0.0.0:8080.
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
/// Log level configuration for the application, using [tracing_subscriber::EnvFilter] directives
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Whether API routes reject requests lacking a bearer token. Defaults to true.
pub const REQUIRE_BEARER_TOKEN: &str = "REQUIRE_BEARER_TOKEN";
/// Whether to insert the sample projects when the projects table is empty. Defaults to false.
pub const SEED_SAMPLE_PROJECTS: &str = "SEED_SAMPLE_PROJECTS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Runtime configuration read from the environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_address: String,
    pub require_bearer_token: bool,
    pub seed_sample_projects: bool,
    /// Span and metric export URLs, present only when both are configured
    pub otel_endpoints: Option<(String, String)>,
}

impl Settings {
    /// Reads settings from the process environment
    pub fn from_env() -> Result<Settings, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source, applying defaults for anything unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Settings, anyhow::Error> {
        let database_url =
            lookup(DB_URL).with_context(|| format!("the {DB_URL} environment variable is required"))?;
        let db_max_connections =
            parse_or_default(&lookup, DB_MAX_CONNECTIONS, DEFAULT_MAX_CONNECTIONS)?;
        let bind_address = lookup(BIND_ADDRESS).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let require_bearer_token = parse_or_default(&lookup, REQUIRE_BEARER_TOKEN, true)?;
        let seed_sample_projects = parse_or_default(&lookup, SEED_SAMPLE_PROJECTS, false)?;
        let otel_endpoints = lookup(OTEL_SPAN_EXPORT_URL).zip(lookup(OTEL_METRIC_EXPORT_URL));

        Ok(Settings {
            database_url,
            db_max_connections,
            bind_address,
            require_bearer_token,
            seed_sample_projects,
            otel_endpoints,
        })
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_lookup(lookup_from(&[(DB_URL, "postgres://localhost/tracker")]));

        assert_that!(settings).is_ok().is_equal_to(Settings {
            database_url: "postgres://localhost/tracker".to_owned(),
            db_max_connections: 10,
            bind_address: "0.0.0.0:8080".to_owned(),
            require_bearer_token: true,
            seed_sample_projects: false,
            otel_endpoints: None,
        });
    }

    #[test]
    fn overrides_are_read() {
        let settings = Settings::from_lookup(lookup_from(&[
            (DB_URL, "postgres://localhost/tracker"),
            (DB_MAX_CONNECTIONS, "3"),
            (REQUIRE_BEARER_TOKEN, "false"),
            (SEED_SAMPLE_PROJECTS, "true"),
            (OTEL_SPAN_EXPORT_URL, "http://localhost:4317"),
            (OTEL_METRIC_EXPORT_URL, "http://localhost:4317"),
        ]))
        .expect("settings should parse");

        assert_eq!(3, settings.db_max_connections);
        assert!(!settings.require_bearer_token);
        assert!(settings.seed_sample_projects);
        assert!(settings.otel_endpoints.is_some());
    }

    #[test]
    fn otel_needs_both_urls() {
        let settings = Settings::from_lookup(lookup_from(&[
            (DB_URL, "postgres://localhost/tracker"),
            (OTEL_SPAN_EXPORT_URL, "http://localhost:4317"),
        ]))
        .expect("settings should parse");

        assert_eq!(None, settings.otel_endpoints);
    }

    #[test]
    fn missing_database_url_fails() {
        assert_that!(Settings::from_lookup(lookup_from(&[]))).is_err();
    }

    #[test]
    fn garbage_flag_fails() {
        let settings = Settings::from_lookup(lookup_from(&[
            (DB_URL, "postgres://localhost/tracker"),
            (REQUIRE_BEARER_TOKEN, "sometimes"),
        ]));

        assert_that!(settings).is_err();
    }
}
