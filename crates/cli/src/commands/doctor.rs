use secrecy::ExposeSecret;
use serde::Serialize;

use tendero_core::config::{AppConfig, CatalogSourceKind, LlmProvider, LoadOptions};
use tendero_db::{connect_with_settings, ping};

use crate::commands::{block_on, escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] = ["llm_credentials", "catalog_source", "database_connectivity"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_llm_credentials(&config));
            checks.push(check_catalog_source(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let has_key = config
        .llm
        .api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty());

    match (config.llm.provider, has_key) {
        (LlmProvider::Ollama, _) => DoctorCheck::pass(
            "llm_credentials",
            format!("ollama model `{}` needs no api key", config.llm.model),
        ),
        (provider, true) => DoctorCheck::pass(
            "llm_credentials",
            format!("{provider:?} api key present for model `{}`", config.llm.model),
        ),
        (provider, false) => {
            DoctorCheck::fail("llm_credentials", format!("{provider:?} requires llm.api_key"))
        }
    }
}

fn check_catalog_source(config: &AppConfig) -> DoctorCheck {
    match config.catalog.source {
        CatalogSourceKind::Http => DoctorCheck::pass(
            "catalog_source",
            format!("http feed {}/{}", config.catalog.base_url, config.catalog.source_key),
        ),
        CatalogSourceKind::File => match config.catalog.path.as_deref() {
            Some(path) if path.is_file() => {
                DoctorCheck::pass("catalog_source", format!("file `{}`", path.display()))
            }
            Some(path) => DoctorCheck::fail(
                "catalog_source",
                format!("catalog file `{}` does not exist", path.display()),
            ),
            None => DoctorCheck::fail("catalog_source", "catalog.path is not set"),
        },
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let probe = ping(&pool).await.map_err(|error| format!("database probe failed: {error}"));
        pool.close().await;
        probe
    });

    match result {
        Ok(Ok(())) => DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ),
        Ok(Err(error)) => DoctorCheck::fail("database_connectivity", error),
        Err(error) => DoctorCheck::fail(
            "database_connectivity",
            format!("failed to initialize async runtime: {error}"),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
