use release_service::{config::ReleaseConfig, ReleaseTask};
use service_core::observability::init_tracing;
use std::process::ExitCode;

const SERVICE_NAME: &str = "release-service";

#[tokio::main]
async fn main() -> ExitCode {
    let config = ReleaseConfig::load();

    let log_level = config
        .as_ref()
        .map(|c| c.common.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(SERVICE_NAME, &log_level);

    let result = match config {
        Ok(config) => ReleaseTask::build(config).run().await.map(|_| ()),
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(stage = %err.stage_label(), "{}", err.stage_label());
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
