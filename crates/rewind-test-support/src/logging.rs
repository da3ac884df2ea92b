//! Test log bootstrap.

use once_cell::sync::OnceCell;
use rewind_config::TelemetryConfig;
use rewind_telemetry::{LoggingConfig, init_logging};

static TEST_LOGGING: OnceCell<()> = OnceCell::new();

/// Install the workspace logger once per test binary.
///
/// Settings come from `REWIND_LOG_LEVEL`/`REWIND_LOG_FORMAT` when they parse;
/// otherwise the defaults apply. A subscriber installed elsewhere is left in
/// place.
pub fn init_test_logging() {
    TEST_LOGGING.get_or_init(|| {
        let telemetry = TelemetryConfig::from_env().unwrap_or_default();
        let config = LoggingConfig {
            service_name: "rewind-tests",
            ..LoggingConfig::from(&telemetry)
        };
        init_logging(&config).ok();
    });
}
