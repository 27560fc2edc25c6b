use crate::logger::severity::LogSeverity;

/// Target every record of this crate is emitted under.
pub const TARGET: &str = "claim_overlay";

/// Emits `msg` through the `log` facade, tagged with its severity.
pub fn log(msg: String, log_severity: LogSeverity) {
    ::log::log!(target: TARGET, log_severity.level(), "[{}] {}", log_severity, msg);
}

/// Installs `env_logger` as the backend, honouring `RUST_LOG` and defaulting to `info`.
/// Does nothing if the host already installed a logger.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
