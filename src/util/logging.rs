//! Thin wrapper around `env_logger`, matching the teacher's practice of
//! initializing logging once from whatever embeds the analysis (a test
//! harness, a future CLI front end) rather than on first log call.

/// Initializes the global logger from `RUST_LOG` (or the given default
/// filter if unset). Safe to call more than once; only the first call
/// has any effect.
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .is_test(cfg!(test))
        .try_init();
}
