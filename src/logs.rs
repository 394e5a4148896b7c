use strum_macros::{Display, EnumString};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

pub fn init_logs(format: LogFormat) {
    // see https://docs.rs/env_logger/latest/env_logger/#enabling-logging for the RUST_LOG syntax
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::Subscriber::builder()
        .with_timer(UtcTime::rfc_3339())
        .with_env_filter(env_filter);

    match format {
        LogFormat::Json => {
            let subscriber = builder.json().flatten_event(true).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting default subscriber failed");
        }
        LogFormat::Pretty => {
            let subscriber = builder.with_target(false).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("setting default subscriber failed");
        }
    }
}
