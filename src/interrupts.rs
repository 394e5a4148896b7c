use ntex::rt::spawn;
use std::{future::Future, panic};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// Runs `func` on every panic before the default hook, then exits the process.
pub fn on_panic<F>(func: F)
where
    F: Fn(&panic::PanicHookInfo) + Send + Sync + 'static,
{
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        func(panic_info);
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Awaits SIGTERM or SIGINT on the ntex runtime and runs `func` once.
#[cfg(unix)]
pub fn on_sigterm<F, Fut>(func: F) -> ntex::rt::JoinHandle<()>
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    spawn(async move {
        let (Ok(mut sigterm_stream), Ok(mut sigint_stream)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            tracing::error!("Unable to install signal handlers, graceful shutdown disabled");
            return;
        };

        tokio::select! {
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint_stream.recv() => {
                info!("Received SIGINT signal");
            }
        }

        func().await;
    })
}

#[cfg(windows)]
pub fn on_sigterm<F, Fut>(func: F) -> ntex::rt::JoinHandle<()>
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Unable to listen for ctrl+c, graceful shutdown disabled");
            return;
        }
        info!("Received Ctrl+C signal");

        func().await;
    })
}
