mod app;
mod buffer;
mod game;
mod keymap;
mod level;
mod ui;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();
    tracing::info!("vimnet starting");
    app::run()
}

/// The terminal is in raw mode for the whole session, so logs go to a file.
/// Filtered by RUST_LOG; the guard keeps the writer alive until exit.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let appender = tracing_appender::rolling::never(".", "vimnet.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    match tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
