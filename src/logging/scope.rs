use super::format::TemplateFormat;
use super::sink::{Funnel, LogSink};
use anyhow::Result;
use std::fmt::Display;
use tracing::Dispatch;
use tracing::dispatcher::DefaultGuard;
use tracing::level_filters::LevelFilter;

/// A region during which log records are funneled to one destination.
///
/// Entering installs the scope as the current thread's default dispatcher.
/// Worker threads join the scope through the [`ScopedLogger`] handle, either
/// by passing it to [`MultiProcPool::with_logger`](crate::parallel::MultiProcPool::with_logger)
/// or by calling its methods directly.
///
/// Leaving the scope, explicitly or by drop, restores the previous default
/// and flushes and releases the destination. This happens exactly once.
pub struct LogScope {
    logger: ScopedLogger,
    funnel: Funnel,
    guard: Option<DefaultGuard>,
}

impl LogScope {
    pub fn enter(sink: LogSink, format: &str, level: tracing::Level) -> Result<Self> {
        let template = TemplateFormat::parse(format);
        if !template.has_message() {
            tracing::warn!("Log format '{}' has no {{message}} placeholder", format);
        }
        let funnel = Funnel::new(sink.open()?);

        let subscriber = tracing_subscriber::fmt()
            .with_writer(funnel.clone())
            .with_max_level(LevelFilter::from_level(level))
            .with_ansi(false)
            .event_format(template)
            .finish();

        let dispatch = Dispatch::new(subscriber);
        let guard = tracing::dispatcher::set_default(&dispatch);

        Ok(Self {
            logger: ScopedLogger { dispatch },
            funnel,
            guard: Some(guard),
        })
    }

    /// Handle usable from any thread while the scope is open
    pub fn logger(&self) -> ScopedLogger {
        self.logger.clone()
    }

    pub fn exit(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
            if let Err(e) = self.funnel.close() {
                tracing::warn!("Failed to flush log scope: {}", e);
            }
        }
    }
}

impl Drop for LogScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cloneable, thread-safe handle to a [`LogScope`]
#[derive(Clone)]
pub struct ScopedLogger {
    dispatch: Dispatch,
}

impl ScopedLogger {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with every tracing event it emits routed to this scope
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn debug(&self, message: impl Display) {
        self.in_scope(|| tracing::debug!("{}", message));
    }

    pub fn info(&self, message: impl Display) {
        self.in_scope(|| tracing::info!("{}", message));
    }

    pub fn warn(&self, message: impl Display) {
        self.in_scope(|| tracing::warn!("{}", message));
    }

    pub fn error(&self, message: impl Display) {
        self.in_scope(|| tracing::error!("{}", message));
    }
}

/// Run `f` inside a fresh log scope and close the scope afterwards
pub fn with_log_scope<F, R>(sink: LogSink, format: &str, level: tracing::Level, f: F) -> Result<R>
where
    F: FnOnce(&ScopedLogger) -> R,
{
    let scope = LogScope::enter(sink, format, level)?;
    let result = f(&scope.logger());
    scope.exit();
    Ok(result)
}
