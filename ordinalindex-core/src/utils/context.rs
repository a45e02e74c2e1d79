use hiro_system_kit::slog::Logger;

/// Carries an optional logger through the indexing pipeline, the way
/// `chainhook_sdk::utils::Context` does. `tracer` turns on verbose
/// per-transaction logging that would otherwise be too noisy for normal
/// operation.
#[derive(Debug, Clone)]
pub struct Context {
    pub logger: Option<Logger>,
    pub tracer: bool,
}

impl Context {
    pub fn empty() -> Context {
        Context {
            logger: None,
            tracer: false,
        }
    }

    pub fn expect_logger(&self) -> &Logger {
        self.logger.as_ref().expect("logger not set")
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger);
        }
    }
}
