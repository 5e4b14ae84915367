//! Push-style statement callbacks driven by a statement source

use crate::progress::fmt_num;
use crate::statement::Statement;

/// Receiver of a statement stream.
///
/// A source calls `on_start` once, `handle` per statement in arrival order,
/// and `on_end` once at end of stream.
pub trait StatementHandler {
    fn on_start(&mut self) {}

    fn handle(&mut self, statement: Statement);

    fn on_end(&mut self) {}
}

impl<H: StatementHandler + ?Sized> StatementHandler for &mut H {
    fn on_start(&mut self) {
        (**self).on_start();
    }

    fn handle(&mut self, statement: Statement) {
        (**self).handle(statement);
    }

    fn on_end(&mut self) {
        (**self).on_end();
    }
}

/// Log interval for [`CountingHandler`]
pub const COUNT_LOG_INTERVAL: u64 = 1_000_000;

/// Forwards to an inner handler, logging every [`COUNT_LOG_INTERVAL`] statements
pub struct CountingHandler<H> {
    inner: H,
    count: u64,
    interval: u64,
}

impl<H: StatementHandler> CountingHandler<H> {
    pub fn new(inner: H) -> Self {
        Self::with_interval(inner, COUNT_LOG_INTERVAL)
    }

    pub fn with_interval(inner: H, interval: u64) -> Self {
        Self {
            inner,
            count: 0,
            interval: interval.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: StatementHandler> StatementHandler for CountingHandler<H> {
    fn on_start(&mut self) {
        self.inner.on_start();
    }

    fn handle(&mut self, statement: Statement) {
        self.count += 1;
        if self.count.is_multiple_of(self.interval) {
            log::info!("{} statements read", fmt_num(self.count as usize));
        }
        self.inner.handle(statement);
    }

    fn on_end(&mut self) {
        self.inner.on_end();
    }
}
