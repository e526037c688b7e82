// Диагностика компилятора: одноразовое предупреждение об устаревших конструкциях

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;

pub const IF_DEPRECATION: &str = "operator if is deprecated and will be removed soon, \
please use operator cond instead. Operator cond sample: let a = cond {2 > 1: 1, 2 > 3: 2, _: 3}";

/// Приёмник диагностических сообщений
pub trait DiagnosticsSink: Send + Sync {
    fn deprecation_warning(&self, message: &str);
}

/// Приёмник по умолчанию: пишет через tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn deprecation_warning(&self, message: &str) {
        tracing::error!(target: "rel_syntax::deprecation", "{}", message);
    }
}

/// Владеет собственной защёлкой: предупреждение уходит в приёмник не более одного раза
/// за время жизни этого объекта, сколько бы потоков его ни вызывали.
/// Защёлка взводится до вызова приёмника: паника в приёмнике её не отравляет.
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticsSink>,
    deprecation: AtomicBool,
}

lazy_static! {
    static ref GLOBAL_DIAGNOSTICS: Arc<Diagnostics> = Arc::new(Diagnostics::new(TracingSink));
}

impl Diagnostics {
    pub fn new(sink: impl DiagnosticsSink + 'static) -> Self {
        Self::with_sink(Arc::new(sink))
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            sink,
            deprecation: AtomicBool::new(false),
        }
    }

    /// Общая для процесса защёлка, которой пользуются точки входа по умолчанию
    pub fn global() -> Arc<Diagnostics> {
        GLOBAL_DIAGNOSTICS.clone()
    }

    pub fn warn_deprecated_once(&self, message: &str) {
        if self
            .deprecation
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.sink.deprecation_warning(message);
        }
    }

    pub fn has_warned(&self) -> bool {
        self.deprecation.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("warned", &self.has_warned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl DiagnosticsSink for Counting {
        fn deprecation_warning(&self, _message: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_latch_fires_once_across_threads() {
        let count = Arc::new(AtomicUsize::new(0));
        let diagnostics = Arc::new(Diagnostics::new(Counting(count.clone())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = diagnostics.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        d.warn_deprecated_once(IF_DEPRECATION);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(diagnostics.has_warned());
    }

    struct Panicking(Arc<AtomicUsize>);

    impl DiagnosticsSink for Panicking {
        fn deprecation_warning(&self, _message: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("sink failure");
        }
    }

    #[test]
    fn test_panicking_sink_does_not_poison_latch() {
        let count = Arc::new(AtomicUsize::new(0));
        let diagnostics = Diagnostics::new(Panicking(count.clone()));
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            diagnostics.warn_deprecated_once(IF_DEPRECATION)
        }));
        assert!(first.is_err());
        diagnostics.warn_deprecated_once(IF_DEPRECATION);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(diagnostics.has_warned());
    }
}
