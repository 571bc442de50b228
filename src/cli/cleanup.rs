use once_cell::sync::Lazy;
use parking_lot::Mutex;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Cleanup closures run on Ctrl-C: cancel a running poll, stop a frame stream.
#[derive(Default)]
struct CleanupRegistry {
    items: Vec<Cleanup>,
}

impl CleanupRegistry {
    fn register(&mut self, f: Cleanup) {
        self.items.push(f);
    }

    fn run_all(&mut self) -> usize {
        let items = std::mem::take(&mut self.items);
        let count = items.len();
        for f in items {
            // one panicking cleanup must not skip the others
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        }
        count
    }
}

static GLOBAL_CLEANUP: Lazy<Mutex<CleanupRegistry>> =
    Lazy::new(|| Mutex::new(CleanupRegistry::default()));

/// Register a cleanup closure to be run when `run_cleanups` is invoked.
pub fn register_cleanup(f: impl FnOnce() + Send + 'static) {
    GLOBAL_CLEANUP.lock().register(Box::new(f));
}

/// Drop every registered closure without running it.
pub fn clear_cleanups() {
    GLOBAL_CLEANUP.lock().items.clear();
}

/// Run all registered cleanup closures. Returns how many ran; safe to call
/// repeatedly.
pub fn run_cleanups() -> usize {
    let mut registry = GLOBAL_CLEANUP.lock();
    log::debug!("Running {} cleanup handlers", registry.items.len());
    let count = registry.run_all();
    log::debug!("Cleanup handlers completed");
    count
}

/// Ctrl-C runs the registered cleanups. With nothing to clean up the process
/// exits straight away.
pub fn install_interrupt_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if run_cleanups() == 0 {
            std::process::exit(130);
        }
    })?;
    Ok(())
}
