//! `critical-section` 1.x implementation for ESP-IDF.
//!
//! The `embassy-sync` channels in [`SharedState`](crate::app::shared::SharedState)
//! lock through `critical-section`, which expects the platform to export
//! the acquire/release symbols below.  Here a section is a process-wide
//! std mutex held by the calling thread, re-entrant through a per-thread
//! nesting count.  Never called from an ISR: the GPIO handlers only touch
//! the lock-free [`EdgeQueue`](crate::events::EdgeQueue).

use std::cell::RefCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SECTION: Mutex<()> = Mutex::new(());

/// The calling thread's hold on [`SECTION`].
struct Nesting {
    depth: u8,
    guard: Option<MutexGuard<'static, ()>>,
}

thread_local! {
    static NESTING: RefCell<Nesting> = const {
        RefCell::new(Nesting { depth: 0, guard: None })
    };
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    NESTING.with_borrow_mut(|n| {
        if n.depth == 0 {
            // The mutex guards no data, so a poisoned lock is still usable.
            n.guard = Some(SECTION.lock().unwrap_or_else(PoisonError::into_inner));
        }
        n.depth = n.depth.saturating_add(1);
        n.depth
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    NESTING.with_borrow_mut(|n| match n.depth {
        0 => {}
        1 => {
            n.depth = 0;
            n.guard = None;
        }
        _ => n.depth -= 1,
    });
}
