use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;

use crate::foundation::core::Size;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Host box a map is bound to.
///
/// Cloning yields another handle to the same box. The owner resizes it as layout changes;
/// observers subscribe to size changes instead of polling.
#[derive(Clone, Debug)]
pub struct SurfaceHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: u64,
    size: watch::Sender<Size>,
    attached: AtomicBool,
}

impl SurfaceHandle {
    /// Create an attached box with the given logical size.
    pub fn new(size: Size) -> Self {
        let (tx, _rx) = watch::channel(size);
        Self {
            inner: Arc::new(Inner {
                id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
                size: tx,
                attached: AtomicBool::new(true),
            }),
        }
    }

    /// Stable identity of the underlying box.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Current logical size.
    pub fn size(&self) -> Size {
        *self.inner.size.borrow()
    }

    /// Whether the box has a drawable area.
    pub fn has_area(&self) -> bool {
        let s = self.size();
        s.width >= 1.0 && s.height >= 1.0
    }

    /// Change the logical size and notify subscribers when it actually changed.
    pub fn resize(&self, size: Size) {
        self.inner.size.send_if_modified(|cur| {
            if *cur == size {
                false
            } else {
                *cur = size;
                true
            }
        });
    }

    /// Remove the box from its host. Engines bound to it can no longer be created.
    pub fn detach(&self) {
        self.inner.attached.store(false, Ordering::Release);
    }

    /// Whether the box is still part of its host.
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    /// Receiver that observes size changes.
    pub fn subscribe(&self) -> watch::Receiver<Size> {
        self.inner.size.subscribe()
    }
}
