//! Operator cancellation.
use tokio::sync::watch;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Fires an [`Interrupt`]. Dropping the handle without triggering leaves the interrupt pending
/// forever.
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    pub fn pair() -> (InterruptHandle, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptHandle { tx }, Interrupt { rx })
    }

    /// An interrupt that never fires.
    pub fn never() -> Self {
        Self::pair().1
    }

    /// Fires on the first Ctrl-C delivered to the process.
    pub fn ctrl_c() -> Self {
        let (handle, interrupt) = Self::pair();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, aborting run.");
                    handle.trigger();
                }
                Err(err) => error!("Unable to listen for Ctrl-C: {err}"),
            }
        });
        interrupt
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt has fired.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Sender is gone without firing; nothing can trigger us anymore.
                std::future::pending::<()>().await;
            }
        }
    }
}
