use tokio::sync::watch;

/// Broadcast-style shutdown flag. Cloned freely; any clone can trigger,
/// every listener wakes once.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
    // Kept so the channel stays open even before anyone subscribes.
    _receiver: watch::Receiver<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender,
            _receiver: receiver,
        }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub async fn notified(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        let _ = self.receiver.changed().await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let term = shutdown.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listeners_wake_after_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        assert!(!listener.is_triggered());

        shutdown.trigger();
        listener.notified().await;
        assert!(listener.is_triggered());

        // Subscribing after the fact still observes the triggered state.
        let mut late = shutdown.subscribe();
        late.notified().await;
        assert!(late.is_triggered());
    }
}
