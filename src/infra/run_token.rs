use tokio::sync::watch;

/// Owner side of a run: cancelling it stops the control loop at its next check.
#[derive(Debug)]
pub struct RunHandle {
    sender: watch::Sender<bool>,
}

/// Checked once per control-loop iteration.
#[derive(Debug, Clone)]
pub struct RunToken {
    receiver: watch::Receiver<bool>,
}

pub fn run_token() -> (RunHandle, RunToken) {
    let (sender, receiver) = watch::channel(false);
    (RunHandle { sender }, RunToken { receiver })
}

impl RunHandle {
    pub fn cancel(&self) {
        // No receivers left means nothing is running anymore
        let _ = self.sender.send(true);
    }
}

impl RunToken {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the run is cancelled. Never resolves if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
