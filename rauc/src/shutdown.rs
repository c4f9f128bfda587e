use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Turns SIGINT and SIGTERM into a cancelled token, so a pending install
/// can stop waiting instead of the process dying mid-wait.
pub struct ShutdownHandler {
    token: CancellationToken,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns the signal listener and returns the token it cancels.
    pub fn listen(self) -> CancellationToken {
        let token = self.token.clone();
        tokio::spawn(async move { self.wait().await });
        token
    }

    async fn wait(self) {
        // create signal stream to handle SIGINT (aka ctrl+c)
        let mut sigint_sink = match signal(SignalKind::interrupt()) {
            Ok(sink) => sink,
            Err(err) => {
                warn!("Cannot listen for SIGINT: {err}");
                return;
            }
        };

        // create signal stream to handle SIGTERM (aka how systemd stops us)
        let mut sigterm_sink = match signal(SignalKind::terminate()) {
            Ok(sink) => sink,
            Err(err) => {
                warn!("Cannot listen for SIGTERM: {err}");
                return;
            }
        };

        select! {
            _ = self.token.cancelled() => {}
            _ = sigint_sink.recv() => {
                info!("Received SIGINT, probably Ctrl+C was pressed");
                self.token.cancel();
            }
            _ = sigterm_sink.recv() => {
                info!("Received SIGTERM, stopping");
                self.token.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_is_shared_with_listener() {
        let handler = ShutdownHandler::new();
        let early = handler.token();
        let token = handler.listen();

        early.cancel();
        assert!(token.is_cancelled());
    }
}
