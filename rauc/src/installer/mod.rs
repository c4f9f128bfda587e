mod types;

pub use types::{BundleInfo, InstallOptions, MarkResult, MarkState, Progress};

use crate::config::Config;
use crate::dbus::{COMPLETED, DbusTransport, INTERFACE, Notifications, Transport};
use crate::error::{Error, Result};
use crate::slot::SlotStatus;
use crate::value::Value;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zbus::Message;

const INSTALL: &str = "InstallBundle";

/// Client for the daemon's installer object.
///
/// Cloning is cheap and clones share the transport. Installs are
/// serialised across clones: the `Completed` signal carries nothing that
/// ties it to a particular call, so only one install may be waiting for it
/// at a time.
pub struct Installer<T = DbusTransport> {
    transport: Arc<T>,
    pending: Arc<Mutex<()>>,
    channel_capacity: usize,
    completion_timeout: Option<Duration>,
}

impl<T> Clone for Installer<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            pending: self.pending.clone(),
            channel_capacity: self.channel_capacity,
            completion_timeout: self.completion_timeout,
        }
    }
}

impl Installer<DbusTransport> {
    /// Connects to the daemon described by `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let transport = DbusTransport::connect(config).await?;
        Ok(Self::with_transport(transport, config))
    }

    /// Connects to the daemon on the system bus with default settings.
    pub async fn system() -> Result<Self> {
        Self::connect(&Config::default()).await
    }
}

impl<T: Transport> Installer<T> {
    pub fn with_transport(transport: T, config: &Config) -> Self {
        Self {
            transport: Arc::new(transport),
            pending: Arc::new(Mutex::new(())),
            channel_capacity: config.channel_capacity.max(1),
            completion_timeout: config.completion_timeout(),
        }
    }

    /// Limits how long [`Installer::install`] waits for `Completed`.
    /// `None` waits for as long as the daemon takes.
    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Installs the bundle at `source` and waits until the daemon reports
    /// the outcome.
    pub async fn install(&self, source: &str, options: &InstallOptions) -> Result<()> {
        self.install_with_cancel(source, options, CancellationToken::new())
            .await
    }

    /// Same as [`Installer::install`], giving up with [`Error::Cancelled`]
    /// once `cancel` fires. The daemon keeps installing in that case.
    pub async fn install_with_cancel(
        &self,
        source: &str,
        options: &InstallOptions,
        cancel: CancellationToken,
    ) -> Result<()> {
        let _pending = self.pending.lock().await;

        // subscribe before calling, the signal may beat the reply
        let notifications = self.transport.subscribe(self.channel_capacity).await?;

        info!("Installing bundle {source}");
        self.transport.install_bundle(source, options).await?;

        let code = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Stopped waiting for {source} to be installed");
                return Err(Error::Cancelled { operation: INSTALL });
            }
            code = self.await_completion(notifications) => code?,
        };

        if code == 0 {
            info!("Bundle {source} installed");
            return Ok(());
        }

        let message = self.last_error().await?;
        warn!(code, "Installing {source} failed: {message}");
        Err(Error::Domain { code, message })
    }

    async fn await_completion(&self, notifications: Notifications) -> Result<i32> {
        match self.completion_timeout {
            Some(after) => tokio::time::timeout(after, next_completion(notifications))
                .await
                .map_err(|_| Error::Timeout {
                    operation: INSTALL,
                    after,
                })?,
            None => next_completion(notifications).await,
        }
    }

    pub async fn info(&self, bundle: &str) -> Result<BundleInfo> {
        let (compatible, version) = self.transport.info(bundle).await?;
        Ok(BundleInfo {
            compatible,
            version,
        })
    }

    /// Marks a slot. `slot_identifier` is `booted`, `other` or a slot name.
    pub async fn mark(&self, state: MarkState, slot_identifier: &str) -> Result<MarkResult> {
        let (slot_name, message) = self.transport.mark(state.as_str(), slot_identifier).await?;
        info!("Marked {slot_name} {state}: {message}");
        Ok(MarkResult { slot_name, message })
    }

    /// Slots in the order the daemon lists them.
    pub async fn slot_status(&self) -> Result<Vec<SlotStatus>> {
        self.transport
            .slot_status()
            .await?
            .into_iter()
            .map(|(name, attributes)| {
                SlotStatus::from_attributes(name, attributes)
                    .map_err(|reason| Error::decode("GetSlotStatus", reason))
            })
            .collect()
    }

    pub async fn operation(&self) -> Result<String> {
        self.string_property("Operation").await
    }

    pub async fn last_error(&self) -> Result<String> {
        self.string_property("LastError").await
    }

    pub async fn compatible(&self) -> Result<String> {
        self.string_property("Compatible").await
    }

    pub async fn variant(&self) -> Result<String> {
        self.string_property("Variant").await
    }

    pub async fn boot_slot(&self) -> Result<String> {
        self.string_property("BootSlot").await
    }

    pub async fn progress(&self) -> Result<Progress> {
        let value = self.transport.property("Progress").await?;
        Progress::try_from(&value).map_err(|reason| Error::decode("Progress", reason))
    }

    async fn string_property(&self, name: &'static str) -> Result<String> {
        match self.transport.property(name).await? {
            Value::Str(s) => Ok(s),
            other => Err(Error::decode(
                name,
                format!("expected a string, got {}", other.kind()),
            )),
        }
    }
}

/// Reads notifications until the first `Completed` and returns its code.
async fn next_completion(mut notifications: Notifications) -> Result<i32> {
    while let Some(message) = notifications.next().await {
        let message = message.map_err(|e| Error::ChannelClosed {
            operation: INSTALL,
            source: Some(e),
        })?;
        if let Some(code) = completion_code(&message) {
            return code;
        }
    }

    Err(Error::ChannelClosed {
        operation: INSTALL,
        source: None,
    })
}

/// Status code of a `Completed` signal, `None` for any other message.
fn completion_code(message: &Message) -> Option<Result<i32>> {
    let header = message.header();
    let interface = header.interface().map(|i| i.as_str());
    let member = header.member().map(|m| m.as_str());

    if interface != Some(INTERFACE) || member != Some(COMPLETED) {
        debug!("Ignoring {interface:?}.{member:?} while waiting for completion");
        return None;
    }

    Some(
        message
            .body()
            .deserialize::<i32>()
            .map_err(|e| Error::decode(INSTALL, format!("Completed payload: {e}"))),
    )
}
