use crate::config::{BusKind, Config};
use crate::error::{Error, Result};
use crate::installer::InstallOptions;
use crate::value::Value;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use tracing::{debug, info};
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::proxy::CacheProperties;
use zbus::{Connection, MatchRule, Message, MessageStream};

mod proxy;
use proxy::InstallerProxy;

/// Interface of the daemon's control object.
pub const INTERFACE: &str = "de.pengutronix.rauc.Installer";

/// Signal emitted once an installation finishes.
pub const COMPLETED: &str = "Completed";

/// Signals delivered to a single pending invocation.
pub type Notifications = BoxStream<'static, zbus::Result<Message>>;

/// Raw access to the installer object.
///
/// The production implementation is [`DbusTransport`]; anything else that
/// can hand out signal streams and answer calls can stand in for it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts delivering the control interface's signals for the object,
    /// queueing up to `capacity` of them.
    async fn subscribe(&self, capacity: usize) -> Result<Notifications>;

    async fn install_bundle(&self, source: &str, options: &InstallOptions) -> Result<()>;

    async fn info(&self, bundle: &str) -> Result<(String, String)>;

    async fn mark(&self, state: &str, slot_identifier: &str) -> Result<(String, String)>;

    async fn slot_status(&self) -> Result<Vec<(String, BTreeMap<String, Value>)>>;

    async fn property(&self, name: &'static str) -> Result<Value>;
}

pub struct DbusTransport {
    connection: Connection,
    installer: InstallerProxy<'static>,
    properties: PropertiesProxy<'static>,
    object_path: String,
}

impl DbusTransport {
    pub async fn connect(config: &Config) -> Result<Self> {
        let connection = match config.bus {
            BusKind::System => Connection::system().await,
            BusKind::Session => Connection::session().await,
        }
        .map_err(Error::Connection)?;

        info!(
            "Connected to the {:?} bus, using {} at {}",
            config.bus, config.service, config.object_path
        );

        let installer = InstallerProxy::builder(&connection)
            .destination(config.service.clone())
            .map_err(Error::Connection)?
            .path(config.object_path.clone())
            .map_err(Error::Connection)?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(Error::Connection)?;

        let properties = PropertiesProxy::builder(&connection)
            .destination(config.service.clone())
            .map_err(Error::Connection)?
            .path(config.object_path.clone())
            .map_err(Error::Connection)?
            .build()
            .await
            .map_err(Error::Connection)?;

        Ok(Self {
            connection,
            installer,
            properties,
            object_path: config.object_path.clone(),
        })
    }
}

#[async_trait]
impl Transport for DbusTransport {
    async fn subscribe(&self, capacity: usize) -> Result<Notifications> {
        let rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .interface(INTERFACE)
            .and_then(|rule| rule.path(self.object_path.as_str()))
            .map_err(|e| Error::call("subscribe", e))?
            .build();

        debug!("Subscribing to {rule}");

        let stream = MessageStream::for_match_rule(rule, &self.connection, Some(capacity))
            .await
            .map_err(|e| Error::call("subscribe", e))?;

        Ok(stream.boxed())
    }

    async fn install_bundle(&self, source: &str, options: &InstallOptions) -> Result<()> {
        self.installer
            .install_bundle(source, options.to_args())
            .await
            .map_err(|e| Error::call("InstallBundle", e))
    }

    async fn info(&self, bundle: &str) -> Result<(String, String)> {
        self.installer
            .info(bundle)
            .await
            .map_err(|e| Error::call("Info", e))
    }

    async fn mark(&self, state: &str, slot_identifier: &str) -> Result<(String, String)> {
        self.installer
            .mark(state, slot_identifier)
            .await
            .map_err(|e| Error::call("Mark", e))
    }

    async fn slot_status(&self) -> Result<Vec<(String, BTreeMap<String, Value>)>> {
        let slots = self
            .installer
            .get_slot_status()
            .await
            .map_err(|e| Error::call("GetSlotStatus", e))?;

        slots
            .into_iter()
            .map(|(name, attributes)| {
                let attributes = attributes
                    .iter()
                    .map(|(key, value)| {
                        Value::try_from(value)
                            .map(|value| (key.clone(), value))
                            .map_err(|reason| {
                                Error::decode("GetSlotStatus", format!("{name}.{key}: {reason}"))
                            })
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Ok((name, attributes))
            })
            .collect()
    }

    async fn property(&self, name: &'static str) -> Result<Value> {
        let value = self
            .properties
            .get(InterfaceName::from_static_str_unchecked(INTERFACE), name)
            .await
            .map_err(|e| Error::call(name, e))?;

        Value::try_from(&value).map_err(|reason| Error::decode(name, reason))
    }
}
