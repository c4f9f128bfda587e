//! Client for the RAUC update daemon's installer interface on D-Bus.
//!
//! [`Installer`] wraps the `de.pengutronix.rauc.Installer` object: it
//! installs bundles and waits for the daemon's `Completed` signal, marks
//! slots, and reads slot status and the daemon's properties.
//!
//! ```no_run
//! # async fn example() -> rauc::Result<()> {
//! let installer = rauc::Installer::system().await?;
//! installer
//!     .install("/data/update.raucb", &rauc::InstallOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control;
pub mod dbus;
pub mod error;
pub mod installer;
pub mod shutdown;
pub mod slot;
pub mod value;

pub use config::{BusKind, Config};
pub use error::{Error, Result};
pub use installer::{BundleInfo, InstallOptions, Installer, MarkResult, MarkState, Progress};
pub use slot::{SlotState, SlotStatus};
pub use value::Value;
