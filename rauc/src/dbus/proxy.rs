use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Value};
use zbus::{Result, proxy};

#[proxy(
    interface = "de.pengutronix.rauc.Installer",
    default_service = "de.pengutronix.rauc",
    default_path = "/",
    gen_blocking = false
)]
pub(crate) trait Installer {
    async fn install_bundle(&self, source: &str, args: HashMap<&str, Value<'_>>) -> Result<()>;
    async fn info(&self, bundle: &str) -> Result<(String, String)>;
    async fn mark(&self, state: &str, slot_identifier: &str) -> Result<(String, String)>;
    async fn get_slot_status(&self) -> Result<Vec<(String, HashMap<String, OwnedValue>)>>;
}
