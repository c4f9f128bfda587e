use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// Runtime state of a slot as reported by `GetSlotStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Booted,
    Active,
    Inactive,
    Unknown(String),
}

impl SlotState {
    pub fn is_booted(&self) -> bool {
        matches!(self, SlotState::Booted)
    }
}

impl From<&str> for SlotState {
    fn from(state: &str) -> Self {
        match state {
            "booted" => SlotState::Booted,
            "active" => SlotState::Active,
            "inactive" => SlotState::Inactive,
            other => SlotState::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Booted => f.write_str("booted"),
            SlotState::Active => f.write_str("active"),
            SlotState::Inactive => f.write_str("inactive"),
            SlotState::Unknown(other) => f.write_str(other),
        }
    }
}

/// One entry of the daemon's slot status list.
///
/// Known attributes are decoded into typed fields up front, the full
/// attribute map stays available through [`SlotStatus::attribute`] for keys
/// this crate does not know about.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotStatus {
    pub name: String,
    pub class: Option<String>,
    pub device: Option<String>,
    pub slot_type: Option<String>,
    pub bootname: Option<String>,
    pub state: Option<SlotState>,
    pub parent: Option<String>,
    pub mountpoint: Option<String>,
    pub boot_status: Option<String>,
    pub sha256: Option<String>,
    pub size: Option<u64>,
    pub bundle_compatible: Option<String>,
    pub bundle_version: Option<String>,
    pub installed_timestamp: Option<String>,
    pub installed_count: Option<u64>,
    pub activated_timestamp: Option<String>,
    pub activated_count: Option<u64>,
    attributes: BTreeMap<String, Value>,
}

impl SlotStatus {
    /// Builds a slot entry, failing if a known key carries the wrong type.
    pub fn from_attributes(
        name: impl Into<String>,
        attributes: BTreeMap<String, Value>,
    ) -> Result<Self, String> {
        let text = |key: &str| -> Result<Option<String>, String> {
            match attributes.get(key) {
                None => Ok(None),
                Some(Value::Str(s)) => Ok(Some(s.clone())),
                Some(other) => Err(format!("{key} should be a string, got {}", other.kind())),
            }
        };
        let number = |key: &str| -> Result<Option<u64>, String> {
            match attributes.get(key) {
                None => Ok(None),
                Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                    format!("{key} should be an unsigned integer, got {}", value.kind())
                }),
            }
        };

        Ok(Self {
            name: name.into(),
            class: text("class")?,
            device: text("device")?,
            slot_type: text("type")?,
            bootname: text("bootname")?,
            state: text("state")?.as_deref().map(SlotState::from),
            parent: text("parent")?,
            mountpoint: text("mountpoint")?,
            boot_status: text("boot-status")?,
            sha256: text("sha256")?,
            size: number("size")?,
            bundle_compatible: text("bundle.compatible")?,
            bundle_version: text("bundle.version")?,
            installed_timestamp: text("installed.timestamp")?,
            installed_count: number("installed.count")?,
            activated_timestamp: text("activated.timestamp")?,
            activated_count: number("activated.count")?,
            attributes,
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn is_booted(&self) -> bool {
        self.state.as_ref().is_some_and(SlotState::is_booted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn decodes_known_keys() {
        let slot = SlotStatus::from_attributes(
            "rootfs.0",
            attrs(&[
                ("class", Value::from("rootfs")),
                ("state", Value::from("booted")),
                ("device", Value::from("/dev/mmcblk0p1")),
                ("size", Value::UInt(1 << 20)),
                ("installed.count", Value::UInt(3)),
                ("description", Value::from("primary")),
            ]),
        )
        .unwrap();

        assert_eq!(slot.name, "rootfs.0");
        assert_eq!(slot.class.as_deref(), Some("rootfs"));
        assert_eq!(slot.device.as_deref(), Some("/dev/mmcblk0p1"));
        assert_eq!(slot.state, Some(SlotState::Booted));
        assert!(slot.is_booted());
        assert_eq!(slot.size, Some(1 << 20));
        assert_eq!(slot.installed_count, Some(3));
        assert_eq!(slot.bootname, None);
        assert_eq!(
            slot.attribute("description").and_then(Value::as_str),
            Some("primary")
        );
    }

    #[test]
    fn rejects_mistyped_known_keys() {
        let err = SlotStatus::from_attributes("rootfs.1", attrs(&[("state", Value::Int(1))]))
            .unwrap_err();
        assert!(err.contains("state"), "{err}");
    }

    #[test]
    fn unknown_states_are_kept() {
        let slot =
            SlotStatus::from_attributes("data", attrs(&[("state", Value::from("pending"))]))
                .unwrap();
        assert_eq!(slot.state, Some(SlotState::Unknown("pending".into())));
        assert!(!slot.is_booted());
    }
}
