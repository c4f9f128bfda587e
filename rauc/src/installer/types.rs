use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use zbus::zvariant;

/// Options accepted by `InstallBundle`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Skip the daemon's compatible check for this bundle.
    pub ignore_compatible: bool,
}

impl InstallOptions {
    pub fn ignore_compatible(mut self, ignore: bool) -> Self {
        self.ignore_compatible = ignore;
        self
    }

    /// The `a{sv}` argument map, containing only the options that are set.
    pub(crate) fn to_args(&self) -> HashMap<&'static str, zvariant::Value<'static>> {
        let mut args = HashMap::new();
        if self.ignore_compatible {
            args.insert("ignore-compatible", zvariant::Value::from(true));
        }
        args
    }
}

/// The `Progress` property: overall percentage, current step and how deeply
/// nested that step is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percentage: i32,
    pub message: String,
    pub nesting_depth: i32,
}

impl TryFrom<&Value> for Progress {
    type Error = String;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let int = |field: &Value, name: &str| {
            field
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| format!("{name} should be an int32, got {}", field.kind()))
        };

        match value.fields() {
            Some([percentage, message, depth]) => Ok(Progress {
                percentage: int(percentage, "percentage")?,
                message: message
                    .as_str()
                    .ok_or_else(|| format!("message should be a string, got {}", message.kind()))?
                    .to_owned(),
                nesting_depth: int(depth, "nesting depth")?,
            }),
            Some(fields) => Err(format!("expected 3 fields, got {}", fields.len())),
            None => Err(format!("expected a struct, got {}", value.kind())),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3}% {}{}",
            self.percentage,
            "  ".repeat(self.nesting_depth.max(0) as usize),
            self.message
        )
    }
}

/// Reply of `Info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub compatible: String,
    pub version: String,
}

/// Reply of `Mark`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkResult {
    pub slot_name: String,
    pub message: String,
}

/// State a slot can be marked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkState {
    Good,
    Bad,
    Active,
}

impl MarkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkState::Good => "good",
            MarkState::Bad => "bad",
            MarkState::Active => "active",
        }
    }
}

impl FromStr for MarkState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(MarkState::Good),
            "bad" => Ok(MarkState::Bad),
            "active" => Ok(MarkState::Active),
            other => Err(format!(
                "unknown mark state '{other}', expected good, bad or active"
            )),
        }
    }
}

impl fmt::Display for MarkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_decodes_exactly() {
        let value = Value::Struct(vec![
            Value::Int(42),
            Value::from("copying image"),
            Value::Int(1),
        ]);
        let progress = Progress::try_from(&value).unwrap();
        assert_eq!(
            progress,
            Progress {
                percentage: 42,
                message: "copying image".into(),
                nesting_depth: 1,
            }
        );
    }

    #[test]
    fn progress_rejects_wrong_shapes() {
        assert!(Progress::try_from(&Value::from("42")).is_err());
        assert!(Progress::try_from(&Value::Struct(vec![Value::Int(1)])).is_err());

        let err = Progress::try_from(&Value::Struct(vec![
            Value::from("42"),
            Value::from("copying image"),
            Value::Int(1),
        ]))
        .unwrap_err();
        assert!(err.contains("percentage"), "{err}");
    }

    #[test]
    fn options_only_carry_set_keys() {
        assert!(InstallOptions::default().to_args().is_empty());

        let args = InstallOptions::default().ignore_compatible(true).to_args();
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("ignore-compatible"), Some(&zvariant::Value::from(true)));
    }

    #[test]
    fn mark_state_parses() {
        assert_eq!("good".parse::<MarkState>(), Ok(MarkState::Good));
        assert_eq!("active".parse::<MarkState>(), Ok(MarkState::Active));
        assert!("booted".parse::<MarkState>().is_err());
    }
}
