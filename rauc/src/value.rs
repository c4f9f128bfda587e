use std::collections::BTreeMap;
use std::fmt;

use zbus::zvariant;

/// A dynamically typed value received from the daemon.
///
/// D-Bus variants are converted into this at the boundary so that nothing
/// outside the `dbus` module has to deal with `zvariant` lifetimes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Struct(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view, accepting unsigned values that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Unsigned view, accepting non-negative signed values.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Fields of a struct value.
    pub fn fields(&self) -> Option<&[Value]> {
        match self {
            Value::Struct(f) => Some(f),
            _ => None,
        }
    }

    /// Short name of the variant, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Struct(fields) => write_seq(f, "(", fields, ")"),
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::UInt(u.into())
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl TryFrom<&zvariant::Value<'_>> for Value {
    type Error = String;

    fn try_from(value: &zvariant::Value<'_>) -> Result<Self, Self::Error> {
        Ok(match value {
            zvariant::Value::Bool(b) => Value::Bool(*b),
            zvariant::Value::U8(u) => Value::UInt((*u).into()),
            zvariant::Value::U16(u) => Value::UInt((*u).into()),
            zvariant::Value::U32(u) => Value::UInt((*u).into()),
            zvariant::Value::U64(u) => Value::UInt(*u),
            zvariant::Value::I16(i) => Value::Int((*i).into()),
            zvariant::Value::I32(i) => Value::Int((*i).into()),
            zvariant::Value::I64(i) => Value::Int(*i),
            zvariant::Value::F64(d) => Value::Double(*d),
            zvariant::Value::Str(s) => Value::Str(s.as_str().to_owned()),
            zvariant::Value::ObjectPath(p) => Value::Str(p.as_str().to_owned()),
            zvariant::Value::Signature(s) => Value::Str(s.to_string()),
            zvariant::Value::Value(inner) => Value::try_from(inner.as_ref())?,
            zvariant::Value::Array(array) => Value::List(
                array
                    .iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            zvariant::Value::Dict(dict) => {
                let mut map = BTreeMap::new();
                for (key, value) in dict.iter() {
                    let key = match Value::try_from(key)? {
                        Value::Str(s) => s,
                        other => other.to_string(),
                    };
                    map.insert(key, Value::try_from(value)?);
                }
                Value::Map(map)
            }
            zvariant::Value::Structure(structure) => Value::Struct(
                structure
                    .fields()
                    .iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            other => return Err(format!("unsupported variant {other:?}")),
        })
    }
}

impl TryFrom<&zvariant::OwnedValue> for Value {
    type Error = String;

    fn try_from(value: &zvariant::OwnedValue) -> Result<Self, Self::Error> {
        let value: &zvariant::Value<'_> = value;
        Value::try_from(value)
    }
}
