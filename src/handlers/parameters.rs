//! Case-insensitive parameter bag with read-time coercion.
//!
//! [`OperationParameters`] stores whatever the caller supplied, either a
//! JSON wire element or a native Rust value, and only converts it when a
//! handler reads it with a concrete target type. Conversion is driven by
//! [`FromParameter`]:
//!
//! 1. `Option<T>` reads coerce as `T`.
//! 2. A native value whose type is exactly the target is returned as is.
//! 3. A JSON element converts by kind: strings, numbers and booleans
//!    directly, enums by member name or ordinal, anything else through
//!    serde (see [`Structured`]).
//! 4. Native primitives of another type are rendered as JSON and take the
//!    same path, so a native `i32` reads as `i64` and `"42"` reads as `u32`.
//!
//! A native `Value::Null` or `None` counts as `null`, like the JSON element.
//!
//! Every failure is an [`Error::InvalidArgument`] naming the parameter, the
//! offending value and the target type.
//!
//! # Examples
//!
//! ```
//! use docmcp::handlers::OperationParameters;
//!
//! let mut params = OperationParameters::new();
//! params.set("PageIndex", "3").set("landscape", true);
//!
//! assert_eq!(params.get_required::<u32>("pageindex").unwrap(), 3);
//! assert_eq!(params.get_optional("scale", 1.0_f64).unwrap(), 1.0);
//! assert!(params.get_required::<String>("title").is_err());
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

type NativeValue = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
enum Stored {
    Json(Value),
    Native {
        value: NativeValue,
        type_name: &'static str,
    },
}

impl Stored {
    /// JSON `null`, or a native value that renders as one (`Value::Null`,
    /// `None` of a primitive).
    fn is_null(&self) -> bool {
        match self {
            Self::Json(value) => value.is_null(),
            Self::Native { value, .. } => {
                native_to_json(value.as_ref()).is_some_and(|json| json.is_null())
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Native { value, type_name } => native_to_json(value.as_ref())
                .map(|json| json.to_string())
                .unwrap_or_else(|| format!("<{type_name}>")),
        }
    }
}

#[derive(Clone)]
struct Entry {
    name: String,
    value: Stored,
}

/// An uncoerced parameter value as returned by
/// [`OperationParameters::get_raw`].
#[derive(Clone, Copy)]
pub enum RawParameter<'a> {
    /// A JSON wire element, possibly `null`.
    Json(&'a Value),
    /// A native value stored with [`OperationParameters::set_native`].
    Native(&'a (dyn Any + Send + Sync)),
}

impl<'a> RawParameter<'a> {
    /// Returns the JSON element, if this is one.
    pub fn as_json(&self) -> Option<&'a Value> {
        match *self {
            Self::Json(value) => Some(value),
            Self::Native(_) => None,
        }
    }

    /// Downcasts a native value.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        match *self {
            Self::Json(_) => None,
            Self::Native(value) => value.downcast_ref::<T>(),
        }
    }
}

impl fmt::Debug for RawParameter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Native(_) => f.debug_tuple("Native").finish_non_exhaustive(),
        }
    }
}

/// Named parameters passed to an operation handler.
///
/// Names are matched case-insensitively; the spelling used by the first
/// `set` is kept for [`names`](Self::names). Setting an existing name
/// replaces its value.
#[derive(Clone, Default)]
pub struct OperationParameters {
    entries: IndexMap<String, Entry>,
}

impl OperationParameters {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from a JSON arguments object, as received in a tool
    /// call. `null` yields an empty bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `arguments` is neither an
    /// object nor `null`.
    pub fn from_arguments(arguments: Value) -> Result<Self> {
        match arguments {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(Error::invalid_argument(format!(
                "arguments must be a JSON object (got {other})"
            ))),
        }
    }

    /// Stores a JSON value under `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.insert(name.into(), Stored::Json(value.into()));
        self
    }

    /// Stores `value` only when it is `Some`.
    pub fn set_if_some<V: Into<Value>>(
        &mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    /// Stores a native Rust value under `name`.
    ///
    /// Reading it back with the same type returns a clone; other targets go
    /// through the primitive conversions.
    pub fn set_native<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.insert(
            name.into(),
            Stored::Native {
                value: Arc::new(value),
                type_name: type_name::<T>(),
            },
        );
        self
    }

    /// Returns `true` if `name` is present with a non-null value.
    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|entry| !entry.value.is_null())
    }

    /// Reads and coerces a parameter that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the parameter is absent,
    /// `null`, or cannot be converted to `T`.
    pub fn get_required<T: FromParameter>(&self, name: &str) -> Result<T> {
        let entry = self
            .lookup(name)
            .filter(|entry| !entry.value.is_null())
            .ok_or_else(|| {
                Error::invalid_argument(format!("missing required parameter '{name}'"))
            })?;
        coerce(name, &entry.value)
    }

    /// Reads and coerces a parameter, falling back to `default` when it is
    /// absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when a value is present but
    /// cannot be converted to `T`.
    pub fn get_optional<T: FromParameter>(&self, name: &str, default: T) -> Result<T> {
        match self.lookup(name).filter(|entry| !entry.value.is_null()) {
            Some(entry) => coerce(name, &entry.value),
            None => Ok(default),
        }
    }

    /// Returns the stored value without coercion.
    ///
    /// An explicit `null` is returned as `Some(RawParameter::Json(Null))`.
    pub fn get_raw(&self, name: &str) -> Option<RawParameter<'_>> {
        self.lookup(name).map(|entry| match &entry.value {
            Stored::Json(value) => RawParameter::Json(value),
            Stored::Native { value, .. } => RawParameter::Native(value.as_ref()),
        })
    }

    /// Number of stored parameters, `null` ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameters are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameter names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.name.as_str())
    }

    fn insert(&mut self, name: String, value: Stored) {
        let key = normalize(&name);
        match self.entries.get_mut(&key) {
            Some(entry) => entry.value = value,
            None => {
                self.entries.insert(key, Entry { name, value });
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries.get(&normalize(name))
    }
}

impl fmt::Debug for OperationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .values()
                    .map(|entry| (&entry.name, entry.value.describe())),
            )
            .finish()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for OperationParameters {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

impl From<Map<String, Value>> for OperationParameters {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn coerce<T: FromParameter>(name: &str, stored: &Stored) -> Result<T> {
    let converted = match stored {
        Stored::Json(value) => T::from_json(value),
        Stored::Native { value, .. } => match value.downcast_ref::<T>() {
            Some(exact) => Some(exact.clone()),
            None => T::from_native(value.as_ref()),
        },
    };
    converted.ok_or_else(|| {
        Error::invalid_argument(format!(
            "parameter '{name}' has value {} which cannot be converted to {}",
            stored.describe(),
            T::type_name()
        ))
    })
}

/// A type a parameter can be read as.
///
/// Implemented for strings, paths, booleans, every integer and float
/// primitive, [`Value`], `Option<T>`, `Vec<T>`, [`Structured<T>`] and
/// [`Native<T>`].
/// Enums get an implementation from [`parameter_enum!`](crate::parameter_enum).
pub trait FromParameter: Clone + Send + Sync + 'static {
    /// Converts a JSON wire element, or returns `None` if it does not fit.
    fn from_json(value: &Value) -> Option<Self>;

    /// Converts a native value of some other type.
    ///
    /// The default renders native primitives as JSON and defers to
    /// [`from_json`](Self::from_json).
    fn from_native(value: &(dyn Any + Send + Sync)) -> Option<Self> {
        native_to_json(value).and_then(|json| Self::from_json(&json))
    }

    /// Type name used in conversion errors.
    fn type_name() -> &'static str {
        type_name::<Self>()
    }
}

fn native_to_json(value: &(dyn Any + Send + Sync)) -> Option<Value> {
    macro_rules! try_downcast {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(Value::from(v.clone()));
                }
                if let Some(v) = value.downcast_ref::<Option<$ty>>() {
                    return Some(v.clone().map_or(Value::Null, Value::from));
                }
            )+
        };
    }

    if let Some(v) = value.downcast_ref::<Value>() {
        return Some(v.clone());
    }
    if let Some(v) = value.downcast_ref::<Option<Value>>() {
        return Some(v.clone().unwrap_or(Value::Null));
    }
    if let Some(v) = value.downcast_ref::<&'static str>() {
        return Some(Value::from(*v));
    }
    if let Some(v) = value.downcast_ref::<PathBuf>() {
        return v.to_str().map(Value::from);
    }
    try_downcast!(String, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
    None
}

impl FromParameter for Value {
    fn from_json(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromParameter for String {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromParameter for PathBuf {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(PathBuf::from)
    }
}

impl FromParameter for bool {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

macro_rules! integer_parameter {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromParameter for $ty {
                fn from_json(value: &Value) -> Option<Self> {
                    match value {
                        Value::Number(n) => n
                            .as_i64()
                            .and_then(|v| <$ty>::try_from(v).ok())
                            .or_else(|| n.as_u64().and_then(|v| <$ty>::try_from(v).ok())),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

integer_parameter!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromParameter for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromParameter for f32 {
    fn from_json(value: &Value) -> Option<Self> {
        f64::from_json(value)
            .filter(|v| v.is_nan() || v.abs() <= f64::from(f32::MAX))
            .map(|v| v as f32)
    }
}

impl<T: FromParameter> FromParameter for Option<T> {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_json(other).map(Some),
        }
    }

    fn from_native(value: &(dyn Any + Send + Sync)) -> Option<Self> {
        match value.downcast_ref::<T>() {
            Some(exact) => Some(Some(exact.clone())),
            None => T::from_native(value).map(Some),
        }
    }

    fn type_name() -> &'static str {
        T::type_name()
    }
}

impl<T: FromParameter> FromParameter for Vec<T> {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_json).collect()
    }
}

/// Reads a parameter through serde deserialization.
///
/// Used for option objects and other structured inputs.
///
/// ```
/// use docmcp::handlers::{OperationParameters, Structured};
/// use serde::Deserialize;
///
/// #[derive(Debug, Clone, Deserialize)]
/// struct Margins {
///     top: f64,
///     bottom: f64,
/// }
///
/// let mut params = OperationParameters::new();
/// params.set("margins", serde_json::json!({"top": 1.0, "bottom": 2.5}));
///
/// let Structured(margins) = params.get_required::<Structured<Margins>>("margins").unwrap();
/// assert_eq!(margins.bottom, 2.5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structured<T>(pub T);

impl<T> Structured<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromParameter for Structured<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok().map(Structured)
    }

    fn from_native(value: &(dyn Any + Send + Sync)) -> Option<Self> {
        match value.downcast_ref::<T>() {
            Some(exact) => Some(Structured(exact.clone())),
            None => native_to_json(value).and_then(|json| Self::from_json(&json)),
        }
    }

    fn type_name() -> &'static str {
        type_name::<T>()
    }
}

/// Reads a value stored with [`OperationParameters::set_native`] by its
/// exact type.
///
/// Unlike the other targets there is no conversion: the stored value must
/// be a `T`.
///
/// ```
/// use docmcp::handlers::{Native, OperationParameters};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct PageRange(u32, u32);
///
/// let mut params = OperationParameters::new();
/// params.set_native("range", PageRange(1, 4));
///
/// let Native(range) = params.get_required::<Native<PageRange>>("range").unwrap();
/// assert_eq!(range, PageRange(1, 4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Native<T>(pub T);

impl<T> Native<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Clone + Send + Sync + 'static> FromParameter for Native<T> {
    fn from_json(_value: &Value) -> Option<Self> {
        None
    }

    fn from_native(value: &(dyn Any + Send + Sync)) -> Option<Self> {
        value.downcast_ref::<T>().cloned().map(Native)
    }

    fn type_name() -> &'static str {
        type_name::<T>()
    }
}

/// Resolves an enum member from a case-insensitive name or an ordinal.
///
/// Support function for [`parameter_enum!`](crate::parameter_enum).
#[doc(hidden)]
pub fn enum_from_json<T: Clone>(
    value: &Value,
    members: &[T],
    name_of: fn(&T) -> &'static str,
) -> Option<T> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            members
                .iter()
                .find(|member| name_of(member).eq_ignore_ascii_case(s))
                .or_else(|| s.parse::<usize>().ok().and_then(|i| members.get(i)))
                .cloned()
        }
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| members.get(i))
            .cloned(),
        _ => None,
    }
}

/// Declares a fieldless enum that can be read from [`OperationParameters`].
///
/// The enum accepts its member names in any case, or the zero-based
/// ordinal of a member as a number or numeric string. The enum must
/// derive `Clone`.
///
/// ```
/// use docmcp::handlers::OperationParameters;
///
/// docmcp::parameter_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Orientation {
///         Portrait,
///         Landscape,
///     }
/// }
///
/// let mut params = OperationParameters::new();
/// params.set("a", "LANDSCAPE").set("b", 0);
/// assert_eq!(params.get_required::<Orientation>("a").unwrap(), Orientation::Landscape);
/// assert_eq!(params.get_required::<Orientation>("b").unwrap(), Orientation::Portrait);
/// ```
#[macro_export]
macro_rules! parameter_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member in declaration order.
            pub const MEMBERS: &'static [$name] = &[$($name::$variant),+];

            /// The member's declared name.
            pub fn member_name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }
        }

        impl $crate::handlers::FromParameter for $name {
            fn from_json(value: &$crate::__private::Value) -> ::std::option::Option<Self> {
                $crate::handlers::parameters::enum_from_json(value, Self::MEMBERS, Self::member_name)
            }
        }
    };
}
