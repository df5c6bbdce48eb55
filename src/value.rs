use bytes::{Buf, Bytes};

use crate::{
    encode::{Encode, Encoded, push_element},
    postgres::{AnyArray, Bytea, CompositeRecord, Oid, PgFormat, PgType},
    registry::TypeRegistry,
    row::{Column, DecodeError, FromColumn},
};

#[cfg(feature = "time")]
use crate::postgres::{Interval, TimeTz};

const INLINE_LEN: usize = 15;

pub(crate) enum ValueRef<'a> {
    Slice(&'a [u8]),
    Inline {
        offset: usize,
        value: [u8;INLINE_LEN],
    },
    Bytes(Bytes)
}

impl ValueRef<'_> {
    pub fn inline(slice: &[u8]) -> ValueRef<'static> {
        let len = slice.len();
        assert!(len < INLINE_LEN, "inline slice is too large");
        let mut value = [0u8;INLINE_LEN];
        value[INLINE_LEN - len..].copy_from_slice(slice);
        ValueRef::Inline { offset: INLINE_LEN - len, value }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueRef::Slice(items) => items.len(),
            ValueRef::Inline { offset, .. } => INLINE_LEN - offset,
            ValueRef::Bytes(bytes) => bytes.len(),
        }
    }
}

impl Buf for ValueRef<'_> {
    fn remaining(&self) -> usize {
        match self {
            ValueRef::Slice(items) => Buf::remaining(items),
            ValueRef::Inline { offset, .. } => INLINE_LEN - offset,
            ValueRef::Bytes(bytes) => Buf::remaining(bytes),
        }
    }

    fn chunk(&self) -> &[u8] {
        match self {
            ValueRef::Slice(items) => Buf::chunk(items),
            ValueRef::Inline { offset, value } => &value[*offset..],
            ValueRef::Bytes(bytes) => Buf::chunk(bytes),
        }
    }

    fn advance(&mut self, cnt: usize) {
        match self {
            ValueRef::Slice(items) => Buf::advance(items, cnt),
            ValueRef::Inline { offset, .. } => *offset += cnt,
            ValueRef::Bytes(bytes) => Buf::advance(bytes, cnt),
        }
    }
}

impl std::fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use crate::ext::FmtExt;
        self.chunk().lossy().fmt(f)
    }
}

/// Dynamic, tagged-union value, used when a column's Rust type isn't known ahead
/// of time (e.g. generic tooling, or a value nested inside a composite/array/enum
/// that has no static Rust counterpart).
///
/// Array and composite members decode recursively into nested [`Value`]s; an enum
/// value decodes to its label string. Classifying an opaque oid as a named
/// composite or enum (as opposed to plain unrecognized bytes) requires the
/// catalog knowledge in [`TypeRegistry`], see [`Value::decode_with_registry`].
/// Built-in array oids and the anonymous `record` oid are recognized without it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Char(char),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    /// `oid` (26) or one of the `reg*` aliases (24, 2202-2206, 3734, 3769, 4089,
    /// 4096) — all the same big-endian `u32` on the wire.
    Oid(u32),
    #[cfg(feature = "time")]
    Date(time::Date),
    #[cfg(feature = "time")]
    Time(time::Time),
    #[cfg(feature = "time")]
    Timestamp(time::PrimitiveDateTime),
    #[cfg(feature = "time")]
    TimestampTz(time::UtcDateTime),
    #[cfg(feature = "time")]
    TimeTz(TimeTz),
    #[cfg(feature = "time")]
    Interval(Interval),
    Array(Vec<Value>),
    Composite(Vec<Value>),
    Enum(String),
}

impl Value {
    /// Decode a column, consulting `registry` to recognize named composite and
    /// enum oids (which, unlike arrays and anonymous records, carry no static
    /// marker oid).
    pub fn decode_with_registry(col: Column, registry: &TypeRegistry) -> Result<Value, DecodeError> {
        let oid = col.oid();
        decode_element(oid, col.into_value(), Some(registry))
    }

    /// The oid this value would be sent as, used when nesting into an array or
    /// composite. `0` for `Null`/`Enum`, whose real oid isn't statically known.
    fn element_oid(&self) -> Oid {
        match self {
            Value::Null => 0,
            Value::Bool(_) => bool::OID,
            Value::Int2(_) => i16::OID,
            Value::Int4(_) => i32::OID,
            Value::Int8(_) => i64::OID,
            Value::Float4(_) => f32::OID,
            Value::Float8(_) => f64::OID,
            Value::Char(_) => char::OID,
            Value::Text(_) => <String as PgType>::OID,
            Value::Bytes(_) => Bytea::OID,
            Value::Uuid(_) => uuid::Uuid::OID,
            // re-encoding always targets the plain `oid` type; the original
            // reg* subtype isn't retained once folded into this variant.
            Value::Oid(_) => 26,
            #[cfg(feature = "time")]
            Value::Date(_) => time::Date::OID,
            #[cfg(feature = "time")]
            Value::Time(_) => time::Time::OID,
            #[cfg(feature = "time")]
            Value::Timestamp(_) => time::PrimitiveDateTime::OID,
            #[cfg(feature = "time")]
            Value::TimestampTz(_) => time::UtcDateTime::OID,
            #[cfg(feature = "time")]
            Value::TimeTz(_) => TimeTz::OID,
            #[cfg(feature = "time")]
            Value::Interval(_) => Interval::OID,
            Value::Array(_) => AnyArray::OID,
            Value::Composite(_) => CompositeRecord::OID,
            Value::Enum(_) => 0,
        }
    }
}

impl FromColumn for Value {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        let oid = col.oid();
        decode_element(oid, col.into_value(), None)
    }
}

/// Scalar oids this crate has a static [`FromColumn`] impl for. Reuses those
/// impls (via a synthetic [`Column`]) instead of re-deriving their wire layout.
fn decode_scalar(oid: Oid, bytes: Bytes) -> Option<Result<Value, DecodeError>> {
    let col = |bytes| Column::synthetic(oid, Some(bytes));
    Some(match oid {
        16 => bool::decode(col(bytes)).map(Value::Bool),
        21 => i16::decode(col(bytes)).map(Value::Int2),
        23 => i32::decode(col(bytes)).map(Value::Int4),
        20 => i64::decode(col(bytes)).map(Value::Int8),
        700 => f32::decode(col(bytes)).map(Value::Float4),
        701 => f64::decode(col(bytes)).map(Value::Float8),
        18 => char::decode(col(bytes)).map(Value::Char),
        19 | 25 | 114 | 705 | 1042 | 1043 => String::decode(col(bytes)).map(Value::Text),
        17 => Vec::<u8>::decode(col(bytes)).map(Value::Bytes),
        2950 => uuid::Uuid::decode(col(bytes)).map(Value::Uuid),
        24 | 26 | 2202..=2206 | 3734 | 3769 | 4089 | 4096 => {
            let mut b = bytes;
            Ok(Value::Oid(b.get_u32()))
        },
        #[cfg(feature = "time")]
        1082 => time::Date::decode(col(bytes)).map(Value::Date),
        #[cfg(feature = "time")]
        1083 => time::Time::decode(col(bytes)).map(Value::Time),
        #[cfg(feature = "time")]
        1114 => time::PrimitiveDateTime::decode(col(bytes)).map(Value::Timestamp),
        #[cfg(feature = "time")]
        1184 => time::UtcDateTime::decode(col(bytes)).map(Value::TimestampTz),
        #[cfg(feature = "time")]
        1266 => TimeTz::decode(col(bytes)).map(Value::TimeTz),
        #[cfg(feature = "time")]
        1186 => Interval::decode(col(bytes)).map(Value::Interval),
        _ => return None,
    })
}

fn decode_element(oid: Oid, bytes: Option<Bytes>, registry: Option<&TypeRegistry>) -> Result<Value, DecodeError> {
    let Some(bytes) = bytes else { return Ok(Value::Null) };

    if let Some(registry) = registry {
        if registry.is_enum(oid) {
            return Ok(Value::Enum(String::from_utf8(bytes.into())?));
        }
        if oid == CompositeRecord::OID || registry.composite_members(oid).is_some() {
            return decode_composite(bytes, Some(registry));
        }
        if let Some(elem_oid) = registry.array_element(oid).or_else(|| crate::postgres::array_element_oid(oid)) {
            return decode_array(bytes, elem_oid, Some(registry));
        }
    } else {
        if oid == CompositeRecord::OID {
            return decode_composite(bytes, None);
        }
        if let Some(elem_oid) = crate::postgres::array_element_oid(oid) {
            return decode_array(bytes, elem_oid, None);
        }
    }

    match decode_scalar(oid, bytes) {
        Some(result) => result,
        None => Err(DecodeError::OidMissmatch),
    }
}

fn decode_composite(mut value: Bytes, registry: Option<&TypeRegistry>) -> Result<Value, DecodeError> {
    let field_count = value.get_i32().max(0);
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let field_oid = value.get_u32();
        let field_value = match value.get_i32() {
            -1 => None,
            len => Some(value.split_to(len as usize)),
        };
        fields.push(decode_element(field_oid, field_value, registry)?);
    }
    Ok(Value::Composite(fields))
}

fn decode_array(mut value: Bytes, _elem_oid_hint: Oid, registry: Option<&TypeRegistry>) -> Result<Value, DecodeError> {
    let ndim = value.get_i32();
    let _has_null = value.get_i32();
    let elem_oid = value.get_u32();
    let mut dims = Vec::with_capacity(ndim.max(0) as usize);
    for _ in 0..ndim {
        let len = value.get_i32();
        let _lower_bound = value.get_i32();
        dims.push(len.max(0));
    }
    let total: usize = if dims.is_empty() { 0 } else { dims.iter().map(|&d| d as usize).product() };

    let mut elems = Vec::with_capacity(total);
    for _ in 0..total {
        let elem_value = match value.get_i32() {
            -1 => None,
            len => Some(value.split_to(len as usize)),
        };
        elems.push(decode_element(elem_oid, elem_value, registry)?);
    }

    let mut iter = elems.into_iter();
    Ok(nest_array(&dims, &mut iter))
}

/// Rebuild nested [`Value::Array`]s from a flat, row-major element list and the
/// per-dimension lengths read off the wire.
fn nest_array(dims: &[i32], values: &mut std::vec::IntoIter<Value>) -> Value {
    match dims.split_first() {
        None => values.next().unwrap_or(Value::Null),
        Some((&len, rest)) => {
            Value::Array((0..len).map(|_| nest_array(rest, values)).collect())
        }
    }
}

impl Encode<'static> for Value {
    fn encode(self) -> Encoded<'static> {
        match self {
            Value::Null => Encoded::null(),
            Value::Bool(v) => v.encode(),
            Value::Int2(v) => v.encode(),
            Value::Int4(v) => v.encode(),
            Value::Int8(v) => v.encode(),
            Value::Float4(v) => v.encode(),
            Value::Float8(v) => v.encode(),
            Value::Char(v) => v.encode(),
            Value::Text(v) => Encoded::owned(v.into_bytes(), <String as PgType>::OID, PgFormat::Text),
            Value::Bytes(v) => Encoded::owned(v, Bytea::OID, PgFormat::Binary),
            Value::Uuid(v) => v.encode(),
            Value::Oid(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Date(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Time(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Timestamp(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::TimestampTz(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::TimeTz(v) => v.encode(),
            #[cfg(feature = "time")]
            Value::Interval(v) => v.encode(),
            Value::Array(items) => encode_array(items),
            Value::Composite(fields) => encode_composite(fields),
            // no catalog access here; re-encoding an enum needs its type oid from
            // the caller, so this is left as plain text and oid 0 (server infers).
            Value::Enum(label) => Encoded::owned(label.into_bytes(), 0, PgFormat::Text),
        }
    }
}

fn encode_array(items: Vec<Value>) -> Encoded<'static> {
    let elem_oid = items.first().map(Value::element_oid).unwrap_or(0);
    let array_oid = crate::postgres::array_oid_of(elem_oid).unwrap_or(AnyArray::OID);
    let has_null = items.iter().any(|v| matches!(v, Value::Null)) as i32;

    let mut buf = Vec::with_capacity(20 + items.len() * 8);
    buf.extend_from_slice(&1i32.to_be_bytes());
    buf.extend_from_slice(&has_null.to_be_bytes());
    buf.extend_from_slice(&elem_oid.to_be_bytes());
    buf.extend_from_slice(&(items.len() as i32).to_be_bytes());
    buf.extend_from_slice(&1i32.to_be_bytes());

    for item in items {
        match item {
            Value::Null => buf.extend_from_slice(&(-1i32).to_be_bytes()),
            other => push_element(&mut buf, other.encode()),
        }
    }

    Encoded::owned(buf, array_oid, PgFormat::Binary)
}

fn encode_composite(fields: Vec<Value>) -> Encoded<'static> {
    let mut buf = Vec::with_capacity(4 + fields.len() * 8);
    buf.extend_from_slice(&(fields.len() as i32).to_be_bytes());

    for field in fields {
        let oid = field.element_oid();
        buf.extend_from_slice(&oid.to_be_bytes());
        match field {
            Value::Null => buf.extend_from_slice(&(-1i32).to_be_bytes()),
            other => push_element(&mut buf, other.encode()),
        }
    }

    Encoded::owned(buf, CompositeRecord::OID, PgFormat::Binary)
}

macro_rules! value_scalar {
    ($variant:ident, $ty:ty) => {
        impl TryFrom<Value> for $ty {
            type Error = DecodeError;

            fn try_from(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    _ => Err(DecodeError::TypeMismatch),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

value_scalar!(Bool, bool);
value_scalar!(Int2, i16);
value_scalar!(Int4, i32);
value_scalar!(Int8, i64);
value_scalar!(Float4, f32);
value_scalar!(Float8, f64);
value_scalar!(Char, char);
value_scalar!(Text, String);
value_scalar!(Bytes, Vec<u8>);
value_scalar!(Uuid, uuid::Uuid);
value_scalar!(Oid, u32);
#[cfg(feature = "time")]
value_scalar!(Date, time::Date);
#[cfg(feature = "time")]
value_scalar!(Time, time::Time);
#[cfg(feature = "time")]
value_scalar!(Timestamp, time::PrimitiveDateTime);
#[cfg(feature = "time")]
value_scalar!(TimestampTz, time::UtcDateTime);
#[cfg(feature = "time")]
value_scalar!(TimeTz, TimeTz);
#[cfg(feature = "time")]
value_scalar!(Interval, Interval);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_null() {
        let col = Column::synthetic(23, None);
        assert_eq!(Value::decode(col).unwrap(), Value::Null);
    }

    #[test]
    fn decodes_known_scalar() {
        let col = Column::synthetic(23, Some(Bytes::from_static(&42i32.to_be_bytes())));
        assert_eq!(Value::decode(col).unwrap(), Value::Int4(42));
    }

    #[test]
    fn unknown_oid_without_registry_errors() {
        let col = Column::synthetic(99999, Some(Bytes::from_static(b"x")));
        assert!(matches!(Value::decode(col), Err(DecodeError::OidMissmatch)));
    }

    #[test]
    fn try_from_mismatch() {
        let err = i32::try_from(Value::Text("nope".into())).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch));
    }

    #[test]
    fn decodes_1d_array_of_int4() {
        let mut body = Vec::new();
        body.extend_from_slice(&1i32.to_be_bytes()); // ndim
        body.extend_from_slice(&0i32.to_be_bytes()); // has_null
        body.extend_from_slice(&23u32.to_be_bytes()); // elem oid
        body.extend_from_slice(&3i32.to_be_bytes()); // dim len
        body.extend_from_slice(&1i32.to_be_bytes()); // lower bound
        for v in [1i32, 2, 3] {
            body.extend_from_slice(&4i32.to_be_bytes());
            body.extend_from_slice(&v.to_be_bytes());
        }
        let col = Column::synthetic(1007, Some(Bytes::from(body)));
        let decoded = Value::decode(col).unwrap();
        assert_eq!(
            decoded,
            Value::Array(vec![Value::Int4(1), Value::Int4(2), Value::Int4(3)])
        );
    }

    #[test]
    fn decodes_2d_array_of_int4() {
        let mut body = Vec::new();
        body.extend_from_slice(&2i32.to_be_bytes());
        body.extend_from_slice(&0i32.to_be_bytes());
        body.extend_from_slice(&23u32.to_be_bytes());
        body.extend_from_slice(&2i32.to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(&2i32.to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        for v in [1i32, 2, 3, 4] {
            body.extend_from_slice(&4i32.to_be_bytes());
            body.extend_from_slice(&v.to_be_bytes());
        }
        let col = Column::synthetic(1007, Some(Bytes::from(body)));
        let decoded = Value::decode(col).unwrap();
        assert_eq!(
            decoded,
            Value::Array(vec![
                Value::Array(vec![Value::Int4(1), Value::Int4(2)]),
                Value::Array(vec![Value::Int4(3), Value::Int4(4)]),
            ])
        );
    }
}

