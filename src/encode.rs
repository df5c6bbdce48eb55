//! Query parameter encoding.
use bytes::{Buf, Bytes};

use crate::{
    ext::BindParams,
    postgres::{Bytea, Oid, PgFormat, PgType},
    value::ValueRef,
};

/// Value that can be encoded to be bound to a sql parameter.
pub trait Encode<'q> {
    /// Encode the value.
    fn encode(self) -> Encoded<'q>;
}

/// Postgres encoded value, ready to be bound as a query parameter.
pub struct Encoded<'q> {
    value: ValueRef<'q>,
    is_null: bool,
    oid: Oid,
    format: PgFormat,
}

impl<'q> Encoded<'q> {
    /// Create [`Encoded`] from a borrowed slice.
    pub fn from_slice(slice: &'q [u8], oid: Oid, format: PgFormat) -> Encoded<'q> {
        Encoded { value: ValueRef::Slice(slice), is_null: false, oid, format }
    }

    /// Create a heap allocated [`Encoded`] by copying the given slice.
    pub fn copy_from_slice(slice: &[u8], oid: Oid, format: PgFormat) -> Encoded<'static> {
        Encoded {
            value: ValueRef::Bytes(Bytes::copy_from_slice(slice)),
            is_null: false,
            oid,
            format,
        }
    }

    /// Create a heap allocated [`Encoded`] taking ownership of `buf`.
    pub fn owned(buf: Vec<u8>, oid: Oid, format: PgFormat) -> Encoded<'static> {
        Encoded { value: ValueRef::Bytes(Bytes::from(buf)), is_null: false, oid, format }
    }

    /// Create [`Encoded`] `NULL`.
    ///
    /// As the wire format never transmits bytes for a `NULL` parameter, the chosen
    /// format code is irrelevant to the server; [`PgFormat::Binary`] is used here.
    pub fn null() -> Encoded<'static> {
        Encoded { value: ValueRef::Slice(&[]), is_null: true, oid: 0, format: PgFormat::Binary }
    }

    /// Returns this value's oid, or `0` for `NULL`.
    pub fn oid(&self) -> Oid {
        match self.is_null {
            true => 0,
            false => self.oid,
        }
    }

    /// Returns the format code this value is encoded in.
    pub fn format(&self) -> PgFormat {
        self.format
    }

    pub(crate) fn value(&self) -> &ValueRef<'q> {
        &self.value
    }
}

impl Buf for Encoded<'_> {
    fn remaining(&self) -> usize {
        self.value.remaining()
    }

    fn chunk(&self) -> &[u8] {
        self.value.chunk()
    }

    fn advance(&mut self, cnt: usize) {
        self.value.advance(cnt);
    }
}

impl BindParams for Encoded<'_> {
    fn size(&self) -> i32 {
        match self.is_null {
            true => -1,
            false => self.remaining().try_into().unwrap(),
        }
    }
}

macro_rules! encode {
    (<$lf:tt,$ty:ty>$pat:tt => $body:expr, $format:expr) => {
        impl<$lf> Encode<$lf> for &$lf $ty {
            fn encode($pat) -> Encoded<$lf> {
                Encoded { value: $body, oid: <$ty>::OID, is_null: false, format: $format }
            }
        }
    };
    (<$ty:ty>$pat:tt => $body:expr, $format:expr) => {
        impl Encode<'static> for $ty {
            fn encode($pat) -> Encoded<'static> {
                Encoded { value: $body, oid: <$ty>::OID, is_null: false, format: $format }
            }
        }
    };
}

encode!(<bool>self => ValueRef::inline(&(self as u8).to_be_bytes()), PgFormat::Binary);
encode!(<i16>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<i32>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<i64>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<u32>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<f32>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<f64>self => ValueRef::inline(&self.to_be_bytes()), PgFormat::Binary);
encode!(<char>self => ValueRef::inline(&[(self as u32) as u8]), PgFormat::Binary);

// text literals are sent in text format, postgres parses them via the type's `typinput`
encode!(<'a,str>self => ValueRef::Slice(self.as_bytes()), PgFormat::Text);
encode!(<'a,String>self => ValueRef::Slice(self.as_bytes()), PgFormat::Text);

// `[u8]`/`Vec<u8>` have no oid of their own; they both stand for `bytea`.
impl<'a> Encode<'a> for &'a [u8] {
    fn encode(self) -> Encoded<'a> {
        Encoded { value: ValueRef::Slice(self), oid: Bytea::OID, is_null: false, format: PgFormat::Binary }
    }
}

impl<'a> Encode<'a> for &'a Vec<u8> {
    fn encode(self) -> Encoded<'a> {
        Encoded { value: ValueRef::Slice(self), oid: Bytea::OID, is_null: false, format: PgFormat::Binary }
    }
}

impl<T: crate::postgres::reg::RegAlias> Encode<'static> for T {
    fn encode(self) -> Encoded<'static> {
        Encoded {
            value: ValueRef::inline(&self.into_oid().to_be_bytes()),
            oid: Self::OID,
            is_null: false,
            format: PgFormat::Binary,
        }
    }
}

impl Encode<'static> for uuid::Uuid {
    fn encode(self) -> Encoded<'static> {
        // 16 bytes, too large for `ValueRef::inline`'s 15 byte budget.
        Encoded {
            value: ValueRef::Bytes(Bytes::copy_from_slice(self.as_bytes())),
            oid: uuid::Uuid::OID,
            is_null: false,
            format: PgFormat::Binary,
        }
    }
}

impl<'q, T> Encode<'q> for Option<T>
where
    T: Encode<'q>,
{
    fn encode(self) -> Encoded<'q> {
        match self {
            Some(value) => value.encode(),
            None => Encoded::null(),
        }
    }
}

/// Append the raw bytes of an already-[`Encode`]d value to `buf`, a `Binary`-format
/// array element always using its own binary wire representation.
pub(crate) fn push_element(buf: &mut Vec<u8>, encoded: impl Buf) {
    let mut encoded = encoded;
    buf.extend_from_slice(&(encoded.remaining() as i32).to_be_bytes());
    while encoded.has_remaining() {
        let chunk = encoded.chunk();
        buf.extend_from_slice(chunk);
        let n = chunk.len();
        encoded.advance(n);
    }
}

impl<T> Encode<'static> for Vec<T>
where
    T: Encode<'static> + PgType,
{
    fn encode(self) -> Encoded<'static> {
        let array_oid = crate::postgres::array_oid_of(T::OID).unwrap_or(crate::postgres::AnyArray::OID);
        let mut buf = Vec::with_capacity(20 + self.len() * 8);
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&0i32.to_be_bytes());
        buf.extend_from_slice(&T::OID.to_be_bytes());
        buf.extend_from_slice(&(self.len() as i32).to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        for item in self {
            push_element(&mut buf, item.encode());
        }
        Encoded::owned(buf, array_oid, PgFormat::Binary)
    }
}

impl<T> Encode<'static> for Vec<Option<T>>
where
    T: Encode<'static> + PgType,
{
    fn encode(self) -> Encoded<'static> {
        let array_oid = crate::postgres::array_oid_of(T::OID).unwrap_or(crate::postgres::AnyArray::OID);
        let has_null = self.iter().any(Option::is_none) as i32;
        let mut buf = Vec::with_capacity(20 + self.len() * 8);
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&has_null.to_be_bytes());
        buf.extend_from_slice(&T::OID.to_be_bytes());
        buf.extend_from_slice(&(self.len() as i32).to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        for item in self {
            match item {
                Some(item) => push_element(&mut buf, item.encode()),
                None => buf.extend_from_slice(&(-1i32).to_be_bytes()),
            }
        }
        Encoded::owned(buf, array_oid, PgFormat::Binary)
    }
}

impl std::fmt::Debug for Encoded<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Encoded")
            .field("value", if self.is_null { &"NULL" } else { &self.value })
            .field("oid", &self.oid)
            .field("format", &self.format)
            .finish()
    }
}
