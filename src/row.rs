//! Postgres row operation.
//!
//! - [`Row`]
//! - [`Column`]
//! - [`FromRow`]
//! - [`FromColumn`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use bytes::{Buf, Bytes};
use std::{borrow::Cow, fmt, str::Utf8Error, string::FromUtf8Error};

use crate::{
    common::{ByteStr, unit_error},
    ext::{BytesExt, FmtExt},
    postgres::{Oid, PgType},
};

// <https://www.postgresql.org/docs/current/protocol-message-formats.html#PROTOCOL-MESSAGE-FORMATS-ROWDESCRIPTION>
// table_oid
// attribute_len
// oid
// data_type_size
// type_modifier
// format_code
const SUFFIX: usize = size_of::<u32>()
    + size_of::<u16>()
    + size_of::<u32>()
    + size_of::<i16>()
    + size_of::<i32>()
    + size_of::<u16>();

const OID_OFFSET: usize = size_of::<u32>() + size_of::<u16>();

/// Postgres row.
pub struct Row {
    field_len: u16,
    body: Bytes,
    values: Bytes,
}

impl Row {
    /// `RowDescription` message
    pub(crate) fn new(mut bytes: Bytes) -> Self {
        Self {
            field_len: bytes.get_u16(),
            body: bytes,
            values: Bytes::new(),
        }
    }

    /// `DataRow` message
    pub(crate) fn inner_clone(&self, mut bytes: Bytes) -> Row {
        assert_eq!(
            self.field_len, bytes.get_u16(),
            "RowDescription len missmatch with DataRow len"
        );
        Self {
            field_len: self.field_len,
            body: self.body.clone(),
            values: bytes,
        }
    }

    /// Returns `true` if row contains no columns.
    pub const fn is_empty(&self) -> bool {
        self.field_len == 0
    }

    /// Returns the number of fields/column.
    pub const fn len(&self) -> u16 {
        self.field_len
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, R: FromColumn>(&self, idx: I) -> Result<R, DecodeError> {
        let (offset,nul,nth) = idx.position(&self.body, self.field_len)?;

        let name = ByteStr::from_utf8(self.body.slice(offset..nul))?;

        let mut i = 0;
        let mut values = self.values.clone();
        let value = loop {
            let len = values.get_i32();
            let value = match len {
                -1 => None,
                _ => Some(values.split_to(len as _)),
            };
            if i == nth {
                break value;
            }
            i += 1;
        };

        R::decode(Column::new(name, &self.body[nul + 1..], value))
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }
}

impl IntoIterator for Row {
    type Item = Result<Column, DecodeError>;

    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            field_len: self.field_len,
            body: self.body,
            values: self.values,
            iter_n: 0,
        }
    }
}

/// [`IntoIterator`] implementation from [`Row`].
#[derive(Debug)]
pub struct IntoIter {
    field_len: u16,
    body: Bytes,
    values: Bytes,

    iter_n: u16,
}

impl IntoIter {
    /// Same as [`Iterator::next`] but returns [`Result`] instead.
    pub fn try_next(&mut self) -> Result<Column, DecodeError> {
        match self.next() {
            Some(ok) => ok,
            None => Err(DecodeError::IndexOutOfBounds(self.iter_n as _)),
        }
    }
}

impl Iterator for IntoIter {
    type Item = Result<Column, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.iter_n == self.field_len {
            return None
        }

        let field_name = match self.body.get_nul_bytestr() {
            Ok(ok) => ok,
            Err(err) => {
                self.iter_n = self.field_len;
                return Some(Err(err.into()))
            },
        };
        let column = self.body.split_to(SUFFIX);
        let len = self.values.get_i32();
        let value = match len {
            -1 => None,
            _ => Some(self.values.split_to(len as _)),
        };
        self.iter_n += 1;

        Some(Ok(Column::new(field_name, &column, value)))
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        let mut b = self.body.clone();
        let mut v = self.values.clone();
        for _ in 0..self.field_len {
            let Ok(key) = b.get_nul_bytestr() else { break };
            b.advance(SUFFIX);
            let len = v.get_i32();
            dbg.key(&key);
            match len {
                -1 => dbg.value(&format_args!("NULL")),
                len => dbg.value(&v.split_to(len as _).lossy()),
            };
        }
        dbg.finish()
    }
}

/// Postgres column.
#[derive(Debug, Clone)]
pub struct Column {
    oid: Oid,
    value: Option<Bytes>,
    name: ByteStr,
}

impl Column {
    /// `body` is start of data **after** field name
    fn new(name: ByteStr, body: &[u8], value: Option<Bytes>) -> Self {
        Self {
            name,
            oid: (&mut &body[OID_OFFSET..]).get_u32(),
            value
        }
    }

    /// Returns column [`Oid`].
    pub const fn oid(&self) -> Oid {
        self.oid
    }

    /// Returns column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Extract the inner bytes as slice.
    ///
    /// Returns [`None`] if value is `NULL`.
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Clone the inner [`Bytes`].
    ///
    /// Returns [`None`] if value is `NULL`.
    pub fn value(&self) -> Option<Bytes> {
        self.value.as_ref().cloned()
    }

    /// Consume self into the inner [`Bytes`].
    ///
    /// Returns empty [`Bytes`] if value is `NULL`.
    pub fn into_value(self) -> Option<Bytes> {
        self.value
    }

    /// Try consume self into the inner [`Bytes`].
    ///
    /// Return [`DecodeError::Null`] if value is `NULL`.
    pub fn try_into_value(self) -> Result<Bytes, DecodeError> {
        self.value.ok_or(DecodeError::Null)
    }

    /// Try decode type using [`FromColumn`] implementation.
    pub fn decode<D: FromColumn>(self) -> Result<D, DecodeError> {
        D::decode(self)
    }

    /// Build a [`Column`] for a value nested inside another column's bytes, e.g. an
    /// array element or a composite field. There is no field name to report.
    pub(crate) fn synthetic(oid: Oid, value: Option<Bytes>) -> Self {
        Self { name: ByteStr::default(), oid, value }
    }
}

/// Query result with its rows affected.
#[derive(Debug)]
pub struct RowResult {
    pub rows_affected: u64,
    /// Oid of the last inserted row, for a single-row `INSERT` that didn't use
    /// `RETURNING`. `None` for every other command, or a multi-row insert (the
    /// server reports `0` there too, per the protocol's `CommandComplete`).
    pub last_insert_oid: Option<u32>,
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: FromColumn),*
        {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok((
                    $(row.try_get($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);

/// A type that can be constructed from [`Column`].
pub trait FromColumn: Sized {
    /// Try decode self from column.
    fn decode(column: Column) -> Result<Self, DecodeError>;
}

impl FromColumn for Column {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column)
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.is_null() {
            true => Ok(None),
            false => column.decode().map(Some),
        }
    }
}

impl FromColumn for () {
    fn decode(_: Column) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl FromColumn for bool {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        Ok(col.try_into_value()?[0] != 0)
    }
}

macro_rules! decode_be {
    ($ty:ty) => {
        impl FromColumn for $ty {
            fn decode(col: Column) -> Result<Self, DecodeError> {
                if col.oid() != Self::OID {
                    return Err(DecodeError::OidMissmatch);
                }
                let mut be = [0u8;size_of::<Self>()];
                be.copy_from_slice(&col.try_into_value()?[..size_of::<Self>()]);
                Ok(<$ty>::from_be_bytes(be))
            }
        }
    };
}

decode_be!(i16);
decode_be!(i32);
decode_be!(i64);
decode_be!(u32);
decode_be!(f32);
decode_be!(f64);

impl FromColumn for uuid::Uuid {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let value = col.try_into_value()?;
        let mut bytes = [0u8;16];
        bytes.copy_from_slice(&value[..16]);
        Ok(uuid::Uuid::from_bytes(bytes))
    }
}

/// `text`-family oids (`name`, `text`, `unknown`, `bpchar`, `varchar`, `json`) all
/// share the same wire representation: raw utf8 bytes, no length prefix of their own.
fn is_textlike_oid(oid: Oid) -> bool {
    matches!(oid, 19 | 25 | 114 | 705 | 1042 | 1043)
}

impl FromColumn for String {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if !is_textlike_oid(col.oid()) {
            return Err(DecodeError::OidMissmatch);
        }
        Ok(String::from_utf8(col.try_into_value().map(Into::into)?)?)
    }
}

impl FromColumn for Vec<u8> {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.oid() != crate::postgres::Bytea::OID {
            return Err(DecodeError::OidMissmatch);
        }
        Ok(col.try_into_value()?.into())
    }
}

impl FromColumn for char {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let value = col.try_into_value()?;
        Ok(value.first().copied().unwrap_or(0) as char)
    }
}

impl<T: crate::postgres::reg::RegAlias> FromColumn for T {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        if col.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let mut be = [0u8;4];
        be.copy_from_slice(&col.try_into_value()?[..4]);
        Ok(T::from_oid(u32::from_be_bytes(be)))
    }
}

// ===== Array =====
//
// <https://www.postgresql.org/docs/current/arrays.html>, binary `array_recv`:
// i32 ndim, i32 has_null, u32 element oid, then per dimension: i32 length, i32
// lower bound, then `length` elements in row-major order, each `i32 len` +
// `len` bytes (`-1` for `NULL`).

fn read_array_header(value: &mut Bytes) -> (i32, Oid, usize) {
    let ndim = value.get_i32();
    let _has_null = value.get_i32();
    let elem_oid = value.get_u32();
    let mut total = if ndim == 0 { 0 } else { 1usize };
    for _ in 0..ndim {
        let len = value.get_i32();
        let _lower_bound = value.get_i32();
        total *= len.max(0) as usize;
    }
    (ndim, elem_oid, total)
}

fn read_array_element(value: &mut Bytes) -> Option<Bytes> {
    match value.get_i32() {
        -1 => None,
        len => Some(value.split_to(len as usize)),
    }
}

impl<T: FromColumn + PgType> FromColumn for Vec<T> {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        let mut value = col.try_into_value()?;
        let (ndim, elem_oid, total) = read_array_header(&mut value);
        if ndim > 1 {
            return Err(DecodeError::ArrayDimension(ndim));
        }
        if total > 0 && elem_oid != T::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let mut out = Vec::with_capacity(total);
        for _ in 0..total {
            let elem = read_array_element(&mut value);
            out.push(T::decode(Column::synthetic(elem_oid, elem))?);
        }
        Ok(out)
    }
}

impl<T: FromColumn + PgType> FromColumn for Vec<Option<T>> {
    fn decode(col: Column) -> Result<Self, DecodeError> {
        let mut value = col.try_into_value()?;
        let (ndim, elem_oid, total) = read_array_header(&mut value);
        if ndim > 1 {
            return Err(DecodeError::ArrayDimension(ndim));
        }
        if total > 0 && elem_oid != T::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let mut out = Vec::with_capacity(total);
        for _ in 0..total {
            out.push(match read_array_element(&mut value) {
                None => None,
                Some(bytes) => Some(T::decode(Column::synthetic(elem_oid, Some(bytes)))?),
            });
        }
        Ok(out)
    }
}

// ===== Composite =====
//
// <https://www.postgresql.org/docs/current/rowtypes.html>, binary `record_recv`:
// i32 field count, then per field: u32 field oid, i32 len, `len` bytes (`-1`
// for `NULL`). Shared by both anonymous `record` and every named composite
// type, named or not, so decoding it needs no catalog lookup.

macro_rules! from_column_tuple {
    ($arity:literal; $($t:ident),*) => {
        impl<$($t: FromColumn),*> FromColumn for ($($t,)*) {
            fn decode(col: Column) -> Result<Self, DecodeError> {
                let mut value = col.try_into_value()?;
                let field_count = value.get_i32();
                if field_count != $arity {
                    return Err(DecodeError::FieldCountMismatch($arity as usize, field_count as usize));
                }
                $(
                    let field_oid = value.get_u32();
                    let field_value = read_array_element(&mut value);
                    let $t = <$t as FromColumn>::decode(Column::synthetic(field_oid, field_value))?;
                )*
                Ok(($($t,)*))
            }
        }
    };
}

from_column_tuple!(1; T0);
from_column_tuple!(2; T0, T1);
from_column_tuple!(3; T0, T1, T2);
from_column_tuple!(4; T0, T1, T2, T3);
from_column_tuple!(5; T0, T1, T2, T3, T4);
from_column_tuple!(6; T0, T1, T2, T3, T4, T5);
from_column_tuple!(7; T0, T1, T2, T3, T4, T5, T6);
from_column_tuple!(8; T0, T1, T2, T3, T4, T5, T6, T7);

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns (bytes start offset, nul string index, nth column).
    fn position(self, body: &[u8], len: u16) -> Result<(usize,usize,u16), DecodeError>;
}

macro_rules! position {
    (
        $self:pat, $body:ident, $len:ident,
        ($offset:ident,$i_nul:ident,$nth:ident) => $test:expr,
        () => $into:expr
    ) => {
        let mut iter = $body.iter().copied().enumerate();
        let mut $offset = 0;

        for $nth in 0..$len {
            let Some(($i_nul, _)) = iter.find(|(_, e)| matches!(e, b'\0')) else {
                break;
            };

            if $test {
                return Ok(($offset,$i_nul,$nth));
            }

            match iter.$nth(SUFFIX) {
                Some((i,_)) => {
                    $offset = i;
                },
                None => break,
            }
        }

        Err(DecodeError::ColumnNotFound($into))
    };
}

impl Index for usize {
    fn position(self, body: &[u8], len: u16) -> Result<(usize,usize,u16), DecodeError> {
        position! {
            self, body, len,
            (off,i_nul,nth) => self == nth as usize,
            () => String::from(itoa::Buffer::new().format(self)).into()
        }
    }
}

impl Index for &str {
    fn position(self, body: &[u8], len: u16) -> Result<(usize,usize,u16), DecodeError> {
        position! {
            self, body, len,
            (off,i_nul,nth) => self.as_bytes() == &body[off..i_nul],
            () => String::from(self).into()
        }
    }
}

/// Indexes the `dup`-th (0-based) column named `name`, for result sets with
/// duplicate column names (e.g. a join without aliasing). `(name, 0)` behaves
/// like plain `name` indexing, returning the first match.
impl Index for (&str, usize) {
    fn position(self, body: &[u8], len: u16) -> Result<(usize,usize,u16), DecodeError> {
        let (name, dup) = self;
        let mut iter = body.iter().copied().enumerate();
        let mut offset = 0;
        let mut seen = 0usize;

        for nth in 0..len {
            let Some((i_nul, _)) = iter.find(|(_, e)| matches!(e, b'\0')) else {
                break;
            };

            if name.as_bytes() == &body[offset..i_nul] {
                if seen == dup {
                    return Ok((offset, i_nul, nth));
                }
                seen += 1;
            }

            match iter.nth(SUFFIX) {
                Some((i, _)) => offset = i,
                None => break,
            }
        }

        Err(DecodeError::ColumnNotFound(format!("{name}[{dup}]").into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
    impl Sealed for (&str, usize) { }
}

unit_error! {
    /// An error when try to [`fetch_one`][crate::query::Query::fetch_one] and not returns any row.
    pub struct RowNotFound("row not found");
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding row value.
pub enum DecodeError {
    /// Postgres return non utf8 string.
    Utf8(Utf8Error),
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Oid requested missmatch.
    OidMissmatch,
    /// Row is null.
    Null,
    /// Composite field count does not match the target tuple arity: `(expected, got)`.
    FieldCountMismatch(usize, usize),
    /// Array has a dimensionality the target type cannot represent.
    ArrayDimension(i32),
    /// A [`Value`][crate::Value] held a variant that doesn't match the requested type.
    TypeMismatch,
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::error::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::Utf8(e) => write!(f, "{e}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::OidMissmatch => write!(f, "data type missmatch"),
            Self::Null => write!(f, "unexpected NULL value"),
            Self::FieldCountMismatch(want, got) => {
                write!(f, "composite field count missmatch, expected {want} got {got}")
            }
            Self::ArrayDimension(ndim) => write!(f, "unsupported array dimension: {ndim}"),
            Self::TypeMismatch => write!(f, "value variant does not match requested type"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<FromUtf8Error>e => Self::Utf8(e.utf8_error()));
#[cfg(feature = "json")]
from!(<serde_json::error::Error>e => Self::Json(e));

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

