
/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

/// A type that have corresponding postgres oid.
pub trait PgType {
    const OID: Oid;
}

macro_rules! oid {
    ($ty:ty, $oid:literal $(, $doc:literal)? ) => {
        impl PgType for $ty {
            $(#[doc = $doc])?
            const OID: Oid = $oid;
        }
    };
}

oid!(bool, 16, "`bool` state of true or false");
oid!(char, 18, "`char` single byte, internal type");
oid!(i64, 20, "`int8` ~18 digit integer, 8-byte storage");
oid!(i16, 21, "`int2` -32 thousand to 32 thousand, 2-byte storage");
oid!(i32, 23, "`int4` -2 billion to 2 billion integer, 4-byte storage");
oid!(str, 25, "`text` variable-length string, no limit specified");
oid!(String, 25, "`text` variable-length string, no limit specified");
oid!(u32, 26, "`oid` object identifier type, 4-byte storage");
oid!(f32, 700, "`float4` single-precision floating point number, 4-byte storage");
oid!(f64, 701, "`float8` double-precision floating point number, 8-byte storage");
oid!(uuid::Uuid, 2950, "`uuid` UUID datatype");

/// `bytea`, variable-length binary string.
pub struct Bytea;
oid!(Bytea, 17, "`bytea` variable-length binary string");

/// OID/`reg*` aliases, all transmitted as a big-endian `u32`.
pub mod reg {
    use super::{Oid, PgType};

    /// Marker for the `reg*` oid-alias family: every member is a bare `u32` on
    /// the wire, just under a different static oid than plain [`u32`]/`oid`.
    pub trait RegAlias: PgType {
        fn from_oid(oid: Oid) -> Self;
        fn into_oid(self) -> Oid;
    }

    macro_rules! reg_oid {
        ($name:ident, $oid:literal, $doc:literal) => {
            #[doc = $doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $name(pub Oid);
            impl PgType for $name {
                const OID: Oid = $oid;
            }
            impl RegAlias for $name {
                fn from_oid(oid: Oid) -> Self {
                    Self(oid)
                }
                fn into_oid(self) -> Oid {
                    self.0
                }
            }
        };
    }

    reg_oid!(RegProc, 24, "`regproc` registered procedure");
    reg_oid!(RegClass, 2205, "`regclass` registered relation");
    reg_oid!(RegType, 2206, "`regtype` registered type");
    reg_oid!(RegRole, 4096, "`regrole` registered role");
    reg_oid!(RegNamespace, 4089, "`regnamespace` registered namespace");
    reg_oid!(RegProcedure, 2202, "`regprocedure` registered procedure (with args)");
    reg_oid!(RegOper, 2203, "`regoper` registered operator");
    reg_oid!(RegOperator, 2204, "`regoperator` registered operator (with args)");
    reg_oid!(RegConfig, 3734, "`regconfig` registered text search configuration");
    reg_oid!(RegDictionary, 3769, "`regdictionary` registered text search dictionary");
}

// text-ish variants
//
// `name`, 19 -- catalog identifier, internal type
// `text`, 25
// `unknown`, 705 -- the type of an as yet untyped literal
// `bpchar`, 1042 -- char(n), blank-padded string, fixed storage
// `varchar`, 1043 -- varchar(n), non-blank-padded string, variable storage
// `json`, 114 -- textual JSON, UTF-8 text (distinct from binary `jsonb`, oid 3802)

/// Marker type for OIDs 19/705/1042/1043/114, which share the `text`-like binary wire form.
pub struct Name;
oid!(Name, 19, "`name` catalog identifier, internal type");

/// `json`, textual JSON representation. See [`crate::types::Json`] for the
/// binary `jsonb` (oid 3802) counterpart.
pub struct JsonText;
oid!(JsonText, 114, "`json` textual JSON representation");

/// `unknown`, the type of an as yet untyped literal.
pub struct Unknown;
oid!(Unknown, 705, "`unknown` the type of an as yet untyped literal");

/// `bpchar`, char(n), blank-padded string, fixed storage.
pub struct BpChar;
oid!(BpChar, 1042, "`bpchar` char(n), blank-padded string, fixed storage");

/// `varchar`, varchar(n), non-blank-padded string, variable storage.
pub struct VarChar;
oid!(VarChar, 1043, "`varchar` non-blank-padded string, variable storage");

#[cfg(feature = "time")]
mod time_oid {
    use super::{Oid, PgType};

    impl PgType for time::Date {
        /// `date` calendar date (no time of day)
        const OID: Oid = 1082;
    }

    impl PgType for time::Time {
        /// `time` time of day (no time zone)
        const OID: Oid = 1083;
    }

    impl PgType for time::PrimitiveDateTime {
        /// `timestamp` date and time
        const OID: Oid = 1114;
    }

    impl PgType for time::UtcDateTime {
        /// `timestamptz` date and time with timezone
        const OID: Oid = 1184;
    }
}

/// `interval`, a time span: `i64` microseconds, `i32` days, `i32` months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub microseconds: i64,
    pub days: i32,
    pub months: i32,
}
oid!(Interval, 1186, "`interval` time span");

/// `timetz`, time of day with a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTz {
    /// microseconds since midnight
    pub micros: i64,
    /// zone offset, in seconds west of UTC (as transmitted on the wire)
    pub offset_secs: i32,
}
oid!(TimeTz, 1266, "`timetz` time of day with time zone");

/// `2249`, generic composite-row marker used when no static shape is requested.
pub struct CompositeRecord;
oid!(CompositeRecord, 2249, "`record` generic composite row");

/// `2287`, generic array marker used when no static shape is requested.
pub struct AnyArray;
oid!(AnyArray, 2287, "`anyarray` generic array");

/// Array type oid for a built-in base type oid, used to fill in the `Bind`
/// parameter oid when encoding a [`Vec`].
///
/// <https://www.postgresql.org/docs/current/catalog-pg-type.html>, every built-in
/// scalar's array counterpart is a fixed, well-known oid; unlike composites and
/// enums there is no catalog lookup involved.
pub fn array_oid_of(base: Oid) -> Option<Oid> {
    Some(match base {
        16 => 1000,   // bool
        17 => 1001,   // bytea
        18 => 1002,   // char
        19 => 1003,   // name
        20 => 1016,   // int8
        21 => 1005,   // int2
        23 => 1007,   // int4
        25 => 1009,   // text
        26 => 1028,   // oid
        700 => 1021,  // float4
        701 => 1022,  // float8
        1042 => 1014, // bpchar
        1043 => 1015, // varchar
        1082 => 1182, // date
        1083 => 1183, // time
        1114 => 1115, // timestamp
        1184 => 1185, // timestamptz
        1186 => 1187, // interval
        1266 => 1270, // timetz
        2950 => 2951, // uuid
        _ => return None,
    })
}

/// Inverse of [`array_oid_of`]: the element oid for a built-in array type oid.
pub fn array_element_oid(array_oid: Oid) -> Option<Oid> {
    Some(match array_oid {
        1000 => 16,
        1001 => 17,
        1002 => 18,
        1003 => 19,
        1016 => 20,
        1005 => 21,
        1007 => 23,
        1009 => 25,
        1028 => 26,
        1021 => 700,
        1022 => 701,
        1014 => 1042,
        1015 => 1043,
        1182 => 1082,
        1183 => 1083,
        1115 => 1114,
        1185 => 1184,
        1187 => 1186,
        1270 => 1266,
        2951 => 2950,
        _ => return None,
    })
}
