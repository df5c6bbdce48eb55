use time::{Duration, PrimitiveDateTime, UtcDateTime};

use crate::{
    Encode, FromColumn,
    encode::Encoded,
    postgres::{Interval, Oid, PgFormat, PgType, TimeTz},
    row::{Column, DecodeError},
};

// `PgType` impls for `time::Date`/`time::Time`/`PrimitiveDateTime`/`UtcDateTime` live in
// `crate::postgres::pg_type`, alongside the rest of the oid table.

const PRIMITIVE_PG_EPOCH: PrimitiveDateTime = {
    // source: `from_julian_day` docs
    let date = match time::Date::from_julian_day(2_451_545) {
        Ok(ok) => ok,
        Err(_) => panic!("postgres epoch is a valid julian day"),
    };
    PrimitiveDateTime::new(date, time::Time::MIDNIGHT)
};

const UTC_PG_EPOCH: UtcDateTime = {
    // source: `from_julian_day` docs
    let date = match time::Date::from_julian_day(2_451_545) {
        Ok(ok) => ok,
        Err(_) => panic!("postgres epoch is a valid julian day"),
    };
    UtcDateTime::new(date, time::Time::MIDNIGHT)
};

const PG_EPOCH_DATE: time::Date = match time::Date::from_julian_day(2_451_545) {
    Ok(ok) => ok,
    Err(_) => panic!("postgres epoch is a valid julian day"),
};

fn read_i64(column: &Column) -> Result<i64, DecodeError> {
    Ok(i64::from_be_bytes(
        column.as_slice().ok_or(DecodeError::Null)?[..8].try_into().unwrap(),
    ))
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes(bytes[..4].try_into().unwrap())
}

impl FromColumn for PrimitiveDateTime {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let micros = read_i64(&column)?;
        Ok(PRIMITIVE_PG_EPOCH.saturating_add(Duration::microseconds(micros)))
    }
}

impl FromColumn for UtcDateTime {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let micros = read_i64(&column)?;
        Ok(UTC_PG_EPOCH.saturating_add(Duration::microseconds(micros)))
    }
}

impl FromColumn for time::Date {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let value = column.as_slice().ok_or(DecodeError::Null)?;
        let days = read_i32(value);
        Ok(PG_EPOCH_DATE.saturating_add(Duration::days(days as i64)))
    }
}

impl FromColumn for time::Time {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let micros = read_i64(&column)?;
        Ok(time::Time::MIDNIGHT + Duration::microseconds(micros))
    }
}

impl FromColumn for Interval {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let value = column.try_into_value()?;
        let microseconds = i64::from_be_bytes(value[0..8].try_into().unwrap());
        let days = read_i32(&value[8..12]);
        let months = read_i32(&value[12..16]);
        Ok(Interval { microseconds, days, months })
    }
}

impl FromColumn for TimeTz {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        if column.oid() != Self::OID {
            return Err(DecodeError::OidMissmatch);
        }
        let value = column.try_into_value()?;
        let micros = i64::from_be_bytes(value[0..8].try_into().unwrap());
        let offset_secs = read_i32(&value[8..12]);
        Ok(TimeTz { micros, offset_secs })
    }
}

impl Encode<'static> for PrimitiveDateTime {
    fn encode(self) -> Encoded<'static> {
        let micros = ((self - PRIMITIVE_PG_EPOCH).whole_microseconds()) as i64;
        Encoded::owned(micros.to_be_bytes().to_vec(), Self::OID, PgFormat::Binary)
    }
}

impl Encode<'static> for UtcDateTime {
    fn encode(self) -> Encoded<'static> {
        let micros = ((self - UTC_PG_EPOCH).whole_microseconds()) as i64;
        Encoded::owned(micros.to_be_bytes().to_vec(), Self::OID, PgFormat::Binary)
    }
}

impl Encode<'static> for time::Date {
    fn encode(self) -> Encoded<'static> {
        let days = (self - PG_EPOCH_DATE).whole_days() as i32;
        Encoded::owned(days.to_be_bytes().to_vec(), Self::OID, PgFormat::Binary)
    }
}

impl Encode<'static> for time::Time {
    fn encode(self) -> Encoded<'static> {
        let micros = (self - time::Time::MIDNIGHT).whole_microseconds() as i64;
        Encoded::owned(micros.to_be_bytes().to_vec(), Self::OID, PgFormat::Binary)
    }
}

impl Encode<'static> for Interval {
    fn encode(self) -> Encoded<'static> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&self.microseconds.to_be_bytes());
        buf.extend_from_slice(&self.days.to_be_bytes());
        buf.extend_from_slice(&self.months.to_be_bytes());
        Encoded::owned(buf, Interval::OID, PgFormat::Binary)
    }
}

impl Encode<'static> for TimeTz {
    fn encode(self) -> Encoded<'static> {
        let mut buf = Vec::with_capacity(12);
        buf.extend_from_slice(&self.micros.to_be_bytes());
        buf.extend_from_slice(&self.offset_secs.to_be_bytes());
        Encoded::owned(buf, TimeTz::OID, PgFormat::Binary)
    }
}
