//! Protocol and server error types.
use bytes::{Buf, Bytes};
use std::fmt;

use crate::ext::BytesExt;

/// An error when translating buffer from postgres.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected message type: expected {expect:?}, found {found:?}{}", phase.map(|p|format!(" (while {p})")).unwrap_or_default())]
    Unexpected {
        expect: Option<u8>,
        found: u8,
        phase: Option<&'static str>,
    },
    #[error("unknown authentication method: {auth}")]
    UnknownAuth { auth: u32 },
    #[error("non-binary format code ({code}) received for field {field:?}")]
    NonBinaryFormat { field: String, code: u16 },
    #[error("PortalSuspended received, row limits are not supported")]
    PortalSuspended,
}

impl ProtocolError {
    pub(crate) fn unknown(found: u8) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: None }
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect: Some(expect), found, phase: None }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: Some(phase) }
    }

    pub(crate) fn unknown_auth(auth: u32) -> ProtocolError {
        Self::UnknownAuth { auth }
    }
}

/// Raw, un-parsed fields common to [`ErrorResponse`][1] and [`NoticeResponse`][2].
///
/// Both messages share the same wire layout: a sequence of `Byte1 code, String value`
/// pairs terminated by a zero byte.
///
/// [1]: crate::postgres::backend::ErrorResponse
/// [2]: crate::postgres::backend::NoticeResponse
///
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
#[derive(Clone)]
pub struct DatabaseError {
    pub severity: String,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<String>,
    pub internal_position: Option<String>,
    pub internal_query: Option<String>,
    pub where_: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub data_type: Option<String>,
    pub constraint: Option<String>,
    pub file: Option<String>,
    pub line: Option<String>,
    pub routine: Option<String>,
}

impl DatabaseError {
    pub(crate) fn parse(mut body: Bytes) -> Self {
        let mut severity = String::new();
        let mut code = String::new();
        let mut message = String::new();
        let mut detail = None;
        let mut hint = None;
        let mut position = None;
        let mut internal_position = None;
        let mut internal_query = None;
        let mut where_ = None;
        let mut schema = None;
        let mut table = None;
        let mut column = None;
        let mut data_type = None;
        let mut constraint = None;
        let mut file = None;
        let mut line = None;
        let mut routine = None;

        loop {
            if !body.has_remaining() {
                break;
            }
            let field = body.get_u8();
            if field == 0 {
                break;
            }
            let Ok(value) = body.get_nul_bytestr() else { break };
            let value = value.to_string();
            match field {
                b'S' => severity = value,
                b'C' => code = value,
                b'M' => message = value,
                b'D' => detail = Some(value),
                b'H' => hint = Some(value),
                b'P' => position = Some(value),
                b'p' => internal_position = Some(value),
                b'q' => internal_query = Some(value),
                b'W' => where_ = Some(value),
                b's' => schema = Some(value),
                b't' => table = Some(value),
                b'c' => column = Some(value),
                b'd' => data_type = Some(value),
                b'n' => constraint = Some(value),
                b'F' => file = Some(value),
                b'L' => line = Some(value),
                b'R' => routine = Some(value),
                // unrecognized field types are silently ignored per protocol docs
                _ => {}
            }
        }

        Self {
            severity,
            code,
            message,
            detail,
            hint,
            position,
            internal_position,
            internal_query,
            where_,
            schema,
            table,
            column,
            data_type,
            constraint,
            file,
            line,
            routine,
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for DatabaseError {}
