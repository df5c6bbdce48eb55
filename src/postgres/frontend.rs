//! Postgres Frontend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{Buf, BufMut, BytesMut};

use super::{Oid, PgFormat};
use crate::common::{BindParams, BufMutExt, StrExt, UsizeExt};

/// Write a frontend message into `buf`, framed as `Byte1(msgtype) Int32(len) body`.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    let size_hint = msg.size_hint();
    buf.put_u8(F::MSGTYPE);
    buf.put_u32(size_hint);
    let start = buf.len();
    msg.encode(&mut *buf);
    debug_assert_eq!((buf.len() - start).to_u32() + 4, size_hint, "size_hint mismatch");
}

/// A type that can be encoded into postgres frontend message.
pub trait FrontendProtocol {
    /// Message type, also known as tag.
    const MSGTYPE: u8;

    /// Returns the size of the message, in bytes, this count includes itself.
    fn size_hint(&self) -> u32;

    /// Write self into given buffer, this does not write the message type and length.
    fn encode(self, buf: impl BufMut);
}

macro_rules! size_of {
    ($($e:expr),* $(,)?) => {
        0 $(+ $e)*
    };
}

/// Startup message, this is the only frontend message that has no message type byte.
pub struct Startup<'a> {
    pub user: &'a str,
    pub database: Option<&'a str>,
    pub replication: Option<&'a str>,
    pub options: Option<&'a str>,
    /// Additional `key=value` run-time parameters, forwarded verbatim.
    pub extra: &'a [(&'a str, &'a str)],
}

impl<'a> Startup<'a> {
    pub fn write(self, buf: &mut BytesMut) {
        let mut len = size_of!(4, 4, "user".nul_string_len(), self.user.nul_string_len(), 1);
        if let Some(database) = self.database {
            len += size_of!("database".nul_string_len(), database.nul_string_len());
        }
        if let Some(replication) = self.replication {
            len += size_of!("replication".nul_string_len(), replication.nul_string_len());
        }
        if let Some(options) = self.options {
            len += size_of!("options".nul_string_len(), options.nul_string_len());
        }
        for (key, value) in self.extra {
            len += size_of!(key.nul_string_len(), value.nul_string_len());
        }

        buf.put_u32(len);
        buf.put_u32(196_608); // protocol version 3.0
        buf.put_nul_string("user");
        buf.put_nul_string(self.user);
        if let Some(database) = self.database {
            buf.put_nul_string("database");
            buf.put_nul_string(database);
        }
        if let Some(replication) = self.replication {
            buf.put_nul_string("replication");
            buf.put_nul_string(replication);
        }
        if let Some(options) = self.options {
            buf.put_nul_string("options");
            buf.put_nul_string(options);
        }
        for (key, value) in self.extra {
            buf.put_nul_string(key);
            buf.put_nul_string(value);
        }
        buf.put_u8(0);
    }
}

/// The message is a password response. Note that this is also used for GSSAPI,
/// SSPI and SASL response messages, but the exact representation is different in each case.
pub struct PasswordMessage<'a> {
    pub password: &'a str,
}

impl FrontendProtocol for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> u32 {
        size_of!(4, self.password.nul_string_len())
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.password);
    }
}

/// A simple query, ran through the simple query sub-protocol.
pub struct Query<'a> {
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> u32 {
        size_of!(4, self.sql.nul_string_len())
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.sql);
    }
}

/// The message is parse, preparing a statement for execution.
pub struct Parse<'a, I> {
    pub prepare_name: &'a str,
    pub sql: &'a str,
    pub oids_len: u16,
    pub oids: I,
}

impl<I: IntoIterator<Item = Oid>> FrontendProtocol for Parse<'_, I> {
    const MSGTYPE: u8 = b'P';

    fn size_hint(&self) -> u32 {
        size_of!(
            4,
            self.prepare_name.nul_string_len(),
            self.sql.nul_string_len(),
            2,
            self.oids_len as u32 * 4,
        )
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.prepare_name);
        buf.put_nul_string(self.sql);
        buf.put_u16(self.oids_len);
        for oid in self.oids {
            buf.put_u32(oid);
        }
    }
}

/// Ask postgres to flush its internal buffer, without requesting
/// a full [`ReadyForQuery`][super::backend::ReadyForQuery].
pub struct Flush;

impl FrontendProtocol for Flush {
    const MSGTYPE: u8 = b'H';

    fn size_hint(&self) -> u32 {
        size_of!(4)
    }

    fn encode(self, _: impl BufMut) {}
}

/// Ask postgres to close the current transaction and issue a
/// [`ReadyForQuery`][super::backend::ReadyForQuery] response.
pub struct Sync;

impl FrontendProtocol for Sync {
    const MSGTYPE: u8 = b'S';

    fn size_hint(&self) -> u32 {
        size_of!(4)
    }

    fn encode(self, _: impl BufMut) {}
}

/// Ask postgres to terminate this connection.
pub struct Terminate;

impl FrontendProtocol for Terminate {
    const MSGTYPE: u8 = b'X';

    fn size_hint(&self) -> u32 {
        size_of!(4)
    }

    fn encode(self, _: impl BufMut) {}
}

/// The message is bind, binding parameters to a prepared statement to create a portal.
pub struct Bind<'a, ParamFmts, Params, ResultFmts> {
    pub portal_name: &'a str,
    pub stmt_name: &'a str,
    pub param_formats_len: u16,
    pub param_formats: ParamFmts,
    pub params_len: u16,
    /// Total size, in bytes, of all the parameter values combined with their length prefix.
    pub params_size_hint: u32,
    pub params: Params,
    pub result_formats_len: u16,
    pub result_formats: ResultFmts,
}

impl<ParamFmts, Params, ResultFmts> FrontendProtocol for Bind<'_, ParamFmts, Params, ResultFmts>
where
    ParamFmts: IntoIterator<Item = PgFormat>,
    Params: Iterator + ExactSizeIterator,
    Params::Item: BindParams,
    ResultFmts: IntoIterator<Item = PgFormat>,
{
    const MSGTYPE: u8 = b'B';

    fn size_hint(&self) -> u32 {
        size_of!(
            4,
            self.portal_name.nul_string_len(),
            self.stmt_name.nul_string_len(),
            2,
            self.param_formats_len as u32 * 2,
            2,
            self.params_len as u32 * 4,
            self.params_size_hint,
            2,
            self.result_formats_len as u32 * 2,
        )
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_nul_string(self.stmt_name);

        buf.put_u16(self.param_formats_len);
        for format in self.param_formats {
            buf.put_u16(format.format_code());
        }

        buf.put_u16(self.params_len);
        for mut param in self.params {
            let size = param.size();
            buf.put_i32(size);
            if size > 0 {
                buf.put(&mut param);
            }
        }

        buf.put_u16(self.result_formats_len);
        for format in self.result_formats {
            buf.put_u16(format.format_code());
        }
    }
}

/// The message is execute, completing the extended query protocol pipeline.
pub struct Execute<'a> {
    pub portal_name: &'a str,
    /// Maximum number of rows to return, or 0 for no limit.
    pub max_row: u32,
}

impl FrontendProtocol for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn size_hint(&self) -> u32 {
        size_of!(4, self.portal_name.nul_string_len(), 4)
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_u32(self.max_row);
    }
}

/// The message is close, closing a prepared statement or portal.
pub struct Close<'a> {
    /// `'S'` to close a prepared statement, or `'P'` to close a portal.
    pub variant: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn size_hint(&self) -> u32 {
        size_of!(4, 1, self.name.nul_string_len())
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.variant);
        buf.put_nul_string(self.name);
    }
}

/// The message is describe, describing a prepared statement or portal.
pub struct Describe<'a> {
    /// `'S'` to describe a prepared statement, or `'P'` to describe a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn size_hint(&self) -> u32 {
        size_of!(4, 1, self.name.nul_string_len())
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u8(self.kind);
        buf.put_nul_string(self.name);
    }
}
