//! Postgres wire protocol, message codec and type oids.
mod pg_type;
mod pg_format;
pub mod frontend;
pub mod backend;
mod error;

pub use pg_type::{
    AnyArray, Bytea, BpChar, CompositeRecord, Interval, JsonText, Name, Oid, PgType, TimeTz, Unknown,
    VarChar, array_element_oid, array_oid_of, reg,
};
pub use pg_format::PgFormat;
pub use frontend::FrontendProtocol;
pub use backend::{BackendMessage, BackendProtocol, ErrorResponse, NoticeResponse};
pub use error::{DatabaseError, ProtocolError};
