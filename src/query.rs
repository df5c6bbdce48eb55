//! Query API types.
use std::marker::PhantomData;

use crate::{
    FromRow, Result,
    encode::{Encode, Encoded},
    executor::Executor,
    fetch::{Execute, FetchAll, FetchOne, FetchOptional, FetchStream},
    row::RowResult,
    sql::Sql,
};

pub use crate::phase::begin;

/// Entry point of the query API, decoding each row into `R`.
///
/// `R` is almost always picked with turbofish at the call site, e.g.
/// `query::<_, _, (i32, String)>(sql, exe)`.
#[inline]
pub fn query<'val, SQL, Exe, R>(sql: SQL, exe: Exe) -> Query<'val, SQL, Exe, R> {
    Query { sql, exe, params: Vec::new(), _p: PhantomData }
}

/// Alias of [`query`], kept for call sites that read more naturally spelling out
/// that the result is decoded "as" a particular row shape.
#[inline]
pub fn query_as<'val, SQL, Exe, R>(sql: SQL, exe: Exe) -> Query<'val, SQL, Exe, R> {
    query(sql, exe)
}

/// Entry point of the query API, decoding a single column `D` out of each row.
///
/// The returned rows are `(D,)`, so `.fetch_one().await?.0` extracts the value.
#[inline]
pub fn query_scalar<'val, SQL, Exe, D>(sql: SQL, exe: Exe) -> Query<'val, SQL, Exe, (D,)> {
    query(sql, exe)
}

/// Entry point of the query API for statements that do not return rows.
#[inline]
pub fn execute<'val, SQL, Exe>(sql: SQL, exe: Exe) -> Query<'val, SQL, Exe, ()> {
    query(sql, exe)
}

/// The query API, built up with [`Query::bind`] then run with one of
/// [`Query::fetch`], [`Query::fetch_all`], [`Query::fetch_one`], [`Query::fetch_optional`]
/// or [`Query::execute`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Query<'val, SQL, Exe, R> {
    sql: SQL,
    exe: Exe,
    params: Vec<Encoded<'val>>,
    _p: PhantomData<R>,
}

impl<'val, SQL, Exe, R> Query<'val, SQL, Exe, R> {
    /// Bind the next (1-based, in declaration order) query parameter.
    #[inline]
    pub fn bind<V: Encode<'val>>(mut self, value: V) -> Self {
        self.params.push(value.encode());
        self
    }

    /// Fetch rows using the [`Stream`][futures_core::Stream] api.
    ///
    /// The returned stream must be polled to completion, otherwise it will
    /// disturb the next command sent on the same connection.
    #[inline]
    pub fn fetch(self) -> FetchStream<'val, SQL, Exe::Future, Exe::Transport, R>
    where
        Exe: Executor,
        R: FromRow,
    {
        FetchStream::new(self.sql, self.exe.connection(), self.params, 0)
    }

    /// Fetch all rows into a [`Vec`].
    #[inline]
    pub fn fetch_all(self) -> FetchAll<'val, SQL, Exe::Future, Exe::Transport, R>
    where
        Exe: Executor,
        R: FromRow,
    {
        FetchAll::new(self.sql, self.exe.connection(), self.params)
    }

    /// Fetch exactly one row, returning [`RowNotFound`][crate::row::RowNotFound] if none is returned.
    #[inline]
    pub fn fetch_one(self) -> FetchOne<'val, SQL, Exe::Future, Exe::Transport, R>
    where
        Exe: Executor,
        R: FromRow,
    {
        FetchOne::new(self.sql, self.exe.connection(), self.params)
    }

    /// Fetch at most one row.
    #[inline]
    pub fn fetch_optional(self) -> FetchOptional<'val, SQL, Exe::Future, Exe::Transport, R>
    where
        Exe: Executor,
        R: FromRow,
    {
        FetchOptional::new(self.sql, self.exe.connection(), self.params)
    }

    /// Run the statement to completion, returning the number of rows affected.
    #[inline]
    pub fn execute(self) -> Execute<'val, SQL, Exe::Future, Exe::Transport>
    where
        Exe: Executor,
    {
        Execute::new(self.sql, self.exe.connection(), self.params)
    }
}

impl<'val, SQL, Exe, R> IntoFuture for Query<'val, SQL, Exe, R>
where
    SQL: Sql + Unpin,
    Exe: Executor + Unpin,
{
    type Output = Result<RowResult>;

    type IntoFuture = Execute<'val, SQL, Exe::Future, Exe::Transport>;

    #[inline]
    fn into_future(self) -> Self::IntoFuture {
        self.execute()
    }
}
