//! Error context helpers and diesel newtype glue shared by every layer.

/// Implements `Fail`, `Display` and conversions for the layer's
/// `Error { inner: Context<ErrorKind> }` struct. Expects `fmt`, `Fail`,
/// `Backtrace` and `Context` in scope.
#[macro_export]
macro_rules! derive_error_impls {
    () => {
        impl Fail for Error {
            fn cause(&self) -> Option<&Fail> {
                self.inner.cause()
            }

            fn backtrace(&self) -> Option<&Backtrace> {
                self.inner.backtrace()
            }
        }

        impl fmt::Display for Error {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.inner, f)
            }
        }

        #[allow(dead_code)]
        impl Error {
            pub fn kind(&self) -> ErrorKind {
                self.inner.get_context().clone()
            }
        }

        impl From<ErrorKind> for Error {
            fn from(kind: ErrorKind) -> Error {
                Error {
                    inner: Context::new(kind),
                }
            }
        }

        impl From<Context<ErrorKind>> for Error {
            fn from(inner: Context<ErrorKind>) -> Error {
                Error { inner: inner }
            }
        }
    };
}

/// Wraps an error into a chain of contexts, recording the call site and
/// the debug representation of the arguments after `=>`.
///
/// * `ectx!(err e, ctx1, ctx2 => arg)` - converts into the layer error
/// * `ectx!(try err e, ctx1 => arg)` - returns `Context<_>`, ready for `?`
/// * `ectx!(ctx1, ctx2 => arg)` - closure form for `map_err`
/// * `ectx!(try ctx1 => arg)` - closure form returning `Context<_>`
/// * `ectx!(convert ctx1 => arg)` - closure form that maps the lower layer
///   `ErrorKind` into this layer's `ErrorKind`
#[macro_export]
macro_rules! ectx {
    (err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        #[allow(unused_mut)]
        let mut msg = format!("at {}:{}", file!(), line!());
        $(
            $(
                msg.push_str(&format!("\nwith args - {}: {:#?}", stringify!($arg), $arg));
            )*
        )*
        let err = $e.context(msg);
        $(
            let err = err.context($context);
        )*
        err.into()
    }};

    (try err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        #[allow(unused_mut)]
        let mut msg = format!("at {}:{}", file!(), line!());
        $(
            $(
                msg.push_str(&format!("\nwith args - {}: {:#?}", stringify!($arg), $arg));
            )*
        )*
        let err = $e.context(msg);
        $(
            let err = err.context($context);
        )*
        err
    }};

    (try convert $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            let kind: ErrorKind = e.kind().into();
            ectx!(try err e $(,$context)*, kind $(=> $($arg),*)*)
        }
    }};

    (convert $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            let kind: ErrorKind = e.kind().into();
            ectx!(err e $(,$context)*, kind $(=> $($arg),*)*)
        }
    }};

    (try $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| ectx!(try err e $(,$context)* $(=> $($arg),*)*)
    }};

    ($($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| ectx!(err e $(,$context)* $(=> $($arg),*)*)
    }};
}

/// Delegates diesel `FromSql` / `ToSql` of a tuple newtype to its inner value.
#[macro_export]
macro_rules! derive_newtype_sql {
    ($mod_name:ident, $sql_type:ty, $type:ty, $constructor:expr) => {
        mod $mod_name {
            use std::io::Write;

            use diesel::deserialize::{self, FromSql};
            use diesel::pg::Pg;
            use diesel::serialize::{self, Output, ToSql};

            use super::*;

            impl FromSql<$sql_type, Pg> for $type {
                fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
                    FromSql::<$sql_type, Pg>::from_sql(data).map($constructor)
                }
            }

            impl ToSql<$sql_type, Pg> for $type {
                fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                    ToSql::<$sql_type, Pg>::to_sql(&self.0, out)
                }
            }
        }
    };
}

/// Stores an enum as `VarChar` using its `Display` and `FromStr` impls.
/// The enum itself must derive `FromSqlRow` and `AsExpression` with
/// `#[sql_type = "VarChar"]`.
#[macro_export]
macro_rules! derive_text_enum_sql {
    ($mod_name:ident, $type:ty) => {
        mod $mod_name {
            use std::io::Write;

            use diesel::deserialize::{self, FromSql};
            use diesel::pg::Pg;
            use diesel::serialize::{self, IsNull, Output, ToSql};
            use diesel::sql_types::VarChar;

            use super::*;

            impl FromSql<VarChar, Pg> for $type {
                fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
                    let raw: String = FromSql::<VarChar, Pg>::from_sql(data)?;
                    raw.parse::<$type>().map_err(|e| e.to_string().into())
                }
            }

            impl ToSql<VarChar, Pg> for $type {
                fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                    out.write_all(self.to_string().as_bytes())?;
                    Ok(IsNull::No)
                }
            }
        }
    };
}
