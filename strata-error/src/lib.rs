#![deny(missing_docs)]

//! This crate defines error & result types for Strata.
//! It also contains a variety of useful macros for error handling.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("STRATA_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Alias for [`Backtrace`] so that `thiserror` does not derive the unstable `Error::provide`.
type CapturedBacktrace = Backtrace;

/// The top-level error type for Strata.
///
/// The `Display` form carries only the message; the captured backtrace is part of the `Debug`
/// form so that errors surfaced to users stay readable.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum StrataError {
    /// An index is out of bounds.
    #[error("index {0} out of bounds from {1} to {2}")]
    OutOfBounds(usize, usize, usize, CapturedBacktrace),
    /// An invalid argument was provided.
    #[error("{0}")]
    InvalidArgument(ErrString, CapturedBacktrace),
    /// A value required by the schema is missing or null.
    #[error("{0}")]
    SchemaViolation(ErrString, CapturedBacktrace),
    /// A value does not match the type the schema declares for its column.
    #[error("{0}")]
    MismatchedTypes(ErrString, CapturedBacktrace),
    /// A page declares an encoding this reader does not implement.
    #[error("{0}")]
    UnsupportedEncoding(ErrString, CapturedBacktrace),
    /// A page or writer configuration names a compression codec that is not implemented.
    #[error("{0}")]
    UnsupportedCompression(ErrString, CapturedBacktrace),
    /// Pagination arguments are out of range.
    #[error("{0}")]
    InvalidPagination(ErrString, CapturedBacktrace),
    /// The file structure is inconsistent, truncated, or otherwise unreadable.
    #[error("{0}")]
    Corrupted(ErrString, CapturedBacktrace),
    /// A serialization or deserialization error occurred.
    #[error("{0}")]
    InvalidSerde(ErrString, CapturedBacktrace),
    /// An error annotated with additional context.
    #[error("{0}: {1}")]
    Context(ErrString, Box<StrataError>),
    /// A wrapper for IO errors.
    #[error(transparent)]
    IOError(#[from] io::Error),
    /// A wrapper for protobuf decode errors.
    #[cfg(feature = "prost")]
    #[error(transparent)]
    ProstDecodeError(#[from] prost::DecodeError),
}

impl StrataError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        StrataError::Context(msg.into(), Box::new(self))
    }

    /// The backtrace captured when the error was constructed, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            StrataError::OutOfBounds(.., bt)
            | StrataError::InvalidArgument(_, bt)
            | StrataError::SchemaViolation(_, bt)
            | StrataError::MismatchedTypes(_, bt)
            | StrataError::UnsupportedEncoding(_, bt)
            | StrataError::UnsupportedCompression(_, bt)
            | StrataError::InvalidPagination(_, bt)
            | StrataError::Corrupted(_, bt)
            | StrataError::InvalidSerde(_, bt) => Some(bt),
            StrataError::Context(_, inner) => inner.backtrace(),
            _ => None,
        }
    }
}

impl Debug for StrataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)?;
        if let Some(bt) = self.backtrace() {
            write!(f, "\nBacktrace:\n{bt}")?;
        }
        Ok(())
    }
}

/// A type alias for Results that return StrataErrors as their error type.
pub type StrataResult<T> = Result<T, StrataError>;

/// A trait for expect-ing a StrataResult or an Option.
pub trait StrataExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (programmer error).
    fn strata_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> StrataExpect for Result<T, E>
where
    E: Into<StrataError>,
{
    type Output = T;

    #[inline(always)]
    fn strata_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| crate::strata_panic!(e.with_context(msg.to_string())))
    }
}

impl<T> StrataExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn strata_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            let err = StrataError::InvalidArgument(msg.to_string().into(), Backtrace::capture());
            crate::strata_panic!(err)
        })
    }
}

impl From<StrataError> for io::Error {
    fn from(value: StrataError) -> Self {
        match value {
            StrataError::IOError(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// A convenient macro for creating a StrataError.
#[macro_export]
macro_rules! strata_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::StrataError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::StrataError::Context($msg.into(), Box::new($err))
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::StrataError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($variant:ident: $err:expr $(,)?) => {
        $crate::__private::must_use(
            $crate::StrataError::$variant($err)
        )
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::strata_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a StrataError.
#[macro_export]
macro_rules! strata_bail {
    ($($tt:tt)+) => {
        return Err($crate::strata_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a StrataError in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! strata_panic {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::strata_panic!($crate::strata_err!(OutOfBounds: $idx, $start, $stop))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::strata_panic!($crate::strata_err!($variant: $fmt, $($arg),*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::strata_panic!($crate::strata_err!($fmt, $($arg),*))
    };
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err: $crate::StrataError = $err;
        panic!("{:?}", err.with_context(format!($fmt, $($arg),*)))
    }};
    ($err:expr) => {{
        let err: $crate::StrataError = $err;
        panic!("{:?}", err)
    }};
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub const fn must_use(error: crate::StrataError) -> crate::StrataError {
        error
    }
}
