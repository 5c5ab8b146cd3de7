use std::{fmt, io};
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of a failure.
///
/// An [`Error`] is a chain of details; its [`kind`](Error::kind()) is that of
/// the innermost classified detail. Context layered on top with
/// [`Chainable::chain()`] doesn't change the kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The document can't be turned into pages: an empty or unsluggable
    /// heading, a slug collision, unparseable markup.
    InvalidStructure,
    /// Reading the source or writing output failed.
    Io,
    /// The markdown renderer or the template engine failed.
    Render,
    /// Anything else: configuration, subprocesses.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidStructure => "invalid document structure".fmt(f),
            ErrorKind::Io => "i/o error".fmt(f),
            ErrorKind::Render => "render error".fmt(f),
            ErrorKind::Other => "error".fmt(f),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    kind: Option<ErrorKind>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }

    fn kind(&self) -> ErrorKind { ErrorKind::Other }
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    /// Classifies this error as `kind`, overriding the kind of its details.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        let inner = self.prev.as_ref().map_or(ErrorKind::Other, |prev| prev.kind());
        if inner != ErrorKind::Other {
            return inner;
        }

        self.kind
            .or_else(|| self.detail.iter().map(|d| d.kind()).find(|k| *k != ErrorKind::Other))
            .unwrap_or(ErrorKind::Other)
    }

    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

impl<E: StdError + Send + Sync> ErrorDetail for Box<E> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty => $kind:ident) => {
        impl $crate::error::ErrorDetail for $T {
            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }

            fn kind(&self) -> $crate::error::ErrorKind {
                $crate::error::ErrorKind::$kind
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error => Io);
impl_error_detail_with_std_error!(toml::de::Error => Other);
impl_error_detail_with_std_error!(quick_xml::Error => InvalidStructure);

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            detail: self.detail.iter()
                .map(|detail| MakeshiftError::from(&**detail))
                .map(|error| Box::new(error) as Box<dyn ErrorDetail>)
                .collect(),
            prev: self.prev.clone(),
            kind: self.kind,
            _location: self._location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            prev: None,
            detail: vec![Box::new(detail)],
            kind: None,
            _location: std::panic::Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    writeln!(f, "{indent}{}", format!("{:#}", detail).replace('\n', &indent_line))?;
                    if let Some(prev) = &e.prev {
                        NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                    }

                    for (key, value) in detail.context() {
                        let value = value.to_string().replace('\n', &indent_line);
                        if let Some(key) = key {
                            writeln!(f, "{indent}{key}: {value}")?;
                        } else {
                            writeln!(f, "{indent}{value}")?;
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
    pub kind: ErrorKind,
}

impl From<&dyn ErrorDetail> for MakeshiftError {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        MakeshiftError {
            message: detail.to_string(),
            parameters: detail.context(),
            kind: detail.kind(),
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

/// Like [`error!`], but classified as [`ErrorKind::InvalidStructure`].
#[doc(hidden)]
#[macro_export]
macro_rules! invalid {
    ($($token:tt)*) => (
        $crate::error!($($token)*).with_kind($crate::error::ErrorKind::InvalidStructure)
    );
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
            kind: $crate::error::ErrorKind::Other,
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident if $cond:expr => $value:expr $(, $rest:tt)*) => {
        if $cond {
            $v.push((None, $value.to_string()));
        }

        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident if $cond:expr => $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v if $cond => $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident if $cond:expr => $key:expr => $value:expr) => {
        if $cond {
            $crate::error!(@param $v $key => $value);
        }
    };

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }

    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

impl ErrorDetail for Infallible {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_context() {
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let result: Result<()> = Err(io).chain(error!("failed to read source"));
        let error = result.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Io);

        let error = invalid!("empty heading", "page" => 3)
            .chain(error!("failed to split document"));
        assert_eq!(error.kind(), ErrorKind::InvalidStructure);
        assert_eq!(error.clone().kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn unclassified_is_other() {
        let error = error!("something", "key" => "value");
        assert_eq!(error.kind(), ErrorKind::Other);

        let rendered = error.to_string();
        assert!(rendered.contains("something"));
        assert!(rendered.contains("key: value"));
    }
}
