/*!

A small, dependency-free error type in the style this crate's author favours
elsewhere: one enum of error *kinds*, a `source_location!()` macro that
stamps `file!()`/`line!()` onto every construction site, and a builder-style
`with_message` to attach context without reaching for `anyhow`/`thiserror`.

Every foreseeable failure in this crate is a configuration problem (a bad
topology/traffic file) — per spec.md SS7, routing/selection failures degrade
the affected flow and never produce an `Error` at all.

*/

use std::fmt;

/// Where an [`Error`] was constructed. Captured by [`source_location!`].
#[derive(Clone, Debug)]
pub struct SourceLocation
{
	pub file: &'static str,
	pub line: u32,
}

impl fmt::Display for SourceLocation
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{}:{}", self.file, self.line)
	}
}

/// Captures the call site of an [`Error`]. Used as the first argument to
/// the `error!` macro so every error carries a place to start debugging.
#[macro_export]
macro_rules! source_location
{
	() => { $crate::error::SourceLocation{ file: file!(), line: line!() } };
}

/// The kinds of fatal error this crate can raise. All of them originate
/// before the simulation kernel starts running (spec.md SS7: "Configuration
/// error ... fatal, abort before simulation starts").
#[derive(Clone, Debug)]
pub enum ErrorKind
{
	/// A topology or traffic file could not be read from disk.
	Io,
	/// A topology or traffic file parsed as JSON but its shape does not
	/// match what this crate expects (missing field, wrong type, ...).
	IllFormedConfiguration,
	/// The CLI arguments themselves were malformed.
	BadArgument,
}

/// A fatal, non-recoverable error. Anything this crate returns as `Err`
/// aborts the run before the simulation kernel starts (spec.md SS7).
#[derive(Clone, Debug)]
pub struct Error
{
	pub kind: ErrorKind,
	pub location: SourceLocation,
	pub message: Option<String>,
}

impl Error
{
	pub fn new(kind: ErrorKind, location: SourceLocation) -> Error
	{
		Error{ kind, location, message: None }
	}

	/// Attach human-readable context. Chainable at the call site:
	/// `error!(io).with_message(format!("could not open {}", path))`.
	pub fn with_message(mut self, message: String) -> Error
	{
		self.message = Some(message);
		self
	}
}

impl fmt::Display for Error
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		match &self.message
		{
			Some(m) => write!(f, "{:?} at {}: {}", self.kind, self.location, m),
			None => write!(f, "{:?} at {}", self.kind, self.location),
		}
	}
}

impl std::error::Error for Error {}

/// Build an [`Error`] of the named kind, stamping the construction site via
/// [`source_location!`]. `error!(io)`, `error!(ill_formed_configuration)`,
/// `error!(bad_argument)`.
#[macro_export]
macro_rules! error
{
	(io) => { $crate::error::Error::new($crate::error::ErrorKind::Io, $crate::source_location!()) };
	(ill_formed_configuration) => { $crate::error::Error::new($crate::error::ErrorKind::IllFormedConfiguration, $crate::source_location!()) };
	(bad_argument) => { $crate::error::Error::new($crate::error::ErrorKind::BadArgument, $crate::source_location!()) };
}
