//! The weft error type.

use crate::prelude::*;

/// Pipeline phase in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Binary decoding: preamble, section walk, type grammar.
    Parse,
    /// Streaming validation: scopes, index spaces, aliases, canons.
    Validate,
    /// Canonical ABI lift (core representation to generic value).
    Lift,
    /// Canonical ABI lower (generic value to core representation).
    Lower,
}

impl Phase {
    /// Short lower-case name, used in error rendering.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::Lift => "lift",
            Self::Lower => "lower",
        }
    }
}

/// Closed error taxonomy.
///
/// Every error produced by this workspace carries exactly one of these
/// kinds; there is no catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A vector count or name length exceeded its cap, or a LEB128 ran past
    /// five bytes.
    Bounds,
    /// The reader ran out of bytes before a field completed.
    Truncated,
    /// A type, canon, or section byte outside the known set.
    UnknownOpcode,
    /// A variant/option/result/enum discriminant at or above the case count.
    InvalidDiscriminant,
    /// A string that is not valid UTF-8, at lift or lower time.
    InvalidUtf8,
    /// A char in the surrogate range or at/above 0x110000.
    InvalidChar,
    /// A type index out of range, or of the wrong kind for its position.
    InvalidTypeIndex,
    /// The instance dependency graph contains a cycle.
    CycleDetected,
    /// u32 address/size arithmetic overflowed, or a list byte size exceeded
    /// its cap.
    Overflow,
    /// A canon opcode or option reserved for future use.
    UnsupportedCanon,
    /// An instance export name was not found, or an outer-alias count walked
    /// off the scope stack.
    UnresolvedAlias,
    /// A scope closed with a declared but unconsumed value.
    ValueNotUsed,
}

impl ErrorKind {
    /// Stable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bounds => "bounds",
            Self::Truncated => "truncated",
            Self::UnknownOpcode => "unknown-opcode",
            Self::InvalidDiscriminant => "invalid-discriminant",
            Self::InvalidUtf8 => "invalid-utf8",
            Self::InvalidChar => "invalid-char",
            Self::InvalidTypeIndex => "invalid-type-index",
            Self::CycleDetected => "cycle-detected",
            Self::Overflow => "overflow",
            Self::UnsupportedCanon => "unsupported-canon",
            Self::UnresolvedAlias => "unresolved-alias",
            Self::ValueNotUsed => "value-not-used",
        }
    }
}

/// One step of the breadcrumb path from the root of the item being
/// processed down to the failure site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named record field or function parameter.
    Field(String),
    /// A named variant case.
    Case(String),
    /// A list element, tuple position, or section item ordinal.
    Index(u32),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{}", name),
            Self::Case(name) => write!(f, "!{}", name),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Weft error.
///
/// Errors bubble with `?`; outer frames prepend path segments via
/// [`crate::ResultExt`] so `path` always reads root-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Pipeline phase.
    pub phase: Phase,
    /// Error kind.
    pub kind: ErrorKind,
    /// Detail message.
    pub message: String,
    /// Breadcrumb path, root-first.
    pub path: Vec<PathSegment>,
}

impl Error {
    /// Create a new error with an empty path.
    pub fn new<S: Into<String>>(phase: Phase, kind: ErrorKind, message: S) -> Self {
        Self { phase, kind, message: message.into(), path: Vec::new() }
    }

    /// Create a parse-phase error.
    pub fn parse<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self::new(Phase::Parse, kind, message)
    }

    /// Create a validate-phase error.
    pub fn validate<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self::new(Phase::Validate, kind, message)
    }

    /// Create a lift-phase error.
    pub fn lift<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self::new(Phase::Lift, kind, message)
    }

    /// Create a lower-phase error.
    pub fn lower<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self::new(Phase::Lower, kind, message)
    }

    /// Shorthand for a parse-phase truncated-input error.
    pub fn truncated<S: Into<String>>(message: S) -> Self {
        Self::parse(ErrorKind::Truncated, message)
    }

    /// Shorthand for a parse-phase bounded-input error.
    pub fn bounds<S: Into<String>>(message: S) -> Self {
        Self::parse(ErrorKind::Bounds, message)
    }

    /// Shorthand for a parse-phase unknown-opcode error naming the byte.
    pub fn unknown_opcode(what: &str, byte: u8) -> Self {
        Self::parse(ErrorKind::UnknownOpcode, format!("unknown {} byte {:#04x}", what, byte))
    }

    /// Prepend a path segment; used by [`crate::ResultExt`] as the error
    /// bubbles outward.
    pub fn push_path(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Render the breadcrumb path.
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            out.push_str(&format!("{}", segment));
        }
        out
    }

    /// Check if this is a bounded-input error.
    #[must_use]
    pub fn is_bounds(&self) -> bool {
        self.kind == ErrorKind::Bounds
    }

    /// Check if this is a truncated-input error.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.kind == ErrorKind::Truncated
    }

    /// Check if this error was raised during decoding.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.phase == Phase::Parse
    }

    /// Check if this error was raised during validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        self.phase == Phase::Validate
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error ({})", self.phase.name(), self.kind.name())?;
        if !self.path.is_empty() {
            write!(f, " at {}", self.path_string())?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_phase_kind_and_path() {
        let err = Error::lift(ErrorKind::InvalidChar, "surrogate code point")
            .push_path(PathSegment::Index(2))
            .push_path(PathSegment::Field("points".into()));
        let rendered = format!("{}", err);
        assert_eq!(rendered, "lift error (invalid-char) at .points[2]: surrogate code point");
    }

    #[test]
    fn predicates_track_kind_and_phase() {
        let err = Error::bounds("vector count 20000 exceeds cap");
        assert!(err.is_bounds());
        assert!(err.is_parse_error());
        assert!(!err.is_truncated());
        assert!(!err.is_validation_error());
    }
}
