use thiserror::Error;

/// Errors raised while parsing or evaluating a template.
///
/// Every variant carries enough of the offending expression to point at the
/// broken field in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `{{` without a matching `}}`
    #[error("unclosed action starting at byte {offset}")]
    Unclosed {
        /// Byte offset of the opening delimiter
        offset: usize,
    },

    /// The expression inside an action could not be parsed
    #[error("syntax error in {{{{{expr}}}}}: {message}")]
    Syntax {
        /// Raw action body
        expr: String,
        /// What the parser expected
        message: String,
    },

    /// A field in a dotted path does not exist
    #[error("can't evaluate field {field} in {path}")]
    MissingField {
        /// Field that was not found
        field: String,
        /// Path walked so far, e.g. `.App.Repo`
        path: String,
    },

    /// `lookup` found no entry with the given key
    #[error("no {kind} named \"{key}\"")]
    UnknownEntry {
        /// Entry kind, e.g. `App`
        kind: String,
        /// Requested key
        key: String,
    },

    /// Call to a function the engine does not provide
    #[error("function \"{0}\" not defined")]
    UnknownFunction(String),

    /// Function called with the wrong arguments
    #[error("wrong arguments for {func}: {message}")]
    BadArguments {
        /// Function name
        func: String,
        /// Details
        message: String,
    },

    /// `index` past the end of an array
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested position
        index: i64,
        /// Array length
        len: usize,
    },

    /// The expression evaluated to an object, which has no text form
    #[error("{path} is an object and cannot be rendered")]
    NotScalar {
        /// Expression that produced the object
        path: String,
    },
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, Error>;
