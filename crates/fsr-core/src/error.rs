use thiserror::Error;

/// Action- and load-level failures. Nothing in this taxonomy is allowed to
/// abort a whole run: the runner catches these at the test boundary and
/// classifies them into the test outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed document {path} at {line}:{column}: {message}")]
    DocumentParse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("fixture {fixture_id} already bound to {existing}, refusing {requested}")]
    DuplicateFixture {
        fixture_id: String,
        existing: String,
        requested: String,
    },

    #[error("unknown fixture: {0}")]
    UnknownFixture(String),

    #[error("create succeeded but no id in response body or Location header")]
    IdentifierNotFound,

    #[error("operation references unprovisioned fixture source {0}")]
    FixtureUnresolved(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("unsupported operation method: {0}")]
    UnsupportedOperation(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
