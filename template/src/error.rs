use crate::Function;

/// Errors raised while compiling a template string.
///
/// Evaluation never fails, every problem that can be detected is reported here
/// when the templates are loaded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated `${{` starting at byte {0}")]
    UnterminatedExpression(usize),
    #[error("empty `${{}}` at byte {0}")]
    EmptyExpression(usize),
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal at offset {0}")]
    UnterminatedString(usize),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: &'static str },
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{function}` takes {expected} argument(s) but {found} were given")]
    Arity {
        function: Function,
        expected: String,
        found: usize,
    },
    #[error("in template `{key}`: {source}")]
    InKey {
        key: String,
        #[source]
        source: Box<TemplateError>,
    },
}

impl TemplateError {
    /// Attach the dotted key of the template that failed to compile.
    ///
    /// Nested keys are prefixed from the inside out, so a failure in
    /// `fitnessPointData.distanceInMiles` reads naturally.
    pub(crate) fn in_key(self, key: &str) -> Self {
        match self {
            TemplateError::InKey { key: inner, source } => TemplateError::InKey {
                key: format!("{key}.{inner}"),
                source,
            },
            other => TemplateError::InKey {
                key: key.to_string(),
                source: Box::new(other),
            },
        }
    }
}
