use std::fmt;

/// A problem found in the analyzed program.
///
/// Faults travel inside type-sets as `Type::Error` so analysis carries on
/// past them. They compare structurally, so recording the same fault at a
/// node twice leaves a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    NotCallable { callee: String },
    TooManyArguments { expected: usize, given: usize },
    MultipleValues { name: String },
    UnexpectedKeywords { names: Vec<String> },
    MissingArgument { name: String },
    UnresolvedName { name: String },
    NotAssignable,
    Unreachable,
    CalledBeforeDefinition { name: String },
}

impl Fault {
    /// Stable identifier used in machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            Fault::NotCallable { .. } => "not-callable",
            Fault::TooManyArguments { .. } => "too-many-arguments",
            Fault::MultipleValues { .. } => "multiple-values",
            Fault::UnexpectedKeywords { .. } => "unexpected-keywords",
            Fault::MissingArgument { .. } => "missing-argument",
            Fault::UnresolvedName { .. } => "unresolved-name",
            Fault::NotAssignable => "not-assignable",
            Fault::Unreachable => "unreachable",
            Fault::CalledBeforeDefinition { .. } => "called-before-definition",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::NotCallable { callee } => write!(f, "calling non-callable: {}", callee),
            Fault::TooManyArguments { expected, given } => write!(
                f,
                "too many values: function takes {} positional argument(s) but {} were given",
                expected, given
            ),
            Fault::MultipleValues { name } => {
                write!(f, "multiple values for keyword argument '{}'", name)
            }
            Fault::UnexpectedKeywords { names } => {
                write!(f, "unexpected keyword arguments: {}", names.join(", "))
            }
            Fault::MissingArgument { name } => write!(f, "missing value for parameter '{}'", name),
            Fault::UnresolvedName { name } => write!(f, "unresolved symbol '{}'", name),
            Fault::NotAssignable => write!(f, "not assignable"),
            Fault::Unreachable => write!(f, "unreachable code"),
            Fault::CalledBeforeDefinition { name } => {
                write!(f, "'{}' called before its definition", name)
            }
        }
    }
}
