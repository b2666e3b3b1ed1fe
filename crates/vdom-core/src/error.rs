use crate::hooks::HookKind;
use crate::NodeId;

/// Failure reported by a [`HostDriver`](crate::HostDriver).
///
/// The engine never wraps or retries these; they surface unchanged through
/// [`RenderError::Host`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    Detached { id: NodeId },
    NotAChild { node: NodeId, parent: NodeId },
    Unsupported { operation: &'static str },
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::Detached { id } => write!(f, "node {id} has no parent"),
            NodeError::NotAChild { node, parent } => {
                write!(f, "node {node} is not a child of {parent}")
            }
            NodeError::Unsupported { operation } => {
                write!(f, "host driver does not support {operation}")
            }
        }
    }
}

impl std::error::Error for NodeError {}

/// Errors that abort a mount, update or unmount pass.
///
/// The instance tree is left wherever the pass stopped. Callers that want to
/// keep rendering should unmount and mount again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    InvalidElement {
        element: String,
    },
    HookOutsideRender,
    HookMismatch {
        index: usize,
        expected: HookKind,
        found: HookKind,
    },
    HookTypeMismatch {
        index: usize,
        expected: &'static str,
    },
    HookCountChanged {
        expected: usize,
        found: usize,
    },
    TooManyReRenders {
        limit: usize,
    },
    Host(NodeError),
    /// An instance was updated before it was mounted or after unmounting.
    NotMounted,
    RuntimeDropped,
}

impl RenderError {
    /// Stable code used by the `minified-errors` diagnostics.
    pub fn code(&self) -> u32 {
        match self {
            RenderError::HookOutsideRender => 1,
            RenderError::InvalidElement { .. } => 2,
            RenderError::HookMismatch { .. } => 3,
            RenderError::HookTypeMismatch { .. } => 4,
            RenderError::HookCountChanged { .. } => 5,
            RenderError::TooManyReRenders { .. } => 6,
            RenderError::Host(_) => 7,
            RenderError::RuntimeDropped => 8,
            RenderError::NotMounted => 9,
        }
    }
}

impl std::fmt::Display for RenderError {
    #[cfg(feature = "minified-errors")]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidElement { .. } | RenderError::HookOutsideRender => write!(
                f,
                "minified error #{}; build without `minified-errors` for the full message",
                self.code()
            ),
            other => describe(other, f),
        }
    }

    #[cfg(not(feature = "minified-errors"))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        describe(self, f)
    }
}

fn describe(error: &RenderError, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match error {
        RenderError::InvalidElement { element } => {
            write!(f, "invalid element type: {element}")
        }
        RenderError::HookOutsideRender => {
            write!(f, "hooks can only be called inside a function component render")
        }
        RenderError::HookMismatch {
            index,
            expected,
            found,
        } => write!(
            f,
            "hook #{index} changed kind between renders; slot holds {expected:?}, call was {found:?}"
        ),
        RenderError::HookTypeMismatch { index, expected } => {
            write!(f, "hook #{index} holds a value of a different type than {expected}")
        }
        RenderError::HookCountChanged { expected, found } => write!(
            f,
            "rendered {found} hooks but the previous render used {expected}"
        ),
        RenderError::TooManyReRenders { limit } => write!(
            f,
            "too many re-renders (limit {limit}); a state update during render keeps scheduling another pass"
        ),
        RenderError::Host(err) => write!(f, "host driver error: {err}"),
        RenderError::NotMounted => write!(f, "instance is not mounted"),
        RenderError::RuntimeDropped => write!(f, "runtime was dropped"),
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeError> for RenderError {
    fn from(err: NodeError) -> Self {
        RenderError::Host(err)
    }
}

/// Result of a render function.
pub type RenderResult<T = crate::Element> = Result<T, RenderError>;
