//! Proxy error types.

/// Why a single foreign or extension method call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The method does not accept these arguments. A dispatcher moves on to
    /// the next candidate.
    #[error("rejected arguments: {0}")]
    Signature(String),

    /// The method accepted the arguments and then failed.
    #[error("{0}")]
    Failed(String),
}

impl InvokeError {
    /// Argument count mismatch.
    #[must_use]
    pub fn arity(expected: usize, got: usize) -> Self {
        Self::Signature(format!("expected {expected} argument(s), got {got}"))
    }

    /// Argument type mismatch at `index`.
    #[must_use]
    pub fn argument_type(index: usize, expected: &str, got: &str) -> Self {
        Self::Signature(format!("argument {index}: expected {expected}, got {got}"))
    }
}

/// Errors from proxy member access.
///
/// All of these are per-call; the proxy stays usable.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Nothing on the object, its extensions, its synthetic elements or its
    /// local attributes has this name.
    #[error("'{type_name}' has no member '{member}'")]
    AttributeNotFound {
        /// Runtime type of the foreign object.
        type_name: String,
        /// Requested name.
        member: String,
    },

    /// Several extension sources define the name and the object has no
    /// member of its own to prefer.
    #[error(
        "'{member}' is defined as an extension method by multiple sources: {}; \
         call one of them explicitly with Proxy::call_extension(<source>, \"{member}\", args)",
        .sources.join(", ")
    )]
    MultipleDefinitions {
        /// Requested name.
        member: String,
        /// Declaring sources as `module.Type`.
        sources: Vec<String>,
    },

    /// Every dispatch candidate rejected the arguments.
    #[error("no candidate for '{member}' accepted the arguments: {}", .rejections.join("; "))]
    Dispatch {
        /// Requested name.
        member: String,
        /// One `candidate: reason` entry per candidate, in try order.
        rejections: Vec<String>,
    },

    /// The call reached a method that failed.
    #[error("call to '{member}' failed: {source}")]
    Invoke {
        /// Requested name.
        member: String,
        /// Underlying failure.
        source: InvokeError,
    },

    /// A value member was called like a method.
    #[error("member '{member}' is not callable")]
    NotCallable {
        /// Requested name.
        member: String,
    },

    /// The foreign object refused an assignment.
    #[error("failed to set '{member}': {source}")]
    Assignment {
        /// Assigned name.
        member: String,
        /// Underlying failure.
        source: InvokeError,
    },
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_definitions_lists_every_source() {
        let err = ProxyError::MultipleDefinitions {
            member: "LoadELF".into(),
            sources: vec!["Renode.Ext.A".into(), "Renode.Ext.B".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Renode.Ext.A"));
        assert!(msg.contains("Renode.Ext.B"));
        assert!(msg.contains("call_extension"));
    }

    #[test]
    fn dispatch_lists_rejections_in_order() {
        let err = ProxyError::Dispatch {
            member: "Reset".into(),
            rejections: vec!["own: arity".into(), "ext: type".into()],
        };
        assert!(err.to_string().ends_with("own: arity; ext: type"));
    }
}
