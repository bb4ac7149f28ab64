//! Member resolution over one foreign object.
//!
//! [`Proxy::get`] looks a name up in this order:
//! 1. The object's own members. A value is returned as is; a method becomes
//!    a call candidate.
//! 2. Extension methods for the object's type. Each matching declaration
//!    becomes a candidate bound to the object.
//! 3. Synthetic elements supplied by the wrapper.
//! 4. Attributes recorded locally by [`Proxy::set`].
//!
//! One candidate is returned directly; several become a dispatcher that
//! tries them in order. Several extension sources with no own method is a
//! [`ProxyError::MultipleDefinitions`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use crate::error::{InvokeError, ProxyError, ProxyResult};
use crate::extension::{ExtensionCatalog, ExtensionDeclaration};
use crate::foreign::ForeignMember;
use crate::synthetic::SyntheticElements;
use crate::value::{ForeignRef, ForeignValue};

/// Outcome of [`Proxy::get`].
#[derive(Debug)]
pub enum Resolved {
    /// A plain value, passed through unchanged.
    Value(ForeignValue),
    /// Something to call.
    Callable(Callable),
}

impl Resolved {
    /// The value, if this resolved to one.
    #[must_use]
    pub fn into_value(self) -> Option<ForeignValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Callable(_) => None,
        }
    }

    /// The callable, if this resolved to one.
    #[must_use]
    pub fn into_callable(self) -> Option<Callable> {
        match self {
            Self::Callable(c) => Some(c),
            Self::Value(_) => None,
        }
    }
}

#[derive(Clone)]
enum Candidate {
    Own {
        target: ForeignRef,
        name: String,
    },
    Extension {
        target: ForeignRef,
        declaration: ExtensionDeclaration,
    },
}

impl Candidate {
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, InvokeError> {
        match self {
            Self::Own { target, name } => target.invoke(name, args),
            Self::Extension {
                target,
                declaration,
            } => declaration.invoke(target, args),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Own { target, name } => format!("{}.{name}", target.type_name()),
            Self::Extension { declaration, .. } => {
                format!("{}.{}", declaration.source(), declaration.method())
            },
        }
    }
}

/// A method bound to its object: one candidate, or a dispatcher over
/// several.
#[derive(Clone)]
pub struct Callable {
    member: String,
    candidates: Vec<Candidate>,
}

impl Callable {
    /// Call with `args`.
    ///
    /// Candidates are tried in order. One that rejects the arguments
    /// ([`InvokeError::Signature`]) passes the call on to the next; the first
    /// one that accepts decides the outcome.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::Invoke`] if the accepting candidate fails, or the only
    ///   candidate rejects the arguments
    /// - [`ProxyError::Dispatch`] if every one of several candidates rejects
    ///   the arguments
    pub fn call(&self, args: &[ForeignValue]) -> ProxyResult<ForeignValue> {
        let mut rejections = Vec::new();
        for candidate in &self.candidates {
            match candidate.call(args) {
                Ok(value) => return Ok(value),
                Err(InvokeError::Signature(reason)) if self.is_dispatcher() => {
                    trace!(member = %self.member, candidate = %candidate.describe(), %reason, "Candidate rejected call");
                    rejections.push(format!("{}: {reason}", candidate.describe()));
                },
                Err(source) => {
                    return Err(ProxyError::Invoke {
                        member: self.member.clone(),
                        source,
                    });
                },
            }
        }
        Err(ProxyError::Dispatch {
            member: self.member.clone(),
            rejections,
        })
    }

    /// Whether several candidates share the name.
    #[must_use]
    pub fn is_dispatcher(&self) -> bool {
        self.candidates.len() > 1
    }

    /// Candidate descriptions, in try order.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        self.candidates.iter().map(Candidate::describe).collect()
    }

    /// Member name this was resolved from.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("member", &self.member)
            .field("candidates", &self.candidates())
            .finish()
    }
}

/// Wrapper around one foreign object.
///
/// Holds a shared, non-owning handle: the foreign runtime decides when the
/// object dies.
pub struct Proxy {
    internal: ForeignRef,
    catalog: Arc<ExtensionCatalog>,
    synthetics: Option<Arc<dyn SyntheticElements>>,
    locals: Mutex<HashMap<String, ForeignValue>>,
}

impl Proxy {
    /// Wrap `internal`, resolving extension methods through `catalog`.
    #[must_use]
    pub fn new(internal: ForeignRef, catalog: Arc<ExtensionCatalog>) -> Self {
        Self {
            internal,
            catalog,
            synthetics: None,
            locals: Mutex::new(HashMap::new()),
        }
    }

    /// Add wrapper-supplied synthetic elements.
    #[must_use]
    pub fn with_synthetics(mut self, synthetics: Arc<dyn SyntheticElements>) -> Self {
        self.synthetics = Some(synthetics);
        self
    }

    /// The wrapped foreign object.
    #[must_use]
    pub fn internal(&self) -> &ForeignRef {
        &self.internal
    }

    /// Resolve `name`.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::MultipleDefinitions`] if several extension sources
    ///   define `name` and the object has no method of that name
    /// - [`ProxyError::AttributeNotFound`] if nothing matches
    pub fn get(&self, name: &str) -> ProxyResult<Resolved> {
        let mut candidates = Vec::new();

        match self.internal.member(name) {
            Some(ForeignMember::Value(value)) => return Ok(Resolved::Value(value)),
            Some(ForeignMember::Method) => candidates.push(Candidate::Own {
                target: Arc::clone(&self.internal),
                name: name.to_string(),
            }),
            None => {},
        }

        let index = self.catalog.index_for(self.internal.as_ref());
        let extensions = index.candidates(name);
        if candidates.is_empty() {
            let sources = index.sources(name);
            if sources.len() > 1 {
                return Err(ProxyError::MultipleDefinitions {
                    member: name.to_string(),
                    sources: sources.into_iter().collect(),
                });
            }
        }
        candidates.extend(extensions.iter().map(|declaration| Candidate::Extension {
            target: Arc::clone(&self.internal),
            declaration: declaration.clone(),
        }));

        if !candidates.is_empty() {
            if candidates.len() > 1 {
                debug!(member = name, count = candidates.len(), "Resolved to dispatcher");
            }
            return Ok(Resolved::Callable(Callable {
                member: name.to_string(),
                candidates,
            }));
        }

        if let Some(synthetics) = &self.synthetics
            && synthetics.names().iter().any(|n| n == name)
            && let Some(value) = synthetics.get(name)
        {
            return Ok(Resolved::Value(value));
        }

        if let Some(value) = self
            .locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Resolved::Value(value.clone()));
        }

        Err(ProxyError::AttributeNotFound {
            type_name: self.internal.type_name().to_string(),
            member: name.to_string(),
        })
    }

    /// Resolve `name` and call it with `args`.
    ///
    /// # Errors
    ///
    /// Anything [`get`](Self::get) or [`Callable::call`] returns, and
    /// [`ProxyError::NotCallable`] if `name` resolves to a value.
    pub fn call(&self, name: &str, args: &[ForeignValue]) -> ProxyResult<ForeignValue> {
        match self.get(name)? {
            Resolved::Callable(callable) => callable.call(args),
            Resolved::Value(_) => Err(ProxyError::NotCallable {
                member: name.to_string(),
            }),
        }
    }

    /// Call the extension method `name` declared by `source`
    /// (`module.Type`), bypassing conflict checks.
    ///
    /// # Errors
    ///
    /// [`ProxyError::AttributeNotFound`] if `source` declares no such
    /// method for this object's type; otherwise as [`Callable::call`].
    pub fn call_extension(
        &self,
        source: &str,
        name: &str,
        args: &[ForeignValue],
    ) -> ProxyResult<ForeignValue> {
        let index = self.catalog.index_for(self.internal.as_ref());
        let candidates: Vec<Candidate> = index
            .candidates(name)
            .iter()
            .filter(|d| d.source() == source)
            .map(|declaration| Candidate::Extension {
                target: Arc::clone(&self.internal),
                declaration: declaration.clone(),
            })
            .collect();

        if candidates.is_empty() {
            return Err(ProxyError::AttributeNotFound {
                type_name: self.internal.type_name().to_string(),
                member: format!("{source}.{name}"),
            });
        }
        Callable {
            member: name.to_string(),
            candidates,
        }
        .call(args)
    }

    /// Assign `name`.
    ///
    /// Own members of the foreign object receive the assignment; the value
    /// is also recorded as a local attribute of the proxy in every case.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Assignment`] if the foreign object refuses it. Nothing
    /// is recorded then.
    pub fn set(&self, name: &str, value: ForeignValue) -> ProxyResult<()> {
        if self.internal.member(name).is_some() {
            self.internal
                .set_member(name, value.clone())
                .map_err(|source| ProxyError::Assignment {
                    member: name.to_string(),
                    source,
                })?;
        }
        self.locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Every name [`get`](Self::get) can resolve: synthetic elements, own
    /// members, extension methods and local attributes, deduplicated.
    #[must_use]
    pub fn list_members(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.internal.member_names().into_iter().collect();
        if let Some(synthetics) = &self.synthetics {
            names.extend(synthetics.names());
        }
        let index = self.catalog.index_for(self.internal.as_ref());
        names.extend(index.names().map(str::to_string));
        names.extend(
            self.locals
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned(),
        );
        names
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type_name", &self.internal.type_name())
            .finish_non_exhaustive()
    }
}
