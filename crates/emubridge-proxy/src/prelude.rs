//! Common imports for wrapping foreign objects.

pub use crate::{
    Callable, ExtensionCatalog, ExtensionDeclaration, ExtensionRegistry, ForeignMember,
    ForeignObject, ForeignRef, ForeignValue, InvokeError, Proxy, ProxyError, ProxyResult,
    Resolved, SyntheticElements,
};
