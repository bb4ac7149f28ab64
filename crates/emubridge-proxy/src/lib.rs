//! emubridge Proxy - Member access for objects living in the engine's runtime.
//!
//! A [`Proxy`] wraps one foreign object and resolves names across:
//! - the object's own members ([`ForeignObject`])
//! - extension methods declared for its type ([`ExtensionRegistry`])
//! - synthetic elements supplied by the wrapper ([`SyntheticElements`])
//!
//! Name collisions are resolved deterministically: an own method and
//! extension methods of the same name form a dispatcher that tries the own
//! method first, while several extension sources with no own method are an
//! error naming every source.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod extension;
pub mod foreign;
pub mod proxy;
pub mod synthetic;
pub mod value;

pub use error::{InvokeError, ProxyError, ProxyResult};
pub use extension::{
    ExtensionCatalog, ExtensionDeclaration, ExtensionFn, ExtensionMethodIndex, ExtensionRegistry,
};
pub use foreign::{ForeignMember, ForeignObject};
pub use proxy::{Callable, Proxy, Resolved};
pub use synthetic::SyntheticElements;
pub use value::{ForeignRef, ForeignValue};
