//! The adapter interface foreign objects are reached through.

use crate::error::InvokeError;
use crate::value::ForeignValue;

/// What a member name refers to on a foreign object.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignMember {
    /// A field or property, with its current value.
    Value(ForeignValue),
    /// A method, called through [`ForeignObject::invoke`].
    Method,
}

/// An object living in the foreign runtime.
///
/// Implementations forward to the runtime's reflection facilities. The
/// proxy never creates or frees the underlying object.
pub trait ForeignObject: Send + Sync {
    /// Runtime type name, e.g. `Antmicro.Renode.Peripherals.UART.NS16550`.
    fn type_name(&self) -> &str;

    /// The runtime type and everything extension methods may target for it
    /// (base types, interfaces). Defaults to the type itself.
    fn type_hierarchy(&self) -> Vec<String> {
        vec![self.type_name().to_string()]
    }

    /// Names of the object's own members.
    fn member_names(&self) -> Vec<String>;

    /// Look up one of the object's own members.
    fn member(&self, name: &str) -> Option<ForeignMember>;

    /// Call a method member.
    ///
    /// # Errors
    ///
    /// [`InvokeError::Signature`] when the arguments do not fit,
    /// [`InvokeError::Failed`] when the method itself fails.
    fn invoke(&self, name: &str, args: &[ForeignValue]) -> Result<ForeignValue, InvokeError>;

    /// Assign a field or property.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] if the member is read-only or the value
    /// has the wrong type.
    fn set_member(&self, name: &str, value: ForeignValue) -> Result<(), InvokeError>;
}
