//! Wrapper-supplied members.

use crate::value::ForeignValue;

/// Extra members a wrapper adds on top of the foreign object, such as a
/// machine's peripherals exposed by name.
///
/// They are listed with the object's members but only resolved when
/// nothing on the object or its extensions matches.
pub trait SyntheticElements: Send + Sync {
    /// Names of the synthetic members.
    fn names(&self) -> Vec<String>;

    /// Value of a synthetic member, `None` if it vanished since listing.
    fn get(&self, name: &str) -> Option<ForeignValue>;
}
