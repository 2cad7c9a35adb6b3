//! The trust mark.
//!
//! [`Trust`] has a private constructor, so only this crate can produce one.
//! Every [`crate::node::Fragment`] carries exactly one, and nothing that
//! crosses a serialization boundary can rebuild a `Fragment` directly. The
//! only way untrusted data re-enters the tree is through a checked
//! constructor such as [`crate::constructors::value`].

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Trust(());

impl Trust {
    pub(crate) fn mark() -> Self {
        Trust(())
    }
}
