//! Type-erased source files
//!
//! The scheduler works over a heterogeneous working set (build descriptors
//! next to markup next to code), so it sees every tree through the
//! object-safe [`SourceFile`] view.

use crate::fingerprint::Fingerprint;
use crate::tree::{Tree, TreeId, TreeKind};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Object-safe view of a tree of any kind
pub trait SourceFile: Debug + Send + Sync + 'static {
    /// Identity tag of this tree value
    fn id(&self) -> TreeId;

    /// Dynamic type name (the kind's `TYPE_ID`)
    fn tree_type(&self) -> &'static str;

    /// Source path
    fn path(&self) -> &str;

    /// Content fingerprint
    fn fingerprint(&self) -> Fingerprint;

    /// Access to the concrete tree for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a source file in the working set
pub type Source = Arc<dyn SourceFile>;

impl<K: TreeKind> SourceFile for Tree<K> {
    fn id(&self) -> TreeId {
        Tree::id(self)
    }

    fn tree_type(&self) -> &'static str {
        K::TYPE_ID
    }

    fn path(&self) -> &str {
        Tree::path(self)
    }

    fn fingerprint(&self) -> Fingerprint {
        Tree::fingerprint(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<K: TreeKind> Tree<K> {
    /// Wrap this tree as a type-erased [`Source`]
    #[inline]
    #[must_use]
    pub fn into_source(self) -> Source {
        Arc::new(self)
    }
}

/// Identity comparison of two sources
#[inline]
#[must_use]
pub fn same_source(a: &Source, b: &Source) -> bool {
    a.id() == b.id()
}

/// Identity comparison of two optional sources (absent means deleted)
#[inline]
#[must_use]
pub fn same_slot(a: Option<&Source>, b: Option<&Source>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_source(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Borrow the concrete tree if `source` is of kind `K`
#[inline]
#[must_use]
pub fn downcast<K: TreeKind>(source: &Source) -> Option<&Tree<K>> {
    source.as_any().downcast_ref::<Tree<K>>()
}
