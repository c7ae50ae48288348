//! Identity-tagged persistent trees
//!
//! A [`Tree`] is an immutable value whose content is shared behind an `Arc`.
//! Every allocation of a tree value draws a fresh [`TreeId`]; cloning keeps the
//! tag because a clone is the same persistent value. Two trees are "the same"
//! iff their tags match, regardless of content.

use crate::fingerprint::Fingerprint;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity tag of one tree allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(u64);

impl TreeId {
    /// Draw a fresh, process-unique tag
    #[inline]
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw tag value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of source tree (a grammar: build descriptor, markup, ...)
///
/// Implemented by the external grammar crates; the engine only needs the
/// content type, a stable type identifier, and a fingerprint.
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug)]
/// pub struct PomKind;
///
/// impl TreeKind for PomKind {
///     type Content = Pom;
///     const TYPE_ID: &'static str = "maven.pom";
///
///     fn fingerprint(content: &Pom) -> Fingerprint {
///         Fingerprint::compute(content.print().as_bytes())
///     }
/// }
/// ```
pub trait TreeKind: Send + Sync + Debug + 'static {
    /// Parsed content of one source unit
    type Content: Send + Sync + Debug + Clone + PartialEq + 'static;

    /// Dynamic type name reported to instrumentation
    const TYPE_ID: &'static str;

    /// Deterministic digest of the content
    fn fingerprint(content: &Self::Content) -> Fingerprint;

    /// Validate content invariants
    ///
    /// Default implementation always succeeds.
    ///
    /// # Errors
    /// Returns error if content violates invariants
    fn validate_content(_content: &Self::Content) -> Result<(), TreeError> {
        Ok(())
    }
}

/// Errors related to tree construction
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Content invariant violation
    #[error("content invariant violated in {path}: {message}")]
    InvariantViolation {
        /// Source path of the offending tree
        path: String,
        /// What was violated
        message: String,
    },
}

impl TreeError {
    /// Create an invariant violation for `path`
    #[must_use]
    pub fn invariant(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Immutable, structurally shared source tree
///
/// # Invariants
/// - `id` is fresh for every constructor and `with_*`/`map` call
/// - Cloning preserves `id` and shares `content`
pub struct Tree<K: TreeKind> {
    id: TreeId,
    path: Arc<str>,
    content: Arc<K::Content>,
}

impl<K: TreeKind> Clone for Tree<K> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            path: Arc::clone(&self.path),
            content: Arc::clone(&self.content),
        }
    }
}

impl<K: TreeKind> Debug for Tree<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("kind", &K::TYPE_ID)
            .field("id", &self.id)
            .field("path", &self.path)
            .field("content", &self.content)
            .finish()
    }
}

impl<K: TreeKind> Tree<K> {
    /// Create a tree for a parsed source unit (validates content)
    ///
    /// # Errors
    /// Returns error if content validation fails
    pub fn new(path: impl Into<Arc<str>>, content: K::Content) -> Result<Self, TreeError> {
        let path = path.into();
        check::<K>(&path, &content)?;
        Ok(Self::from_parts(path, Arc::new(content)))
    }

    fn from_parts(path: Arc<str>, content: Arc<K::Content>) -> Self {
        Self {
            id: TreeId::fresh(),
            path,
            content,
        }
    }

    /// Identity tag
    #[inline]
    #[must_use]
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Source path this tree was parsed from (or will be written to)
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reference to content
    #[inline]
    #[must_use]
    pub fn content(&self) -> &K::Content {
        &self.content
    }

    /// Identity comparison
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Whether the content is equal, ignoring identity
    #[inline]
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.content, &other.content) || self.content == other.content
    }

    /// New tree value with replaced content at the same path
    ///
    /// Always allocates a fresh identity, even if `content` equals the
    /// current content. Content is not validated; use
    /// [`Tree::try_with_content`] or [`Tree::validate`] for untrusted edits.
    #[must_use]
    pub fn with_content(&self, content: K::Content) -> Self {
        Self::from_parts(Arc::clone(&self.path), Arc::new(content))
    }

    /// Like [`Tree::with_content`], but validates the new content first
    ///
    /// # Errors
    /// Returns error if content validation fails
    pub fn try_with_content(&self, content: K::Content) -> Result<Self, TreeError> {
        check::<K>(&self.path, &content)?;
        Ok(self.with_content(content))
    }

    /// Re-run the kind's content validation on this tree
    ///
    /// # Errors
    /// Returns error if content validation fails
    pub fn validate(&self) -> Result<(), TreeError> {
        check::<K>(&self.path, &self.content)
    }

    /// New tree value with the content transformed by `f` (not validated)
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnOnce(&K::Content) -> K::Content,
    {
        self.with_content(f(&self.content))
    }

    /// New tree value moved to another path, sharing the content
    #[must_use]
    pub fn with_path(&self, path: impl Into<Arc<str>>) -> Self {
        Self::from_parts(path.into(), Arc::clone(&self.content))
    }

    /// Content fingerprint
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        K::fingerprint(&self.content)
    }

    /// Type identifier of the kind
    #[inline]
    #[must_use]
    pub fn type_id() -> &'static str {
        K::TYPE_ID
    }
}

fn check<K: TreeKind>(path: &str, content: &K::Content) -> Result<(), TreeError> {
    K::validate_content(content).map_err(|e| match e {
        TreeError::InvariantViolation { message, .. } => TreeError::invariant(path, message),
    })
}
