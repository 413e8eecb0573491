use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global interner for annotation type keys (`user-info`, `area-pri-1`, ...).
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned annotation type key.
/// Compared on every hit test and style lookup, so it is a 4-byte `Copy` handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey(Spur);

impl TypeKey {
    /// Intern a type key, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        TypeKey(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Type name with the `user-` / `area-` authoring prefix stripped.
    pub fn base_name(&self) -> &str {
        let s = self.as_str();
        s.strip_prefix("user-")
            .or_else(|| s.strip_prefix("area-"))
            .unwrap_or(s)
    }

    pub fn is_info(&self) -> bool {
        self.base_name() == "info"
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.as_str())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TypeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TypeKey::intern(&s))
    }
}

/// Stable identity of an annotation for the lifetime of a session.
///
/// Indices shift on delete; ids don't. Render handles are keyed by this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

impl AnnotationId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        AnnotationId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Rebuild an id the page handed back.
    pub fn from_raw(raw: u64) -> Self {
        AnnotationId(raw)
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = TypeKey::intern("area-info");
        let b = TypeKey::intern("area-info");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "area-info");
    }

    #[test]
    fn base_name_strips_authoring_prefix() {
        assert_eq!(TypeKey::intern("user-pri-1").base_name(), "pri-1");
        assert_eq!(TypeKey::intern("area-info").base_name(), "info");
        assert_eq!(TypeKey::intern("pri-2").base_name(), "pri-2");
        assert!(TypeKey::intern("user-info").is_info());
    }

    #[test]
    fn annotation_ids_are_unique() {
        let a = AnnotationId::next();
        let b = AnnotationId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
