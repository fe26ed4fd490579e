use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// A shared function value compared and hashed by identity.
///
/// Two definitions holding clones of the same `SharedFn` are equal; two separately
/// constructed closures never are, even when their bodies are identical.
pub struct SharedFn<F: ?Sized>(Arc<F>);

impl<F: ?Sized> SharedFn<F> {
    pub fn from_arc(f: Arc<F>) -> Self {
        Self(f)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<F: ?Sized> Clone for SharedFn<F> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F: ?Sized> Deref for SharedFn<F> {
    type Target = F;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl<F: ?Sized> PartialEq for SharedFn<F> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<F: ?Sized> Eq for SharedFn<F> {}

impl<F: ?Sized> Hash for SharedFn<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state)
    }
}

impl<F: ?Sized> fmt::Debug for SharedFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedFn({:#x})", self.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Predicate = SharedFn<dyn Fn(f64) -> bool + Send + Sync>;

    #[test]
    fn test_identity_equality() {
        let a: Predicate = SharedFn::from_arc(Arc::new(|v: f64| v > 0.0));
        let b: Predicate = SharedFn::from_arc(Arc::new(|v: f64| v > 0.0));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a(1.0));
    }
}
