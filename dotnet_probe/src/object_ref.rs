use process_memory::Pointer;

/// Raw reference into the target's managed heap.
///
/// The referent is neither pinned nor rooted.  The handle is valid only
/// for the duration of the synchronous helper call or probe callback
/// that produced it; the target's garbage collector is free to move or
/// reclaim the referent the moment that call returns.  Session state
/// must never store one, only the decoded value it was read into.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(Pointer);

impl ObjectRef {
    pub fn new(ptr: Pointer) -> Self {
        Self(ptr)
    }

    pub fn null() -> Self {
        Self(Pointer::null())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn address(self) -> Pointer {
        self.0
    }
}

impl From<Pointer> for ObjectRef {
    fn from(ptr: Pointer) -> Self {
        Self(ptr)
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.0).finish()
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
