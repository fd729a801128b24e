use process_memory::Pointer;

use crate::Error;

/// One candidate method as enumerated in the target: name, parameter
/// type full-names in declaration order, and whether a receiver is
/// passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub is_static: bool,
}

/// Capability surface of the managed runtime being probed.
///
/// The resolver only needs these four operations, so alternate runtimes
/// and transports plug in here without touching resolver logic.  The
/// in-process helper is one implementation; tests script another.
///
/// Implementations take `&self` and use interior mutability for any
/// caching, since a resolution session is shared behind shared
/// references.
pub trait ReflectionHost {
    /// Opaque token for a loaded module.
    type Module;

    /// Opaque token for a located type.
    type Type;

    /// Load the module at `path`, or reuse it if the target already has
    /// it loaded.
    fn load_module(&self, path: &str) -> Result<Self::Module, Error>;

    fn find_type(
        &self,
        module: &Self::Module,
        type_name: &str,
    ) -> Result<Self::Type, Error>;

    /// Every method named `method_name` on the type, any visibility,
    /// static and instance alike.
    fn methods_named(
        &self,
        ty: &Self::Type,
        method_name: &str,
    ) -> Result<Vec<MethodDescriptor>, Error>;

    /// Force the method to native code now and return its entry
    /// address.  Eager compilation is the point: the address is only
    /// stable enough to walk and hook once real code exists, and
    /// probes are usually installed before the target's own logic has
    /// ever called the method.
    fn entry_point(
        &self,
        ty: &Self::Type,
        method: &MethodDescriptor,
    ) -> Result<Pointer, Error>;
}
