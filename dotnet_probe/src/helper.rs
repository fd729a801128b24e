use derive_more::derive::From;
use elsa::FrozenMap;
use log::{debug, warn};
use process_memory::{Export, MemoryAccess, Pointer, PointerWidth};

use crate::{
    abi::resolve_export, Error, ExportDescriptor, ManagedString,
    MethodDescriptor, ObjectRef, ReflectionHost,
};

/// Word-sized argument to a helper export.
#[derive(Debug, Clone, Copy, From)]
pub enum HelperArg {
    Pointer(Pointer),
    Int32(i32),
}

/// Synchronous call boundary into the target process, supplied by the
/// instrumentation engine.
///
/// `call` must not return until the helper export has.  Any object
/// reference the helper hands back is valid only until the next call
/// lets the target run again (see [`ObjectRef`]).
pub trait HelperInvoker {
    fn call(
        &self,
        export: &ExportDescriptor,
        args: &[HelperArg],
    ) -> Result<Pointer, Error>;

    /// Place `text` in target memory as NUL-terminated UTF-16 and
    /// return its address.  The buffer must remain valid through the
    /// next `call`.
    fn alloc_utf16(&self, text: &str) -> Result<Pointer, Error>;
}

/// Placeholder returned whenever an object dump cannot be produced.
pub const DESCRIBE_FAILED: &str = "<describe failed>";

const LOAD_MODULE: &str = "LoadModule";
const FIND_TYPE: &str = "FindType";
const LIST_METHODS: &str = "ListMethods";
const PREPARE_METHOD: &str = "PrepareMethod";
const MAKE_STRING: &str = "MakeString";
const BOX_INT32: &str = "BoxInt32";
const BOX_BOOL: &str = "BoxBool";
const DESCRIBE_OBJECT: &str = "DescribeObject";

/// Session against the in-process resolution helper.
///
/// The helper is a small module loaded into the target that exposes the
/// runtime's reflection surface as plain exports:
///
/// * `LoadModule(pathW) -> nonzero on success`
/// * `FindType(pathW, typeNameW) -> nonzero if the type exists`
/// * `ListMethods(pathW, typeNameW, methodNameW) -> managed string`,
///   one method per line as `name<TAB>S-or-I<TAB>sig` with the
///   parameter type full-names '|'-joined in `sig`
/// * `PrepareMethod(pathW, typeNameW, methodNameW, sigW) -> entry`,
///   forcing compilation to native code
/// * `MakeString(textW)`, `BoxInt32(v)`, `BoxBool(0 or 1)`,
///   `DescribeObject(ref)` returning managed object references
///
/// The helper catches every failure on its side and reports null, so a
/// fault in the target never propagates back across the boundary.
/// Export descriptors are located once and cached for the lifetime of
/// the session; the helper module is never unloaded while a probe is
/// attached.
pub struct HelperSession<M, I> {
    memory: M,
    invoker: I,
    width: PointerWidth,
    exports: Vec<Export>,
    descriptors: FrozenMap<&'static str, Box<ExportDescriptor>>,
}

impl<M: MemoryAccess, I: HelperInvoker> HelperSession<M, I> {
    pub fn new(
        memory: M,
        invoker: I,
        width: PointerWidth,
        exports: Vec<Export>,
    ) -> Self {
        Self {
            memory,
            invoker,
            width,
            exports,
            descriptors: FrozenMap::new(),
        }
    }

    pub fn width(&self) -> PointerWidth {
        self.width
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    fn export(&self, name: &'static str) -> Result<&ExportDescriptor, Error> {
        if let Some(descriptor) = self.descriptors.get(name) {
            return Ok(descriptor);
        }
        let descriptor = resolve_export(&self.exports, name)?;
        debug!(
            "helper export {name}: {} at {} ({})",
            descriptor.name, descriptor.address, descriptor.convention,
        );
        Ok(self.descriptors.insert(name, Box::new(descriptor)))
    }

    fn call(
        &self,
        name: &'static str,
        args: &[HelperArg],
    ) -> Result<Pointer, Error> {
        let export = self.export(name)?;
        self.invoker.call(export, args)
    }

    /// Call with leading wide-string arguments placed in the target.
    fn call_with_text(
        &self,
        name: &'static str,
        texts: &[&str],
    ) -> Result<Pointer, Error> {
        let args = texts
            .iter()
            .map(|text| {
                self.invoker.alloc_utf16(text).map(HelperArg::Pointer)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        self.call(name, &args)
    }

    pub fn decode_string(
        &self,
        obj: ObjectRef,
    ) -> Result<ManagedString, Error> {
        ManagedString::read(&self.memory, self.width, obj)
    }

    pub fn looks_like_string(&self, ptr: Pointer) -> bool {
        crate::looks_like_string(&self.memory, self.width, ptr)
    }

    /// Ask the target runtime to allocate a managed string holding
    /// `text`.
    pub fn make_string(&self, text: &str) -> Result<ObjectRef, Error> {
        let arg = self.invoker.alloc_utf16(text)?;
        self.call(MAKE_STRING, &[arg.into()])?
            .as_non_null()
            .map(ObjectRef::new)
            .ok_or(Error::HelperReturnedNull(MAKE_STRING))
    }

    pub fn box_int32(&self, value: i32) -> Result<ObjectRef, Error> {
        self.call(BOX_INT32, &[value.into()])?
            .as_non_null()
            .map(ObjectRef::new)
            .ok_or(Error::HelperReturnedNull(BOX_INT32))
    }

    pub fn box_bool(&self, value: bool) -> Result<ObjectRef, Error> {
        self.call(BOX_BOOL, &[HelperArg::Int32(value as i32)])?
            .as_non_null()
            .map(ObjectRef::new)
            .ok_or(Error::HelperReturnedNull(BOX_BOOL))
    }

    /// Best-effort dump of an arbitrary object: type name, textual
    /// form, and a shallow property listing (capped helper-side at 40
    /// properties), produced inside the target because only the
    /// target's runtime can introspect its own heap.
    ///
    /// Describing an object may run property getters and `ToString` in
    /// the target, so every call is potentially re-entrant and
    /// non-deterministic.  All failures collapse into a fixed
    /// placeholder rather than propagating.
    pub fn describe(&self, obj: ObjectRef) -> String {
        match self.try_describe(obj) {
            Ok(text) => text,
            Err(err) => {
                warn!("describe of {obj} failed: {err}");
                DESCRIBE_FAILED.to_string()
            }
        }
    }

    fn try_describe(&self, obj: ObjectRef) -> Result<String, Error> {
        let reply = self
            .call(DESCRIBE_OBJECT, &[HelperArg::Pointer(obj.address())])?;
        match self.decode_string(ObjectRef::new(reply))? {
            ManagedString::Text(text) => Ok(text),
            ManagedString::Null | ManagedString::Suspicious { .. } => {
                Err(Error::HelperReturnedNull(DESCRIBE_OBJECT))
            }
        }
    }
}

/// Token for a module the helper has confirmed loaded.
#[derive(Debug, Clone)]
pub struct HelperModule {
    path: String,
}

/// Token for a type the helper has confirmed present.
#[derive(Debug, Clone)]
pub struct HelperType {
    module_path: String,
    type_name: String,
}

impl<M: MemoryAccess, I: HelperInvoker> ReflectionHost
    for HelperSession<M, I>
{
    type Module = HelperModule;
    type Type = HelperType;

    fn load_module(&self, path: &str) -> Result<HelperModule, Error> {
        let reply = self.call_with_text(LOAD_MODULE, &[path])?;
        if reply.is_null() {
            return Err(Error::ModuleNotLoaded(path.to_string()));
        }
        Ok(HelperModule {
            path: path.to_string(),
        })
    }

    fn find_type(
        &self,
        module: &HelperModule,
        type_name: &str,
    ) -> Result<HelperType, Error> {
        let reply = self
            .call_with_text(FIND_TYPE, &[module.path.as_str(), type_name])?;
        if reply.is_null() {
            return Err(Error::TypeNotFound(type_name.to_string()));
        }
        Ok(HelperType {
            module_path: module.path.clone(),
            type_name: type_name.to_string(),
        })
    }

    fn methods_named(
        &self,
        ty: &HelperType,
        method_name: &str,
    ) -> Result<Vec<MethodDescriptor>, Error> {
        let reply = self.call_with_text(
            LIST_METHODS,
            &[ty.module_path.as_str(), ty.type_name.as_str(), method_name],
        )?;

        let listing = match self.decode_string(ObjectRef::new(reply))? {
            ManagedString::Text(text) => text,
            _ => return Err(Error::HelperReturnedNull(LIST_METHODS)),
        };

        Ok(listing
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(parse_method_line)
            .collect())
    }

    fn entry_point(
        &self,
        ty: &HelperType,
        method: &MethodDescriptor,
    ) -> Result<Pointer, Error> {
        let signature = method.parameter_types.join("|");
        self.call_with_text(
            PREPARE_METHOD,
            &[
                ty.module_path.as_str(),
                ty.type_name.as_str(),
                method.name.as_str(),
                signature.as_str(),
            ],
        )
    }
}

fn parse_method_line(line: &str) -> Option<MethodDescriptor> {
    let mut fields = line.split('\t');
    let name = fields.next()?;
    let kind = fields.next()?;
    let signature = fields.next().unwrap_or("");

    if kind != "S" && kind != "I" {
        warn!("unrecognized method listing line: {line:?}");
        return None;
    }

    Some(MethodDescriptor {
        name: name.to_string(),
        is_static: kind == "S",
        parameter_types: crate::method_reference::parse_signature(signature),
    })
}
