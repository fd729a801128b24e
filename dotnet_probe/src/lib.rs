mod error;
pub use error::Error;

mod method_reference;
pub use method_reference::MethodReference;

mod abi;
pub use abi::{resolve_export, CallingConvention, ExportDescriptor};

mod object_ref;
pub use object_ref::ObjectRef;

mod managed_string;
pub use managed_string::{
    looks_like_string, ManagedString, STRING_HEURISTIC_BOUND,
    STRING_SANITY_BOUND,
};

mod reflection;
pub use reflection::{MethodDescriptor, ReflectionHost};

mod resolver;
pub use resolver::MethodResolver;

mod helper;
pub use helper::{
    HelperArg, HelperInvoker, HelperModule, HelperSession, HelperType,
    DESCRIBE_FAILED,
};

mod stub_walker;
pub use stub_walker::{verified_hook_target, walk, walk_hops, MAX_STUB_HOPS};

mod argument_recovery;
pub use argument_recovery::{
    ArgumentDecoder, ArgumentValue, FrameSnapshot, RecoveredArgument,
    DEFAULT_SCAN_SLOTS,
};

mod probe;
pub use probe::{
    install_probe, ForcedReturn, InterceptorEngine, ProbeConfig, RawProbe,
    ResolvedEntry, TraceProbe, TraceSink,
};
