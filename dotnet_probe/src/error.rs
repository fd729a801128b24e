use process_memory::Pointer;
use thiserror::Error;

#[derive(Error)]
pub enum Error {
    #[error("process_memory::Error{{ {err} }}")]
    ProcessMemory {
        #[from]
        err: process_memory::Error,
    },

    #[error("Module '{0}' is not loaded and could not be loaded")]
    ModuleNotLoaded(String),

    #[error("Could not find type '{0}'")]
    TypeNotFound(String),

    #[error(
        "Could not find method '{type_name}.{method_name}' \
         with signature '({signature})'"
    )]
    MethodNotFound {
        type_name: String,
        method_name: String,
        signature: String,
    },

    #[error("Runtime returned a null entry point for '{0}'")]
    NullEntryPoint(String),

    #[error("Export not found: {0}")]
    ExportNotFound(String),

    #[error("Helper export '{0}' returned a null reference")]
    HelperReturnedNull(&'static str),

    #[error("Call into helper export '{export}' failed: {message}")]
    HelperCallFailed { export: String, message: String },

    #[error(
        "Stub walk from {start} exceeded {max_hops} hops \
         without reaching a stable body"
    )]
    StubWalkExhausted { start: Pointer, max_hops: usize },

    #[error("Stub at {from} jumps to unreadable address {target}")]
    UnreadableStubTarget { from: Pointer, target: Pointer },

    #[error("Resolved target {0} is not in executable memory")]
    NonExecutableTarget(Pointer),

    #[error("Interceptor engine refused to attach at {target}: {message}")]
    AttachFailed { target: Pointer, message: String },

    #[error("Invalid UTF-16 string: {err}")]
    InvalidUTF16 {
        #[from]
        err: std::char::DecodeUtf16Error,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
