use derive_more::derive::From;
use log::{debug, warn};
use process_memory::{MemoryAccess, Pointer, PointerWidth};

use crate::{
    verified_hook_target, ArgumentDecoder, Error, FrameSnapshot,
    MethodReference, MethodResolver, RecoveredArgument, ReflectionHost,
};

/// Outcome of resolving and normalizing one method reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Address the runtime reported for the compiled method.  May be a
    /// dispatch stub.
    pub entry: Pointer,
    /// Stable code body after stub walking; where probes attach.
    pub target: Pointer,
}

impl ResolvedEntry {
    pub fn is_stub(&self) -> bool {
        self.entry != self.target
    }
}

/// Word forced into the return register when a probe overrides a
/// scalar-returning method.
///
/// Only scalars can be forced from configuration; an object or string
/// return needs a live managed allocation, which a probe produces per
/// invocation through the helper session instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub enum ForcedReturn {
    Int32(i32),
    Bool(bool),
}

impl ForcedReturn {
    pub fn as_word(self) -> usize {
        match self {
            ForcedReturn::Int32(value) => value as u32 as usize,
            ForcedReturn::Bool(value) => value as usize,
        }
    }
}

/// One configurable probe pipeline.
///
/// Argument decoding and return forcing are independent toggles on the
/// same pipeline rather than separate probe flavors.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub decoder: ArgumentDecoder,
    pub forced_return: Option<ForcedReturn>,
}

impl ProbeConfig {
    pub fn tracing(decoder: ArgumentDecoder) -> Self {
        Self {
            decoder,
            forced_return: None,
        }
    }

    pub fn forcing_return(
        decoder: ArgumentDecoder,
        forced: impl Into<ForcedReturn>,
    ) -> Self {
        Self {
            decoder,
            forced_return: Some(forced.into()),
        }
    }
}

/// Raw per-invocation events, driven by the interception engine from
/// whichever target thread made the call.  Implementations must be
/// safe to invoke concurrently; each call carries its own frame.
pub trait RawProbe: Send + Sync {
    fn on_enter(&self, frame: FrameSnapshot);

    /// Return `Some` to replace the word in the return-value register,
    /// affecting only the current invocation.
    fn on_exit(&self, frame: FrameSnapshot, return_word: usize)
        -> Option<usize>;
}

/// Installation boundary of the external interception engine.
pub trait InterceptorEngine {
    /// Install a trap at `target`, routing every call through `probe`.
    /// Callers have already verified that `target` is executable.
    fn attach(
        &mut self,
        target: Pointer,
        probe: Box<dyn RawProbe>,
    ) -> Result<(), Error>;
}

/// Sink for decoded trace events.  Append-only from the probe's point
/// of view; implementations typically forward to the operator console.
pub trait TraceSink: Send + Sync {
    fn method_entered(
        &self,
        entry: &ResolvedEntry,
        frame: &FrameSnapshot,
        arguments: &[RecoveredArgument],
    );

    fn method_exited(&self, entry: &ResolvedEntry, return_word: usize);
}

/// The configured pipeline attached at a hook target: recovers
/// arguments with the configured strategy, reports both directions to
/// the sink, and applies any forced return.
pub struct TraceProbe<M, S> {
    memory: M,
    width: PointerWidth,
    entry: ResolvedEntry,
    config: ProbeConfig,
    sink: S,
}

impl<M, S> TraceProbe<M, S>
where
    M: MemoryAccess + Send + Sync,
    S: TraceSink,
{
    pub fn new(
        memory: M,
        width: PointerWidth,
        entry: ResolvedEntry,
        config: ProbeConfig,
        sink: S,
    ) -> Self {
        Self {
            memory,
            width,
            entry,
            config,
            sink,
        }
    }
}

impl<M, S> RawProbe for TraceProbe<M, S>
where
    M: MemoryAccess + Send + Sync,
    S: TraceSink,
{
    fn on_enter(&self, frame: FrameSnapshot) {
        let arguments = match self.config.decoder.recover(
            &self.memory,
            self.width,
            &frame,
        ) {
            Ok(arguments) => arguments,
            Err(err) => {
                // Recovery is best-effort; a torn frame must not take
                // down the invocation it is observing.
                warn!("argument recovery failed: {err}");
                Vec::new()
            }
        };

        self.sink.method_entered(&self.entry, &frame, &arguments);
    }

    fn on_exit(
        &self,
        _frame: FrameSnapshot,
        return_word: usize,
    ) -> Option<usize> {
        self.sink.method_exited(&self.entry, return_word);
        self.config.forced_return.map(ForcedReturn::as_word)
    }
}

/// Resolve a method reference, normalize its entry to a hookable body,
/// and attach a configured trace probe there.
///
/// Fails without attaching if the stub walk exhausts its budget or the
/// final address is not executable; there is no partial install.
pub fn install_probe<H, M, S>(
    resolver: &MethodResolver<H>,
    setup_memory: &impl MemoryAccess,
    width: PointerWidth,
    engine: &mut impl InterceptorEngine,
    reference: &MethodReference,
    probe_memory: M,
    config: ProbeConfig,
    sink: S,
) -> Result<ResolvedEntry, Error>
where
    H: ReflectionHost,
    M: MemoryAccess + Send + Sync + 'static,
    S: TraceSink + 'static,
{
    let entry = resolver.resolve(reference)?;
    let target = verified_hook_target(setup_memory, width, entry)?;
    let resolved = ResolvedEntry { entry, target };

    debug!(
        "installing probe for {reference} at {target} (entry {entry})",
    );

    engine.attach(
        target,
        Box::new(TraceProbe::new(
            probe_memory,
            width,
            resolved,
            config,
            sink,
        )),
    )?;

    Ok(resolved)
}
