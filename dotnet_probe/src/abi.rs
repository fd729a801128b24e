use log::debug;
use process_memory::{Export, Pointer};

use crate::Error;

/// Calling-convention family of a helper export.
///
/// Which family a cross-boundary call uses changes who cleans up the
/// stack, so guessing wrong corrupts the caller's call state in a way
/// that is not detectable at the call site.  A decorated export name
/// (`_Name@12`) is authoritative evidence of stdcall; an undecorated
/// name is treated as the platform default, not as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    Default,
    StdCall,
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::Default => write!(f, "default"),
            CallingConvention::StdCall => write!(f, "stdcall"),
        }
    }
}

/// A located helper export together with the convention inferred for
/// it.  Produced once per export name and cached for the lifetime of
/// the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescriptor {
    pub name: String,
    pub address: Pointer,
    pub convention: CallingConvention,
}

/// Find the export to call for `preferred`, tolerating toolchain name
/// decoration.
///
/// An exact name match wins and keeps the default convention.  Failing
/// that, a decorated form `_preferred@NN` marks the export as stdcall.
/// Failing that, any export whose name merely contains `preferred` is
/// used with the default convention.
pub fn resolve_export(
    exports: &[Export],
    preferred: &str,
) -> Result<ExportDescriptor, Error> {
    if let Some(hit) = exports.iter().find(|e| e.name == preferred) {
        return Ok(ExportDescriptor {
            name: hit.name.clone(),
            address: hit.address,
            convention: CallingConvention::Default,
        });
    }

    if let Some(hit) = exports
        .iter()
        .find(|e| is_stdcall_decoration(&e.name, preferred))
    {
        debug!("using decorated export {} for {preferred}", hit.name);
        return Ok(ExportDescriptor {
            name: hit.name.clone(),
            address: hit.address,
            convention: CallingConvention::StdCall,
        });
    }

    if let Some(hit) = exports.iter().find(|e| e.name.contains(preferred)) {
        debug!("using export {} as substring match for {preferred}", hit.name);
        return Ok(ExportDescriptor {
            name: hit.name.clone(),
            address: hit.address,
            convention: CallingConvention::Default,
        });
    }

    Err(Error::ExportNotFound(preferred.to_string()))
}

/// `_Name@NN` where NN is the decimal byte count of the arguments.
fn is_stdcall_decoration(name: &str, preferred: &str) -> bool {
    name.strip_prefix('_')
        .and_then(|rest| rest.strip_prefix(preferred))
        .and_then(|rest| rest.strip_prefix('@'))
        .map(|digits| {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false)
}
