use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;
use process_memory::Pointer;

use crate::{Error, MethodReference, ReflectionHost};

/// Maps a symbolic method reference to the native entry address of its
/// compiled body.
///
/// Resolution happens once per reference during setup; the result is
/// cached for the lifetime of the session.  The runtime may later
/// re-compile a method and move its entry point, which is not detected
/// here; long-lived sessions call `resolve_fresh` on whatever cadence
/// suits their target.
pub struct MethodResolver<H> {
    host: H,
    cache: RefCell<HashMap<MethodReference, Pointer>>,
}

impl<H: ReflectionHost> MethodResolver<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Resolve-or-reuse.  The first resolution of a reference does the
    /// full lookup; later calls return the cached entry address.
    pub fn resolve(
        &self,
        reference: &MethodReference,
    ) -> Result<Pointer, Error> {
        if let Some(entry) = self.cache.borrow().get(reference) {
            return Ok(*entry);
        }

        let entry = self.resolve_uncached(reference)?;
        self.cache
            .borrow_mut()
            .insert(reference.clone(), entry);
        Ok(entry)
    }

    /// Bypass and replace the cached entry.  The only recourse once the
    /// target has re-compiled a method under an already-resolved
    /// reference.
    pub fn resolve_fresh(
        &self,
        reference: &MethodReference,
    ) -> Result<Pointer, Error> {
        let entry = self.resolve_uncached(reference)?;
        self.cache
            .borrow_mut()
            .insert(reference.clone(), entry);
        Ok(entry)
    }

    fn resolve_uncached(
        &self,
        reference: &MethodReference,
    ) -> Result<Pointer, Error> {
        let module = self.host.load_module(reference.module_path())?;
        let ty = self.host.find_type(&module, reference.type_name())?;

        let candidates =
            self.host.methods_named(&ty, reference.method_name())?;

        let signature = reference.parameter_signature();

        let chosen = if signature.is_empty() {
            if candidates.len() > 1 {
                debug!(
                    "{} overloads of {}.{}, no signature given, \
                     taking the first",
                    candidates.len(),
                    reference.type_name(),
                    reference.method_name(),
                );
            }
            candidates.into_iter().next()
        } else {
            candidates
                .into_iter()
                .find(|method| method.parameter_types == signature)
        }
        .ok_or_else(|| Error::MethodNotFound {
            type_name: reference.type_name().to_string(),
            method_name: reference.method_name().to_string(),
            signature: reference.signature_string(),
        })?;

        let entry = self.host.entry_point(&ty, &chosen)?;
        let entry = entry
            .as_non_null()
            .ok_or_else(|| Error::NullEntryPoint(reference.to_string()))?;

        debug!("resolved {reference} -> {entry}");

        Ok(entry)
    }
}
