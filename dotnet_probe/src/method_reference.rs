use itertools::Itertools as _;

/// Identifies one method overload inside the target process.
///
/// The signature is an ordered list of parameter type full-names
/// ("System.String", "System.Int32", ...).  With an empty signature the
/// resolver takes the first method of that name the runtime enumerates,
/// so callers probing an overloaded method should always supply one.
///
/// Immutable once constructed; a resolved entry address is cached
/// against the whole reference.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
    module_path: String,
    type_name: String,
    method_name: String,
    parameter_signature: Vec<String>,
}

impl MethodReference {
    pub fn new(
        module_path: impl Into<String>,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            type_name: type_name.into(),
            method_name: method_name.into(),
            parameter_signature: Vec::new(),
        }
    }

    pub fn with_signature(
        self,
        signature: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            parameter_signature: signature
                .into_iter()
                .map(Into::into)
                .collect(),
            ..self
        }
    }

    /// Signature from the wire form used when talking to the helper:
    /// parameter type full-names joined with '|', empty string for a
    /// parameterless match.
    pub fn with_signature_str(self, signature: &str) -> Self {
        Self {
            parameter_signature: parse_signature(signature),
            ..self
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameter_signature(&self) -> &[String] {
        &self.parameter_signature
    }

    pub fn signature_string(&self) -> String {
        self.parameter_signature.iter().join("|")
    }
}

pub(crate) fn parse_signature(signature: &str) -> Vec<String> {
    if signature.is_empty() {
        Vec::new()
    } else {
        signature.split('|').map(String::from).collect()
    }
}

impl std::fmt::Display for MethodReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.type_name,
            self.method_name,
            self.signature_string(),
        )
    }
}

impl std::fmt::Debug for MethodReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodReference({}, in {})", self, self.module_path)
    }
}
