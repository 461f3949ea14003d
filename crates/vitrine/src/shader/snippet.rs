/// One WGSL function template, plus the snippets supplying its callees.
///
/// The template text must define a single function named by the placeholder
/// `$name`; the composer assigns the concrete, module-unique name when the
/// snippet is stitched into a program. Any other `$ident` in the text must be
/// bound to a dependency snippet with [`with_dep`](Snippet::with_dep) and is
/// replaced by that dependency's assigned function name.
#[derive(Clone, Debug, PartialEq)]
pub struct Snippet {
    source: String,
    deps: Vec<(String, Snippet)>,
}

impl Snippet {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            deps: Vec::new(),
        }
    }

    /// Binds `placeholder` (written `$placeholder` in the template) to `dep`.
    /// Binding the same placeholder again replaces the earlier snippet.
    /// `name` is reserved for the snippet's own function.
    pub fn with_dep(mut self, placeholder: impl Into<String>, dep: Snippet) -> Self {
        let placeholder = placeholder.into();
        if let Some(slot) = self.deps.iter_mut().find(|(p, _)| *p == placeholder) {
            slot.1 = dep;
        } else {
            self.deps.push((placeholder, dep));
        }
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn deps(&self) -> &[(String, Snippet)] {
        &self.deps
    }
}

/// Distinct `$ident` placeholders in `text`, in order of first appearance.
///
/// An identifier starts with an ASCII letter or `_` and continues with ASCII
/// alphanumerics or `_`; a `$` followed by anything else is not a
/// placeholder. All placeholder bytes are ASCII, so the byte-wise scan below
/// always slices at character boundaries.
pub(crate) fn placeholders(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        if end > start && !bytes[start].is_ascii_digit() {
            let name = &text[start..end];
            if !found.iter().any(|f| f == name) {
                found.push(name.to_string());
            }
        }
        i = end.max(start);
    }
    found
}
