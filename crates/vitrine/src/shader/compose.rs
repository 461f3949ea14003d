use std::collections::{BTreeMap, BTreeSet};

use super::snippet::{placeholders, Snippet};

/// Errors produced while composing a shader module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// A template calls a hook that was never bound.
    #[error("template references hook `{name}` but nothing is bound to it")]
    MissingHook { name: String },
    /// A hook was bound but neither template mentions it.
    #[error("hook `{name}` is bound but no template references it")]
    UnusedHook { name: String },
    /// A snippet uses a placeholder none of its dependencies provide.
    #[error("placeholder `${placeholder}` has no binding")]
    UnboundPlaceholder { placeholder: String },
    /// A snippet does not define `fn $name`.
    #[error("snippet does not define `fn $name`; source starts with `{head}`")]
    BadSnippet { head: String },
}

/// Assembles a vertex and a fragment template plus named hook snippets into
/// one WGSL module.
///
/// Hook roots keep the hook's own name, so a template calling `$warp(...)`
/// ends up calling a generated `fn warp`. Dependency functions get fresh
/// `<hook>_<n>` names and are emitted before their callers, one copy per
/// occurrence. Composition is purely textual and deterministic: the same
/// templates and hooks always produce the same module string.
pub struct Composer {
    vertex: String,
    fragment: String,
    hooks: Vec<(String, Snippet)>,
}

impl Composer {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            hooks: Vec::new(),
        }
    }

    /// Binds `snippet` to the hook `$name`; rebinding replaces.
    pub fn hook(mut self, name: impl Into<String>, snippet: Snippet) -> Self {
        let name = name.into();
        if let Some(slot) = self.hooks.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = snippet;
        } else {
            self.hooks.push((name, snippet));
        }
        self
    }

    pub fn compose(&self) -> Result<String, ComposeError> {
        // Hook references across both templates, in template order.
        let mut referenced = placeholders(&self.vertex);
        for name in placeholders(&self.fragment) {
            if !referenced.contains(&name) {
                referenced.push(name);
            }
        }

        for name in &referenced {
            if !self.hooks.iter().any(|(n, _)| n == name) {
                return Err(ComposeError::MissingHook { name: name.clone() });
            }
        }
        for (name, _) in &self.hooks {
            if !referenced.contains(name) {
                return Err(ComposeError::UnusedHook { name: name.clone() });
            }
        }

        // Emit every hook tree, dependencies ahead of their callers. Seeding
        // the used-name set with all hook names keeps generated names clear
        // of hooks that are emitted later.
        let mut used: BTreeSet<String> = self.hooks.iter().map(|(n, _)| n.clone()).collect();
        let mut functions = String::new();
        for (name, snippet) in &self.hooks {
            emit(snippet, name, name, &mut used, &mut functions)?;
        }

        // Strip the `$` off hook calls in the templates.
        let hook_map: BTreeMap<String, String> = self
            .hooks
            .iter()
            .map(|(n, _)| (n.clone(), n.clone()))
            .collect();
        let vertex = substitute(&self.vertex, &hook_map)?;
        let fragment = substitute(&self.fragment, &hook_map)?;

        let module = format!("{functions}\n{vertex}\n{fragment}");

        // Nothing unresolved may survive into the module handed to the GPU.
        if let Some(leftover) = placeholders(&module).into_iter().next() {
            return Err(ComposeError::UnboundPlaceholder {
                placeholder: leftover,
            });
        }
        Ok(module)
    }
}

/// Appends `snippet` to `out` under `fn_name`, its dependencies first.
fn emit(
    snippet: &Snippet,
    fn_name: &str,
    hook: &str,
    used: &mut BTreeSet<String>,
    out: &mut String,
) -> Result<(), ComposeError> {
    if !snippet.source().contains("fn $name") {
        let head: String = snippet.source().chars().take(40).collect();
        return Err(ComposeError::BadSnippet { head });
    }

    let mut map = BTreeMap::new();
    for (placeholder, dep) in snippet.deps() {
        let dep_name = unique_name(hook, used);
        emit(dep, &dep_name, hook, used, out)?;
        map.insert(placeholder.clone(), dep_name);
    }
    // Inserted last: `name` stays reserved even against a dep of that name.
    map.insert("name".to_string(), fn_name.to_string());

    out.push_str(&substitute(snippet.source(), &map)?);
    out.push('\n');
    Ok(())
}

fn unique_name(hook: &str, used: &mut BTreeSet<String>) -> String {
    let mut n = 1usize;
    loop {
        let candidate = format!("{hook}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Replaces every `$ident` in `text` using `map`; unknown idents error out.
fn substitute(text: &str, map: &BTreeMap<String, String>) -> Result<String, ComposeError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut flushed = 0;
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
            let ident = &text[start..end];
            let name = map
                .get(ident)
                .ok_or_else(|| ComposeError::UnboundPlaceholder {
                    placeholder: ident.to_string(),
                })?;
            out.push_str(&text[flushed..i]);
            out.push_str(name);
            flushed = end;
        }
        i = end.max(start);
    }
    out.push_str(&text[flushed..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = "@vertex fn vs_main() { let p = $warp(vec4<f32>(0.0)); }";
    const FRAG: &str = "@fragment fn fs_main() { }";

    fn identity_snippet() -> Snippet {
        Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return p; }")
    }

    #[test]
    fn hook_root_takes_the_hook_name() {
        let module = Composer::new(VERT, FRAG)
            .hook("warp", identity_snippet())
            .compose()
            .unwrap();
        assert!(module.contains("fn warp(p: vec4<f32>)"));
        assert!(module.contains("= warp(vec4<f32>(0.0))"));
        assert!(!module.contains('$'));
    }

    #[test]
    fn dependencies_get_fresh_names_and_come_first() {
        let snippet = Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return $inner(p); }")
            .with_dep("inner", identity_snippet());
        let module = Composer::new(VERT, FRAG)
            .hook("warp", snippet)
            .compose()
            .unwrap();

        let dep_def = module.find("fn warp_1(").unwrap();
        let root_def = module.find("fn warp(").unwrap();
        assert!(dep_def < root_def, "dependency must be emitted first");
        assert!(module.contains("return warp_1(p);"));
    }

    #[test]
    fn nested_dependencies_number_uniquely() {
        let inner = Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return $deeper(p); }")
            .with_dep("deeper", identity_snippet());
        let snippet = Snippet::new(
            "fn $name(p: vec4<f32>) -> vec4<f32> { return $a($b(p)); }",
        )
        .with_dep("a", inner)
        .with_dep("b", identity_snippet());

        let module = Composer::new(VERT, FRAG)
            .hook("warp", snippet)
            .compose()
            .unwrap();
        for name in ["fn warp_1(", "fn warp_2(", "fn warp_3(", "fn warp("] {
            assert!(module.contains(name), "missing {name} in:\n{module}");
        }
    }

    #[test]
    fn composition_is_deterministic() {
        let build = || {
            Composer::new(VERT, FRAG)
                .hook(
                    "warp",
                    Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return $i(p); }")
                        .with_dep("i", identity_snippet()),
                )
                .compose()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn rebinding_a_hook_replaces_it() {
        let module = Composer::new(VERT, FRAG)
            .hook(
                "warp",
                Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return p * 2.0; }"),
            )
            .hook("warp", identity_snippet())
            .compose()
            .unwrap();
        assert!(module.contains("return p;"));
        assert!(!module.contains("p * 2.0"));
    }

    #[test]
    fn missing_hook_is_an_error() {
        let err = Composer::new(VERT, FRAG).compose().unwrap_err();
        assert_eq!(
            err,
            ComposeError::MissingHook {
                name: "warp".to_string()
            }
        );
    }

    #[test]
    fn unused_hook_is_an_error() {
        let err = Composer::new(VERT, FRAG)
            .hook("warp", identity_snippet())
            .hook("never_called", identity_snippet())
            .compose()
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::UnusedHook {
                name: "never_called".to_string()
            }
        );
    }

    #[test]
    fn unbound_placeholder_is_an_error() {
        let err = Composer::new(VERT, FRAG)
            .hook(
                "warp",
                Snippet::new("fn $name(p: vec4<f32>) -> vec4<f32> { return $nowhere(p); }"),
            )
            .compose()
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::UnboundPlaceholder {
                placeholder: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn snippet_without_fn_name_is_an_error() {
        let err = Composer::new(VERT, FRAG)
            .hook("warp", Snippet::new("fn warp() { }"))
            .compose()
            .unwrap_err();
        assert!(matches!(err, ComposeError::BadSnippet { .. }));
    }
}
