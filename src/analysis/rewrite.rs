//! Text-level source rewrites applied before storage.
//!
//! Every rewrite works from the parsed statement positions and edits only the
//! bytes it has to. All of them are idempotent: running a rewrite over its own
//! output produces the same text.

use std::collections::BTreeSet;

use tracing::debug;

use super::lexer::Span;
use super::parser::{DefaultTarget, ExportDecl, ImportBinding, ImportDecl, ImportForm, Module};

/// A replacement of a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Edit {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Edit::replace(Span::new(at, at), text)
    }

    pub fn delete(span: Span) -> Self {
        Edit::replace(span, "")
    }
}

/// Apply non-overlapping edits to `src`.
pub fn apply_edits(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        out.push_str(&src[cursor..edit.span.start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Names exported by a named export statement (declaration or local list).
fn named_exports(module: &Module) -> BTreeSet<&str> {
    let mut names = BTreeSet::new();
    for export in &module.exports {
        match export {
            ExportDecl::Declaration { names: decl, .. } => {
                names.extend(decl.iter().map(String::as_str));
            }
            ExportDecl::List {
                specifiers,
                from: None,
                ..
            } => {
                names.extend(
                    specifiers
                        .iter()
                        .filter(|s| s.exported != "default")
                        .map(|s| s.exported.as_str()),
                );
            }
            _ => {}
        }
    }
    names
}

/// `name`, or `<name>Default` (then `<name>Default2`, ...) when the module
/// already binds it at the top level.
fn fresh_binding(module: &Module, name: &str) -> String {
    if !module.binds(name) {
        return name.to_string();
    }

    let base = format!("{}Default", name);
    let mut candidate = base.clone();
    let mut n = 2;
    while module.binds(&candidate) {
        candidate = format!("{}{}", base, n);
        n += 1;
    }
    candidate
}

/// Make the default export importable by name.
///
/// - `export default function Button() {}` becomes
///   `export function Button() {}` plus a trailing `export default Button;`
/// - anonymous functions and classes get `name` inserted
/// - `export default <expression>` becomes `export const <name> = <expression>`
/// - `export default Button` and `export { Button as default }` gain
///   `export { Button };` when `Button` is not already a named export
///
/// `name` is only used when the default export has no name of its own, and
/// is suffixed with `Default` when it would shadow an existing binding.
pub fn expose_default_export(src: &str, module: &Module, name: Option<&str>) -> String {
    let named = named_exports(module);
    let mut edits = Vec::new();
    let mut trailer = Vec::new();

    if let Some(default) = module.default_export() {
        match &default.target {
            DefaultTarget::Function {
                name: own,
                name_insert_at,
            }
            | DefaultTarget::Class {
                name: own,
                name_insert_at,
            } => {
                let binding = match own {
                    Some(own) => Some(own.clone()),
                    None => name.map(|n| fresh_binding(module, n)),
                };
                if let Some(binding) = binding {
                    edits.push(Edit::replace(default.keyword_span, "export"));
                    if own.is_none() {
                        edits.push(Edit::insert(*name_insert_at, format!(" {}", binding)));
                    }
                    trailer.push(format!("export default {};", binding));
                }
            }
            DefaultTarget::Identifier(local) => {
                if !named.contains(local.as_str()) {
                    trailer.push(format!("export {{ {} }};", local));
                }
            }
            DefaultTarget::Expression => {
                if let Some(binding) = name.map(|n| fresh_binding(module, n)) {
                    edits.push(Edit::replace(
                        default.keyword_span,
                        format!("export const {} =", binding),
                    ));
                    trailer.push(format!("export default {};", binding));
                }
            }
        }
    }

    for export in &module.exports {
        if let ExportDecl::List {
            specifiers,
            from: None,
            ..
        } = export
        {
            for spec in specifiers {
                if spec.exported == "default"
                    && !spec.type_only
                    && !named.contains(spec.local.as_str())
                {
                    trailer.push(format!("export {{ {} }};", spec.local));
                }
            }
        }
    }

    if edits.is_empty() && trailer.is_empty() {
        return src.to_string();
    }

    debug!(edits = edits.len(), appended = trailer.len(), "exposing default export");

    let mut out = apply_edits(src, edits);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for line in trailer {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Remove the `async` modifier from the declaration of `entry`.
pub fn strip_async_entry(src: &str, module: &Module, entry: &str) -> String {
    let default_span = module
        .default_export()
        .filter(|d| d.target.name() == Some(entry) || d.target == DefaultTarget::Expression)
        .and_then(|d| d.async_span);

    let decl_span = module
        .declarations
        .iter()
        .find(|d| d.names.iter().any(|n| n == entry))
        .and_then(|d| d.async_span);

    match default_span.or(decl_span) {
        Some(span) => {
            debug!(entry, "removing async modifier from demo entry");
            apply_edits(src, vec![Edit::delete(span)])
        }
        None => src.to_string(),
    }
}

/// Result of stripping self-imports from a demo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrippedImports {
    pub text: String,
    /// Specifiers of every import statement that was edited or removed
    pub removed: Vec<String>,
}

/// Remove bindings of `exported` names from local imports.
///
/// A statement left without bindings is removed, together with its line when
/// it sits on a line of its own.
pub fn strip_self_imports(
    src: &str,
    module: &Module,
    exported: &[String],
    is_local: impl Fn(&str) -> bool,
) -> StrippedImports {
    let exported: BTreeSet<&str> = exported.iter().map(String::as_str).collect();
    let mut edits = Vec::new();
    let mut removed: Vec<String> = Vec::new();

    for import in &module.imports {
        if import.form != ImportForm::Static || import.type_only || !is_local(&import.specifier) {
            continue;
        }

        let is_self = |b: &ImportBinding| match b {
            ImportBinding::Named {
                type_only: true, ..
            } => false,
            other => other.imported_name().is_some_and(|n| exported.contains(n)),
        };

        if !import.bindings.iter().any(is_self) {
            continue;
        }

        let kept: Vec<&ImportBinding> = import.bindings.iter().filter(|b| !is_self(*b)).collect();
        if kept.is_empty() {
            edits.push(Edit::delete(line_extent(src, import.span)));
        } else {
            edits.push(Edit::replace(import.span, render_import(import, &kept)));
        }

        debug!(specifier = %import.specifier, kept = kept.len(), "stripping self-import");
        if !removed.contains(&import.specifier) {
            removed.push(import.specifier.clone());
        }
    }

    StrippedImports {
        text: apply_edits(src, edits),
        removed,
    }
}

/// Render an import statement with a subset of its bindings.
fn render_import(import: &ImportDecl, bindings: &[&ImportBinding]) -> String {
    let mut clauses = Vec::new();
    let mut named = Vec::new();

    for binding in bindings {
        match binding {
            ImportBinding::Default { local } => clauses.push(local.clone()),
            ImportBinding::Namespace { local } => clauses.push(format!("* as {}", local)),
            ImportBinding::Named {
                imported,
                local,
                type_only,
            } => {
                let prefix = if *type_only { "type " } else { "" };
                if imported == local {
                    named.push(format!("{}{}", prefix, imported));
                } else {
                    named.push(format!("{}{} as {}", prefix, imported, local));
                }
            }
        }
    }

    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }

    format!("import {} from {};", clauses.join(", "), import.specifier_raw)
}

/// Widen `span` to its whole line when nothing else shares the line.
fn line_extent(src: &str, span: Span) -> Span {
    let line_start = src[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = src[span.end..]
        .find('\n')
        .map(|i| span.end + i + 1)
        .unwrap_or(src.len());

    let before_blank = src[line_start..span.start].trim().is_empty();
    let after_blank = src[span.end..line_end].trim().is_empty();

    if before_blank && after_blank {
        Span::new(line_start, line_end)
    } else {
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::parse_module;

    fn expose(src: &str, name: Option<&str>) -> String {
        let module = parse_module(src).unwrap();
        expose_default_export(src, &module, name)
    }

    fn strip(src: &str, exported: &[&str]) -> StrippedImports {
        let module = parse_module(src).unwrap();
        let exported: Vec<String> = exported.iter().map(|s| s.to_string()).collect();
        strip_self_imports(src, &module, &exported, |s| s.starts_with('.'))
    }

    #[test]
    fn test_apply_edits_in_any_order() {
        let out = apply_edits(
            "abcdef",
            vec![
                Edit::replace(Span::new(4, 5), "E"),
                Edit::insert(0, ">"),
                Edit::delete(Span::new(1, 3)),
            ],
        );
        assert_eq!(out, ">adEf");
    }

    #[test]
    fn test_named_default_function_is_exposed() {
        let out = expose("export default function Button() {\n  return null\n}\n", None);
        assert_eq!(
            out,
            "export function Button() {\n  return null\n}\nexport default Button;\n"
        );
        assert_eq!(expose(&out, None), out);
    }

    #[test]
    fn test_anonymous_default_gets_name() {
        let out = expose("export default function () {}", Some("Badge"));
        assert_eq!(out, "export function Badge () {}\nexport default Badge;\n");
        assert_eq!(expose(&out, Some("Badge")), out);

        let out = expose("export default () => null;\n", Some("Badge"));
        assert_eq!(out, "export const Badge = () => null;\nexport default Badge;\n");
        assert_eq!(expose(&out, Some("Badge")), out);
    }

    #[test]
    fn test_synthesized_name_avoids_existing_bindings() {
        let src = "const Card = () => null;\nexport default memo(Card);\n";
        let out = expose(src, Some("Card"));
        assert_eq!(
            out,
            "const Card = () => null;\nexport const CardDefault = memo(Card);\nexport default CardDefault;\n"
        );
        assert_eq!(out.matches("const Card ").count(), 1);
        assert_eq!(expose(&out, Some("Card")), out);

        let src = "import { Badge } from \"./badge\";\nimport BadgeDefault from \"./old\";\nexport default function () {}\n";
        let out = expose(src, Some("Badge"));
        assert!(out.contains("export function BadgeDefault2 () {}"));
        assert!(out.ends_with("export default BadgeDefault2;\n"));
    }

    #[test]
    fn test_default_identifier_gains_named_export() {
        let src = "function Card() {}\nexport default Card;\n";
        let out = expose(src, None);
        assert_eq!(out, "function Card() {}\nexport default Card;\nexport { Card };\n");
        assert_eq!(expose(&out, None), out);

        let already = "export function Card() {}\nexport default Card;\n";
        assert_eq!(expose(already, None), already);
    }

    #[test]
    fn test_default_alias_in_list() {
        let out = expose("function Card() {}\nexport { Card as default };", None);
        assert!(out.ends_with("export { Card };\n"));
        assert_eq!(expose(&out, None), out);
    }

    #[test]
    fn test_strip_async_entry() {
        let src = "export default async function Demo() {}";
        let module = parse_module(src).unwrap();
        assert_eq!(
            strip_async_entry(src, &module, "Demo"),
            "export default function Demo() {}"
        );

        let src = "const Demo = async () => null;\nexport default Demo;";
        let module = parse_module(src).unwrap();
        let out = strip_async_entry(src, &module, "Demo");
        assert_eq!(out, "const Demo = () => null;\nexport default Demo;");

        let module = parse_module(&out).unwrap();
        assert_eq!(strip_async_entry(&out, &module, "Demo"), out);
    }

    #[test]
    fn test_strip_whole_self_import() {
        let src = "import { Button } from \"./button\";\nimport { motion } from \"framer-motion\";\n\nexport default function Demo() {}\n";
        let result = strip(src, &["Button"]);
        assert_eq!(
            result.text,
            "import { motion } from \"framer-motion\";\n\nexport default function Demo() {}\n"
        );
        assert_eq!(result.removed, vec!["./button"]);

        let again = strip(&result.text, &["Button"]);
        assert_eq!(again.text, result.text);
        assert!(again.removed.is_empty());
    }

    #[test]
    fn test_strip_keeps_other_bindings() {
        let src = "import Button, { ButtonProps, useThing as thing } from './button';\n";
        let result = strip(src, &["Button", "ButtonProps"]);
        assert_eq!(result.text, "import { useThing as thing } from './button';\n");
        assert_eq!(result.removed, vec!["./button"]);
    }

    #[test]
    fn test_strip_ignores_packages_and_types() {
        let src = "import { Button } from \"ui-kit\";\nimport type { Button as B } from \"./button\";\n";
        let result = strip(src, &["Button"]);
        assert_eq!(result.text, src);
        assert!(result.removed.is_empty());
    }
}
