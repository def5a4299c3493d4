//! Module statement parser.
//!
//! Walks the token stream and recognizes the statements that matter for
//! registry analysis: import declarations, export declarations and top-level
//! value declarations. Everything else is skipped without being parsed.
//!
//! Supported forms:
//!
//! ```text
//! import "x";                          import D, * as ns from "x";
//! import D, { a, b as c } from "x";    import type { T } from "x";
//! export function F() {}               export const A = 1, B = 2;
//! export class C {}                    export const { a, b: c } = o;
//! export default function F() {}       export default F;
//! export default () => null;           export { a, b as c };
//! export { a } from "x";               export * from "x";
//! import("x")                          require("x")
//! ```

use super::lexer::{tokenize, Span, SyntaxError, Token, TokenKind};

/// How an import reached the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportForm {
    /// `import ... from "x"` or `import "x"`
    Static,
    /// `export ... from "x"`
    ReExport,
    /// `import("x")` or `require("x")`
    Dynamic,
}

/// A single binding introduced by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    Default { local: String },
    Namespace { local: String },
    Named {
        imported: String,
        local: String,
        type_only: bool,
    },
}

impl ImportBinding {
    /// The name this binding refers to on the exporting side.
    ///
    /// Default imports are matched by their local name, since a component's
    /// default export is exposed under its own declared name.
    pub fn imported_name(&self) -> Option<&str> {
        match self {
            ImportBinding::Default { local } => Some(local),
            ImportBinding::Named { imported, .. } => Some(imported),
            ImportBinding::Namespace { .. } => None,
        }
    }

    /// The name bound in the importing module.
    pub fn local(&self) -> &str {
        match self {
            ImportBinding::Default { local }
            | ImportBinding::Namespace { local }
            | ImportBinding::Named { local, .. } => local,
        }
    }
}

/// An import statement (or import-like expression).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Decoded module specifier
    pub specifier: String,
    /// Specifier as written, quotes included
    pub specifier_raw: String,
    pub form: ImportForm,
    pub bindings: Vec<ImportBinding>,
    pub type_only: bool,
    pub span: Span,
    pub line: usize,
}

/// Kind of a top-level value declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Class,
    Variable,
    Enum,
}

/// A top-level value declaration. Variable statements produce one
/// declaration per declarator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub names: Vec<String>,
    pub kind: DeclKind,
    pub exported: bool,
    /// `async` keyword plus trailing whitespace, when present
    pub async_span: Option<Span>,
    pub start: usize,
}

/// One entry of an `export { ... }` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
    pub type_only: bool,
}

/// What an `export default` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultTarget {
    Function {
        name: Option<String>,
        /// Offset where a name can be inserted for anonymous functions
        name_insert_at: usize,
    },
    Class {
        name: Option<String>,
        name_insert_at: usize,
    },
    Identifier(String),
    Expression,
}

impl DefaultTarget {
    /// The bound name, if the default export has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            DefaultTarget::Function { name, .. } | DefaultTarget::Class { name, .. } => {
                name.as_deref()
            }
            DefaultTarget::Identifier(name) => Some(name),
            DefaultTarget::Expression => None,
        }
    }
}

/// An `export default` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExport {
    pub target: DefaultTarget,
    /// The `export default` keywords
    pub keyword_span: Span,
    pub async_span: Option<Span>,
    pub line: usize,
}

/// An export statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDecl {
    Declaration {
        names: Vec<String>,
        start: usize,
    },
    List {
        specifiers: Vec<ExportSpecifier>,
        from: Option<String>,
        start: usize,
    },
    Star {
        from: String,
        alias: Option<String>,
        start: usize,
    },
    Default(DefaultExport),
}

/// The statements of a module relevant to analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub declarations: Vec<Declaration>,
}

impl Module {
    /// Start offset of the top-level declaration binding `name`.
    pub fn declaration_start(&self, name: &str) -> Option<usize> {
        self.declarations
            .iter()
            .find(|d| d.names.iter().any(|n| n == name))
            .map(|d| d.start)
    }

    /// Whether `name` is already bound at the top level, by a declaration or
    /// an import.
    pub fn binds(&self, name: &str) -> bool {
        self.declaration_start(name).is_some()
            || self
                .imports
                .iter()
                .flat_map(|i| i.bindings.iter())
                .any(|b| b.local() == name)
    }

    /// Default export, if any.
    pub fn default_export(&self) -> Option<&DefaultExport> {
        self.exports.iter().find_map(|e| match e {
            ExportDecl::Default(d) => Some(d),
            _ => None,
        })
    }
}

/// Parse a module.
pub fn parse_module(src: &str) -> Result<Module, SyntaxError> {
    let tokens = tokenize(src)?;
    Parser {
        src,
        tokens,
        pos: 0,
        module: Module::default(),
    }
    .run()
}

/// Keywords that start a statement when they begin a line.
const STATEMENT_KEYWORDS: &[&str] = &[
    "import",
    "export",
    "const",
    "let",
    "var",
    "function",
    "class",
    "type",
    "interface",
    "enum",
    "declare",
];

/// Identifiers after which the next line continues the same expression.
const CONTINUATION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "new",
    "extends",
    "await",
    "yield",
    "in",
    "of",
    "instanceof",
    "case",
    "void",
    "delete",
    "default",
    "export",
];

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    module: Module,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Module, SyntaxError> {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind == TokenKind::Ident && !self.after_member_access() {
                let depth = token.depth;
                match token.text {
                    "import" if self.next_is_punct("(") => {}
                    "import" if depth == 0 && !self.next_is_punct(".") => {
                        self.parse_import()?;
                        continue;
                    }
                    "export" if depth == 0 => {
                        self.parse_export()?;
                        continue;
                    }
                    "function" | "class" | "const" | "let" | "var" | "enum" | "async"
                        if depth == 0 && self.at_statement_start() =>
                    {
                        let start = self.pos;
                        for decl in self.parse_declaration(false)? {
                            self.module.declarations.push(decl);
                        }
                        if self.pos == start {
                            self.pos += 1;
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }

        self.collect_call_imports();
        self.module.imports.sort_by_key(|i| i.span.start);
        Ok(self.module)
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + ahead)
    }

    fn next_is_punct(&self, punct: &str) -> bool {
        self.peek_at(1).is_some_and(|t| t.is_punct(punct))
    }

    fn after_member_access(&self) -> bool {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .is_some_and(|t| t.is_punct(".") || t.is_punct("?."))
    }

    fn at_statement_start(&self) -> bool {
        let Some(prev) = self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) else {
            return true;
        };

        if prev.is_punct(";") || prev.is_punct("}") {
            return true;
        }

        self.tokens[self.pos].newline_before && !is_continuation(prev)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let offset = self
            .peek()
            .map(|t| t.span.start)
            .unwrap_or(self.src.len());
        SyntaxError::at(self.src, offset, message)
    }

    fn expect_ident(&mut self, context: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                let name = t.text.to_string();
                self.pos += 1;
                Ok(name)
            }
            Some(t) => Err(self.error(format!(
                "expected identifier in {}, found `{}`",
                context, t.text
            ))),
            None => Err(self.error(format!("unexpected end of input in {}", context))),
        }
    }

    fn expect_specifier(&mut self, context: &str) -> Result<(String, String), SyntaxError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Str => {
                let raw = t.text.to_string();
                let value = t.string_value().unwrap_or_default();
                self.pos += 1;
                Ok((value, raw))
            }
            Some(t) => Err(self.error(format!(
                "expected module specifier in {}, found `{}`",
                context, t.text
            ))),
            None => Err(self.error(format!("unexpected end of input in {}", context))),
        }
    }

    /// Consume a trailing `;` and return the end offset of the statement.
    fn finish_statement(&mut self) -> usize {
        if let Some(t) = self.peek() {
            if t.is_punct(";") {
                let end = t.span.end;
                self.pos += 1;
                return end;
            }
        }
        self.tokens[self.pos - 1].span.end
    }

    /// Skip an `{ ... }` block starting at the current token.
    fn skip_braces(&mut self) {
        let Some(open) = self.peek() else { return };
        let depth = open.depth;
        self.pos += 1;
        while let Some(t) = self.peek() {
            let closes = t.depth == depth && t.is_punct("}");
            self.pos += 1;
            if closes {
                return;
            }
        }
    }

    /// Skip to the end of a statement we do not analyze.
    fn skip_statement(&mut self) {
        self.pos += 1;
        while let Some(t) = self.peek() {
            if t.depth == 0 {
                if t.is_punct(";") || t.is_punct("}") {
                    self.pos += 1;
                    return;
                }
                if t.newline_before && t.kind == TokenKind::Ident && STATEMENT_KEYWORDS.contains(&t.text)
                {
                    return;
                }
            }
            self.pos += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Imports
    // ---------------------------------------------------------------------

    /// Record `import("x")` and `require("x")` calls with a literal specifier,
    /// wherever they appear.
    fn collect_call_imports(&mut self) {
        let mut found = Vec::new();

        for (i, window) in self.tokens.windows(4).enumerate() {
            let [callee, open, arg, close] = window else {
                continue;
            };
            let is_call = (callee.is_ident("import") || callee.is_ident("require"))
                && open.is_punct("(")
                && arg.kind == TokenKind::Str
                && (close.is_punct(")") || close.is_punct(","));
            let member = i
                .checked_sub(1)
                .and_then(|p| self.tokens.get(p))
                .is_some_and(|t| t.is_punct(".") || t.is_punct("?."));

            if is_call && !member {
                found.push(ImportDecl {
                    specifier: arg.string_value().unwrap_or_default(),
                    specifier_raw: arg.text.to_string(),
                    form: ImportForm::Dynamic,
                    bindings: Vec::new(),
                    type_only: false,
                    span: Span::new(callee.span.start, close.span.end),
                    line: callee.line,
                });
            }
        }

        self.module.imports.extend(found);
    }

    fn parse_import(&mut self) -> Result<(), SyntaxError> {
        let import_token = &self.tokens[self.pos];
        let (start, line) = (import_token.span.start, import_token.line);
        self.pos += 1;

        let mut bindings = Vec::new();
        let mut type_only = false;

        // import "x";
        if self.peek().is_some_and(|t| t.kind == TokenKind::Str) {
            let (specifier, specifier_raw) = self.expect_specifier("import declaration")?;
            let end = self.finish_statement();
            self.module.imports.push(ImportDecl {
                specifier,
                specifier_raw,
                form: ImportForm::Static,
                bindings,
                type_only,
                span: Span::new(start, end),
                line,
            });
            return Ok(());
        }

        if self.peek().is_some_and(|t| t.is_ident("type")) && self.type_modifier_follows() {
            type_only = true;
            self.pos += 1;
        }

        if let Some(t) = self.peek() {
            if t.kind == TokenKind::Ident && !t.is_ident("from") || self.double_from() {
                let local = t.text.to_string();

                // TypeScript `import x = require("y")` is an import-equals alias
                if self.next_is_punct("=") {
                    self.skip_statement();
                    return Ok(());
                }

                self.pos += 1;
                bindings.push(ImportBinding::Default { local });
                if self.peek().is_some_and(|t| t.is_punct(",")) {
                    self.pos += 1;
                }
            }
        }

        match self.peek() {
            Some(t) if t.is_punct("*") => {
                self.pos += 1;
                if !self.peek().is_some_and(|t| t.is_ident("as")) {
                    return Err(self.error("expected `as` after `*` in import declaration"));
                }
                self.pos += 1;
                let local = self.expect_ident("namespace import")?;
                bindings.push(ImportBinding::Namespace { local });
            }
            Some(t) if t.is_punct("{") => {
                for spec in self.parse_specifier_list("import declaration")? {
                    bindings.push(ImportBinding::Named {
                        local: spec.alias.unwrap_or_else(|| spec.name.clone()),
                        imported: spec.name,
                        type_only: spec.type_only,
                    });
                }
            }
            _ => {}
        }

        if !self.peek().is_some_and(|t| t.is_ident("from")) {
            return Err(match self.peek() {
                Some(t) => self.error(format!(
                    "expected `from` in import declaration, found `{}`",
                    t.text
                )),
                None => self.error("unexpected end of input in import declaration"),
            });
        }
        self.pos += 1;

        let (specifier, specifier_raw) = self.expect_specifier("import declaration")?;
        self.skip_import_attributes();
        let end = self.finish_statement();

        self.module.imports.push(ImportDecl {
            specifier,
            specifier_raw,
            form: ImportForm::Static,
            bindings,
            type_only,
            span: Span::new(start, end),
            line,
        });

        Ok(())
    }

    /// `import type X from`, `import type { ... }` and `import type * as`
    /// use `type` as a modifier; `import type from "x"` binds `type`.
    fn type_modifier_follows(&self) -> bool {
        match self.peek_at(1) {
            Some(t) if t.is_punct("{") || t.is_punct("*") => true,
            Some(t) if t.is_ident("from") => self.peek_at(2).is_some_and(|n| n.is_ident("from")),
            Some(t) => t.kind == TokenKind::Ident,
            None => false,
        }
    }

    /// `import from from "x"` binds a default named `from`.
    fn double_from(&self) -> bool {
        self.peek().is_some_and(|t| t.is_ident("from"))
            && self.peek_at(1).is_some_and(|t| t.is_ident("from"))
    }

    /// `with { type: "json" }` / `assert { ... }` after a specifier.
    fn skip_import_attributes(&mut self) {
        let is_attributes = self
            .peek()
            .is_some_and(|t| (t.is_ident("with") || t.is_ident("assert")) && !t.newline_before)
            && self.next_is_punct("{");

        if is_attributes {
            self.pos += 1;
            self.skip_braces();
        }
    }

    fn parse_specifier_list(&mut self, context: &str) -> Result<Vec<ListSpecifier>, SyntaxError> {
        // Current token is `{`
        self.pos += 1;
        let mut specifiers = Vec::new();

        loop {
            let Some(t) = self.peek() else {
                return Err(self.error(format!("unexpected end of input in {}", context)));
            };
            if t.is_punct("}") {
                self.pos += 1;
                return Ok(specifiers);
            }

            let mut type_only = false;
            if t.is_ident("type") {
                let modifier = self.peek_at(1).is_some_and(|n| {
                    (n.kind == TokenKind::Ident && !n.is_ident("as")) || n.kind == TokenKind::Str
                });
                if modifier {
                    type_only = true;
                    self.pos += 1;
                }
            }

            let name = self.specifier_name(context)?;
            let alias = if self.peek().is_some_and(|t| t.is_ident("as")) {
                self.pos += 1;
                Some(self.specifier_name(context)?)
            } else {
                None
            };

            specifiers.push(ListSpecifier {
                name,
                alias,
                type_only,
            });

            match self.peek() {
                Some(t) if t.is_punct(",") => self.pos += 1,
                Some(t) if t.is_punct("}") => {}
                Some(t) => {
                    return Err(self.error(format!(
                        "expected `,` or `}}` in {}, found `{}`",
                        context, t.text
                    )))
                }
                None => return Err(self.error(format!("unexpected end of input in {}", context))),
            }
        }
    }

    fn specifier_name(&mut self, context: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Str => {
                let name = t.string_value().unwrap_or_default();
                self.pos += 1;
                Ok(name)
            }
            _ => self.expect_ident(context),
        }
    }

    // ---------------------------------------------------------------------
    // Exports
    // ---------------------------------------------------------------------

    fn parse_export(&mut self) -> Result<(), SyntaxError> {
        let export_token = &self.tokens[self.pos];
        let (start, line) = (export_token.span.start, export_token.line);
        self.pos += 1;

        let Some(next) = self.peek() else {
            return Err(self.error("unexpected end of input after `export`"));
        };

        match next.kind {
            TokenKind::Ident => match next.text {
                "default" => self.parse_default_export(start, line),
                "type" => {
                    // `export type { T }`, `export type * from`, `export type T = ...`
                    if self.next_is_punct("{") {
                        self.pos += 1;
                        self.parse_specifier_list("export declaration")?;
                        if self.peek().is_some_and(|t| t.is_ident("from")) {
                            self.pos += 1;
                            self.expect_specifier("export declaration")?;
                        }
                        self.finish_statement();
                    } else {
                        self.skip_statement();
                    }
                    Ok(())
                }
                "interface" | "declare" | "namespace" | "module" | "global" | "import" => {
                    self.skip_statement();
                    Ok(())
                }
                "abstract" => {
                    self.pos += 1;
                    if !self.peek().is_some_and(|t| t.is_ident("class")) {
                        return Err(self.error("expected `class` after `export abstract`"));
                    }
                    self.parse_exported_declaration(start)
                }
                "async" | "function" | "class" | "const" | "let" | "var" | "enum" => {
                    self.parse_exported_declaration(start)
                }
                other => Err(self.error(format!("unexpected `{}` after `export`", other))),
            },
            TokenKind::Punct if next.text == "{" => {
                let specifiers = self
                    .parse_specifier_list("export declaration")?
                    .into_iter()
                    .map(|spec| ExportSpecifier {
                        exported: spec.alias.unwrap_or_else(|| spec.name.clone()),
                        local: spec.name,
                        type_only: spec.type_only,
                    })
                    .collect();

                let from = self.parse_reexport_source(start, line)?;
                self.finish_statement();
                self.module.exports.push(ExportDecl::List {
                    specifiers,
                    from,
                    start,
                });
                Ok(())
            }
            TokenKind::Punct if next.text == "*" => {
                self.pos += 1;
                let alias = if self.peek().is_some_and(|t| t.is_ident("as")) {
                    self.pos += 1;
                    Some(self.specifier_name("export declaration")?)
                } else {
                    None
                };

                let Some(from) = self.parse_reexport_source(start, line)? else {
                    return Err(self.error("expected `from` after `export *`"));
                };
                self.finish_statement();
                self.module
                    .exports
                    .push(ExportDecl::Star { from, alias, start });
                Ok(())
            }
            TokenKind::Punct if next.text == "=" => {
                self.skip_statement();
                Ok(())
            }
            _ => Err(self.error(format!("unexpected `{}` after `export`", next.text))),
        }
    }

    /// Parse `from "x"` of a re-export and record it as an import.
    fn parse_reexport_source(
        &mut self,
        start: usize,
        line: usize,
    ) -> Result<Option<String>, SyntaxError> {
        if !self.peek().is_some_and(|t| t.is_ident("from")) {
            return Ok(None);
        }
        self.pos += 1;

        let (specifier, specifier_raw) = self.expect_specifier("export declaration")?;
        self.skip_import_attributes();
        let end = self.tokens[self.pos - 1].span.end;

        self.module.imports.push(ImportDecl {
            specifier: specifier.clone(),
            specifier_raw,
            form: ImportForm::ReExport,
            bindings: Vec::new(),
            type_only: false,
            span: Span::new(start, end),
            line,
        });

        Ok(Some(specifier))
    }

    fn parse_exported_declaration(&mut self, start: usize) -> Result<(), SyntaxError> {
        let declarations = self.parse_declaration(true)?;
        if declarations.is_empty() {
            return Err(self.error("expected a declaration after `export`"));
        }

        let names = declarations
            .iter()
            .flat_map(|d| d.names.iter().cloned())
            .collect();
        self.module.declarations.extend(declarations);
        self.module
            .exports
            .push(ExportDecl::Declaration { names, start });
        Ok(())
    }

    fn parse_default_export(&mut self, start: usize, line: usize) -> Result<(), SyntaxError> {
        let default_token = &self.tokens[self.pos];
        let keyword_span = Span::new(start, default_token.span.end);
        self.pos += 1;

        let Some(next) = self.peek() else {
            return Err(self.error("unexpected end of input after `export default`"));
        };

        let mut async_span = None;
        if next.is_ident("async") {
            if let Some(after) = self.peek_at(1) {
                let async_function = after.is_ident("function") && !after.newline_before;
                let async_arrow = after.is_punct("(")
                    || (after.kind == TokenKind::Ident
                        && self.peek_at(2).is_some_and(|t| t.is_punct("=>")));
                if async_function || async_arrow {
                    async_span = Some(Span::new(next.span.start, after.span.start));
                }
                if async_function {
                    self.pos += 1;
                }
            }
        }

        let Some(next) = self.peek() else {
            return Err(self.error("unexpected end of input after `export default`"));
        };

        let decl_start = next.span.start;
        let target = if next.is_ident("function") {
            self.pos += 1;
            if self.peek().is_some_and(|t| t.is_punct("*")) {
                self.pos += 1;
            }
            let name_insert_at = self.tokens[self.pos - 1].span.end;
            let name = self.optional_binding_name(&[]);
            self.record_default_declaration(&name, DeclKind::Function, async_span, decl_start);
            DefaultTarget::Function {
                name,
                name_insert_at,
            }
        } else if next.is_ident("class") || next.is_ident("abstract") {
            if next.is_ident("abstract") {
                self.pos += 1;
            }
            self.pos += 1;
            let name_insert_at = self.tokens[self.pos - 1].span.end;
            let name = self.optional_binding_name(&["extends", "implements"]);
            self.record_default_declaration(&name, DeclKind::Class, None, decl_start);
            DefaultTarget::Class {
                name,
                name_insert_at,
            }
        } else if next.is_ident("interface") {
            self.skip_statement();
            return Ok(());
        } else if next.kind == TokenKind::Ident && self.ends_expression_at(self.pos + 1) {
            let name = next.text.to_string();
            self.pos += 1;
            self.finish_statement();
            DefaultTarget::Identifier(name)
        } else {
            DefaultTarget::Expression
        };

        self.module.exports.push(ExportDecl::Default(DefaultExport {
            target,
            keyword_span,
            async_span,
            line,
        }));
        Ok(())
    }

    fn optional_binding_name(&mut self, reserved: &[&str]) -> Option<String> {
        let t = self.peek()?;
        if t.kind == TokenKind::Ident && !reserved.contains(&t.text) {
            let name = t.text.to_string();
            self.pos += 1;
            Some(name)
        } else {
            None
        }
    }

    fn record_default_declaration(
        &mut self,
        name: &Option<String>,
        kind: DeclKind,
        async_span: Option<Span>,
        start: usize,
    ) {
        if let Some(name) = name {
            self.module.declarations.push(Declaration {
                names: vec![name.clone()],
                kind,
                exported: true,
                async_span,
                start,
            });
        }
    }

    /// Whether the expression ends right before token `index`.
    fn ends_expression_at(&self, index: usize) -> bool {
        match self.tokens.get(index) {
            None => true,
            Some(t) if t.is_punct(";") => true,
            Some(t) if t.is_punct("}") && t.depth == 0 => false,
            Some(t) => {
                t.newline_before
                    && !matches!(
                        t.text,
                        "(" | "." | "?." | "[" | "=" | "<" | "=>" | "`" | "as" | "satisfies"
                    )
                    && t.kind != TokenKind::Template
            }
        }
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    /// Parse a value declaration starting at the current token.
    ///
    /// Returns no declarations for tokens that turn out not to start one
    /// (e.g. an `async` arrow expression statement).
    fn parse_declaration(&mut self, exported: bool) -> Result<Vec<Declaration>, SyntaxError> {
        let Some(first) = self.peek() else {
            return Ok(Vec::new());
        };
        let start = first.span.start;

        let mut async_span = None;
        if first.is_ident("async") {
            let function_follows = self
                .peek_at(1)
                .is_some_and(|t| t.is_ident("function") && !t.newline_before);
            if !function_follows {
                return Ok(Vec::new());
            }
            let next_start = self.tokens[self.pos + 1].span.start;
            async_span = Some(Span::new(first.span.start, next_start));
            self.pos += 1;
        }

        let Some(keyword) = self.peek() else {
            return Ok(Vec::new());
        };

        match keyword.text {
            "function" => {
                self.pos += 1;
                if self.peek().is_some_and(|t| t.is_punct("*")) {
                    self.pos += 1;
                }
                match self.optional_binding_name(&[]) {
                    Some(name) => Ok(vec![Declaration {
                        names: vec![name],
                        kind: DeclKind::Function,
                        exported,
                        async_span,
                        start,
                    }]),
                    None if exported => Err(self.error("expected function name")),
                    None => Ok(Vec::new()),
                }
            }
            "class" => {
                self.pos += 1;
                match self.optional_binding_name(&["extends", "implements"]) {
                    Some(name) => Ok(vec![Declaration {
                        names: vec![name],
                        kind: DeclKind::Class,
                        exported,
                        async_span: None,
                        start,
                    }]),
                    None if exported => Err(self.error("expected class name")),
                    None => Ok(Vec::new()),
                }
            }
            "enum" => {
                self.pos += 1;
                let name = self.expect_ident("enum declaration")?;
                Ok(vec![Declaration {
                    names: vec![name],
                    kind: DeclKind::Enum,
                    exported,
                    async_span: None,
                    start,
                }])
            }
            "const" if self.peek_at(1).is_some_and(|t| t.is_ident("enum")) => {
                self.pos += 2;
                let name = self.expect_ident("enum declaration")?;
                Ok(vec![Declaration {
                    names: vec![name],
                    kind: DeclKind::Enum,
                    exported,
                    async_span: None,
                    start,
                }])
            }
            "const" | "let" | "var" => {
                let binding_follows = self.peek_at(1).is_some_and(|t| {
                    t.kind == TokenKind::Ident || t.is_punct("{") || t.is_punct("[")
                });
                if !binding_follows {
                    if exported {
                        return Err(self.error("expected variable name"));
                    }
                    return Ok(Vec::new());
                }
                self.pos += 1;
                self.parse_declarators(exported, start)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn parse_declarators(
        &mut self,
        exported: bool,
        start: usize,
    ) -> Result<Vec<Declaration>, SyntaxError> {
        let mut declarations = Vec::new();

        loop {
            let mut names = Vec::new();
            let decl_start = if declarations.is_empty() {
                start
            } else {
                self.peek().map(|t| t.span.start).unwrap_or(start)
            };

            match self.peek() {
                Some(t) if t.kind == TokenKind::Ident => {
                    names.push(t.text.to_string());
                    self.pos += 1;
                }
                Some(t) if t.is_punct("{") || t.is_punct("[") => {
                    self.collect_pattern_names(&mut names);
                }
                Some(t) => {
                    return Err(self.error(format!("expected variable name, found `{}`", t.text)))
                }
                None => return Err(self.error("unexpected end of input in variable declaration")),
            }

            let mut async_span = None;
            let mut next_declarator = false;

            while let Some(t) = self.peek() {
                if t.depth == 0 {
                    if t.is_punct(";") {
                        self.pos += 1;
                        break;
                    }
                    if t.is_punct("=") && async_span.is_none() {
                        if let (Some(a), Some(after)) = (self.peek_at(1), self.peek_at(2)) {
                            if a.is_ident("async") && !after.newline_before {
                                async_span = Some(Span::new(a.span.start, after.span.start));
                            }
                        }
                    }
                    if t.is_punct(",") && self.declarator_follows() {
                        self.pos += 1;
                        next_declarator = true;
                        break;
                    }
                    if t.newline_before
                        && t.kind == TokenKind::Ident
                        && STATEMENT_KEYWORDS.contains(&t.text)
                    {
                        break;
                    }
                    if t.newline_before && t.is_ident("async") {
                        break;
                    }
                }
                self.pos += 1;
            }

            declarations.push(Declaration {
                names,
                kind: DeclKind::Variable,
                exported,
                async_span,
                start: decl_start,
            });

            if !next_declarator {
                return Ok(declarations);
            }
        }
    }

    /// After a top-level `,`: does another declarator start here?
    fn declarator_follows(&self) -> bool {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some(t), _) if t.is_punct("{") || t.is_punct("[") => true,
            (Some(t), Some(after)) if t.kind == TokenKind::Ident => {
                after.is_punct("=") || after.is_punct(":") || after.is_punct(";")
            }
            (Some(t), None) => t.kind == TokenKind::Ident,
            _ => false,
        }
    }

    /// Collect binding names from a destructuring pattern.
    fn collect_pattern_names(&mut self, out: &mut Vec<String>) {
        let Some(open) = self.peek() else { return };
        let is_object = open.is_punct("{");
        let outer = open.depth;
        let inner = outer + 1;
        self.pos += 1;

        let mut expect_binding = true;
        while let Some(t) = self.peek() {
            if t.depth == outer && (t.is_punct("}") || t.is_punct("]")) {
                self.pos += 1;
                return;
            }

            if t.depth == inner && expect_binding {
                if t.is_punct(",") {
                    self.pos += 1;
                    continue;
                }
                if t.is_punct("...") {
                    self.pos += 1;
                    continue;
                }

                let is_key = is_object
                    && matches!(t.kind, TokenKind::Ident | TokenKind::Str | TokenKind::Number)
                    && self.next_is_punct(":");
                if is_key {
                    self.pos += 2;
                    match self.peek() {
                        Some(v) if v.kind == TokenKind::Ident => {
                            out.push(v.text.to_string());
                            self.pos += 1;
                        }
                        Some(v) if v.is_punct("{") || v.is_punct("[") => {
                            self.collect_pattern_names(out);
                        }
                        _ => {}
                    }
                    expect_binding = false;
                    continue;
                }

                if t.kind == TokenKind::Ident {
                    out.push(t.text.to_string());
                    self.pos += 1;
                    expect_binding = false;
                    continue;
                }

                if t.is_punct("{") || t.is_punct("[") {
                    self.collect_pattern_names(out);
                    expect_binding = false;
                    continue;
                }
            }

            if t.depth == inner && t.is_punct(",") {
                expect_binding = true;
            }
            self.pos += 1;
        }
    }
}

struct ListSpecifier {
    name: String,
    alias: Option<String>,
    type_only: bool,
}

fn is_continuation(prev: &Token<'_>) -> bool {
    match prev.kind {
        TokenKind::Punct => matches!(
            prev.text,
            "=" | "(" | "[" | "{" | "," | "." | "?." | ":" | "?" | "+" | "-" | "*" | "/" | "%"
                | "&" | "|" | "^" | "!" | "~" | "<" | ">" | "=>" | "..."
        ),
        TokenKind::Ident => CONTINUATION_KEYWORDS.contains(&prev.text),
        _ => false,
    }
}
