//! DSL AST types and `syn::parse::Parse` implementations.

use proc_macro2::TokenStream;
use syn::parse::{Parse, ParseStream};
use syn::{braced, Ident, LitStr, Pat, Result, Stmt, Token};

// ============================================================================
// AST types
// ============================================================================

/// Top-level suite — a list of DSL items.
#[derive(Debug)]
pub struct Suite {
    pub items: Vec<DslItem>,
}

/// A single DSL node.
#[derive(Debug)]
pub enum DslItem {
    Describe(DescribeBlock),
    It(ItBlock),
    Hook(HookBlock),
    Let(LetBinding),
}

/// `describe "name" { ... }` / `context "name" { ... }`, or the skipped
/// `xdescribe` / `xcontext`.
#[derive(Debug)]
pub struct DescribeBlock {
    pub name: LitStr,
    pub skipped: bool,
    pub items: Vec<DslItem>,
}

/// `it "name" { ... }` / `specify "name" { ... }`, or the pending
/// `xit` / `xspecify`.
#[derive(Debug)]
pub struct ItBlock {
    pub name: LitStr,
    pub pending: bool,
    pub body: TokenStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    BeforeEach,
    AfterEach,
    BeforeAll,
    AfterAll,
}

/// `before_each { ... }` / `after_each { ... }` / `before_all { ... }` / `after_all { ... }`
#[derive(Debug)]
pub struct HookBlock {
    pub kind: HookKind,
    pub body: TokenStream,
}

/// `let name = expr;` at suite level. The value is cloned into every hook
/// and test declared after it in the same suite or below.
#[derive(Debug)]
pub struct LetBinding {
    pub ident: Ident,
    pub stmt: Stmt,
}

// ============================================================================
// Parsing
// ============================================================================

impl Parse for Suite {
    fn parse(input: ParseStream) -> Result<Self> {
        let items = parse_items(input)?;
        Ok(Suite { items })
    }
}

/// Parse a sequence of DSL items until the stream is exhausted.
fn parse_items(input: ParseStream) -> Result<Vec<DslItem>> {
    let mut items = Vec::new();
    while !input.is_empty() {
        items.push(input.parse::<DslItem>()?);
    }
    Ok(items)
}

impl Parse for DslItem {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(Token![let]) {
            return Ok(DslItem::Let(parse_let(input)?));
        }

        let ident: Ident = input.parse()?;
        let name = ident.to_string();

        match name.as_str() {
            // Container blocks
            "describe" | "context" => Ok(DslItem::Describe(parse_describe_block(input, false)?)),
            "xdescribe" | "xcontext" => Ok(DslItem::Describe(parse_describe_block(input, true)?)),

            // Spec blocks
            "it" | "specify" => Ok(DslItem::It(parse_it_block(input, false)?)),
            "xit" | "xspecify" => Ok(DslItem::It(parse_it_block(input, true)?)),

            // Hooks
            "before_each" => Ok(DslItem::Hook(parse_hook_block(input, HookKind::BeforeEach)?)),
            "after_each" => Ok(DslItem::Hook(parse_hook_block(input, HookKind::AfterEach)?)),
            "before_all" => Ok(DslItem::Hook(parse_hook_block(input, HookKind::BeforeAll)?)),
            "after_all" => Ok(DslItem::Hook(parse_hook_block(input, HookKind::AfterAll)?)),

            _ => Err(syn::Error::new(
                ident.span(),
                format!(
                    "unknown DSL keyword `{name}`. Expected one of: \
                     describe, context, it, specify, before_each, after_each, \
                     before_all, after_all, let \
                     (with optional x prefix for skipped/pending)"
                ),
            )),
        }
    }
}

// ============================================================================
// Block parsers
// ============================================================================

/// Parse: `"name" { items... }`
fn parse_describe_block(input: ParseStream, skipped: bool) -> Result<DescribeBlock> {
    let name: LitStr = input.parse()?;
    let content;
    braced!(content in input);
    let items = parse_items(&content)?;
    Ok(DescribeBlock {
        name,
        skipped,
        items,
    })
}

/// Parse: `"name" { body }`
fn parse_it_block(input: ParseStream, pending: bool) -> Result<ItBlock> {
    let name: LitStr = input.parse()?;
    let body_content;
    braced!(body_content in input);
    let body: TokenStream = body_content.parse()?;
    Ok(ItBlock {
        name,
        pending,
        body,
    })
}

/// Parse: `{ body }`
fn parse_hook_block(input: ParseStream, kind: HookKind) -> Result<HookBlock> {
    let content;
    braced!(content in input);
    let body: TokenStream = content.parse()?;
    Ok(HookBlock { kind, body })
}

/// Parse: `let ident [: Type] = expr;`
fn parse_let(input: ParseStream) -> Result<LetBinding> {
    let stmt: Stmt = input.parse()?;
    let Stmt::Local(local) = &stmt else {
        return Err(input.error("expected a `let` binding"));
    };
    let pat = match &local.pat {
        Pat::Type(typed) => &*typed.pat,
        other => other,
    };
    let ident = match pat {
        Pat::Ident(binding) => binding.ident.clone(),
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "suite-level `let` must bind a single name",
            ))
        }
    };
    if local.init.is_none() {
        return Err(syn::Error::new_spanned(&local.pat, "suite-level `let` needs a value"));
    }
    Ok(LetBinding { ident, stmt })
}
