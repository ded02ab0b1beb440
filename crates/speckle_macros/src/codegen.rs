//! Code generation — transforms the DSL AST into `speckle::Context` calls.
//!
//! Every block becomes a closure registered on the enclosing context. Bodies
//! see the current `Spec` as `spec`; suite-level `let` bindings are cloned
//! into each closure declared after them.

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use crate::dsl::*;

// ============================================================================
// Public entry points
// ============================================================================

/// `::speckle::build(|ctx| { ... })` — evaluates to the root `SuiteNode`.
pub fn generate_tree(suite: &Suite) -> TokenStream {
    let body = generate_items(&suite.items, &[]);
    let ctx = ctx_param(&suite.items);
    quote! {
        ::speckle::build(|#ctx: &mut ::speckle::Context<'_>| { #body })
    }
}

/// `fn main()` that builds the tree and hands it to `speckle::run_suite`.
pub fn generate_main(suite: &Suite) -> TokenStream {
    let tree = generate_tree(suite);
    quote! {
        fn main() {
            ::speckle::run_suite(#tree);
        }
    }
}

// ============================================================================
// Item generation
// ============================================================================

fn generate_items(items: &[DslItem], inherited: &[Ident]) -> TokenStream {
    let mut scope = inherited.to_vec();
    let mut output = TokenStream::new();

    for item in items {
        match item {
            DslItem::Let(binding) => {
                let stmt = &binding.stmt;
                output.extend(quote! { #stmt });
                scope.retain(|name| *name != binding.ident);
                scope.push(binding.ident.clone());
            }
            DslItem::Describe(block) => {
                let name = &block.name;
                let method = if block.skipped {
                    quote! { xdescribe }
                } else {
                    quote! { describe }
                };
                let inner = generate_items(&block.items, &scope);
                let ctx = ctx_param(&block.items);
                output.extend(quote! {
                    ctx.#method(#name, |#ctx: &mut ::speckle::Context<'_>| { #inner });
                });
            }
            DslItem::It(block) => {
                let name = &block.name;
                let method = if block.pending {
                    quote! { xit }
                } else {
                    quote! { it }
                };
                let callback = spec_closure(&block.body, &scope);
                output.extend(quote! {
                    ctx.#method(#name, #callback);
                });
            }
            DslItem::Hook(hook) => {
                let method = match hook.kind {
                    HookKind::BeforeEach => quote! { before_each },
                    HookKind::AfterEach => quote! { after_each },
                    HookKind::BeforeAll => quote! { before_all },
                    HookKind::AfterAll => quote! { after_all },
                };
                let callback = spec_closure(&hook.body, &scope);
                output.extend(quote! {
                    ctx.#method(#callback);
                });
            }
        }
    }

    output
}

/// A `move |spec| { body }` closure with fresh clones of every binding in scope.
fn spec_closure(body: &TokenStream, scope: &[Ident]) -> TokenStream {
    quote! {
        {
            #(
                #[allow(unused_variables)]
                let #scope = ::std::clone::Clone::clone(&#scope);
            )*
            #[allow(unused_variables)]
            let callback = move |spec: &::speckle::Spec| { #body };
            callback
        }
    }
}

/// Name of the context parameter: `_ctx` when the block declares nothing.
fn ctx_param(items: &[DslItem]) -> Ident {
    let declares = items.iter().any(|item| !matches!(item, DslItem::Let(_)));
    let name = if declares { "ctx" } else { "_ctx" };
    Ident::new(name, proc_macro2::Span::call_site())
}
