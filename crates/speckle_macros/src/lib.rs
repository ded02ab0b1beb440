//! Proc macros for the `speckle` test harness.

mod codegen;
mod dsl;

/// Declare a suite tree with a block DSL.
///
/// Expands to the root `speckle::SuiteNode`, the same value
/// `speckle::build` returns. Inside every test and hook body the current
/// `speckle::Spec` is bound as `spec`.
///
/// # Example
///
/// ```text
/// let tree = speckle::suite! {
///     describe "Setup And Teardown" {
///         let global_count = Rc::new(Cell::new(0));
///
///         before_each {
///             global_count.set(global_count.get() + 1);
///         }
///
///         it "counts" {
///             spec.expect(global_count.get()).to_be(1);
///         }
///
///         xit "is pending" {}
///     }
/// };
/// ```
///
/// # Supported DSL keywords
///
/// ## Containers
/// - `describe "name" { ... }` / `context "name" { ... }`
/// - `xdescribe` / `xcontext` — skipped: nothing inside runs
///
/// ## Specs
/// - `it "name" { ... }` / `specify "name" { ... }`
/// - `xit` / `xspecify` — pending
///
/// ## Lifecycle hooks
/// - `before_each { ... }` — runs before every test in this scope (and nested scopes)
/// - `after_each { ... }` — runs after every test, even when it fails
/// - `before_all { ... }` — runs once before the first test in scope
/// - `after_all { ... }` — runs once after the last test in scope
///
/// ## Shared state
/// - `let name = expr;` — evaluated once while the tree is built, then
///   cloned into every later hook and test. Use `Rc<Cell<_>>` or
///   `Rc<RefCell<_>>` for state that hooks mutate.
///
/// # Execution order
///
/// ```text
/// before_all (once per scope) -> before_each -> body -> after_each -> after_all (once per scope)
/// ```
#[proc_macro]
pub fn suite(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let suite = syn::parse_macro_input!(input as dsl::Suite);
    codegen::generate_tree(&suite).into()
}

/// Runner macro — generates a `main()` function that runs the suite and
/// prints a colored tree report.
///
/// # Setup
///
/// In `Cargo.toml`:
/// ```toml
/// [[test]]
/// name = "my_specs"
/// harness = false
/// ```
///
/// In your test file:
/// ```text
/// speckle::spec_main! {
///     describe "Calculator" {
///         it "adds" { spec.expect(2 + 3).to_be(5); }
///     }
/// }
/// ```
///
/// Run with:
/// ```sh
/// cargo test --test my_specs
/// ```
#[proc_macro]
pub fn spec_main(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let suite = syn::parse_macro_input!(input as dsl::Suite);
    codegen::generate_main(&suite).into()
}
