//! Derive macros for the gridpack compact serialization format.

mod compact;

use proc_macro::TokenStream;

/// Derives `gridpack_core::Compact` for a struct with named fields.
///
/// Field order in the struct decides nothing: the schema layout is
/// derived from field names and kinds. Supported attributes:
///
/// - `#[compact(type_name = "...")]` on the struct sets the wire type
///   name (defaults to the struct name).
/// - `#[compact(field_name = "...")]` on a field sets its wire name.
/// - `#[compact(skip)]` excludes a field; it is filled from `Default`
///   on read.
#[proc_macro_derive(Compact, attributes(compact))]
pub fn derive_compact(input: TokenStream) -> TokenStream {
    compact::derive_compact_impl(input)
}
