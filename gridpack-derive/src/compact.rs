//! Derive macro implementation for `Compact`.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit};

pub fn derive_compact_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name =
        parse_attr_value(&input.attrs, "type_name").unwrap_or_else(|| name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("Compact only supports structs with named fields"),
        },
        _ => panic!("Compact can only be derived for structs"),
    };

    let mut write_stmts = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_ty = &field.ty;

        if has_skip_attr(&field.attrs) {
            field_inits.push(quote! { #field_ident: Default::default() });
            continue;
        }

        let wire_name =
            parse_attr_value(&field.attrs, "field_name").unwrap_or_else(|| field_ident.to_string());

        write_stmts.push(generate_write_stmt(field_ident, field_ty, &wire_name));
        let read_expr = generate_read_expr(field_ty, &wire_name);
        field_inits.push(quote! { #field_ident: #read_expr });
    }

    let expanded = quote! {
        impl #impl_generics gridpack_core::Compact for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn write<W: gridpack_core::CompactWriter>(
                &self,
                writer: &mut W,
            ) -> gridpack_core::Result<()> {
                #(#write_stmts)*
                Ok(())
            }

            fn read<R: gridpack_core::CompactReader>(
                reader: &mut R,
            ) -> gridpack_core::Result<Self> {
                Ok(Self {
                    #(#field_inits,)*
                })
            }
        }
    };

    TokenStream::from(expanded)
}

/// Maps a primitive Rust type name to its wire method suffix.
fn primitive_suffix(ty: &str) -> Option<&'static str> {
    match ty {
        "bool" => Some("boolean"),
        "i8" => Some("int8"),
        "i16" => Some("int16"),
        "i32" => Some("int32"),
        "i64" => Some("int64"),
        "f32" => Some("float32"),
        "f64" => Some("float64"),
        _ => None,
    }
}

/// Maps a naturally nullable type name to its wire method suffix.
fn nullable_suffix(ty: &str) -> Option<&'static str> {
    match ty {
        "String" => Some("string"),
        "Decimal" => Some("decimal"),
        "NaiveTime" => Some("time"),
        "NaiveDate" => Some("date"),
        "NaiveDateTime" => Some("timestamp"),
        "DateTime<FixedOffset>" => Some("timestamp_with_timezone"),
        _ => None,
    }
}

fn generate_write_stmt(
    field_ident: &syn::Ident,
    field_ty: &syn::Type,
    wire_name: &str,
) -> proc_macro2::TokenStream {
    let ty_str = type_to_string(field_ty);
    if let Some(suffix) = primitive_suffix(&ty_str) {
        let method = format_ident!("write_{}", suffix);
        return quote! { writer.#method(#wire_name, self.#field_ident)?; };
    }
    if ty_str == "String" {
        return quote! { writer.write_string(#wire_name, Some(&self.#field_ident))?; };
    }
    if let Some(suffix) = nullable_suffix(&ty_str) {
        let method = format_ident!("write_{}", suffix);
        return quote! { writer.#method(#wire_name, Some(self.#field_ident))?; };
    }
    if let Some(inner) = strip_wrapper(&ty_str, "Option<") {
        if inner == "String" {
            return quote! { writer.write_string(#wire_name, self.#field_ident.as_deref())?; };
        }
        if let Some(suffix) = nullable_suffix(&inner) {
            let method = format_ident!("write_{}", suffix);
            return quote! { writer.#method(#wire_name, self.#field_ident)?; };
        }
        if let Some(vec_inner) = strip_wrapper(&inner, "Vec<") {
            if let Some(suffix) = primitive_suffix(&vec_inner) {
                let method = format_ident!("write_array_of_{}", suffix);
                return quote! { writer.#method(#wire_name, self.#field_ident.as_deref())?; };
            }
            if let Some(suffix) = strip_wrapper(&vec_inner, "Option<").and_then(|e| {
                nullable_suffix(&e)
            }) {
                let method = format_ident!("write_array_of_{}", suffix);
                return quote! { writer.#method(#wire_name, self.#field_ident.as_deref())?; };
            }
            if let Some(suffix) = nullable_suffix(&vec_inner) {
                let method = format_ident!("write_array_of_{}", suffix);
                let to_owned_elem = elem_to_option(&vec_inner);
                return quote! {
                    {
                        let items = self
                            .#field_ident
                            .as_ref()
                            .map(|items| {
                                items.iter().#to_owned_elem.map(Some).collect::<Vec<_>>()
                            });
                        writer.#method(#wire_name, items.as_deref())?;
                    }
                };
            }
            return quote! {
                writer.write_array_of_compact(#wire_name, self.#field_ident.as_deref())?;
            };
        }
        return quote! { writer.write_compact(#wire_name, self.#field_ident.as_ref())?; };
    }
    if let Some(inner) = strip_wrapper(&ty_str, "Vec<") {
        if let Some(suffix) = primitive_suffix(&inner) {
            let method = format_ident!("write_array_of_{}", suffix);
            return quote! { writer.#method(#wire_name, Some(&self.#field_ident))?; };
        }
        if let Some(suffix) =
            strip_wrapper(&inner, "Option<").and_then(|e| nullable_suffix(&e))
        {
            let method = format_ident!("write_array_of_{}", suffix);
            return quote! { writer.#method(#wire_name, Some(&self.#field_ident))?; };
        }
        if let Some(suffix) = nullable_suffix(&inner) {
            let method = format_ident!("write_array_of_{}", suffix);
            let to_owned_elem = elem_to_option(&inner);
            return quote! {
                {
                    let items: Vec<_> =
                        self.#field_ident.iter().#to_owned_elem.map(Some).collect();
                    writer.#method(#wire_name, Some(&items))?;
                }
            };
        }
        return quote! { writer.write_array_of_compact(#wire_name, Some(&self.#field_ident))?; };
    }
    quote! { writer.write_compact(#wire_name, Some(&self.#field_ident))?; }
}

fn generate_read_expr(field_ty: &syn::Type, wire_name: &str) -> proc_macro2::TokenStream {
    let ty_str = type_to_string(field_ty);
    if let Some(suffix) = primitive_suffix(&ty_str) {
        let method = format_ident!("read_{}", suffix);
        return quote! { reader.#method(#wire_name)? };
    }
    if ty_str == "String" || ty_str == "Decimal" {
        let method = format_ident!(
            "read_{}",
            nullable_suffix(&ty_str).expect("nullable suffix")
        );
        return quote! { reader.#method(#wire_name)?.unwrap_or_default() };
    }
    if let Some(suffix) = nullable_suffix(&ty_str) {
        // chrono types have no Default; a null here is unrepresentable
        let method = format_ident!("read_{}", suffix);
        return quote! {
            reader.#method(#wire_name)?.ok_or_else(|| {
                gridpack_core::CompactError::Serialization(
                    format!("non-optional field '{}' was null", #wire_name),
                )
            })?
        };
    }
    if let Some(inner) = strip_wrapper(&ty_str, "Option<") {
        if let Some(suffix) = nullable_suffix(&inner) {
            let method = format_ident!("read_{}", suffix);
            return quote! { reader.#method(#wire_name)? };
        }
        if let Some(vec_inner) = strip_wrapper(&inner, "Vec<") {
            if let Some(suffix) = primitive_suffix(&vec_inner) {
                let method = format_ident!("read_array_of_{}", suffix);
                return quote! { reader.#method(#wire_name)? };
            }
            if let Some(suffix) = strip_wrapper(&vec_inner, "Option<").and_then(|e| {
                nullable_suffix(&e)
            }) {
                let method = format_ident!("read_array_of_{}", suffix);
                return quote! { reader.#method(#wire_name)? };
            }
            if let Some(suffix) = nullable_suffix(&vec_inner) {
                let method = format_ident!("read_array_of_{}", suffix);
                let unwrap_elems = unwrap_array_elements(wire_name);
                return quote! {
                    match reader.#method(#wire_name)? {
                        Some(items) => Some(#unwrap_elems),
                        None => None,
                    }
                };
            }
            let element_ty = parse_type(&vec_inner);
            return quote! { reader.read_array_of_compact::<#element_ty>(#wire_name)? };
        }
        let inner_ty = parse_type(&inner);
        return quote! { reader.read_compact::<#inner_ty>(#wire_name)? };
    }
    if let Some(inner) = strip_wrapper(&ty_str, "Vec<") {
        if let Some(suffix) = primitive_suffix(&inner) {
            let method = format_ident!("read_array_of_{}", suffix);
            return quote! { reader.#method(#wire_name)?.unwrap_or_default() };
        }
        if let Some(suffix) =
            strip_wrapper(&inner, "Option<").and_then(|e| nullable_suffix(&e))
        {
            let method = format_ident!("read_array_of_{}", suffix);
            return quote! { reader.#method(#wire_name)?.unwrap_or_default() };
        }
        if let Some(suffix) = nullable_suffix(&inner) {
            let method = format_ident!("read_array_of_{}", suffix);
            let unwrap_elems = unwrap_array_elements(wire_name);
            return quote! {
                {
                    let items = reader.#method(#wire_name)?.unwrap_or_default();
                    #unwrap_elems
                }
            };
        }
        let element_ty = parse_type(&inner);
        return quote! {
            reader.read_array_of_compact::<#element_ty>(#wire_name)?.unwrap_or_default()
        };
    }
    quote! {
        reader.read_compact::<#field_ty>(#wire_name)?.ok_or_else(|| {
            gridpack_core::CompactError::Serialization(
                format!("non-optional field '{}' was null", #wire_name),
            )
        })?
    }
}

/// Adapter turning `iter()` elements into owned values for the nullable
/// array writers. Strings clone; the other nullable scalars are `Copy`.
fn elem_to_option(elem: &str) -> proc_macro2::TokenStream {
    if elem == "String" {
        quote! { cloned() }
    } else {
        quote! { copied() }
    }
}

/// Expression collapsing `items: Vec<Option<T>>` into `Vec<T>`, failing
/// on null elements. Used for non-optional element declarations.
fn unwrap_array_elements(wire_name: &str) -> proc_macro2::TokenStream {
    quote! {
        {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(item.ok_or_else(|| {
                    gridpack_core::CompactError::Serialization(format!(
                        "null element in non-optional array field '{}'",
                        #wire_name
                    ))
                })?);
            }
            values
        }
    }
}

fn type_to_string(ty: &syn::Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

fn parse_type(s: &str) -> syn::Type {
    syn::parse_str(s).unwrap_or_else(|_| panic!("unsupported field type: {s}"))
}

fn strip_wrapper(s: &str, prefix: &str) -> Option<String> {
    if s.starts_with(prefix) && s.ends_with('>') {
        Some(s[prefix.len()..s.len() - 1].to_string())
    } else {
        None
    }
}

fn parse_attr_value(attrs: &[syn::Attribute], key: &str) -> Option<String> {
    for attr in attrs {
        if !attr.path().is_ident("compact") {
            continue;
        }
        let mut result = None;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let value = meta.value()?;
                let lit: Lit = value.parse()?;
                if let Lit::Str(s) = lit {
                    result = Some(s.value());
                }
            }
            Ok(())
        });
        if result.is_some() {
            return result;
        }
    }
    None
}

fn has_skip_attr(attrs: &[syn::Attribute]) -> bool {
    for attr in attrs {
        if !attr.path().is_ident("compact") {
            continue;
        }
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                found = true;
            }
            Ok(())
        });
        if found {
            return true;
        }
    }
    false
}
