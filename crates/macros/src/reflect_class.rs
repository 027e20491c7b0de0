//! Reflect derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::DeriveInput;

use crate::parse::{parse_reflect_class, ReflectClassArgs, ReflectFieldArgs, TagArg};

/// Generate the Reflect implementation
pub fn derive_reflect(input: DeriveInput) -> TokenStream {
    match parse_reflect_class(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn tag_chain(tags: &[TagArg]) -> TokenStream {
    let calls = tags.iter().map(|tag| {
        let key = &tag.key;
        let value = &tag.value;
        quote! { .tag(#key, [#value]) }
    });
    quote! { #(#calls)* }
}

fn generate_impl(args: ReflectClassArgs) -> TokenStream {
    let struct_name = &args.ident;

    if !args.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &args.generics,
            "Reflect cannot be derived for generic structs",
        )
        .to_compile_error();
    }

    let fields = match args.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        _ => {
            return syn::Error::new_spanned(&args.ident, "Reflect can only be derived for structs")
                .to_compile_error()
        }
    };

    let class_tags = tag_chain(&args.tags);
    let register_class = match &args.class_name {
        Some(name) => quote! {
            let ty = registry.register_class_as::<#struct_name>(#name, tags);
        },
        None => quote! {
            let ty = registry.register_class::<#struct_name>(tags);
        },
    };

    let field_registrations: Vec<_> = fields
        .iter()
        .filter(|f| f.reflected_name().is_some())
        .map(|f| generate_field(struct_name, f))
        .collect();

    let base_registrations: Vec<_> = fields
        .iter()
        .filter(|f| f.base)
        .map(|f| generate_base(struct_name, f))
        .collect();

    quote! {
        impl ::reflkit_core::Reflect for #struct_name {
            fn register(registry: &::reflkit_core::Registry) -> ::reflkit_core::TypeIdentity {
                let tags = ::reflkit_core::MemberInfo::new("")#class_tags.tags;
                #register_class
                #(#base_registrations)*
                #(#field_registrations)*
                ty
            }
        }
    }
}

fn generate_field(struct_name: &syn::Ident, field: &ReflectFieldArgs) -> TokenStream {
    let Some(field_ident) = field.ident.as_ref() else {
        return TokenStream::new();
    };
    let field_ty = &field.ty;
    let name = field.reflected_name().unwrap_or_default();
    let tags = tag_chain(&field.tags);
    let getter = format_ident!("__reflect_field_{}", field_ident);

    quote! {
        fn #getter(value: &mut #struct_name) -> &mut #field_ty {
            &mut value.#field_ident
        }
        registry.add_field::<#struct_name, #field_ty>(
            ::reflkit_core::MemberInfo::new(#name)#tags,
            #getter,
        );
    }
}

fn generate_base(struct_name: &syn::Ident, field: &ReflectFieldArgs) -> TokenStream {
    let Some(field_ident) = field.ident.as_ref() else {
        return TokenStream::new();
    };
    let field_ty = &field.ty;
    let cast = format_ident!("__reflect_base_{}", field_ident);

    quote! {
        fn #cast(value: &mut #struct_name) -> &mut #field_ty {
            &mut value.#field_ident
        }
        registry.declare_inheritance::<#struct_name, #field_ty>(#cast);
    }
}
