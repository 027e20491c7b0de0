//! reflect_fn attribute macro implementation
//!
//! Keeps the function as written and adds a `{name}_register` helper that
//! binds it into a registry.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse::Parse, parse::ParseStream, FnArg, Ident, ItemFn, LitStr, Token, Type};

/// Arguments to the reflect_fn attribute
///
/// Usage:
/// - `#[reflect_fn]` - static function of the global namespace
/// - `#[reflect_fn("area", method)]` - method of the first parameter's type
/// - `#[reflect_fn("dot", class = "math")]` - static function of a class or namespace
#[derive(Default)]
pub struct ReflectFnArgs {
    /// Reflected name, defaults to the function name
    pub name: Option<LitStr>,
    pub method: bool,
    pub class: Option<LitStr>,
}

impl Parse for ReflectFnArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = Self::default();
        if input.peek(LitStr) {
            args.name = Some(input.parse()?);
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            if ident == "method" {
                args.method = true;
            } else if ident == "class" {
                input.parse::<Token![=]>()?;
                args.class = Some(input.parse()?);
            } else {
                return Err(syn::Error::new(ident.span(), "expected `method` or `class`"));
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        if args.method && args.class.is_some() {
            return Err(input.error("`method` and `class` cannot be combined"));
        }
        Ok(args)
    }
}

/// Type behind the `&T` / `&mut T` first parameter
fn receiver_type(func: &ItemFn) -> syn::Result<&Type> {
    let receiver = func.sig.inputs.first().and_then(|arg| match arg {
        FnArg::Typed(pat) => match pat.ty.as_ref() {
            Type::Reference(reference) => Some(reference.elem.as_ref()),
            _ => None,
        },
        FnArg::Receiver(_) => None,
    });
    receiver.ok_or_else(|| {
        syn::Error::new_spanned(
            &func.sig,
            "a reflected method takes its receiver as `&T` or `&mut T` first",
        )
    })
}

/// Generate the reflect_fn implementation
pub fn generate_reflect_fn(args: ReflectFnArgs, func: ItemFn) -> TokenStream {
    let fn_name = &func.sig.ident;
    let fn_vis = &func.vis;

    let reflected = args
        .name
        .as_ref()
        .map(LitStr::value)
        .unwrap_or_else(|| fn_name.to_string());
    let register_fn_name = format_ident!("{}_register", fn_name);

    let registration = if args.method {
        let receiver = match receiver_type(&func) {
            Ok(ty) => ty,
            Err(e) => return e.to_compile_error(),
        };
        quote! {
            registry.add_method::<#receiver, _, _>(#reflected, #fn_name)
        }
    } else {
        let class = args
            .class
            .as_ref()
            .map(LitStr::value)
            .unwrap_or_default();
        quote! {
            registry.add_static_method(
                ::reflkit_core::TypeIdentity::raw(#class),
                #reflected,
                #fn_name,
            )
        }
    };

    quote! {
        #func

        /// Register this function with `registry`
        #fn_vis fn #register_fn_name(
            registry: &::reflkit_core::Registry,
        ) -> ::reflkit_core::MethodKey {
            #registration
        }
    }
}
