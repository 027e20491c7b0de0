//! reflkit Proc Macros
//!
//! This crate provides the registration macros for reflkit:
//!
//! - `#[derive(Reflect)]` - Register a struct, its fields and its bases
//! - `#[reflect_fn]` - Bind a function as a method or static function
//!
//! # Reflect Example
//!
//! ```ignore
//! use reflkit_core::{Reflect, Registry};
//!
//! #[derive(Default, Reflect)]
//! #[reflect(class = "Shape")]
//! pub struct Shape {
//!     #[reflect(field)]
//!     sides: i32,
//! }
//!
//! #[derive(Default, Reflect)]
//! #[reflect(class = "Square", tag(key = "kind", value = "polygon"))]
//! pub struct Square {
//!     #[reflect(base)]
//!     shape: Shape,
//!
//!     #[reflect(field = "length")]
//!     side_length: f64,
//! }
//!
//! let registry = Registry::with_builtins();
//! registry.reflect::<Shape>();
//! registry.reflect::<Square>();
//! let square = registry.new_by_name("Square", &[]);
//! ```
//!
//! # reflect_fn Example
//!
//! ```ignore
//! use reflkit_core::reflect_fn;
//!
//! #[reflect_fn("area", method)]
//! fn square_area(square: &Square) -> f64 {
//!     square.side_length * square.side_length
//! }
//!
//! #[reflect_fn("clamp", class = "math")]
//! fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
//!     x.max(lo).min(hi)
//! }
//!
//! // Generated:
//! // - square_area_register(&Registry) -> MethodKey
//! // - clamp_register(&Registry) -> MethodKey
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes (Reflect)
//!
//! - `#[reflect(class = "Name")]` - Optional. Also constructible under this name.
//! - `#[reflect(tag(key = "k", value = "v"))]` - Class tag, may repeat.
//!
//! ## Field Attributes (Reflect)
//!
//! - `#[reflect(field)]` - Reflect the field under its own name.
//! - `#[reflect(field = "name")]` - Reflect the field under another name.
//! - `#[reflect(base)]` - The field is an embedded base class.
//! - `#[reflect(tag(key = "k", value = "v"))]` - Field tag, may repeat.

mod parse;
mod reflect_class;
mod reflect_fn;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemFn};

/// Derive macro for class registration
///
/// Implements `reflkit_core::Reflect`. The struct must implement
/// `Default`, which becomes its reflected constructor.
///
/// # Generated Code
///
/// `Reflect::register` does, in order:
///
/// - registers the class (and its `class` alias, if given)
/// - declares every `base` field as a base class, in field order
/// - registers every `field` with a write-through accessor
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect_class::derive_reflect(input).into()
}

/// Attribute macro for function registration
///
/// # Arguments
///
/// - Optional first argument: reflected name (defaults to the function name)
/// - `method` - Bind as a method of the first parameter's referenced type
/// - `class = "Name"` - Bind as a static function of a class or namespace
///
/// With neither, the function lands in the global namespace.
///
/// # Generated Code
///
/// - The original function, unchanged
/// - `{name}_register(&Registry) -> MethodKey`
#[proc_macro_attribute]
pub fn reflect_fn(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as reflect_fn::ReflectFnArgs);
    let func = parse_macro_input!(item as ItemFn);
    reflect_fn::generate_reflect_fn(args, func).into()
}
