//! Attribute parsing for the Reflect derive macro

use darling::util::Override;
use darling::{FromDeriveInput, FromField, FromMeta};
use syn::{DeriveInput, Generics, Ident, Type};

/// One `tag(key = "..", value = "..")` entry
#[derive(Debug, Clone, FromMeta)]
pub struct TagArg {
    pub key: String,
    pub value: String,
}

/// Parsed #[reflect(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(reflect), supports(struct_named))]
pub struct ReflectClassArgs {
    /// Struct identifier
    pub ident: Ident,

    pub generics: Generics,

    /// Struct fields
    pub data: darling::ast::Data<(), ReflectFieldArgs>,

    /// Extra name the class is constructible under
    #[darling(default, rename = "class")]
    pub class_name: Option<String>,

    #[darling(default, multiple, rename = "tag")]
    pub tags: Vec<TagArg>,
}

/// Parsed #[reflect(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(reflect))]
pub struct ReflectFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Reflected field, optionally under another name
    #[darling(default)]
    pub field: Option<Override<String>>,

    /// Embedded base class
    #[darling(default)]
    pub base: bool,

    #[darling(default, multiple, rename = "tag")]
    pub tags: Vec<TagArg>,
}

impl ReflectFieldArgs {
    /// Name the field is reflected under, if it is reflected at all
    pub fn reflected_name(&self) -> Option<String> {
        let ident = self.ident.as_ref()?;
        match self.field.as_ref()? {
            Override::Inherit => Some(ident.to_string()),
            Override::Explicit(name) => Some(name.clone()),
        }
    }
}

/// Parse a DeriveInput into ReflectClassArgs
pub fn parse_reflect_class(input: &DeriveInput) -> darling::Result<ReflectClassArgs> {
    ReflectClassArgs::from_derive_input(input)
}
