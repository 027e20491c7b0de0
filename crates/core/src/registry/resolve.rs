//! Overload resolution
//!
//! Each candidate with the right arity is classified into a bucket by its
//! worst-matching parameter. The first candidate of the best non-empty
//! bucket wins: exact beats convertible beats generic, and within a bucket
//! the earliest registered overload wins.

use super::class::{MethodDecl, MethodDescriptor, MethodKey};
use super::{inherit, Tables};
use crate::error::{ReflectError, ReflectResult};
use crate::object::Projection;
use crate::types::{MatchMode, TypeIdentity, TypeSignature, TypeSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MatchBucket {
    /// Every argument has the parameter's exact fingerprint
    Exact,
    /// Some argument needs a qualifier relaxation or a numeric conversion
    Convertible,
    /// Some parameter is a wildcard or an unbound generic slot
    Generic,
}

pub(crate) struct FoundMethod {
    pub key: MethodKey,
    pub method: MethodDescriptor,
    /// Cast from the receiver to the declaring class
    pub cast: Option<Projection>,
}

fn classify_param(
    param: &TypeSpec,
    arg: &TypeSignature,
    class_args: &[TypeSignature],
    func_args: &[TypeSignature],
) -> Option<MatchBucket> {
    if param.has_wildcard() {
        return param
            .matches(arg, class_args, func_args, MatchMode::Template)
            .then_some(MatchBucket::Generic);
    }
    if param.matches(arg, class_args, func_args, MatchMode::Convertible) {
        let formal = TypeSpec::from(&param.apply_with(class_args, func_args));
        let exact = formal.matches(arg, &[], &[], MatchMode::Loose);
        return Some(if exact {
            MatchBucket::Exact
        } else {
            MatchBucket::Convertible
        });
    }
    (param.is_open() && param.matches(arg, class_args, func_args, MatchMode::Template))
        .then_some(MatchBucket::Generic)
}

/// Bucket of a candidate for these arguments, `None` if it does not apply
pub(crate) fn classify(
    decl: &MethodDecl,
    args: &[TypeSignature],
    class_args: &[TypeSignature],
    func_args: &[TypeSignature],
) -> Option<MatchBucket> {
    if decl.params.len() != args.len() {
        return None;
    }
    decl.params
        .iter()
        .zip(args)
        .try_fold(MatchBucket::Exact, |worst, (param, arg)| {
            classify_param(param, arg, class_args, func_args).map(|bucket| worst.max(bucket))
        })
}

/// Best overload declared directly on one class
fn find_in_class(
    tables: &Tables,
    class: u64,
    name: &str,
    args: &[TypeSignature],
    class_args: &[TypeSignature],
    func_args: &[TypeSignature],
) -> Option<MethodKey> {
    let keys = tables.overload_keys(class, name)?;
    let mut best: [Option<MethodKey>; 3] = [None; 3];
    for key in keys {
        let Some(method) = tables.methods.get(*key) else {
            continue;
        };
        let Some(bucket) = classify(&method.decl, args, class_args, func_args) else {
            continue;
        };
        let slot = &mut best[bucket as usize];
        if slot.is_none() {
            *slot = Some(*key);
        }
        if bucket == MatchBucket::Exact {
            break;
        }
    }
    best.into_iter().flatten().next()
}

/// Resolve `name` for a receiver of type `ty`, walking its bases
pub(crate) fn find_method(
    tables: &Tables,
    ty: TypeIdentity,
    name: &str,
    args: &[TypeSignature],
    class_args: &[TypeSignature],
    func_args: &[TypeSignature],
) -> ReflectResult<FoundMethod> {
    let found = inherit::walk(tables, ty, |hash| {
        find_in_class(tables, hash, name, args, class_args, func_args)
    });

    if let Some((key, cast)) = found {
        if let Some(method) = tables.methods.get(key) {
            tracing::trace!(
                "resolved {}::{} -> {}",
                ty.name(),
                name,
                method.decl.describe(method.class)
            );
            return Ok(FoundMethod {
                key,
                method: method.clone(),
                cast,
            });
        }
    }

    let exists = inherit::walk(tables, ty, |hash| {
        tables.overload_keys(hash, name).map(|_| ())
    })
    .is_some();
    if exists {
        Err(ReflectError::NoMatchingOverload {
            class: ty.name().to_string(),
            method: name.to_string(),
            args: describe_args(args),
        })
    } else {
        Err(ReflectError::MethodNotFound {
            class: ty.name().to_string(),
            method: name.to_string(),
        })
    }
}

pub(crate) fn describe_args(args: &[TypeSignature]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
