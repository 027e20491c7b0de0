//! Alias resolution and the breadth-first inheritance walk

use std::collections::{HashSet, VecDeque};

use super::Tables;
use crate::error::{ReflectError, ReflectResult};
use crate::object::Projection;
use crate::types::TypeIdentity;

/// Follow alias links until a descriptor without one
///
/// Unregistered identities resolve to themselves.
pub(crate) fn resolve_alias(tables: &Tables, ty: TypeIdentity) -> ReflectResult<TypeIdentity> {
    let mut current = ty.decay();
    let mut seen = HashSet::new();
    while let Some(next) = tables
        .classes
        .get(&current.hash())
        .and_then(|class| class.alias_target)
    {
        if !seen.insert(current.hash()) {
            return Err(ReflectError::AliasCycle(ty.name().to_string()));
        }
        current = next;
    }
    Ok(current)
}

/// Whether following alias links from `start` passes through `needle`
pub(crate) fn alias_chain_contains(tables: &Tables, start: TypeIdentity, needle: TypeIdentity) -> bool {
    let mut current = start.decay();
    let mut seen = HashSet::new();
    loop {
        if current.hash() == needle.hash() {
            return true;
        }
        if !seen.insert(current.hash()) {
            return false;
        }
        match tables
            .classes
            .get(&current.hash())
            .and_then(|class| class.alias_target)
        {
            Some(next) => current = next,
            None => return false,
        }
    }
}

/// Visit `start` and its ancestors breadth-first until `probe` finds something
///
/// Returns the probe result and the composed cast from `start` to the
/// class where it was found (`None` when found on `start` itself).
/// Shallower classes are always probed before deeper ones, and among
/// siblings the earlier declared base goes first.
pub(crate) fn walk<R>(
    tables: &Tables,
    start: TypeIdentity,
    mut probe: impl FnMut(u64) -> Option<R>,
) -> Option<(R, Option<Projection>)> {
    let start = resolve_alias(tables, start).unwrap_or(start);
    let mut queue: VecDeque<(u64, Option<Projection>)> = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back((start.hash(), None));

    while let Some((hash, cast)) = queue.pop_front() {
        if !visited.insert(hash) {
            continue;
        }
        if let Some(found) = probe(hash) {
            tracing::trace!(class = hash, "member found during inheritance walk");
            return Some((found, cast));
        }
        let Some(class) = tables.classes.get(&hash) else {
            continue;
        };
        for parent in &class.parents {
            let composed = match &cast {
                Some(current) => current.then(&parent.cast),
                None => parent.cast.clone(),
            };
            queue.push_back((parent.ty.hash(), Some(composed)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClassDescriptor, ParentEdge};

    fn add_class(tables: &mut Tables, name: &str, parents: &[&str]) -> TypeIdentity {
        let ty = TypeIdentity::raw(name);
        let mut class = ClassDescriptor::new(ty);
        class.parents = parents
            .iter()
            .map(|p| ParentEdge {
                ty: TypeIdentity::raw(p),
                cast: Projection::identity(),
            })
            .collect();
        tables.classes.insert(ty.hash(), class);
        ty
    }

    fn add_alias(tables: &mut Tables, name: &str, target: &str) {
        let ty = TypeIdentity::raw(name);
        let mut class = ClassDescriptor::new(ty);
        class.alias_target = Some(TypeIdentity::raw(target));
        tables.classes.insert(ty.hash(), class);
    }

    #[test]
    fn test_alias_chain() {
        let mut tables = Tables::default();
        add_alias(&mut tables, "A", "B");
        add_alias(&mut tables, "B", "C");
        add_class(&mut tables, "C", &[]);
        assert_eq!(
            resolve_alias(&tables, TypeIdentity::raw("A")).unwrap(),
            TypeIdentity::raw("C")
        );
        assert_eq!(
            resolve_alias(&tables, TypeIdentity::raw("Unknown")).unwrap(),
            TypeIdentity::raw("Unknown")
        );
    }

    #[test]
    fn test_alias_cycle_detected() {
        let mut tables = Tables::default();
        add_alias(&mut tables, "X", "Y");
        add_alias(&mut tables, "Y", "X");
        assert_eq!(
            resolve_alias(&tables, TypeIdentity::raw("X")),
            Err(ReflectError::AliasCycle("X".to_string()))
        );
    }

    #[test]
    fn test_walk_is_breadth_first() {
        // D -> (B1, B2), B1 -> Deep
        let mut tables = Tables::default();
        let d = add_class(&mut tables, "D", &["B1", "B2"]);
        add_class(&mut tables, "B1", &["Deep"]);
        add_class(&mut tables, "B2", &[]);
        add_class(&mut tables, "Deep", &[]);

        let mut order = Vec::new();
        let found: Option<(u64, _)> = walk(&tables, d, |hash| {
            order.push(hash);
            None
        });
        assert!(found.is_none());
        let names: Vec<u64> = ["D", "B1", "B2", "Deep"]
            .iter()
            .map(|n| TypeIdentity::raw(n).hash())
            .collect();
        assert_eq!(order, names);
    }

    #[test]
    fn test_walk_reports_cast_only_for_ancestors() {
        let mut tables = Tables::default();
        let d = add_class(&mut tables, "Child", &["Parent"]);
        add_class(&mut tables, "Parent", &[]);

        let (_, cast) = walk(&tables, d, |hash| (hash == d.hash()).then_some(())).unwrap();
        assert!(cast.is_none());

        let parent = TypeIdentity::raw("Parent").hash();
        let (_, cast) = walk(&tables, d, |hash| (hash == parent).then_some(())).unwrap();
        assert!(cast.is_some());
    }

    #[test]
    fn test_walk_survives_diamonds() {
        let mut tables = Tables::default();
        let top = add_class(&mut tables, "Bottom", &["Left", "Right"]);
        add_class(&mut tables, "Left", &["Root"]);
        add_class(&mut tables, "Right", &["Root"]);
        add_class(&mut tables, "Root", &[]);

        let mut visits = 0;
        let _: Option<((), _)> = walk(&tables, top, |_| {
            visits += 1;
            None
        });
        assert_eq!(visits, 4);
    }
}
