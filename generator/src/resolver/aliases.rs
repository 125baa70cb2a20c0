use indexmap::IndexMap;

use crate::binding::{AliasTable, TypeExpr};
use crate::error::ResolveError;

/// Rewrites every alias target so that it no longer mentions other aliases: with `A = B` and
/// `B = nat8`, both `A` and `B` map to `nat8`.
pub(super) fn inline_aliases(raw: &IndexMap<String, TypeExpr>) -> Result<AliasTable, ResolveError> {
    let mut table = AliasTable::with_capacity(raw.len());
    for (name, target) in raw {
        let mut stack = vec![name.as_str()];
        table.insert(name.clone(), inline(target, raw, &mut stack)?);
    }
    Ok(table)
}

fn inline<'a>(
    expr: &'a TypeExpr,
    raw: &'a IndexMap<String, TypeExpr>,
    stack: &mut Vec<&'a str>,
) -> Result<TypeExpr, ResolveError> {
    match expr {
        TypeExpr::Declared(name) => match raw.get_key_value(name) {
            Some((alias, target)) => {
                if stack.contains(&alias.as_str()) {
                    return Err(ResolveError::UnaliasableTarget {
                        alias: stack[0].to_string(),
                        reason: format!("alias cycle {} -> {alias}", stack.join(" -> ")),
                    });
                }
                stack.push(alias);
                let inlined = inline(target, raw, stack)?;
                stack.pop();
                Ok(inlined)
            }
            None => Ok(expr.clone()),
        },
        TypeExpr::Vector(inner) => Ok(TypeExpr::vector(inline(inner, raw, stack)?)),
        TypeExpr::Optional(inner) => Ok(TypeExpr::optional(inline(inner, raw, stack)?)),
        TypeExpr::Primitive(_) | TypeExpr::Nested(_) => Ok(expr.clone()),
    }
}
