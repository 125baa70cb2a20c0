use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::binding::{
    AliasTable, Bindings, RecordBinding, ServiceBinding, TypeBinding, TypeExpr, VariantBinding,
};
use crate::error::EmitError;

/// Line put at the top of every generated file.
pub(super) const GENERATED_BY: &str = concat!(
    "Generated by ",
    env!("CARGO_PKG_NAME"),
    " ",
    env!("CARGO_PKG_VERSION")
);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A top-level record, variant or service type together with its nested types.
    Type,
    /// The client of the service the description is about.
    Client,
    Aliases,
    /// Entry point that pulls every other artifact in.
    Index,
}

/// One generated source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Name of the binding the artifact renders.
    pub name: String,
    /// Path relative to the namespace directory.
    pub file_name: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitOptions {
    /// Base module the artifacts live in, with segments separated by `::`, `.` or `/`.
    pub namespace: String,
    /// Path of the runtime the generated code imports the agent and codec from.
    pub runtime: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            namespace: "bindings".to_string(),
            runtime: "dt_candid_runtime".to_string(),
        }
    }
}

impl EmitOptions {
    pub fn namespace_segments(&self) -> Result<Vec<&str>, EmitError> {
        let segments = self
            .namespace
            .split(|c| c == '.' || c == '/' || c == ':')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let valid = !segments.is_empty()
            && segments.iter().all(|segment| {
                segment.starts_with(|c: char| c.is_alphabetic() || c == '_')
                    && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
            });
        if valid {
            Ok(segments)
        } else {
            Err(EmitError::InvalidPath {
                path: self.namespace.clone(),
            })
        }
    }

    /// Directory, relative to the output directory, that artifacts are written to.
    pub fn namespace_dir(&self) -> Result<PathBuf, EmitError> {
        Ok(self.namespace_segments()?.into_iter().collect())
    }
}

/// A back end. Every visit renders one [`Artifact`].
pub(super) trait BindingVisitor {
    fn visit_record(
        &mut self,
        context: &GeneratorContext,
        record: &RecordBinding,
    ) -> Result<Artifact, EmitError>;

    fn visit_variant(
        &mut self,
        context: &GeneratorContext,
        variant: &VariantBinding,
    ) -> Result<Artifact, EmitError>;

    /// A service type declared next to the records and variants, e.g. a callback target.
    fn visit_service(
        &mut self,
        context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError>;

    fn visit_aliases(
        &mut self,
        context: &GeneratorContext,
        aliases: &AliasTable,
    ) -> Result<Artifact, EmitError>;

    /// The service the description is about.
    fn visit_client(
        &mut self,
        context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError>;

    /// Called last, with every artifact rendered so far.
    fn visit_index(
        &mut self,
        context: &GeneratorContext,
        artifacts: &[Artifact],
    ) -> Result<Artifact, EmitError>;
}

pub(super) struct GeneratorContext<'a> {
    pub(super) bindings: &'a Bindings,
    pub(super) graph: ValueGraph<'a>,
}

impl<'a> GeneratorContext<'a> {
    pub(super) fn new(bindings: &'a Bindings) -> Self {
        Self {
            bindings,
            graph: ValueGraph::new(bindings),
        }
    }
}

/// Runs `visitor` over all bindings: types in declaration order, then the aliases (if any), the
/// client and finally the index.
pub(super) fn walk(
    visitor: &mut impl BindingVisitor,
    context: &GeneratorContext,
) -> Result<Vec<Artifact>, EmitError> {
    let bindings = context.bindings;
    let mut artifacts = Vec::with_capacity(bindings.types.len() + 3);
    for binding in &bindings.types {
        let artifact = match binding {
            TypeBinding::Record(record) => visitor.visit_record(context, record)?,
            TypeBinding::Variant(variant) => visitor.visit_variant(context, variant)?,
            TypeBinding::Service(service) => visitor.visit_service(context, service)?,
        };
        artifacts.push(artifact);
    }
    if !bindings.aliases.is_empty() {
        artifacts.push(visitor.visit_aliases(context, &bindings.aliases)?);
    }
    artifacts.push(visitor.visit_client(context, &bindings.service)?);
    let index = visitor.visit_index(context, &artifacts)?;
    artifacts.push(index);
    Ok(artifacts)
}

/// Key of a binding in the [`ValueGraph`]: its name, prefixed by the keys of its owners.
pub(super) fn node_key(owner: Option<&str>, name: &str) -> String {
    match owner {
        Some(owner) => format!("{owner}::{name}"),
        None => name.to_string(),
    }
}

/// Which record and variant bindings hold which others by value.
///
/// Vectors hold their elements behind a pointer and services are references, so neither
/// contributes edges. Aliases are looked through.
pub(super) struct ValueGraph<'a> {
    edges: HashMap<String, Vec<String>>,
    aliases: &'a AliasTable,
}

impl<'a> ValueGraph<'a> {
    pub(super) fn new(bindings: &'a Bindings) -> Self {
        let mut graph = Self {
            edges: HashMap::new(),
            aliases: &bindings.aliases,
        };
        for binding in &bindings.types {
            graph.add(None, binding);
        }
        graph
    }

    fn add(&mut self, owner: Option<&str>, binding: &TypeBinding) {
        let key = node_key(owner, binding.name());
        if !matches!(binding, TypeBinding::Service(_)) {
            let targets = binding
                .type_exprs()
                .into_iter()
                .flat_map(|expr| self.by_value_targets(&key, expr))
                .collect();
            self.edges.insert(key.clone(), targets);
        }
        for sub_binding in binding.sub_bindings() {
            self.add(Some(&key), sub_binding);
        }
    }

    fn by_value_targets(&self, owner: &str, expr: &TypeExpr) -> Vec<String> {
        let mut targets = Vec::new();
        expr.visit_names(&mut |named, in_vector| {
            if in_vector {
                return;
            }
            match named {
                TypeExpr::Declared(name) => match self.aliases.get(name) {
                    Some(target) => targets.extend(self.by_value_targets(owner, target)),
                    None => targets.push(name.clone()),
                },
                TypeExpr::Nested(name) => targets.push(node_key(Some(owner), name)),
                _ => {}
            }
        });
        targets
    }

    /// Whether `expr`, held by the binding `owner`, leads back to `owner` by value. Such a field
    /// needs an indirection to have a finite size.
    pub(super) fn closes_cycle(&self, owner: &str, expr: &TypeExpr) -> bool {
        let mut visited = HashSet::new();
        let mut pending = self.by_value_targets(owner, expr);
        while let Some(node) = pending.pop() {
            if node == owner {
                return true;
            }
            if visited.insert(node.clone()) {
                if let Some(targets) = self.edges.get(&node) {
                    pending.extend(targets.iter().cloned());
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use dt_candid::parse_service_file;
    use indoc::indoc;

    use super::*;
    use crate::resolver::resolve_service_file;

    fn bindings(text: &str) -> Bindings {
        let file = parse_service_file(text).unwrap();
        resolve_service_file("test", &file).unwrap()
    }

    fn field<'a>(bindings: &'a Bindings, owner: &str, field: &str) -> &'a TypeExpr {
        let TypeBinding::Record(record) = bindings
            .types
            .iter()
            .find(|b| b.name() == owner)
            .unwrap()
        else {
            panic!("{owner} is not a record")
        };
        &record.fields.iter().find(|f| f.name == field).unwrap().type_
    }

    #[test]
    fn namespace_segments() {
        let options = |namespace: &str| EmitOptions {
            namespace: namespace.into(),
            ..EmitOptions::default()
        };
        assert_eq!(
            options("api::ledger").namespace_segments().unwrap(),
            vec!["api", "ledger"]
        );
        assert_eq!(
            options("api.ledger").namespace_dir().unwrap(),
            PathBuf::from("api").join("ledger")
        );
        assert!(options("").namespace_segments().is_err());
        assert!(options("1st").namespace_segments().is_err());
        assert!(options("a-b").namespace_segments().is_err());
    }

    #[test]
    fn cycles_through_options_and_aliases() {
        let bindings = bindings(indoc! {"
            type Node = record { value : nat; next : opt Node; children : vec Node };
            type MaybeA = opt A;
            type A = record { b : B };
            type B = variant { a : MaybeA; leaf };
            type Plain = record { node : Node };
            service : {}
        "});
        let graph = ValueGraph::new(&bindings);
        assert!(graph.closes_cycle("Node", field(&bindings, "Node", "Next")));
        assert!(!graph.closes_cycle("Node", field(&bindings, "Node", "Children")));
        assert!(graph.closes_cycle("A", field(&bindings, "A", "B")));
        assert!(!graph.closes_cycle("Plain", field(&bindings, "Plain", "Node")));
    }

    #[test]
    fn cycles_through_nested_bindings() {
        let bindings = bindings(indoc! {"
            type Tree = record { root : record { left : opt Tree; size : nat } };
            service : {}
        "});
        let graph = ValueGraph::new(&bindings);
        assert!(graph.closes_cycle("Tree", field(&bindings, "Tree", "Root")));
        assert!(graph.closes_cycle(
            "Tree::RootInfo",
            &TypeExpr::optional(TypeExpr::Declared("Tree".into()))
        ));
    }

    #[test]
    fn walk_order() {
        struct Names;
        fn artifact(kind: ArtifactKind, name: &str) -> Result<Artifact, EmitError> {
            Ok(Artifact {
                kind,
                name: name.to_string(),
                file_name: String::new(),
                source: String::new(),
            })
        }
        impl BindingVisitor for Names {
            fn visit_record(
                &mut self,
                _: &GeneratorContext,
                record: &RecordBinding,
            ) -> Result<Artifact, EmitError> {
                artifact(ArtifactKind::Type, &record.name)
            }
            fn visit_variant(
                &mut self,
                _: &GeneratorContext,
                variant: &VariantBinding,
            ) -> Result<Artifact, EmitError> {
                artifact(ArtifactKind::Type, &variant.name)
            }
            fn visit_service(
                &mut self,
                _: &GeneratorContext,
                service: &ServiceBinding,
            ) -> Result<Artifact, EmitError> {
                artifact(ArtifactKind::Type, &service.name)
            }
            fn visit_aliases(
                &mut self,
                _: &GeneratorContext,
                _: &AliasTable,
            ) -> Result<Artifact, EmitError> {
                artifact(ArtifactKind::Aliases, "aliases")
            }
            fn visit_client(
                &mut self,
                _: &GeneratorContext,
                service: &ServiceBinding,
            ) -> Result<Artifact, EmitError> {
                artifact(ArtifactKind::Client, &service.name)
            }
            fn visit_index(
                &mut self,
                _: &GeneratorContext,
                artifacts: &[Artifact],
            ) -> Result<Artifact, EmitError> {
                assert_eq!(artifacts.len(), 5);
                artifact(ArtifactKind::Index, "index")
            }
        }

        let bindings = bindings(indoc! {"
            type V = variant { a };
            type Id = nat;
            type R = record { id : Id };
            type Callback = service {};
            service : {}
        "});
        let context = GeneratorContext::new(&bindings);
        let names = walk(&mut Names, &context)
            .unwrap()
            .into_iter()
            .map(|a| (a.kind, a.name))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                (ArtifactKind::Type, "V".to_string()),
                (ArtifactKind::Type, "R".to_string()),
                (ArtifactKind::Type, "Callback".to_string()),
                (ArtifactKind::Aliases, "aliases".to_string()),
                (ArtifactKind::Client, "Test".to_string()),
                (ArtifactKind::Index, "index".to_string()),
            ]
        );
    }
}
