//! Turns a loaded service description into [binding descriptors](crate::binding).
//!
//! Each top-level declaration is classified as an alias or a structural binding by its outermost
//! type node. Anonymous records, variants and services found inside a structural binding are
//! hoisted into named sub-bindings owned by that binding. Resolution is a pure function of its
//! input and may run concurrently for independent schemas.

mod aliases;
mod scope;

use std::collections::{HashMap, HashSet};

use dt_candid::{
    CandidId, CandidType, FuncType, ParameterType, RecordType, ServiceFile, ServiceType,
    VariantType,
};
use indexmap::IndexMap;
use tracing::debug;

use crate::binding::{
    AliasBinding, Bindings, Declaration, Method, Parameter, RecordBinding, RecordField,
    ServiceBinding, TypeBinding, TypeExpr, VariantBinding, VariantOption,
};
use crate::error::ResolveError;
use crate::naming::{normalize, synthesize};
use scope::Scope;

/// Suffix of names synthesized for hoisted anonymous types.
const HOISTED_SUFFIX: &str = "Info";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Alias,
    Structural,
}

/// Classifies a top-level declaration by its outermost node.
pub fn classify(type_: &CandidType, path: &str) -> Result<DeclarationKind, ResolveError> {
    match type_ {
        CandidType::Primitive(_)
        | CandidType::Reference(_)
        | CandidType::Vector(_)
        | CandidType::Optional(_) => Ok(DeclarationKind::Alias),
        CandidType::Record(_) | CandidType::Variant(_) | CandidType::Service(_) => {
            Ok(DeclarationKind::Structural)
        }
        CandidType::Func(_) => Err(ResolveError::UnsupportedConstruct {
            construct: format!("function type `{type_}`"),
            path: path.to_string(),
        }),
    }
}

/// Resolves a loaded file. A declared type that the actor refers to is resolved once, as the
/// service itself, and references to it (or to an alias of it) name the service.
pub fn resolve_service_file(
    service_name: &str,
    file: &ServiceFile,
) -> Result<Bindings, ResolveError> {
    resolve(
        service_name,
        &file.declared_types,
        &file.service,
        file.service_reference_id.as_ref(),
    )
}

/// Resolves `service` and every declared type except `service_reference_id` (if given) and the
/// declarations it aliases. Declared `func` types only name method signatures and get no binding.
pub fn resolve(
    service_name: &str,
    declared_types: &IndexMap<CandidId, CandidType>,
    service: &ServiceType,
    service_reference_id: Option<&CandidId>,
) -> Result<Bindings, ResolveError> {
    let service_name = normalize(service_name)
        .ok_or_else(|| ResolveError::InvalidServiceName(service_name.to_string()))?;

    let mut top_level = Scope::new("the top-level declarations");
    top_level.reserve(&service_name)?;

    let service_ids = service_reference_id
        .map(|id| reference_chain(declared_types, id))
        .unwrap_or_default();

    let mut names = HashMap::with_capacity(declared_types.len() + 1);
    let mut funcs = HashSet::new();
    let mut declarations = Vec::with_capacity(declared_types.len());
    for (id, type_) in declared_types {
        if service_ids.contains(&id) {
            names.insert(id.clone(), service_name.clone());
            continue;
        }
        let target = reference_chain(declared_types, id)
            .last()
            .and_then(|last| declared_types.get(*last));
        if let Some(CandidType::Func(_)) = target {
            debug!(%id, "skipping function type declaration");
            funcs.insert(id.clone());
            continue;
        }
        let candidate = normalize(&id.to_string()).unwrap_or_else(|| synthesize("T", id.hash()));
        let name = top_level.reserve(&candidate)?;
        names.insert(id.clone(), name.clone());
        declarations.push((name, type_));
    }

    let resolver = Resolver {
        names: &names,
        funcs: &funcs,
    };
    let mut types = Vec::new();
    let mut raw_aliases = IndexMap::new();
    for (name, type_) in declarations {
        match resolver.resolve_declaration(name, type_)? {
            Declaration::Alias(alias) => {
                raw_aliases.insert(alias.name, alias.target);
            }
            Declaration::Structural(binding) => types.push(binding),
        }
    }
    let aliases = aliases::inline_aliases(&raw_aliases)?;

    let service = resolver.resolve_service(service_name.clone(), service, &service_name)?;
    Ok(Bindings {
        service,
        types,
        aliases,
    })
}

/// Resolved sub-expression plus the binding hoisted out of it, if any.
type Resolved = (Option<TypeExpr>, Option<TypeBinding>);

struct Resolver<'a> {
    /// Final top-level name of every declared id.
    names: &'a HashMap<CandidId, String>,
    /// Declared ids that stand for function types.
    funcs: &'a HashSet<CandidId>,
}

impl Resolver<'_> {
    fn lookup(&self, id: &CandidId, path: &str) -> Result<String, ResolveError> {
        if self.funcs.contains(id) {
            return Err(ResolveError::UnsupportedConstruct {
                construct: format!("reference to function type `{id}`"),
                path: path.to_string(),
            });
        }
        self.names
            .get(id)
            .cloned()
            .ok_or_else(|| ResolveError::UnresolvedReference {
                id: id.clone(),
                path: path.to_string(),
            })
    }

    fn resolve_declaration(
        &self,
        name: String,
        type_: &CandidType,
    ) -> Result<Declaration, ResolveError> {
        let kind = classify(type_, &name)?;
        debug!(%name, ?kind, "classified declaration");
        match kind {
            DeclarationKind::Alias => {
                // Hoisting scope that must stay unused: aliases cannot introduce types
                let mut nested = Scope::new(format!("alias {name}"));
                let (target, hoisted) =
                    self.resolve_type_expression(&name, type_, &mut nested, &name)?;
                if let Some(hoisted) = hoisted {
                    return Err(ResolveError::UnaliasableTarget {
                        alias: name,
                        reason: format!(
                            "the target contains an anonymous type that would need the name {}",
                            hoisted.name()
                        ),
                    });
                }
                let target = target.ok_or_else(|| ResolveError::UnaliasableTarget {
                    alias: name.clone(),
                    reason: format!("`{type_}` has no value to alias"),
                })?;
                Ok(Declaration::Alias(AliasBinding { name, target }))
            }
            DeclarationKind::Structural => {
                let binding = match type_ {
                    CandidType::Record(record) => {
                        let path = name.clone();
                        TypeBinding::Record(self.resolve_record(name, record, &path)?)
                    }
                    CandidType::Variant(variant) => {
                        let path = name.clone();
                        TypeBinding::Variant(self.resolve_variant(name, variant, &path)?)
                    }
                    CandidType::Service(service) => {
                        let path = name.clone();
                        TypeBinding::Service(self.resolve_service(name, service, &path)?)
                    }
                    _ => unreachable!("classified as structural"),
                };
                Ok(Declaration::Structural(binding))
            }
        }
    }

    /// Resolves a type in field, option, parameter or alias position.
    ///
    /// `context` is the name an anonymous structural type gets when it is hoisted; it is reserved
    /// in `nested`, the sub-binding scope of the enclosing descriptor. Zero-width primitives
    /// resolve to no expression.
    fn resolve_type_expression(
        &self,
        context: &str,
        type_: &CandidType,
        nested: &mut Scope,
        path: &str,
    ) -> Result<Resolved, ResolveError> {
        match type_ {
            CandidType::Reference(id) => {
                Ok((Some(TypeExpr::Declared(self.lookup(id, path)?)), None))
            }
            CandidType::Primitive(primitive) => Ok((
                (!primitive.is_zero_width()).then_some(TypeExpr::Primitive(*primitive)),
                None,
            )),
            CandidType::Vector(inner) | CandidType::Optional(inner) => {
                let (inner_expr, hoisted) =
                    self.resolve_type_expression(context, inner, nested, path)?;
                let inner_expr = inner_expr.ok_or_else(|| ResolveError::UnsupportedConstruct {
                    construct: format!("container of a zero-width type `{type_}`"),
                    path: path.to_string(),
                })?;
                let expr = if matches!(type_, CandidType::Vector(_)) {
                    TypeExpr::vector(inner_expr)
                } else {
                    TypeExpr::optional(inner_expr)
                };
                Ok((Some(expr), hoisted))
            }
            CandidType::Record(record) => {
                let name = nested.reserve(context)?;
                let binding = self.resolve_record(name.clone(), record, path)?;
                Ok((Some(TypeExpr::Nested(name)), Some(TypeBinding::Record(binding))))
            }
            CandidType::Variant(variant) => {
                let name = nested.reserve(context)?;
                let binding = self.resolve_variant(name.clone(), variant, path)?;
                Ok((Some(TypeExpr::Nested(name)), Some(TypeBinding::Variant(binding))))
            }
            CandidType::Service(service) => {
                let name = nested.reserve(context)?;
                let binding = self.resolve_service(name.clone(), service, path)?;
                Ok((Some(TypeExpr::Nested(name)), Some(TypeBinding::Service(binding))))
            }
            CandidType::Func(_) => Err(ResolveError::UnsupportedConstruct {
                construct: format!("function reference `{type_}`"),
                path: path.to_string(),
            }),
        }
    }

    /// `path` locates the record in the schema; it differs from `name` for hoisted records.
    fn resolve_record(
        &self,
        name: String,
        record: &RecordType,
        path: &str,
    ) -> Result<RecordBinding, ResolveError> {
        let mut members = Scope::enclosed_by(format!("record {name}"), &name);
        let mut nested = Scope::enclosed_by(format!("types nested in {name}"), &name);
        let mut fields = Vec::with_capacity(record.fields.len());
        let mut sub_bindings = Vec::new();
        for (id, type_) in &record.fields {
            let field_name = members.reserve(&member_name(id, "F"))?;
            let path = format!("{path}.{field_name}");
            let context = format!("{field_name}{HOISTED_SUFFIX}");
            let (expr, hoisted) =
                self.resolve_type_expression(&context, type_, &mut nested, &path)?;
            sub_bindings.extend(hoisted);
            // Zero-width fields carry nothing and are left out
            if let Some(type_) = expr {
                fields.push(RecordField {
                    name: field_name,
                    id: id.clone(),
                    type_,
                });
            }
        }
        Ok(RecordBinding {
            name,
            fields,
            sub_bindings,
        })
    }

    fn resolve_variant(
        &self,
        name: String,
        variant: &VariantType,
        path: &str,
    ) -> Result<VariantBinding, ResolveError> {
        let mut members = Scope::enclosed_by(format!("variant {name}"), &name);
        let mut nested = Scope::enclosed_by(format!("types nested in {name}"), &name);
        let mut options = Vec::with_capacity(variant.options.len());
        let mut sub_bindings = Vec::new();
        for (id, type_) in &variant.options {
            let option_name = members.reserve(&member_name(id, "O"))?;
            let path = format!("{path}.{option_name}");
            let context = format!("{option_name}{HOISTED_SUFFIX}");
            let (expr, hoisted) =
                self.resolve_type_expression(&context, type_, &mut nested, &path)?;
            sub_bindings.extend(hoisted);
            // Unlike record fields, payload-less options stay
            options.push(VariantOption {
                name: option_name,
                id: id.clone(),
                type_: expr,
            });
        }
        Ok(VariantBinding {
            name,
            options,
            sub_bindings,
        })
    }

    fn resolve_service(
        &self,
        name: String,
        service: &ServiceType,
        path: &str,
    ) -> Result<ServiceBinding, ResolveError> {
        let mut methods_scope = Scope::new(format!("methods of {name}"));
        let mut nested = Scope::enclosed_by(format!("types nested in {name}"), &name);
        let mut methods = Vec::with_capacity(service.methods.len());
        let mut sub_bindings = Vec::new();
        for (index, (wire_name, func)) in service.methods.iter().enumerate() {
            let candidate = normalize(wire_name).unwrap_or_else(|| synthesize("M", index));
            let method_name = methods_scope.reserve(&candidate)?;
            let path = format!("{path}.{wire_name}");
            let method = self.resolve_method(
                method_name,
                wire_name,
                func,
                &mut nested,
                &mut sub_bindings,
                &path,
            )?;
            methods.push(method);
        }
        Ok(ServiceBinding {
            name,
            methods,
            sub_bindings,
        })
    }

    fn resolve_method(
        &self,
        name: String,
        wire_name: &str,
        func: &FuncType,
        nested: &mut Scope,
        sub_bindings: &mut Vec<TypeBinding>,
        path: &str,
    ) -> Result<Method, ResolveError> {
        let is_fire_and_forget = func.is_oneway();
        let parameters = self.resolve_parameters(
            &name,
            "arg",
            &func.arg_types,
            nested,
            sub_bindings,
            path,
        )?;
        let returns = if is_fire_and_forget {
            // No reply is ever observed; the declared returns only have to be well-formed
            for (index, parameter) in func.return_types.iter().enumerate() {
                self.check_references(&parameter.type_, &format!("{path}.ret{index}"))?;
            }
            Vec::new()
        } else {
            self.resolve_parameters(&name, "ret", &func.return_types, nested, sub_bindings, path)?
        };
        Ok(Method {
            name,
            wire_name: wire_name.to_string(),
            is_fire_and_forget,
            is_query: func.is_query(),
            parameters,
            returns,
        })
    }

    fn resolve_parameters(
        &self,
        method_name: &str,
        prefix: &str,
        parameters: &[ParameterType],
        nested: &mut Scope,
        sub_bindings: &mut Vec<TypeBinding>,
        path: &str,
    ) -> Result<Vec<Parameter>, ResolveError> {
        let mut scope = Scope::new(format!("{prefix} list of {path}"));
        let mut resolved = Vec::with_capacity(parameters.len());
        for (index, parameter) in parameters.iter().enumerate() {
            let candidate = parameter
                .name
                .as_deref()
                .and_then(normalize)
                .unwrap_or_else(|| normalize(&synthesize(prefix, index)).unwrap_or_default());
            let parameter_name = scope.reserve(&candidate)?;
            let context = format!("{method_name}{parameter_name}{HOISTED_SUFFIX}");
            let (type_, hoisted) = self.resolve_type_expression(
                &context,
                &parameter.type_,
                nested,
                &format!("{path}.{parameter_name}"),
            )?;
            sub_bindings.extend(hoisted);
            resolved.push(Parameter {
                name: parameter_name,
                type_,
            });
        }
        Ok(resolved)
    }

    /// Fails if `type_` mentions an undeclared id anywhere.
    fn check_references(&self, type_: &CandidType, path: &str) -> Result<(), ResolveError> {
        match type_ {
            CandidType::Primitive(_) => Ok(()),
            CandidType::Reference(id) => self.lookup(id, path).map(drop),
            CandidType::Vector(inner) | CandidType::Optional(inner) => {
                self.check_references(inner, path)
            }
            CandidType::Record(RecordType { fields: members })
            | CandidType::Variant(VariantType { options: members }) => members
                .iter()
                .try_for_each(|(id, member)| {
                    self.check_references(member, &format!("{path}.{id}"))
                }),
            CandidType::Service(service) => service
                .methods
                .iter()
                .try_for_each(|(name, func)| {
                    self.check_func_references(func, &format!("{path}.{name}"))
                }),
            CandidType::Func(func) => self.check_func_references(func, path),
        }
    }

    fn check_func_references(&self, func: &FuncType, path: &str) -> Result<(), ResolveError> {
        func.arg_types
            .iter()
            .chain(&func.return_types)
            .try_for_each(|parameter| self.check_references(&parameter.type_, path))
    }
}

/// `id` followed by every id it aliases, in order. Stops at the first declaration that is not a
/// bare reference, at an undeclared id or when the chain loops.
fn reference_chain<'a>(
    declared_types: &'a IndexMap<CandidId, CandidType>,
    id: &'a CandidId,
) -> Vec<&'a CandidId> {
    let mut chain = vec![id];
    while let Some(CandidType::Reference(next)) = chain.last().and_then(|c| declared_types.get(*c))
    {
        if chain.contains(&next) {
            break;
        }
        chain.push(next);
    }
    chain
}

/// Normalized name of a field or option, synthesized from `prefix` and the label hash when the
/// label has no usable name.
fn member_name(id: &CandidId, prefix: &str) -> String {
    id.name()
        .and_then(normalize)
        .unwrap_or_else(|| synthesize(prefix, id.hash()))
}

#[cfg(test)]
mod tests {
    use dt_candid::{parse_service_file, PrimitiveType};
    use indoc::indoc;

    use super::*;

    fn resolve_text(text: &str) -> Result<Bindings, ResolveError> {
        let file = parse_service_file(text).expect("fixture must parse");
        resolve_service_file("test", &file)
    }

    fn binding<'a>(bindings: &'a [TypeBinding], name: &str) -> &'a TypeBinding {
        bindings
            .iter()
            .find(|b| b.name() == name)
            .unwrap_or_else(|| panic!("no binding named {name}"))
    }

    fn record<'a>(bindings: &'a [TypeBinding], name: &str) -> &'a RecordBinding {
        match binding(bindings, name) {
            TypeBinding::Record(record) => record,
            other => panic!("{name} is not a record: {other:?}"),
        }
    }

    fn variant<'a>(bindings: &'a [TypeBinding], name: &str) -> &'a VariantBinding {
        match binding(bindings, name) {
            TypeBinding::Variant(variant) => variant,
            other => panic!("{name} is not a variant: {other:?}"),
        }
    }

    fn primitive(primitive: PrimitiveType) -> TypeExpr {
        TypeExpr::Primitive(primitive)
    }

    fn declared(name: &str) -> TypeExpr {
        TypeExpr::Declared(name.into())
    }

    #[test]
    fn classification_follows_the_outermost_node() {
        let alias_kinds = [
            CandidType::Primitive(PrimitiveType::Nat),
            CandidType::reference("A"),
            CandidType::vector(PrimitiveType::Nat8.into()),
            CandidType::optional(CandidType::Record(RecordType::default())),
        ];
        for type_ in &alias_kinds {
            assert_eq!(classify(type_, "x").unwrap(), DeclarationKind::Alias);
        }
        let structural_kinds = [
            CandidType::Record(RecordType::default()),
            CandidType::Variant(VariantType::default()),
            CandidType::Service(ServiceType::default()),
        ];
        for type_ in &structural_kinds {
            assert_eq!(classify(type_, "x").unwrap(), DeclarationKind::Structural);
        }
        assert!(matches!(
            classify(&CandidType::Func(FuncType::default()), "x"),
            Err(ResolveError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn aliases_fill_the_alias_table() {
        let bindings = resolve_text(indoc! {"
            type account_id = blob;
            type Memo = nat64;
            type MaybeMemo = opt Memo;
            type Block = record { memo : Memo };
            type BlockRef = Block;
            service : {}
        "})
        .unwrap();
        assert_eq!(
            bindings.aliases.keys().collect::<Vec<_>>(),
            vec!["AccountId", "Memo", "MaybeMemo", "BlockRef"]
        );
        assert_eq!(
            bindings.aliases["AccountId"],
            TypeExpr::vector(primitive(PrimitiveType::Nat8))
        );
        assert_eq!(
            bindings.aliases["MaybeMemo"],
            TypeExpr::optional(primitive(PrimitiveType::Nat64))
        );
        assert_eq!(bindings.aliases["BlockRef"], declared("Block"));
        assert_eq!(bindings.types.len(), 1);
        // Structural bindings refer to aliases by name
        assert_eq!(
            record(&bindings.types, "Block").fields[0].type_,
            declared("Memo")
        );
    }

    #[test]
    fn alias_chains_are_transitive() {
        let bindings = resolve_text("type A = B; type B = nat8; service : {}").unwrap();
        assert_eq!(bindings.aliases["A"], bindings.aliases["B"]);
        assert_eq!(bindings.aliases["A"], primitive(PrimitiveType::Nat8));
    }

    #[test]
    fn unaliasable_targets() {
        for text in [
            "type A = vec record { a : nat }; service : {}",
            "type A = opt variant { x }; service : {}",
            "type A = null; service : {}",
            "type A = opt B; type B = A; service : {}",
        ] {
            assert!(
                matches!(
                    resolve_text(text),
                    Err(ResolveError::UnaliasableTarget { ref alias, .. }) if alias == "A"
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn field_named_like_its_record_gets_suffix() {
        let bindings =
            resolve_text("type Record = record { record : nat; owner : principal }; service : {}")
                .unwrap();
        let names = record(&bindings.types, "Record")
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Record_", "Owner"]);
    }

    #[test]
    fn zero_width_fields_are_dropped_but_options_kept() {
        let bindings = resolve_text(indoc! {"
            type R = record { a : null; b : nat; c : reserved };
            type V = variant { a : null; b : nat; c : reserved };
            service : {}
        "})
        .unwrap();
        let r = record(&bindings.types, "R");
        assert_eq!(r.fields.len(), 1);
        assert_eq!(r.fields[0].name, "B");

        let v = variant(&bindings.types, "V");
        let options = v
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.type_.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            options,
            vec![
                ("A", None),
                ("B", Some(primitive(PrimitiveType::Nat))),
                ("C", None),
            ]
        );
    }

    #[test]
    fn unnamed_members_get_positional_names() {
        let bindings = resolve_text(
            "type Pair = record { nat; text }; type V = variant { 7 : nat; x }; service : {}",
        )
        .unwrap();
        let pair = record(&bindings.types, "Pair");
        assert_eq!(pair.fields[0].name, "F0");
        assert_eq!(pair.fields[1].name, "F1");
        assert_eq!(pair.fields[1].id, CandidId::Numbered(1));
        let v = variant(&bindings.types, "V");
        assert_eq!(v.options[0].name, "O7");
        assert_eq!(v.options[1].name, "X");
    }

    #[test]
    fn anonymous_types_are_hoisted() {
        let bindings = resolve_text(indoc! {"
            type Account = record {
                meta : record { created : nat64; tags : vec variant { a; b : record { x : nat } } };
                history : vec record { amount : nat };
            };
            service : {}
        "})
        .unwrap();
        let account = record(&bindings.types, "Account");
        assert_eq!(account.fields[0].type_, TypeExpr::Nested("MetaInfo".into()));
        assert_eq!(
            account.fields[1].type_,
            TypeExpr::vector(TypeExpr::Nested("HistoryInfo".into()))
        );
        let nested = account
            .sub_bindings
            .iter()
            .map(TypeBinding::name)
            .collect::<Vec<_>>();
        assert_eq!(nested, vec!["MetaInfo", "HistoryInfo"]);

        let meta = record(&account.sub_bindings, "MetaInfo");
        assert_eq!(
            meta.fields[1].type_,
            TypeExpr::vector(TypeExpr::Nested("TagsInfo".into()))
        );
        let tags = variant(&meta.sub_bindings, "TagsInfo");
        assert_eq!(tags.options[1].type_, Some(TypeExpr::Nested("BInfo".into())));
        assert_eq!(tags.sub_bindings.len(), 1);
        // Hoisted types exist only inside their owner
        assert_eq!(bindings.types.len(), 1);
    }

    #[test]
    fn hoisted_name_avoids_its_owner() {
        let bindings =
            resolve_text("type AInfo = record { a : record { x : nat } }; service : {}").unwrap();
        let owner = record(&bindings.types, "AInfo");
        assert_eq!(owner.fields[0].type_, TypeExpr::Nested("AInfo_".into()));
    }

    #[test]
    fn methods_are_resolved() {
        let bindings = resolve_text(indoc! {"
            type Tokens = record { e8s : nat64 };
            service ledger : {
                account_balance : (record { account : blob }) -> (Tokens) query;
                transfer : (to : blob, Tokens, null) -> (variant { Ok : nat64; Err : text });
                notify : (nat64) -> (Tokens) oneway;
                peek : () -> (nat) composite_query;
            }
        "})
        .unwrap();
        let service = &bindings.service;
        assert_eq!(service.name, "Test");
        let names = service
            .methods
            .iter()
            .map(|m| (m.name.as_str(), m.wire_name.as_str(), m.is_query))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                ("AccountBalance", "account_balance", true),
                ("Transfer", "transfer", false),
                ("Notify", "notify", false),
                ("Peek", "peek", true),
            ]
        );

        let balance = &service.methods[0];
        assert_eq!(balance.parameters[0].name, "Arg0");
        assert_eq!(
            balance.parameters[0].type_,
            Some(TypeExpr::Nested("AccountBalanceArg0Info".into()))
        );
        assert_eq!(balance.returns[0].name, "Ret0");
        assert_eq!(balance.returns[0].type_, Some(declared("Tokens")));

        let transfer = &service.methods[1];
        let parameters = transfer
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            parameters,
            vec![
                ("To", Some(TypeExpr::vector(primitive(PrimitiveType::Nat8)))),
                ("Arg1", Some(declared("Tokens"))),
                ("Arg2", None),
            ]
        );
        assert_eq!(
            transfer.returns[0].type_,
            Some(TypeExpr::Nested("TransferRet0Info".into()))
        );
        let nested = service
            .sub_bindings
            .iter()
            .map(TypeBinding::name)
            .collect::<Vec<_>>();
        assert_eq!(nested, vec!["AccountBalanceArg0Info", "TransferRet0Info"]);
    }

    #[test]
    fn fire_and_forget_methods_have_no_returns() {
        let bindings =
            resolve_text("service : { notify : (nat) -> (nat, text) oneway }").unwrap();
        let notify = &bindings.service.methods[0];
        assert!(notify.is_fire_and_forget);
        assert!(!notify.is_query);
        assert!(notify.returns.is_empty());
        assert_eq!(notify.parameters.len(), 1);
    }

    #[test]
    fn service_reference_is_resolved_once() {
        let bindings = resolve_text(indoc! {"
            type Counter = service { get : () -> (nat) query };
            type Registry = record { counter : Counter };
            service : Counter
        "})
        .unwrap();
        assert_eq!(bindings.types.len(), 1);
        assert_eq!(
            record(&bindings.types, "Registry").fields[0].type_,
            declared("Test")
        );
        assert_eq!(bindings.service.methods.len(), 1);
    }

    #[test]
    fn service_reference_through_an_alias() {
        let bindings = resolve_text(indoc! {"
            type S = Counter;
            type Counter = service { get : () -> (nat) query };
            type Registry = record { main : S; counter : Counter };
            service : S
        "})
        .unwrap();
        assert_eq!(bindings.types.len(), 1);
        assert!(bindings.aliases.is_empty());
        let registry = record(&bindings.types, "Registry");
        assert_eq!(registry.fields[0].type_, declared("Test"));
        assert_eq!(registry.fields[1].type_, declared("Test"));
        assert_eq!(bindings.service.methods.len(), 1);
    }

    #[test]
    fn methods_typed_by_function_declarations() {
        let bindings = resolve_text(indoc! {"
            type Get = func (text) -> (opt text) query;
            type Lookup = Get;
            service : { get : Get; lookup : Lookup }
        "})
        .unwrap();
        assert!(bindings.types.is_empty());
        assert!(bindings.aliases.is_empty());
        for method in &bindings.service.methods {
            assert!(method.is_query);
            assert_eq!(
                method.parameters,
                vec![Parameter {
                    name: "Arg0".into(),
                    type_: Some(primitive(PrimitiveType::Text)),
                }]
            );
            assert_eq!(
                method.returns[0].type_,
                Some(TypeExpr::optional(primitive(PrimitiveType::Text)))
            );
        }
        assert_eq!(bindings.service.methods[0].wire_name, "get");
    }

    #[test]
    fn nested_service_types_become_bindings() {
        let bindings = resolve_text(indoc! {"
            type Callback = service { notify : (nat) -> () };
            type Subscription = record { target : service { ping : () -> () } };
            service : { subscribe : (Callback) -> () }
        "})
        .unwrap();
        assert!(matches!(
            binding(&bindings.types, "Callback"),
            TypeBinding::Service(_)
        ));
        let subscription = record(&bindings.types, "Subscription");
        assert!(matches!(
            subscription.sub_bindings[0],
            TypeBinding::Service(ServiceBinding { ref name, .. }) if name == "TargetInfo"
        ));
    }

    #[test]
    fn top_level_names_are_disambiguated() {
        let bindings =
            resolve_text("type foo = nat; type Foo = text; type test = bool; service : {}")
                .unwrap();
        assert_eq!(
            bindings.aliases.keys().collect::<Vec<_>>(),
            vec!["Foo", "Foo_", "Test_"]
        );

        let err = resolve_text("type foo = nat; type Foo = text; type FOO = bool; service : {}")
            .unwrap_err();
        assert!(matches!(err, ResolveError::NameCollision { ref name, .. } if name == "Foo"));
    }

    #[test]
    fn unresolved_references_fail_without_output() {
        let err = resolve_text(indoc! {"
            type A = record { inner : record { b : vec Missing } };
            service : {}
        "})
        .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnresolvedReference {
                id: CandidId::named("Missing"),
                path: "A.Inner.B".into(),
            }
        );

        let err = resolve_text(indoc! {"
            type V = variant { ok : record { callback : service { m : (Gone) -> () } } };
            service : {}
        "})
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnresolvedReference { ref path, .. } if path == "V.Ok.Callback.m.Arg0"
        ));

        let err = resolve_text("service : { m : () -> (Gone) oneway }").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnresolvedReference { ref id, .. } if *id == CandidId::named("Gone")
        ));
    }

    #[test]
    fn unsupported_constructs() {
        for text in [
            "type F = func (nat) -> (); type R = record { f : F }; service : {}",
            "type F = func (nat) -> (); type G = F; service : { m : (G) -> () }",
            "type R = record { callback : func () -> () }; service : {}",
            "type R = record { nothing : vec null }; service : {}",
        ] {
            assert!(
                matches!(
                    resolve_text(text),
                    Err(ResolveError::UnsupportedConstruct { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let text = indoc! {"
            type Tree = variant { leaf : nat; node : record { left : Tree; right : Tree } };
            type Forest = vec Tree;
            type Meta = record { 1 : text; name : opt text; sub : record { z : nat; a : nat } };
            service : {
                plant : (Forest, record { at : nat64 }) -> (variant { ok; err : text });
                inspect : (Tree) -> (Meta) query;
            }
        "};
        let first = resolve_text(text).unwrap();
        let second = resolve_text(text).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_unusable_service_name() {
        let file = parse_service_file("service : {}").unwrap();
        assert_eq!(
            resolve_service_file("_", &file),
            Err(ResolveError::InvalidServiceName("_".into()))
        );
    }
}
