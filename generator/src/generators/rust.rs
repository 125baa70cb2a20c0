use std::collections::HashSet;

use syn::{
    Expr, Field, FieldMutability, Fields, FnArg, Ident, ImplItem, Item, Pat, Type, Variant,
    __private::Span, parse_quote,
};

use dt_candid::{CandidId, PrimitiveType};

use super::common::{
    node_key, walk, Artifact, ArtifactKind, BindingVisitor, EmitOptions, GeneratorContext,
    GENERATED_BY,
};
use crate::binding::{
    AliasTable, Bindings, Method, RecordBinding, ServiceBinding, TypeBinding, TypeExpr,
    VariantBinding,
};
use crate::error::EmitError;
use crate::naming::{convert_disambiguated, disambiguate, SnakeCase};

use check_keyword::CheckKeyword;

struct RustVisitor {
    runtime: syn::Path,
    /// `crate::` path of the namespace module.
    namespace: syn::Path,
    /// Value of `#[serde(crate = ...)]`, the runtime's re-export of serde.
    serde_crate: String,
    modules: HashSet<String>,
}

impl RustVisitor {
    fn new(options: &EmitOptions) -> Result<Self, EmitError> {
        let runtime = syn::parse_str::<syn::Path>(&options.runtime).map_err(|_| {
            EmitError::InvalidPath {
                path: options.runtime.clone(),
            }
        })?;
        let segments = options
            .namespace_segments()?
            .into_iter()
            .map(Self::name_to_ident)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            runtime,
            namespace: parse_quote!(crate #(::#segments)*),
            serde_crate: format!("{}::serde", options.runtime),
            // mod.rs is the index
            modules: HashSet::from(["mod".to_string()]),
        })
    }

    fn name_to_ident(name: &str) -> Result<Ident, EmitError> {
        if ["crate", "self", "super", "Self"].contains(&name) {
            // These are keywords that are not allowed as raw identifiers
            Ok(Ident::new(&format!("{}_", name), Span::call_site()))
        } else if name.is_keyword() {
            Ok(Ident::new_raw(name, Span::call_site()))
        } else {
            syn::parse_str::<Ident>(name).map_err(|_| EmitError::InvalidIdentifier {
                name: name.to_string(),
            })
        }
    }

    fn snake_case(name: &str) -> String {
        convert_disambiguated::<SnakeCase>(name)
    }

    fn snake_ident(name: &str) -> Result<Ident, EmitError> {
        Self::name_to_ident(&Self::snake_case(name))
    }

    fn client_ident(service_name: &str) -> Result<Ident, EmitError> {
        Self::name_to_ident(&format!("{service_name}ApiClient"))
    }

    /// Claims a file module name for the artifact rendering `name`.
    fn reserve_module(&mut self, name: &str) -> Result<String, EmitError> {
        let module = disambiguate(&Self::snake_case(name), &self.modules).ok_or_else(|| {
            EmitError::InvalidIdentifier {
                name: name.to_string(),
            }
        })?;
        self.modules.insert(module.clone());
        Ok(module)
    }

    /// The label a field or option has on the wire.
    fn wire_name(id: &CandidId) -> String {
        match id {
            CandidId::Named(name) => name.clone(),
            CandidId::Numbered(id) => format!("_{id}_"),
        }
    }

    fn primitive_type(&self, primitive: PrimitiveType) -> Type {
        let runtime = &self.runtime;
        match primitive {
            PrimitiveType::Text => parse_quote!(String),
            PrimitiveType::Bool => parse_quote!(bool),
            PrimitiveType::Nat => parse_quote!(#runtime::Nat),
            PrimitiveType::Nat8 => parse_quote!(u8),
            PrimitiveType::Nat16 => parse_quote!(u16),
            PrimitiveType::Nat32 => parse_quote!(u32),
            PrimitiveType::Nat64 => parse_quote!(u64),
            PrimitiveType::Int => parse_quote!(#runtime::Int),
            PrimitiveType::Int8 => parse_quote!(i8),
            PrimitiveType::Int16 => parse_quote!(i16),
            PrimitiveType::Int32 => parse_quote!(i32),
            PrimitiveType::Int64 => parse_quote!(i64),
            PrimitiveType::Float32 => parse_quote!(f32),
            PrimitiveType::Float64 => parse_quote!(f64),
            PrimitiveType::Principal => parse_quote!(#runtime::Principal),
            PrimitiveType::Reserved | PrimitiveType::Empty | PrimitiveType::Null => {
                parse_quote!(())
            }
        }
    }

    /// Renders `expr` as it appears inside the module of `owner`. With `boxed`, named types that
    /// are held by value are put behind a `Box`.
    fn rust_type(&self, expr: &TypeExpr, owner: &str, boxed: bool) -> Result<Type, EmitError> {
        let type_: Type = match expr {
            TypeExpr::Primitive(primitive) => return Ok(self.primitive_type(*primitive)),
            TypeExpr::Declared(name) => {
                let namespace = &self.namespace;
                let name = Self::name_to_ident(name)?;
                parse_quote!(#namespace::#name)
            }
            TypeExpr::Nested(name) => {
                let module = Self::snake_ident(owner)?;
                let name = Self::name_to_ident(name)?;
                parse_quote!(#module::#name)
            }
            TypeExpr::Vector(inner) => {
                let inner = self.rust_type(inner, owner, false)?;
                return Ok(parse_quote!(Vec<#inner>));
            }
            TypeExpr::Optional(inner) => {
                let inner = self.rust_type(inner, owner, boxed)?;
                return Ok(parse_quote!(Option<#inner>));
            }
        };
        Ok(if boxed {
            parse_quote!(Box<#type_>)
        } else {
            type_
        })
    }

    fn data_attrs(&self) -> Vec<syn::Attribute> {
        let runtime = &self.runtime;
        let serde_crate = &self.serde_crate;
        vec![
            parse_quote! {
                #[derive(Clone, Debug, PartialEq, #runtime::Serialize, #runtime::Deserialize)]
            },
            parse_quote!(#[serde(crate = #serde_crate)]),
        ]
    }

    /// Items of `binding`, followed by a module holding its sub-bindings (if it has any).
    fn binding_items(
        &self,
        context: &GeneratorContext,
        owner: Option<&str>,
        binding: &TypeBinding,
    ) -> Result<Vec<Item>, EmitError> {
        let key = node_key(owner, binding.name());
        let items = match binding {
            TypeBinding::Record(record) => vec![self.record_item(context, &key, record)?],
            TypeBinding::Variant(variant) => vec![self.variant_item(context, &key, variant)?],
            TypeBinding::Service(service) => self.service_items(service)?,
        };
        self.with_nested(context, &key, binding.name(), binding.sub_bindings(), items)
    }

    fn with_nested(
        &self,
        context: &GeneratorContext,
        key: &str,
        name: &str,
        sub_bindings: &[TypeBinding],
        mut items: Vec<Item>,
    ) -> Result<Vec<Item>, EmitError> {
        if sub_bindings.is_empty() {
            return Ok(items);
        }
        let module = Self::snake_ident(name)?;
        let mut nested = Vec::new();
        for sub_binding in sub_bindings {
            nested.extend(self.binding_items(context, Some(key), sub_binding)?);
        }
        items.push(parse_quote! {
            pub mod #module {
                #(#nested)*
            }
        });
        Ok(items)
    }

    fn record_item(
        &self,
        context: &GeneratorContext,
        key: &str,
        record: &RecordBinding,
    ) -> Result<Item, EmitError> {
        let name = Self::name_to_ident(&record.name)?;
        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let boxed = context.graph.closes_cycle(key, &field.type_);
            let wire_name = Self::wire_name(&field.id);
            fields.push(Field {
                attrs: vec![parse_quote!(#[serde(rename = #wire_name)])],
                vis: parse_quote!(pub),
                ident: Some(Self::snake_ident(&field.name)?),
                colon_token: None,
                ty: self.rust_type(&field.type_, &record.name, boxed)?,
                mutability: FieldMutability::None,
            });
        }
        let attrs = self.data_attrs();
        Ok(parse_quote! {
            #(#attrs)*
            pub struct #name {
                #(#fields),*
            }
        })
    }

    fn variant_item(
        &self,
        context: &GeneratorContext,
        key: &str,
        variant: &VariantBinding,
    ) -> Result<Item, EmitError> {
        let name = Self::name_to_ident(&variant.name)?;
        let mut variants = Vec::with_capacity(variant.options.len());
        for option in &variant.options {
            let wire_name = Self::wire_name(&option.id);
            let fields = match &option.type_ {
                Some(type_) => {
                    let boxed = context.graph.closes_cycle(key, type_);
                    let type_ = self.rust_type(type_, &variant.name, boxed)?;
                    Fields::Unnamed(parse_quote! { (#type_) })
                }
                None => Fields::Unit,
            };
            variants.push(Variant {
                attrs: vec![parse_quote!(#[serde(rename = #wire_name)])],
                ident: Self::name_to_ident(&option.name)?,
                fields,
                discriminant: None,
            });
        }
        let attrs = self.data_attrs();
        Ok(parse_quote! {
            #(#attrs)*
            pub enum #name {
                #(#variants),*
            }
        })
    }

    /// A service is passed around as the principal of the canister implementing it, so its type
    /// is a newtype that hands out clients.
    fn service_items(&self, service: &ServiceBinding) -> Result<Vec<Item>, EmitError> {
        let runtime = &self.runtime;
        let serde_crate = &self.serde_crate;
        let name = Self::name_to_ident(&service.name)?;
        let client = Self::client_ident(&service.name)?;
        let methods = service
            .methods
            .iter()
            .map(|method| self.method_item(&service.name, method))
            .collect::<Result<Vec<_>, _>>()?;
        let doc = format!("Client of the `{}` service.", service.name);
        Ok(vec![
            parse_quote! {
                #[derive(Clone, Debug, PartialEq, Eq, #runtime::Serialize, #runtime::Deserialize)]
                #[serde(crate = #serde_crate, transparent)]
                pub struct #name(pub #runtime::Principal);
            },
            parse_quote! {
                impl #name {
                    pub fn client<A: #runtime::Agent>(&self, agent: A) -> #client<A> {
                        #client::new(agent, self.0.clone())
                    }
                }
            },
            parse_quote! {
                #[doc = #doc]
                pub struct #client<A: #runtime::Agent> {
                    agent: A,
                    canister_id: #runtime::Principal,
                }
            },
            parse_quote! {
                impl<A: #runtime::Agent> #client<A> {
                    pub fn new(agent: A, canister_id: #runtime::Principal) -> Self {
                        Self { agent, canister_id }
                    }

                    pub fn canister_id(&self) -> &#runtime::Principal {
                        &self.canister_id
                    }

                    #(#methods)*
                }
            },
        ])
    }

    fn method_item(&self, service_name: &str, method: &Method) -> Result<ImplItem, EmitError> {
        let runtime = &self.runtime;
        let name = match Self::snake_case(&method.name) {
            // Taken by the client itself
            name if ["new", "canister_id"].contains(&name.as_str()) => {
                Self::name_to_ident(&format!("{name}_"))?
            }
            name => Self::name_to_ident(&name)?,
        };
        let wire_name = &method.wire_name;

        let mut inputs: Vec<FnArg> = Vec::new();
        let mut encoded: Vec<Expr> = Vec::new();
        for parameter in &method.parameters {
            match &parameter.type_ {
                Some(type_) => {
                    let ident = Self::snake_ident(&parameter.name)?;
                    let type_ = self.rust_type(type_, service_name, false)?;
                    inputs.push(parse_quote!(#ident: #type_));
                    encoded.push(parse_quote!(#ident));
                }
                // Elided from the signature, but still part of the argument tuple
                None => encoded.push(parse_quote!(())),
            }
        }

        let doc = format!("Calls `{wire_name}`.");
        if method.is_fire_and_forget {
            return Ok(parse_quote! {
                #[doc = #doc]
                pub async fn #name(&self, #(#inputs),*) -> Result<(), #runtime::AgentError> {
                    let arg = #runtime::encode_args((#(#encoded,)*))?;
                    self.agent.call(&self.canister_id, #wire_name, arg).await
                }
            });
        }

        let mut decoded_types: Vec<Type> = Vec::new();
        let mut patterns: Vec<Pat> = Vec::new();
        let mut outputs: Vec<Ident> = Vec::new();
        let mut output_types: Vec<Type> = Vec::new();
        for parameter in &method.returns {
            match &parameter.type_ {
                Some(type_) => {
                    let ident = Self::snake_ident(&parameter.name)?;
                    let type_ = self.rust_type(type_, service_name, false)?;
                    decoded_types.push(type_.clone());
                    patterns.push(parse_quote!(#ident));
                    outputs.push(ident);
                    output_types.push(type_);
                }
                None => {
                    decoded_types.push(parse_quote!(()));
                    patterns.push(parse_quote!(_));
                }
            }
        }
        let (output_type, output): (Type, Expr) = match (&outputs[..], &output_types[..]) {
            ([output], [output_type]) => (output_type.clone(), parse_quote!(#output)),
            _ => (
                parse_quote!((#(#output_types),*)),
                parse_quote!((#(#outputs),*)),
            ),
        };
        let call: Ident = if method.is_query {
            parse_quote!(query)
        } else {
            parse_quote!(call_and_wait)
        };
        Ok(parse_quote! {
            #[doc = #doc]
            pub async fn #name(&self, #(#inputs),*) -> Result<#output_type, #runtime::AgentError> {
                let arg = #runtime::encode_args((#(#encoded,)*))?;
                let reply = self.agent.#call(&self.canister_id, #wire_name, arg).await?;
                let (#(#patterns,)*): (#(#decoded_types,)*) = #runtime::decode_args(&reply)?;
                Ok(#output)
            }
        })
    }

    fn top_level_artifact(
        &mut self,
        kind: ArtifactKind,
        name: &str,
        items: Vec<Item>,
    ) -> Result<Artifact, EmitError> {
        let module = self.reserve_module(name)?;
        Ok(Artifact {
            kind,
            name: name.to_string(),
            file_name: format!("{module}.rs"),
            source: render(items),
        })
    }
}

fn render(items: Vec<Item>) -> String {
    let doc_comment = GENERATED_BY;
    let root = syn::File {
        shebang: None,
        attrs: vec![
            parse_quote!(#![doc = #doc_comment]),
            parse_quote!(#![allow(dead_code, unused_imports, clippy::all)]),
        ],
        items,
    };
    prettyplease::unparse(&root)
}

impl BindingVisitor for RustVisitor {
    fn visit_record(
        &mut self,
        context: &GeneratorContext,
        record: &RecordBinding,
    ) -> Result<Artifact, EmitError> {
        let items = vec![self.record_item(context, &record.name, record)?];
        let items = self.with_nested(
            context,
            &record.name,
            &record.name,
            &record.sub_bindings,
            items,
        )?;
        self.top_level_artifact(ArtifactKind::Type, &record.name, items)
    }

    fn visit_variant(
        &mut self,
        context: &GeneratorContext,
        variant: &VariantBinding,
    ) -> Result<Artifact, EmitError> {
        let items = vec![self.variant_item(context, &variant.name, variant)?];
        let items = self.with_nested(
            context,
            &variant.name,
            &variant.name,
            &variant.sub_bindings,
            items,
        )?;
        self.top_level_artifact(ArtifactKind::Type, &variant.name, items)
    }

    fn visit_service(
        &mut self,
        context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError> {
        let items = self.service_items(service)?;
        let items = self.with_nested(
            context,
            &service.name,
            &service.name,
            &service.sub_bindings,
            items,
        )?;
        self.top_level_artifact(ArtifactKind::Type, &service.name, items)
    }

    fn visit_aliases(
        &mut self,
        _context: &GeneratorContext,
        aliases: &AliasTable,
    ) -> Result<Artifact, EmitError> {
        let mut items = Vec::with_capacity(aliases.len());
        for (name, target) in aliases {
            let ident = Self::name_to_ident(name)?;
            // Alias targets never hold nested types, so the owner is irrelevant
            let target = self.rust_type(target, name, false)?;
            items.push(parse_quote!(pub type #ident = #target;));
        }
        self.top_level_artifact(ArtifactKind::Aliases, "Aliases", items)
    }

    fn visit_client(
        &mut self,
        context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError> {
        let items = self.service_items(service)?;
        let items = self.with_nested(
            context,
            &service.name,
            &service.name,
            &service.sub_bindings,
            items,
        )?;
        self.top_level_artifact(ArtifactKind::Client, &service.name, items)
    }

    fn visit_index(
        &mut self,
        _context: &GeneratorContext,
        artifacts: &[Artifact],
    ) -> Result<Artifact, EmitError> {
        let mut items: Vec<Item> = Vec::with_capacity(artifacts.len() * 2);
        for artifact in artifacts {
            let module = artifact
                .file_name
                .strip_suffix(".rs")
                .unwrap_or(&artifact.file_name);
            let module = Self::name_to_ident(module)?;
            items.push(parse_quote!(mod #module;));
            items.push(parse_quote!(pub use #module::*;));
        }
        Ok(Artifact {
            kind: ArtifactKind::Index,
            name: "index".to_string(),
            file_name: "mod.rs".to_string(),
            source: render(items),
        })
    }
}

pub fn generate(bindings: &Bindings, options: &EmitOptions) -> Result<Vec<Artifact>, EmitError> {
    let context = GeneratorContext::new(bindings);
    let mut visitor = RustVisitor::new(options)?;
    walk(&mut visitor, &context)
}
