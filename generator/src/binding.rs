//! Binding descriptors: the resolved, named form of a service description that the emitters
//! render. Nothing in here knows about the syntax of any target language.

use std::fmt;

use dt_candid::{CandidId, PrimitiveType};
use indexmap::IndexMap;

/// A type as it appears in a field, option or parameter position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// Never one of the zero-width primitives; those resolve to no expression at all.
    Primitive(PrimitiveType),
    /// A top-level binding or alias, by its final name.
    Declared(String),
    /// A hoisted sub-binding of the descriptor the expression occurs in.
    Nested(String),
    Vector(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn vector(inner: TypeExpr) -> Self {
        Self::Vector(Box::new(inner))
    }

    pub fn optional(inner: TypeExpr) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Calls `f` for every named type (declared or nested) in this expression, along with whether
    /// it is reached through a vector.
    pub fn visit_names(&self, f: &mut impl FnMut(&TypeExpr, bool)) {
        self.visit_names_inner(false, f)
    }

    fn visit_names_inner(&self, in_vector: bool, f: &mut impl FnMut(&TypeExpr, bool)) {
        match self {
            Self::Primitive(_) => {}
            Self::Declared(_) | Self::Nested(_) => f(self, in_vector),
            Self::Vector(inner) => inner.visit_names_inner(true, f),
            Self::Optional(inner) => inner.visit_names_inner(in_vector, f),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.keyword()),
            Self::Declared(name) => f.write_str(name),
            Self::Nested(name) => write!(f, "self::{name}"),
            Self::Vector(inner) => write!(f, "vec {inner}"),
            Self::Optional(inner) => write!(f, "opt {inner}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    /// The field label on the wire.
    pub id: CandidId,
    pub type_: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordBinding {
    pub name: String,
    pub fields: Vec<RecordField>,
    pub sub_bindings: Vec<TypeBinding>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantOption {
    pub name: String,
    pub id: CandidId,
    /// `None` for options without a payload.
    pub type_: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantBinding {
    pub name: String,
    pub options: Vec<VariantOption>,
    pub sub_bindings: Vec<TypeBinding>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// `None` if the parameter is elided from generated signatures.
    pub type_: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    /// The method name exactly as written in the schema.
    pub wire_name: String,
    pub is_fire_and_forget: bool,
    pub is_query: bool,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<Parameter>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceBinding {
    pub name: String,
    pub methods: Vec<Method>,
    pub sub_bindings: Vec<TypeBinding>,
}

/// A binding that introduces a named type (or client) of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeBinding {
    Record(RecordBinding),
    Variant(VariantBinding),
    Service(ServiceBinding),
}

impl TypeBinding {
    pub fn name(&self) -> &str {
        match self {
            Self::Record(record) => &record.name,
            Self::Variant(variant) => &variant.name,
            Self::Service(service) => &service.name,
        }
    }

    pub fn sub_bindings(&self) -> &[TypeBinding] {
        match self {
            Self::Record(record) => &record.sub_bindings,
            Self::Variant(variant) => &variant.sub_bindings,
            Self::Service(service) => &service.sub_bindings,
        }
    }

    /// Every type expression held directly by this binding (not by its sub-bindings).
    pub fn type_exprs(&self) -> Vec<&TypeExpr> {
        match self {
            Self::Record(record) => record.fields.iter().map(|f| &f.type_).collect(),
            Self::Variant(variant) => variant
                .options
                .iter()
                .filter_map(|o| o.type_.as_ref())
                .collect(),
            Self::Service(service) => service
                .methods
                .iter()
                .flat_map(|m| m.parameters.iter().chain(&m.returns))
                .filter_map(|p| p.type_.as_ref())
                .collect(),
        }
    }
}

/// A transparent synonym: no type of its own, only a name for an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasBinding {
    pub name: String,
    pub target: TypeExpr,
}

/// What a single top-level declaration resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    Alias(AliasBinding),
    Structural(TypeBinding),
}

/// Alias name to target expression, in declaration order.
pub type AliasTable = IndexMap<String, TypeExpr>;

/// The complete output of one resolution pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bindings {
    pub service: ServiceBinding,
    pub types: Vec<TypeBinding>,
    pub aliases: AliasTable,
}
