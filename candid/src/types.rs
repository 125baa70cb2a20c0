//! The type graph of a Candid service description.
//!
//! Nodes are plain owned values; links between declarations go through [`CandidType::Reference`]
//! and are resolved by id lookup, which is what allows recursive declarations.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::id::CandidId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Text,
    Bool,
    Nat,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Principal,
    Reserved,
    Empty,
    Null,
}

lazy_static! {
    static ref PRIMITIVE_KEYWORDS: IndexMap<&'static str, PrimitiveType> = {
        use PrimitiveType::*;
        [
            Text, Bool, Nat, Nat8, Nat16, Nat32, Nat64, Int, Int8, Int16, Int32, Int64, Float32,
            Float64, Principal, Reserved, Empty, Null,
        ]
        .into_iter()
        .map(|primitive| (primitive.keyword(), primitive))
        .collect()
    };
}

impl PrimitiveType {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Nat => "nat",
            Self::Nat8 => "nat8",
            Self::Nat16 => "nat16",
            Self::Nat32 => "nat32",
            Self::Nat64 => "nat64",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Principal => "principal",
            Self::Reserved => "reserved",
            Self::Empty => "empty",
            Self::Null => "null",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        PRIMITIVE_KEYWORDS.get(keyword).copied()
    }

    pub fn all() -> impl Iterator<Item = Self> {
        PRIMITIVE_KEYWORDS.values().copied()
    }

    /// `reserved`, `empty` and `null` carry no value worth binding to a variable.
    pub fn is_zero_width(&self) -> bool {
        matches!(self, Self::Reserved | Self::Empty | Self::Null)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FuncMode {
    Query,
    CompositeQuery,
    Oneway,
}

impl FuncMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::CompositeQuery => "composite_query",
            Self::Oneway => "oneway",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "query" => Some(Self::Query),
            "composite_query" => Some(Self::CompositeQuery),
            "oneway" => Some(Self::Oneway),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidType {
    Primitive(PrimitiveType),
    Vector(Box<CandidType>),
    Optional(Box<CandidType>),
    Reference(CandidId),
    Record(RecordType),
    Variant(VariantType),
    Service(ServiceType),
    Func(FuncType),
}

impl CandidType {
    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference(CandidId::named(id))
    }

    pub fn vector(inner: CandidType) -> Self {
        Self::Vector(Box::new(inner))
    }

    pub fn optional(inner: CandidType) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Vector(_) => "vec",
            Self::Optional(_) => "opt",
            Self::Reference(_) => "reference",
            Self::Record(_) => "record",
            Self::Variant(_) => "variant",
            Self::Service(_) => "service",
            Self::Func(_) => "func",
        }
    }
}

impl From<PrimitiveType> for CandidType {
    fn from(primitive: PrimitiveType) -> Self {
        Self::Primitive(primitive)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordType {
    pub fields: IndexMap<CandidId, CandidType>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantType {
    pub options: IndexMap<CandidId, CandidType>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceType {
    /// Keyed by the method name exactly as written in the schema.
    pub methods: IndexMap<String, FuncType>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuncType {
    pub modes: BTreeSet<FuncMode>,
    pub arg_types: Vec<ParameterType>,
    pub return_types: Vec<ParameterType>,
}

impl FuncType {
    pub fn is_query(&self) -> bool {
        self.modes.contains(&FuncMode::Query) || self.modes.contains(&FuncMode::CompositeQuery)
    }

    pub fn is_oneway(&self) -> bool {
        self.modes.contains(&FuncMode::Oneway)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterType {
    pub name: Option<String>,
    pub type_: CandidType,
}

impl ParameterType {
    pub fn unnamed(type_: CandidType) -> Self {
        Self { name: None, type_ }
    }

    pub fn named(name: impl Into<String>, type_: CandidType) -> Self {
        Self {
            name: Some(name.into()),
            type_,
        }
    }
}

/// A loaded `.did` file: the declared types plus the one service it describes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceFile {
    pub declared_types: IndexMap<CandidId, CandidType>,
    pub service: ServiceType,
    /// Set when the actor is written as a reference to a declared service type.
    pub service_reference_id: Option<CandidId>,
    /// The name after `service`, if one was written.
    pub service_name: Option<String>,
}

// Display renders IDL text again

fn write_label(f: &mut fmt::Formatter<'_>, id: &CandidId) -> fmt::Result {
    match id {
        CandidId::Named(name) if is_plain_label(name) => f.write_str(name),
        CandidId::Named(name) => write!(f, "\"{name}\""),
        CandidId::Numbered(id) => write!(f, "{id}"),
    }
}

fn is_plain_label(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for CandidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.keyword()),
            Self::Vector(inner) => write!(f, "vec {inner}"),
            Self::Optional(inner) => write!(f, "opt {inner}"),
            Self::Reference(id) => write_label(f, id),
            Self::Record(record) => write!(f, "{record}"),
            Self::Variant(variant) => write!(f, "{variant}"),
            Self::Service(service) => write!(f, "{service}"),
            Self::Func(func) => write!(f, "func {func}"),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("record {")?;
        for (id, type_) in &self.fields {
            f.write_str(" ")?;
            write_label(f, id)?;
            write!(f, " : {type_};")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("variant {")?;
        for (id, type_) in &self.options {
            f.write_str(" ")?;
            write_label(f, id)?;
            if *type_ != CandidType::Primitive(PrimitiveType::Null) {
                write!(f, " : {type_}")?;
            }
            f.write_str(";")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("service {")?;
        for (name, func) in &self.methods {
            f.write_str(" ")?;
            write_label(f, &CandidId::named(name.as_str()))?;
            write!(f, " : {func};")?;
        }
        f.write_str(" }")
    }
}

fn write_parameters(f: &mut fmt::Formatter<'_>, parameters: &[ParameterType]) -> fmt::Result {
    f.write_str("(")?;
    for (i, parameter) in parameters.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &parameter.name {
            write!(f, "{name} : ")?;
        }
        write!(f, "{}", parameter.type_)?;
    }
    f.write_str(")")
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_parameters(f, &self.arg_types)?;
        f.write_str(" -> ")?;
        write_parameters(f, &self.return_types)?;
        for mode in &self.modes {
            write!(f, " {}", mode.keyword())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip() {
        for primitive in PrimitiveType::all() {
            assert_eq!(PrimitiveType::from_keyword(primitive.keyword()), Some(primitive));
        }
        assert_eq!(PrimitiveType::all().count(), 18);
        assert_eq!(PrimitiveType::from_keyword("blob"), None);
    }

    #[test]
    fn zero_width_markers() {
        let zero_width = PrimitiveType::all()
            .filter(PrimitiveType::is_zero_width)
            .collect::<Vec<_>>();
        assert_eq!(
            zero_width,
            vec![
                PrimitiveType::Reserved,
                PrimitiveType::Empty,
                PrimitiveType::Null
            ]
        );
    }

    #[test]
    fn call_modes() {
        let mut func = FuncType::default();
        assert!(!func.is_query() && !func.is_oneway());
        func.modes.insert(FuncMode::CompositeQuery);
        assert!(func.is_query());
        func.modes.insert(FuncMode::Oneway);
        assert!(func.is_oneway());
    }

    #[test]
    fn displays_as_idl() {
        let mut record = RecordType::default();
        record.fields.insert(
            CandidId::named("owner"),
            PrimitiveType::Principal.into(),
        );
        record.fields.insert(
            CandidId::Numbered(1),
            CandidType::optional(CandidType::vector(PrimitiveType::Nat8.into())),
        );
        assert_eq!(
            CandidType::Record(record).to_string(),
            "record { owner : principal; 1 : opt vec nat8; }"
        );

        let mut variant = VariantType::default();
        variant
            .options
            .insert(CandidId::named("ok"), CandidType::reference("Value"));
        variant
            .options
            .insert(CandidId::named("not found"), PrimitiveType::Null.into());
        assert_eq!(
            CandidType::Variant(variant).to_string(),
            "variant { ok : Value; \"not found\"; }"
        );

        let func = FuncType {
            modes: [FuncMode::Query].into_iter().collect(),
            arg_types: vec![ParameterType::named("id", PrimitiveType::Nat64.into())],
            return_types: vec![ParameterType::unnamed(PrimitiveType::Text.into())],
        };
        assert_eq!(
            CandidType::Func(func).to_string(),
            "func (id : nat64) -> (text) query"
        );
    }
}
