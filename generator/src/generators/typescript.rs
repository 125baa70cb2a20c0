use std::collections::{BTreeSet, HashSet};

use dt_candid::{CandidId, PrimitiveType};

use super::common::{
    walk, Artifact, ArtifactKind, BindingVisitor, EmitOptions, GeneratorContext, GENERATED_BY,
};
use crate::binding::{
    AliasTable, Bindings, Method, RecordBinding, ServiceBinding, TypeBinding, TypeExpr,
    VariantBinding,
};
use crate::error::EmitError;
use crate::naming::{convert_disambiguated, disambiguate, CamelCase};

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Indentation-aware line buffer.
#[derive(Default)]
struct Source {
    text: String,
    depth: usize,
}

impl Source {
    fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.depth {
                self.text.push_str("  ");
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.depth += 1;
    }

    fn close(&mut self, line: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(line);
    }
}

struct TypescriptVisitor {
    runtime: String,
    files: HashSet<String>,
}

impl TypescriptVisitor {
    fn new(options: &EmitOptions) -> Result<Self, EmitError> {
        if options.runtime.trim().is_empty() || options.runtime.contains('"') {
            return Err(EmitError::InvalidPath {
                path: options.runtime.clone(),
            });
        }
        Ok(Self {
            runtime: options.runtime.clone(),
            files: HashSet::from(["index".to_string()]),
        })
    }

    fn check_identifier(name: &str) -> Result<(), EmitError> {
        let valid = name.starts_with(|c: char| c.is_alphabetic() || c == '_' || c == '$')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        if valid {
            Ok(())
        } else {
            Err(EmitError::InvalidIdentifier {
                name: name.to_string(),
            })
        }
    }

    fn type_name(name: &str) -> Result<String, EmitError> {
        Self::check_identifier(name)?;
        Ok(name.to_string())
    }

    /// camelCase name usable as a variable.
    fn variable_name(name: &str) -> Result<String, EmitError> {
        let name = convert_disambiguated::<CamelCase>(name);
        Self::check_identifier(&name)?;
        if RESERVED_WORDS.contains(&name.as_str()) {
            Ok(format!("{name}_"))
        } else {
            Ok(name)
        }
    }

    /// camelCase name of an object property; reserved words are fine here.
    fn property_name(name: &str) -> String {
        let name = convert_disambiguated::<CamelCase>(name);
        if Self::check_identifier(&name).is_ok() {
            name
        } else {
            format!("{name:?}")
        }
    }

    fn primitive_type(primitive: PrimitiveType) -> &'static str {
        match primitive {
            PrimitiveType::Text => "string",
            PrimitiveType::Bool => "boolean",
            PrimitiveType::Nat
            | PrimitiveType::Nat64
            | PrimitiveType::Int
            | PrimitiveType::Int64 => "bigint",
            PrimitiveType::Nat8
            | PrimitiveType::Nat16
            | PrimitiveType::Nat32
            | PrimitiveType::Int8
            | PrimitiveType::Int16
            | PrimitiveType::Int32
            | PrimitiveType::Float32
            | PrimitiveType::Float64 => "number",
            PrimitiveType::Principal => "Principal",
            PrimitiveType::Reserved | PrimitiveType::Empty | PrimitiveType::Null => "null",
        }
    }

    /// Renders `expr` as seen from anywhere: nested types are addressed through `owner_path`, the
    /// dotted path of the binding holding the expression.
    fn ts_type(expr: &TypeExpr, owner_path: &str) -> String {
        match expr {
            TypeExpr::Primitive(primitive) => Self::primitive_type(*primitive).to_string(),
            TypeExpr::Declared(name) => name.clone(),
            TypeExpr::Nested(name) => format!("{owner_path}.{name}"),
            TypeExpr::Vector(inner) => format!("Array<{}>", Self::ts_type(inner, owner_path)),
            TypeExpr::Optional(inner) => format!("[] | [{}]", Self::ts_type(inner, owner_path)),
        }
    }

    fn wire_label(id: &CandidId) -> String {
        match id {
            CandidId::Named(name) => format!("{name:?}"),
            CandidId::Numbered(id) => id.to_string(),
        }
    }

    fn write_binding(
        &self,
        out: &mut Source,
        owner_path: Option<&str>,
        binding: &TypeBinding,
    ) -> Result<(), EmitError> {
        let name = Self::type_name(binding.name())?;
        let path = match owner_path {
            Some(owner) => format!("{owner}.{name}"),
            None => name.clone(),
        };
        match binding {
            TypeBinding::Record(record) => Self::write_record(out, &path, &name, record),
            TypeBinding::Variant(variant) => Self::write_variant(out, &path, &name, variant),
            TypeBinding::Service(service) => self.write_service(out, &path, &name, service)?,
        }
        if !binding.sub_bindings().is_empty() {
            out.line("");
            out.open(format!("export namespace {name} {{"));
            for (index, sub_binding) in binding.sub_bindings().iter().enumerate() {
                if index > 0 {
                    out.line("");
                }
                self.write_binding(out, Some(&path), sub_binding)?;
            }
            out.close("}");
        }
        Ok(())
    }

    fn write_record(out: &mut Source, path: &str, name: &str, record: &RecordBinding) {
        out.open(format!("export interface {name} {{"));
        for field in &record.fields {
            out.line(format!("/** Wire label {}. */", Self::wire_label(&field.id)));
            out.line(format!(
                "{}: {};",
                Self::property_name(&field.name),
                Self::ts_type(&field.type_, path)
            ));
        }
        out.close("}");
    }

    fn write_variant(out: &mut Source, path: &str, name: &str, variant: &VariantBinding) {
        if variant.options.is_empty() {
            out.line(format!("export type {name} = never;"));
            return;
        }
        out.open(format!("export type {name} ="));
        for option in &variant.options {
            let payload = match &option.type_ {
                Some(type_) => Self::ts_type(type_, path),
                None => "null".to_string(),
            };
            out.line(format!(
                "| {{ {}: {payload} }} // {}",
                Self::property_name(&option.name),
                Self::wire_label(&option.id)
            ));
        }
        out.close(";");
    }

    /// A service travels as the principal of the canister implementing it.
    fn write_service(
        &self,
        out: &mut Source,
        path: &str,
        name: &str,
        service: &ServiceBinding,
    ) -> Result<(), EmitError> {
        out.line(format!("export type {name} = Principal;"));
        out.line("");
        out.line(format!("/** Client of the `{}` service. */", service.name));
        out.open(format!("export class {name}ApiClient {{"));
        out.line("constructor(private readonly agent: Agent, readonly canisterId: Principal) {}");
        for method in &service.methods {
            out.line("");
            Self::write_method(out, path, method)?;
        }
        out.close("}");
        Ok(())
    }

    fn write_method(out: &mut Source, path: &str, method: &Method) -> Result<(), EmitError> {
        let mut inputs = Vec::new();
        let mut encoded = Vec::new();
        for parameter in &method.parameters {
            match &parameter.type_ {
                Some(type_) => {
                    let name = Self::variable_name(&parameter.name)?;
                    inputs.push(format!("{name}: {}", Self::ts_type(type_, path)));
                    encoded.push(name);
                }
                None => encoded.push("null".to_string()),
            }
        }

        let mut patterns = Vec::new();
        let mut decoded_types = Vec::new();
        let mut outputs = Vec::new();
        let mut output_types = Vec::new();
        if !method.is_fire_and_forget {
            for parameter in &method.returns {
                match &parameter.type_ {
                    Some(type_) => {
                        let name = Self::variable_name(&parameter.name)?;
                        let type_ = Self::ts_type(type_, path);
                        patterns.push(name.clone());
                        decoded_types.push(type_.clone());
                        outputs.push(name);
                        output_types.push(type_);
                    }
                    None => {
                        patterns.push(String::new());
                        decoded_types.push("null".to_string());
                    }
                }
            }
        }
        let output_type = match &output_types[..] {
            [] => "void".to_string(),
            [single] => single.clone(),
            many => format!("[{}]", many.join(", ")),
        };
        let call = if method.is_fire_and_forget {
            "call"
        } else if method.is_query {
            "query"
        } else {
            "callAndWait"
        };

        let name = Self::variable_name(&method.name)?;
        out.line(format!("/** Calls `{}`. */", method.wire_name));
        out.open(format!(
            "async {name}({}): Promise<{output_type}> {{",
            inputs.join(", ")
        ));
        out.line(format!("const arg = encodeArgs([{}]);", encoded.join(", ")));
        let invocation = format!(
            "this.agent.{call}(this.canisterId, {:?}, arg)",
            method.wire_name
        );
        if decoded_types.is_empty() {
            out.line(format!("await {invocation};"));
        } else {
            out.line(format!("const reply = await {invocation};"));
            out.line(format!(
                "const [{}] = decodeArgs(reply) as [{}];",
                patterns.join(", "),
                decoded_types.join(", ")
            ));
            match &outputs[..] {
                [] => {}
                [single] => out.line(format!("return {single};")),
                many => out.line(format!("return [{}];", many.join(", "))),
            }
        }
        out.close("}");
        Ok(())
    }

    /// Header with the runtime imports and the declared types the file refers to, except for the
    /// one it defines itself.
    fn header(&self, binding: Option<&TypeBinding>, aliases: Option<&AliasTable>) -> Source {
        let mut declared = BTreeSet::new();
        if let Some(binding) = binding {
            collect_declared(binding, &mut declared);
            declared.remove(binding.name());
        }
        for target in aliases.into_iter().flat_map(|aliases| aliases.values()) {
            collect_declared_expr(target, &mut declared);
        }
        let has_client = binding.is_some_and(contains_service);

        let mut out = Source::default();
        out.line(format!("// {GENERATED_BY}"));
        out.line(format!(
            "import type {{ Agent, Principal }} from {:?};",
            self.runtime
        ));
        if has_client {
            out.line(format!(
                "import {{ decodeArgs, encodeArgs }} from {:?};",
                self.runtime
            ));
        }
        if !declared.is_empty() {
            let declared = declared.into_iter().collect::<Vec<_>>();
            out.line(format!(
                "import type {{ {} }} from \"./index\";",
                declared.join(", ")
            ));
        }
        out.line("");
        out
    }

    fn artifact(
        &mut self,
        kind: ArtifactKind,
        name: &str,
        source: Source,
    ) -> Result<Artifact, EmitError> {
        let file = disambiguate(&convert_disambiguated::<CamelCase>(name), &self.files)
            .ok_or_else(|| EmitError::InvalidIdentifier {
                name: name.to_string(),
            })?;
        self.files.insert(file.clone());
        Ok(Artifact {
            kind,
            name: name.to_string(),
            file_name: format!("{file}.ts"),
            source: source.text,
        })
    }

    fn visit_type_binding(
        &mut self,
        kind: ArtifactKind,
        binding: &TypeBinding,
    ) -> Result<Artifact, EmitError> {
        let mut out = self.header(Some(binding), None);
        self.write_binding(&mut out, None, binding)?;
        self.artifact(kind, binding.name(), out)
    }
}

fn collect_declared(binding: &TypeBinding, declared: &mut BTreeSet<String>) {
    for expr in binding.type_exprs() {
        collect_declared_expr(expr, declared);
    }
    for sub_binding in binding.sub_bindings() {
        collect_declared(sub_binding, declared);
    }
}

fn collect_declared_expr(expr: &TypeExpr, declared: &mut BTreeSet<String>) {
    expr.visit_names(&mut |named, _| {
        if let TypeExpr::Declared(name) = named {
            declared.insert(name.clone());
        }
    });
}

fn contains_service(binding: &TypeBinding) -> bool {
    matches!(binding, TypeBinding::Service(_))
        || binding.sub_bindings().iter().any(contains_service)
}

impl BindingVisitor for TypescriptVisitor {
    fn visit_record(
        &mut self,
        _context: &GeneratorContext,
        record: &RecordBinding,
    ) -> Result<Artifact, EmitError> {
        self.visit_type_binding(ArtifactKind::Type, &TypeBinding::Record(record.clone()))
    }

    fn visit_variant(
        &mut self,
        _context: &GeneratorContext,
        variant: &VariantBinding,
    ) -> Result<Artifact, EmitError> {
        self.visit_type_binding(ArtifactKind::Type, &TypeBinding::Variant(variant.clone()))
    }

    fn visit_service(
        &mut self,
        _context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError> {
        self.visit_type_binding(ArtifactKind::Type, &TypeBinding::Service(service.clone()))
    }

    fn visit_aliases(
        &mut self,
        _context: &GeneratorContext,
        aliases: &AliasTable,
    ) -> Result<Artifact, EmitError> {
        let mut out = self.header(None, Some(aliases));
        for (name, target) in aliases {
            let name = Self::type_name(name)?;
            out.line(format!(
                "export type {name} = {};",
                Self::ts_type(target, &name)
            ));
        }
        self.artifact(ArtifactKind::Aliases, "aliases", out)
    }

    fn visit_client(
        &mut self,
        _context: &GeneratorContext,
        service: &ServiceBinding,
    ) -> Result<Artifact, EmitError> {
        self.visit_type_binding(ArtifactKind::Client, &TypeBinding::Service(service.clone()))
    }

    fn visit_index(
        &mut self,
        _context: &GeneratorContext,
        artifacts: &[Artifact],
    ) -> Result<Artifact, EmitError> {
        let mut out = Source::default();
        out.line(format!("// {GENERATED_BY}"));
        for artifact in artifacts {
            let module = artifact
                .file_name
                .strip_suffix(".ts")
                .unwrap_or(&artifact.file_name);
            out.line(format!("export * from \"./{module}\";"));
        }
        Ok(Artifact {
            kind: ArtifactKind::Index,
            name: "index".to_string(),
            file_name: "index.ts".to_string(),
            source: out.text,
        })
    }
}

pub fn generate(bindings: &Bindings, options: &EmitOptions) -> Result<Vec<Artifact>, EmitError> {
    let context = GeneratorContext::new(bindings);
    let mut visitor = TypescriptVisitor::new(options)?;
    walk(&mut visitor, &context)
}
