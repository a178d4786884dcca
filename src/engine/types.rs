//! Semantic types and converters.
//!
//! Every placeholder in a pattern (`%number%`, `%players%`, `%text/number%`)
//! names one or more semantic types. This module owns the table those names
//! resolve against:
//!
//! - **Types** ([`TypeInfo`]): a singular and a plural name, an optional parent
//!   (`player` → `entity`) and an optional literal parser used as the loader's
//!   last resort (`"5"` under `number`).
//! - **Converters**: `(from, to)` functions the loader may wrap around a
//!   sub-expression whose static type differs from what a placeholder wants.
//!
//! ## Invariants
//!
//! - `SemanticType` is an index into `TypeRegistry::entries`.
//! - `object` is always index 0 and every type is assignable to it.
//! - Converters are kept in registration order so lookups are deterministic.

use crate::error::RegistryError;
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

/// Handle to a registered semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticType(u16);

impl SemanticType {
    pub const OBJECT: SemanticType = SemanticType(0);
    pub const NUMBER: SemanticType = SemanticType(1);
    pub const TEXT: SemanticType = SemanticType(2);
    pub const BOOLEAN: SemanticType = SemanticType(3);
    pub const DATE: SemanticType = SemanticType(4);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parses literal text of one type (e.g. `"12.5"` for `number`).
pub type LiteralParser = fn(&str) -> Option<Value>;

/// Converts a value of one type to another; `None` drops the value.
pub type Converter = fn(&Value) -> Option<Value>;

/// Registration data for one semantic type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub plural: String,
    pub parent: Option<String>,
    pub literal: Option<LiteralParser>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, plural: impl Into<String>) -> Self {
        TypeInfo { name: name.into(), plural: plural.into(), parent: None, literal: None }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn literal(mut self, parser: LiteralParser) -> Self {
        self.literal = Some(parser);
        self
    }
}

#[derive(Debug)]
struct TypeEntry {
    name: String,
    plural: String,
    parent: Option<SemanticType>,
    literal: Option<LiteralParser>,
}

/// The union of types a placeholder accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSet(Vec<SemanticType>);

impl TypeSet {
    /// Accepts anything.
    pub fn any() -> Self {
        TypeSet(vec![SemanticType::OBJECT])
    }

    pub fn of(ty: SemanticType) -> Self {
        TypeSet(vec![ty])
    }

    pub fn from_types(types: Vec<SemanticType>) -> Self {
        TypeSet(types)
    }

    pub fn is_any(&self) -> bool {
        self.0.contains(&SemanticType::OBJECT)
    }

    pub fn iter(&self) -> impl Iterator<Item = SemanticType> + '_ {
        self.0.iter().copied()
    }
}

/// Table of semantic types and converters.
#[derive(Debug)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    /// Lowercased singular and plural names -> (type, is_plural).
    by_name: HashMap<String, (SemanticType, bool)>,
    converters: Vec<(SemanticType, SemanticType, Converter)>,
}

impl TypeRegistry {
    /// A registry holding only the built-in types and converters.
    pub fn with_builtins() -> Self {
        let mut reg = TypeRegistry { entries: Vec::new(), by_name: HashMap::new(), converters: Vec::new() };
        let builtins = [
            TypeInfo::new("object", "objects"),
            TypeInfo::new("number", "numbers").literal(parse_number),
            TypeInfo::new("text", "texts"),
            TypeInfo::new("boolean", "booleans").literal(parse_boolean),
            TypeInfo::new("date", "dates").literal(parse_date),
        ];
        for info in builtins {
            // Built-in names are distinct, registration cannot fail.
            let _ = reg.register(info);
        }
        reg.add_converter(SemanticType::NUMBER, SemanticType::TEXT, to_text);
        reg.add_converter(SemanticType::BOOLEAN, SemanticType::TEXT, to_text);
        reg.add_converter(SemanticType::DATE, SemanticType::TEXT, to_text);
        reg
    }

    pub fn register(&mut self, info: TypeInfo) -> Result<SemanticType, RegistryError> {
        let singular = info.name.to_lowercase();
        let plural = info.plural.to_lowercase();
        if self.by_name.contains_key(&singular) || self.by_name.contains_key(&plural) {
            return Err(RegistryError::DuplicateType(info.name));
        }
        let parent = match &info.parent {
            Some(name) => Some(self.lookup(name).map(|(ty, _)| ty).ok_or_else(|| RegistryError::UnknownType(name.clone()))?),
            None => None,
        };
        let ty = SemanticType(self.entries.len() as u16);
        self.by_name.insert(singular, (ty, false));
        self.by_name.insert(plural, (ty, true));
        self.entries.push(TypeEntry { name: info.name, plural: info.plural, parent, literal: info.literal });
        Ok(ty)
    }

    pub fn add_converter(&mut self, from: SemanticType, to: SemanticType, converter: Converter) {
        self.converters.push((from, to, converter));
    }

    /// Resolve a type name; the flag is true when the plural form was used.
    pub fn lookup(&self, name: &str) -> Option<(SemanticType, bool)> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }

    pub fn name(&self, ty: SemanticType) -> &str {
        self.entries.get(ty.index()).map(|e| e.name.as_str()).unwrap_or("object")
    }

    pub fn plural_name(&self, ty: SemanticType) -> &str {
        self.entries.get(ty.index()).map(|e| e.plural.as_str()).unwrap_or("objects")
    }

    /// Display form of a type set, e.g. `number/text`.
    pub fn describe(&self, set: &TypeSet) -> String {
        set.iter().map(|t| self.name(t)).collect::<Vec<_>>().join("/")
    }

    /// True when values of `from` may be used where `to` is expected.
    pub fn is_assignable(&self, from: SemanticType, to: SemanticType) -> bool {
        if to == SemanticType::OBJECT {
            return true;
        }
        let mut cur = Some(from);
        while let Some(ty) = cur {
            if ty == to {
                return true;
            }
            cur = self.entries.get(ty.index()).and_then(|e| e.parent);
        }
        false
    }

    pub fn accepts(&self, set: &TypeSet, ty: SemanticType) -> bool {
        set.iter().any(|target| self.is_assignable(ty, target))
    }

    /// First converter (registration order) taking `from` (or one of its
    /// ancestors) to a type accepted by `set`.
    pub fn converter_into(&self, from: SemanticType, set: &TypeSet) -> Option<(SemanticType, Converter)> {
        self.converters
            .iter()
            .find(|(src, dst, _)| self.is_assignable(from, *src) && self.accepts(set, *dst))
            .map(|(_, dst, conv)| (*dst, *conv))
    }

    /// True when a node of type `from` can satisfy `set`, directly or through
    /// a converter.
    pub fn reachable(&self, from: SemanticType, set: &TypeSet) -> bool {
        self.accepts(set, from) || self.converter_into(from, set).is_some()
    }

    /// Dynamic type of a runtime value, if its type is registered.
    pub fn type_of(&self, value: &Value) -> Option<SemanticType> {
        self.lookup(value.type_name()).map(|(ty, _)| ty)
    }

    /// Run the literal parser of `ty`, if it has one.
    pub fn parse_literal(&self, ty: SemanticType, text: &str) -> Option<Value> {
        self.entries.get(ty.index())?.literal.and_then(|parse| parse(text))
    }

    /// Type ids in registration order.
    pub fn types(&self) -> impl Iterator<Item = SemanticType> + '_ {
        (0..self.entries.len()).map(|i| SemanticType(i as u16))
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let re = regex!(r"^[-+]?(\d+(\.\d+)?|\.\d+)$");
    let text = text.trim();
    if !re.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().map(Value::Number)
}

fn parse_boolean(text: &str) -> Option<Value> {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" => Some(Value::Boolean(true)),
        "false" | "no" | "off" => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<Value> {
    let text = text.trim();
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Value::Date(dt));
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(Value::Date)
}

fn to_text(value: &Value) -> Option<Value> {
    Some(Value::text(value.to_string()))
}
