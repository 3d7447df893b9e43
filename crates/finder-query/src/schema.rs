use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::operation::FilterType;

/// Name of the column holding the row's entity reference.
pub const ENTITY_COLUMN: &str = "Entity";
/// Name of the identity column.
pub const ID_COLUMN: &str = "Id";

/// Wire names of the built-in value types.
pub mod type_names {
    pub const NUMBER: &str = "number";
    pub const DECIMAL: &str = "decimal";
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const DATETIME: &str = "datetime";
    pub const GUID: &str = "Guid";
    pub const TIMESPAN: &str = "TimeSpan";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeReference {
    pub name: String,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default)]
    pub is_lite: bool,
    #[serde(default)]
    pub is_embedded: bool,
    #[serde(default)]
    pub is_not_nullable: bool,
}

impl TypeReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: false,
            is_lite: false,
            is_embedded: false,
            is_not_nullable: false,
        }
    }

    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    pub fn lite(mut self) -> Self {
        self.is_lite = true;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.is_embedded = true;
        self
    }

    pub fn not_nullable(mut self) -> Self {
        self.is_not_nullable = true;
        self
    }

    /// The type of one element of a collection type.
    pub fn element(&self) -> TypeReference {
        TypeReference {
            is_collection: false,
            ..self.clone()
        }
    }

    /// Numeric scalar: integers, decimals and durations.
    pub fn is_numeric(&self) -> bool {
        !self.is_collection
            && matches!(
                self.name.as_str(),
                type_names::NUMBER | type_names::DECIMAL | type_names::TIMESPAN
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
    pub display_name: String,
    #[serde(default)]
    pub is_groupable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub has_order_adapter: bool,
    #[serde(default)]
    pub prefer_equals: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_route: Option<String>,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, type_ref: TypeReference, filter_type: Option<FilterType>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            type_ref,
            filter_type,
            is_groupable: false,
            unit: None,
            format: None,
            has_order_adapter: false,
            prefer_equals: false,
            property_route: None,
        }
    }

    pub fn groupable(mut self) -> Self {
        self.is_groupable = true;
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Schema snapshot of one query: its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescription {
    pub query_key: String,
    pub columns: IndexMap<String, ColumnDescription>,
}

impl QueryDescription {
    pub fn new(
        query_key: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnDescription>,
    ) -> Self {
        Self {
            query_key: query_key.into(),
            columns: columns
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.get(name)
    }

    pub fn entity_column(&self) -> Option<&ColumnDescription> {
        self.column(ENTITY_COLUMN)
    }

    /// Columns shown when the options do not replace them: all but `Entity`.
    pub fn default_columns(&self) -> impl Iterator<Item = &ColumnDescription> {
        self.columns.values().filter(|c| c.name != ENTITY_COLUMN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Entity,
    Embedded,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub members: IndexMap<String, ColumnDescription>,
}

impl TypeInfo {
    pub fn new(
        name: impl Into<String>,
        kind: TypeKind,
        members: impl IntoIterator<Item = ColumnDescription>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            members: members
                .into_iter()
                .map(|m| (m.name.clone(), m))
                .collect(),
        }
    }
}

/// Member layout of the entity, embedded and enum types reachable from queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCatalog {
    #[serde(default)]
    types: HashMap<String, TypeInfo>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: TypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    pub fn with(mut self, info: TypeInfo) -> Self {
        self.register(info);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.get(name).is_some_and(|t| t.kind == TypeKind::Enum)
    }

    /// Members navigable from a value of `type_ref`; empty for scalars and enums.
    pub fn members_of(&self, type_ref: &TypeReference) -> impl Iterator<Item = &ColumnDescription> {
        let info = if type_ref.is_collection {
            None
        } else {
            self.get(&type_ref.name)
                .filter(|t| t.kind != TypeKind::Enum)
        };
        info.into_iter().flat_map(|t| t.members.values())
    }

    /// Filter category for a value of `type_ref`, `None` when it cannot be filtered directly.
    pub fn filter_type_of(&self, type_ref: &TypeReference) -> Option<FilterType> {
        if type_ref.is_collection {
            return None;
        }
        if type_ref.is_lite {
            return Some(FilterType::Lite);
        }
        if type_ref.is_embedded {
            return Some(FilterType::Embedded);
        }
        match type_ref.name.as_str() {
            type_names::NUMBER => Some(FilterType::Integer),
            type_names::DECIMAL => Some(FilterType::Decimal),
            type_names::STRING => Some(FilterType::String),
            type_names::BOOLEAN => Some(FilterType::Boolean),
            type_names::DATETIME => Some(FilterType::DateTime),
            type_names::TIMESPAN => Some(FilterType::Time),
            type_names::GUID => Some(FilterType::Guid),
            other => self.get(other).map(|t| match t.kind {
                TypeKind::Entity => FilterType::Lite,
                TypeKind::Embedded => FilterType::Embedded,
                TypeKind::Enum => FilterType::Enum,
            }),
        }
    }
}

/// A query description together with the catalog its paths navigate through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySchema {
    pub description: QueryDescription,
    #[serde(default)]
    pub catalog: TypeCatalog,
}

impl QuerySchema {
    pub fn new(description: QueryDescription, catalog: TypeCatalog) -> Self {
        Self {
            description,
            catalog,
        }
    }

    pub fn query_key(&self) -> &str {
        &self.description.query_key
    }

    pub fn description(&self) -> &QueryDescription {
        &self.description
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }
}
