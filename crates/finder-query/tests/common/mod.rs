#![allow(dead_code)]

use finder_query::{
    ColumnDescription, FilterType, FindOptions, FindOptionsParsed, NormalizeConfig,
    QueryDescription, QuerySchema, TypeCatalog, TypeInfo, TypeKind, TypeReference,
    parse_find_options, type_names,
};

pub const QUERY: &str = "Order";

pub fn order_schema() -> QuerySchema {
    let description = QueryDescription::new(
        QUERY,
        [
            ColumnDescription::new("Entity", TypeReference::new("Order").lite(), Some(FilterType::Lite)),
            ColumnDescription::new("Id", TypeReference::new(type_names::NUMBER), Some(FilterType::Integer))
                .groupable(),
            ColumnDescription::new("Status", TypeReference::new(type_names::STRING), Some(FilterType::String))
                .groupable(),
            ColumnDescription::new("Amount", TypeReference::new(type_names::DECIMAL), Some(FilterType::Decimal))
                .unit("EUR"),
            ColumnDescription::new("Customer", TypeReference::new("Customer").lite(), Some(FilterType::Lite))
                .groupable(),
            ColumnDescription::new(
                "Lines",
                TypeReference::new("OrderLine").embedded().collection(),
                None,
            ),
            ColumnDescription::new("CreatedOn", TypeReference::new(type_names::DATETIME), Some(FilterType::DateTime))
                .groupable()
                .display_name("Created on"),
            ColumnDescription::new("Notes", TypeReference::new(type_names::STRING), Some(FilterType::String)),
            ColumnDescription::new("Priority", TypeReference::new("Priority"), Some(FilterType::Enum))
                .groupable(),
        ],
    );

    let catalog = TypeCatalog::new()
        .with(TypeInfo::new(
            "Customer",
            TypeKind::Entity,
            [
                ColumnDescription::new("Name", TypeReference::new(type_names::STRING), Some(FilterType::String))
                    .groupable(),
                ColumnDescription::new("Country", TypeReference::new(type_names::STRING), Some(FilterType::String))
                    .groupable(),
            ],
        ))
        .with(TypeInfo::new(
            "OrderLine",
            TypeKind::Embedded,
            [
                ColumnDescription::new("Product", TypeReference::new(type_names::STRING), Some(FilterType::String))
                    .groupable(),
                ColumnDescription::new("Quantity", TypeReference::new(type_names::NUMBER), Some(FilterType::Integer)),
            ],
        ))
        .with(TypeInfo::new("Priority", TypeKind::Enum, []));

    QuerySchema::new(description, catalog)
}

pub fn parse(fo: &FindOptions) -> FindOptionsParsed {
    parse_find_options(fo, &order_schema(), &NormalizeConfig::strict())
        .unwrap()
        .into_inner()
}

pub fn column_keys(fop: &FindOptionsParsed) -> Vec<String> {
    fop.column_options
        .iter()
        .filter_map(|c| c.full_key().map(str::to_string))
        .collect()
}

pub fn order_keys(fop: &FindOptionsParsed) -> Vec<String> {
    fop.order_options
        .iter()
        .map(|o| o.token.full_key.clone())
        .collect()
}
