mod config;
mod error;
pub mod group;
pub mod normalize;
mod operation;
mod options;
mod pagination;
mod parsed;
mod request;
mod resolve;
mod result;
mod schema;
mod token;

pub use config::NormalizeConfig;
pub use error::QueryError;
pub use group::{aggregate_parent_columns, can_have_min, disable_grouping, enable_grouping, group_filters};
pub use normalize::{
    Normalized, parse_filter_options, parse_find_options, to_filter_options, to_filter_requests,
    to_find_options, to_query_entities_request, to_query_request, to_query_value_request,
    without_aggregate,
};
pub use operation::{FilterGroupOperation, FilterOperation, FilterType, is_list};
pub use options::{
    ColumnOption, ColumnOptionsMode, FilterConditionOption, FilterGroupOption, FilterOption,
    FindOptions, OrderOption, OrderType, PinnedFilter, QueryTokenString, SystemTime,
    SystemTimeMode,
};
pub use pagination::{DEFAULT_ELEMENTS_PER_PAGE, Pagination, PaginationMode};
pub use parsed::{
    ColumnOptionParsed, FilterConditionOptionParsed, FilterGroupOptionParsed, FilterOptionParsed,
    FindOptionsParsed, OrderOptionParsed,
};
pub use request::{
    ColumnRequest, FilterConditionRequest, FilterGroupRequest, FilterRequest, OrderRequest,
    QueryEntitiesRequest, QueryRequest, QueryValueRequest,
};
pub use resolve::{SubTokensOptions, TokenCompleter, TokenRequest, TokenResolver};
pub use result::{Lite, ResultRow, ResultTable};
pub use schema::{
    ColumnDescription, ENTITY_COLUMN, ID_COLUMN, QueryDescription, QuerySchema, TypeCatalog,
    TypeInfo, TypeKind, TypeReference, type_names,
};
pub use token::{
    QueryToken, QueryTokenType, has_aggregate, has_any_or_all, is_prefix, to_query_token,
    token_parents, without_all_any,
};
