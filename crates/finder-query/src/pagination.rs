use serde::{Deserialize, Serialize};

use crate::error::QueryError;

pub const DEFAULT_ELEMENTS_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationMode {
    Paginate,
    All,
    Firsts,
}

/// Page window of a search. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub mode: PaginationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements_per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::paginate(DEFAULT_ELEMENTS_PER_PAGE, 1)
    }
}

impl Pagination {
    pub fn paginate(elements_per_page: u32, current_page: u32) -> Self {
        Self {
            mode: PaginationMode::Paginate,
            elements_per_page: Some(elements_per_page),
            current_page: Some(current_page),
        }
    }

    pub fn all() -> Self {
        Self {
            mode: PaginationMode::All,
            elements_per_page: None,
            current_page: None,
        }
    }

    pub fn firsts(elements: u32) -> Self {
        Self {
            mode: PaginationMode::Firsts,
            elements_per_page: Some(elements),
            current_page: None,
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        match self.mode {
            PaginationMode::All => Ok(()),
            PaginationMode::Firsts => match self.elements_per_page {
                Some(n) if n > 0 => Ok(()),
                _ => Err(QueryError::InvalidPagination(
                    "Firsts requires a positive elementsPerPage".into(),
                )),
            },
            PaginationMode::Paginate => match (self.elements_per_page, self.current_page) {
                (Some(n), Some(p)) if n > 0 && p > 0 => Ok(()),
                _ => Err(QueryError::InvalidPagination(
                    "Paginate requires positive elementsPerPage and currentPage".into(),
                )),
            },
        }
    }

    fn per_page(&self) -> u64 {
        u64::from(self.elements_per_page.unwrap_or(0))
    }

    fn page(&self) -> u64 {
        u64::from(self.current_page.unwrap_or(1))
    }

    /// 1-based index of the first element on the current page.
    pub fn start_element_index(&self) -> u64 {
        self.per_page() * self.page().saturating_sub(1) + 1
    }

    /// 1-based index of the last element when the page holds `rows` rows.
    pub fn end_element_index(&self, rows: u64) -> u64 {
        (self.start_element_index() + rows).saturating_sub(1)
    }

    pub fn total_pages(&self, total_elements: u64) -> u64 {
        match self.per_page() {
            0 => 1,
            per_page => total_elements.div_ceil(per_page).max(1),
        }
    }

    pub fn max_element_index(&self) -> u64 {
        (self.per_page() * (self.page() + 1)).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_index_of_pages() {
        assert_eq!(Pagination::paginate(20, 1).start_element_index(), 1);
        assert_eq!(Pagination::paginate(20, 3).start_element_index(), 41);
    }

    #[test]
    fn end_index_counts_rows() {
        assert_eq!(Pagination::paginate(20, 3).end_element_index(20), 60);
        assert_eq!(Pagination::paginate(20, 3).end_element_index(5), 45);
        assert_eq!(Pagination::paginate(20, 1).end_element_index(0), 0);
    }

    #[test]
    fn total_pages_rounds_up_with_floor_of_one() {
        assert_eq!(Pagination::paginate(20, 1).total_pages(45), 3);
        assert_eq!(Pagination::paginate(20, 1).total_pages(40), 2);
        assert_eq!(Pagination::paginate(20, 1).total_pages(0), 1);
        assert_eq!(Pagination::all().total_pages(500), 1);
    }

    #[test]
    fn max_element_index_spans_next_page() {
        assert_eq!(Pagination::paginate(20, 1).max_element_index(), 39);
    }

    #[test]
    fn validate_requires_fields_per_mode() {
        assert!(Pagination::default().validate().is_ok());
        assert!(Pagination::all().validate().is_ok());
        assert!(Pagination::firsts(5).validate().is_ok());

        let missing_page = Pagination {
            mode: PaginationMode::Paginate,
            elements_per_page: Some(20),
            current_page: None,
        };
        assert!(matches!(
            missing_page.validate(),
            Err(QueryError::InvalidPagination(_))
        ));
        assert!(Pagination::paginate(20, 0).validate().is_err());
        assert!(Pagination::firsts(0).validate().is_err());
    }

    #[test]
    fn serializes_camel_case_without_empty_fields() {
        let json = serde_json::to_value(Pagination::all()).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "All" }));

        let json = serde_json::to_value(Pagination::paginate(10, 2)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "mode": "Paginate", "elementsPerPage": 10, "currentPage": 2 })
        );
    }
}
