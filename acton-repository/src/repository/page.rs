//! Ordering, page requests and paged results
//!
//! A [`PageRequest`] selects a window (page number, page size, [`Sort`]) of a
//! query's result. The repository answers with a [`Page`], which carries the
//! total element count, or with a [`Slice`], which only knows whether another
//! page follows and therefore never needs a count query.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::{OrderDirection, Page, PageRequest, Sort};
//!
//! let request = PageRequest::of(0, 3)
//!     .unwrap()
//!     .with_sort(Sort::by(OrderDirection::Descending, ["username"]));
//! assert_eq!(request.offset(), 0);
//!
//! let page = Page::of(vec!["EEE", "DDD", "CCC"], 0, 3, 5).unwrap();
//! assert_eq!(page.total_pages(), 2);
//! assert!(page.is_first());
//! assert!(page.has_next());
//! ```

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::error::RepositoryError;
use super::traits::RepositoryResult;
use crate::config::PagingConfig;

/// Direction for ordering results
///
/// ```rust
/// use acton_repository::repository::OrderDirection;
///
/// assert_eq!(OrderDirection::Descending.to_string(), "desc");
/// assert_eq!(OrderDirection::parse("ASC"), Some(OrderDirection::Ascending));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[serde(alias = "desc")]
    Descending,
}

impl OrderDirection {
    /// Parse `asc`/`desc` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") || value.eq_ignore_ascii_case("ascending") {
            Some(Self::Ascending)
        } else if value.eq_ignore_ascii_case("desc") || value.eq_ignore_ascii_case("descending") {
            Some(Self::Descending)
        } else {
            None
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Ordering on a single property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    /// Field to order by
    pub property: String,
    /// Direction of the ordering
    pub direction: OrderDirection,
}

impl Order {
    /// Ascending order on `property`
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending order on `property`
    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: OrderDirection::Descending,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.direction.to_string().to_uppercase())
    }
}

/// Ordered list of [`Order`]s; earlier orders take precedence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// No ordering
    pub const fn unsorted() -> Self {
        Self { orders: Vec::new() }
    }

    /// Order by each of `properties` in `direction`
    pub fn by<I, S>(direction: OrderDirection, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            orders: properties
                .into_iter()
                .map(|property| Order {
                    property: property.into(),
                    direction,
                })
                .collect(),
        }
    }

    /// Build from explicit orders
    pub fn from_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Append `other`'s orders after this sort's orders
    ///
    /// Properties already ordered by `self` keep their first direction.
    #[must_use]
    pub fn and(mut self, other: Sort) -> Self {
        for order in other.orders {
            if !self.orders.iter().any(|o| o.property == order.property) {
                self.orders.push(order);
            }
        }
        self
    }

    /// Whether any ordering is present
    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Orders in precedence order
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Parse request-style sort expressions such as `"username,desc"`
    ///
    /// Each expression lists one or more properties, optionally followed by a
    /// direction that applies to all of them. Without a direction the order is
    /// ascending.
    ///
    /// ```rust
    /// use acton_repository::repository::{Order, Sort};
    ///
    /// let sort = Sort::parse(["username,desc", "age"]).unwrap();
    /// assert_eq!(sort.orders(), [Order::desc("username"), Order::asc("age")]);
    /// assert!(Sort::parse([",desc"]).is_err());
    /// ```
    pub fn parse<I, S>(expressions: I) -> RepositoryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut orders = Vec::new();
        for expression in expressions {
            let expression = expression.as_ref();
            let mut parts: Vec<&str> = expression.split(',').map(str::trim).collect();
            let direction = match parts.last().and_then(|last| OrderDirection::parse(last)) {
                Some(direction) => {
                    parts.pop();
                    direction
                }
                None => OrderDirection::Ascending,
            };
            if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
                return Err(RepositoryError::invalid_page_parameters(format!(
                    "invalid sort expression `{expression}`"
                )));
            }
            orders.extend(parts.into_iter().map(|property| Order {
                property: property.to_string(),
                direction,
            }));
        }
        Ok(Self { orders })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.orders.is_empty() {
            return write!(f, "UNSORTED");
        }
        for (i, order) in self.orders.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{order}")?;
        }
        Ok(())
    }
}

/// Raw offset/limit window handed to storage
///
/// ```rust
/// use acton_repository::repository::Pagination;
///
/// let window = Pagination::new(40, 20); // skip 40, take 20
/// assert_eq!(window.offset, 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Create pagination for the first page with the given limit
    #[must_use]
    pub const fn first_page(limit: u64) -> Self {
        Self { offset: 0, limit }
    }
}

/// Zero-based page number, page size and ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u64,
    page_size: u64,
    sort: Sort,
}

impl PageRequest {
    /// Request page `page_number` (zero-based) of `page_size` elements
    ///
    /// Fails with `InvalidPageParameters` if `page_size` is zero.
    pub fn of(page_number: u64, page_size: u64) -> RepositoryResult<Self> {
        if page_size == 0 {
            return Err(RepositoryError::invalid_page_parameters(
                "page size must be greater than zero",
            ));
        }
        Ok(Self {
            page_number,
            page_size,
            sort: Sort::unsorted(),
        })
    }

    /// Request the first page of `page_size` elements
    pub fn first(page_size: u64) -> RepositoryResult<Self> {
        Self::of(0, page_size)
    }

    /// Replace the ordering
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Build from externally supplied parameters
    ///
    /// Missing values fall back to `config`; the size is capped at
    /// `config.max_page_size`. With `one_indexed` paging the caller's first
    /// page is `1`.
    ///
    /// ```rust
    /// use acton_repository::config::PagingConfig;
    /// use acton_repository::repository::{PageParams, PageRequest};
    ///
    /// let params = PageParams { page: Some(2), size: Some(500), sort: vec!["age,desc".into()] };
    /// let request = PageRequest::from_params(&params, &PagingConfig::default()).unwrap();
    /// assert_eq!(request.page_size(), 100);
    /// assert_eq!(request.offset(), 200);
    /// ```
    pub fn from_params(params: &PageParams, config: &PagingConfig) -> RepositoryResult<Self> {
        let base = u64::from(config.one_indexed);
        let page = match params.page {
            None => 0,
            Some(page) => u64::try_from(page)
                .ok()
                .and_then(|page| page.checked_sub(base))
                .ok_or_else(|| {
                    RepositoryError::invalid_page_parameters(format!(
                        "page number must be at least {base}, got {page}"
                    ))
                })?,
        };
        let size = match params.size {
            None => config.default_page_size,
            Some(size) => u64::try_from(size)
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    RepositoryError::invalid_page_parameters(format!(
                        "page size must be greater than zero, got {size}"
                    ))
                })?,
        };
        let sort = if params.sort.is_empty() {
            match &config.default_sort {
                Some(default_sort) => Sort::parse([default_sort])?,
                None => Sort::unsorted(),
            }
        } else {
            Sort::parse(&params.sort)?
        };
        Ok(Self::of(page, size.min(config.max_page_size.max(1)))?.with_sort(sort))
    }

    /// Zero-based page number
    pub const fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Requested page size
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Requested ordering
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of rows preceding this page
    pub const fn offset(&self) -> u64 {
        self.page_number.saturating_mul(self.page_size)
    }

    /// The storage window for this page
    pub const fn pagination(&self) -> Pagination {
        Pagination::new(self.offset(), self.page_size)
    }

    /// Request for the following page
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_add(1),
            page_size: self.page_size,
            sort: self.sort.clone(),
        }
    }

    /// Request for the preceding page, or this one if it is the first
    #[must_use]
    pub fn previous_or_first(&self) -> Self {
        Self {
            page_number: self.page_number.saturating_sub(1),
            page_size: self.page_size,
            sort: self.sort.clone(),
        }
    }
}

/// External paging parameters, e.g. decoded from a query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParams {
    /// Requested page (zero-based unless paging is configured one-indexed)
    pub page: Option<i64>,
    /// Requested page size
    pub size: Option<i64>,
    /// Sort expressions such as `"username,desc"`
    pub sort: Vec<String>,
}

/// One page of results with total counts
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    page_number: u64,
    page_size: u64,
    total_elements: u64,
    sort: Sort,
}

impl<T> Page<T> {
    /// Build a page, validating the size and the content length
    pub fn of(
        content: Vec<T>,
        page_number: u64,
        page_size: u64,
        total_elements: u64,
    ) -> RepositoryResult<Self> {
        if page_size == 0 {
            return Err(RepositoryError::invalid_page_parameters(
                "page size must be greater than zero",
            ));
        }
        if content.len() as u64 > page_size {
            return Err(RepositoryError::invalid_page_parameters(format!(
                "page content has {} elements, more than the page size {page_size}",
                content.len()
            )));
        }
        Ok(Self {
            content,
            page_number,
            page_size,
            total_elements,
            sort: Sort::unsorted(),
        })
    }

    /// Attach the ordering the page was produced with
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Page content
    pub fn content(&self) -> &[T] {
        &self.content
    }

    /// Take the content out of the page
    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Zero-based page number
    pub const fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Requested page size
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of elements across all pages
    pub const fn total_elements(&self) -> u64 {
        self.total_elements
    }

    /// Ordering the page was produced with
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    /// `ceil(total_elements / page_size)`
    pub const fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(self.page_size)
    }

    /// Number of elements on this page
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub const fn is_first(&self) -> bool {
        self.page_number == 0
    }

    pub const fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub const fn has_next(&self) -> bool {
        self.page_number.saturating_add(1) < self.total_pages()
    }

    pub const fn has_previous(&self) -> bool {
        self.page_number > 0
    }

    /// Transform the content, keeping the paging metadata
    ///
    /// ```rust
    /// use acton_repository::repository::Page;
    ///
    /// let page = Page::of(vec![10_i64, 20], 0, 2, 3).unwrap();
    /// let labels = page.map(|age| format!("age {age}"));
    /// assert_eq!(labels.content(), ["age 10", "age 20"]);
    /// assert_eq!(labels.total_elements(), 3);
    /// ```
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(transform).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            sort: self.sort,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 10)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("page_number", &self.page_number)?;
        state.serialize_field("page_size", &self.page_size)?;
        state.serialize_field("total_elements", &self.total_elements)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.serialize_field("first", &self.is_first())?;
        state.serialize_field("last", &self.is_last())?;
        state.serialize_field("has_next", &self.has_next())?;
        state.serialize_field("has_previous", &self.has_previous())?;
        state.serialize_field("sort", &self.sort)?;
        state.end()
    }
}

/// One page of results without total counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice<T> {
    content: Vec<T>,
    page_number: u64,
    page_size: u64,
    has_next: bool,
    sort: Sort,
}

impl<T> Slice<T> {
    /// Build a slice; `content` must already be trimmed to the page size
    pub fn new(
        content: Vec<T>,
        page_number: u64,
        page_size: u64,
        has_next: bool,
    ) -> RepositoryResult<Self> {
        if page_size == 0 || content.len() as u64 > page_size {
            return Err(RepositoryError::invalid_page_parameters(format!(
                "slice of {} elements does not fit page size {page_size}",
                content.len()
            )));
        }
        Ok(Self {
            content,
            page_number,
            page_size,
            has_next,
            sort: Sort::unsorted(),
        })
    }

    /// Attach the ordering the slice was produced with
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub const fn page_number(&self) -> u64 {
        self.page_number
    }

    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Whether another page follows
    pub const fn has_next(&self) -> bool {
        self.has_next
    }

    pub const fn is_first(&self) -> bool {
        self.page_number == 0
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    /// Transform the content, keeping the paging metadata
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(transform).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            has_next: self.has_next,
            sort: self.sort,
        }
    }
}
