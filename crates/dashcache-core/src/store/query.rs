use std::fmt;

/// User-controlled pagination and filter parameters for one store.
///
/// `search` and `category` are mutually exclusive: the store's mutators clear
/// one whenever the other is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub page: u32,
    pub page_size: u32,
    pub search: String,
    pub category: String,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size,
            search: String::new(),
            category: String::new(),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            page: self.page,
            search: self.search.clone(),
            category: self.category.clone(),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

/// Identity of one cached listing page: `(page, search, category)` in that order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub page: u32,
    pub search: String,
    pub category: String,
}

impl fmt::Display for CacheKey {
    /// `page|search|category`, with `\` and `|` escaped inside the text parts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.page,
            escape_component(&self.search),
            escape_component(&self.category)
        )
    }
}

fn escape_component(s: &str) -> String {
    s.replace('\\', "\\\\").replace('|', "\\|")
}

/// Which listing endpoint a query resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /<resource>`
    List,
    /// `GET /<resource>/search?q=<text>`
    Search(String),
    /// `GET /<resource>/category/<slug>`
    Category(String),
}

/// A fully resolved listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub endpoint: Endpoint,
    pub limit: u32,
    pub skip: u64,
}

impl ListRequest {
    /// Resolve a query to an endpoint. Search text takes precedence over the
    /// category filter, though the mutators never let both be set.
    pub fn for_query(query: &QueryState) -> Self {
        let endpoint = if !query.search.is_empty() {
            Endpoint::Search(query.search.clone())
        } else if !query.category.is_empty() {
            Endpoint::Category(query.category.clone())
        } else {
            Endpoint::List
        };

        Self {
            endpoint,
            limit: query.page_size,
            skip: query.skip(),
        }
    }

    /// First `limit` items of the plain listing; used for totals.
    pub fn first(limit: u32) -> Self {
        Self {
            endpoint: Endpoint::List,
            limit,
            skip: 0,
        }
    }

    /// Path segments below the base URL, unencoded.
    pub fn path_segments<'a>(&'a self, resource: &'a str) -> Vec<&'a str> {
        match &self.endpoint {
            Endpoint::List => vec![resource],
            Endpoint::Search(_) => vec![resource, "search"],
            Endpoint::Category(slug) => vec![resource, "category", slug.as_str()],
        }
    }

    /// Query parameters, unencoded, in the order they are sent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Endpoint::Search(text) = &self.endpoint {
            pairs.push(("q", text.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("skip", self.skip.to_string()));
        pairs
    }
}
