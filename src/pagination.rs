use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// A page window resolved from raw query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.size - 1) / self.size
        }
    }
}

/// Resolves `field,dir` against a whitelist of `(api field, sql column)` pairs.
///
/// Unknown fields fall back to `default_column`; a missing or unknown
/// direction sorts descending.
pub fn resolve_sort(
    raw: Option<&str>,
    allowed: &[(&str, &'static str)],
    default_column: &'static str,
) -> (&'static str, SortDir) {
    let raw = raw.unwrap_or_default();
    let mut parts = raw.split(',').map(str::trim);
    let field = parts.next().unwrap_or_default();
    let dir = match parts.next() {
        Some(d) if d.eq_ignore_ascii_case("asc") => SortDir::Asc,
        _ => SortDir::Desc,
    };
    let column = allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, col)| *col)
        .unwrap_or(default_column);
    (column, dir)
}

pub const LIKE_ESCAPE: &str = r" ESCAPE '\'";

/// `%term%` for a case-insensitive `LIKE ... ESCAPE '\'`, with wildcards in
/// the search text matched literally.
pub fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Common `page/size/sort` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, req: PageRequest, total: i64) -> Self {
        Self {
            content,
            page: req.page,
            size: req.size,
            total_elements: total,
            total_pages: req.total_pages(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: &[(&str, &str)] = &[("appliedDate", "a.applied_date"), ("status", "a.status")];

    #[test]
    fn page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 0, size: 20 });
        assert_eq!(PageRequest::new(Some(-3), Some(0)), PageRequest { page: 0, size: 1 });
        assert_eq!(PageRequest::new(Some(2), Some(1000)).size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 30);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::new(None, Some(20));
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(1), 1);
        assert_eq!(req.total_pages(20), 1);
        assert_eq!(req.total_pages(21), 2);
    }

    #[test]
    fn sort_resolves_whitelisted_fields() {
        assert_eq!(
            resolve_sort(Some("status,asc"), COLS, "a.applied_date"),
            ("a.status", SortDir::Asc)
        );
        assert_eq!(
            resolve_sort(Some("appliedDate,DESC"), COLS, "a.applied_date"),
            ("a.applied_date", SortDir::Desc)
        );
    }

    #[test]
    fn sort_falls_back_on_unknown_input() {
        assert_eq!(
            resolve_sort(Some("password_hash; DROP TABLE users,asc"), COLS, "a.applied_date"),
            ("a.applied_date", SortDir::Asc)
        );
        assert_eq!(resolve_sort(None, COLS, "a.applied_date"), ("a.applied_date", SortDir::Desc));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Nurse"), "%nurse%");
        assert_eq!(like_pattern("a_b"), r"%a\_b%");
        assert_eq!(like_pattern("100%"), r"%100\%%");
        assert_eq!(like_pattern(r"c:\x"), r"%c:\\x%");
    }

    #[test]
    fn page_response_serializes_camel_case() {
        let res = PageResponse::new(vec![1, 2], PageRequest::new(Some(0), Some(2)), 5);
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v["totalElements"], 5);
        assert_eq!(v["totalPages"], 3);
        assert_eq!(v["content"].as_array().unwrap().len(), 2);
    }
}
