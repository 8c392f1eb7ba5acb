//! Catalog listing helpers: pagination plus diacritic-insensitive ranked
//! substring search.
//!
//! The catalog is small enough to rank in memory; the relevance key is fixed
//! (prefix match, match position, length difference) and deliberately not
//! tunable.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::ProductRecord;

const DEFAULT_PER_PAGE: usize = 5;
const MAX_PER_PAGE: usize = 99;

/// A paginated catalog query.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    /// Substring to match against product names; empty means list all.
    pub term: String,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            term: String::new(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of catalog results.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<ProductRecord>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

/// Lowercases and strips combining marks, so "Árbol" matches "arbol".
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect::<String>()
        .to_lowercase()
}

/// Relevance key, ascending: prefix matches first, then earliest match
/// position, then closest length.
fn relevance(name_norm: &str, term_norm: &str) -> (u8, usize, usize) {
    let prefix = if name_norm.starts_with(term_norm) { 0 } else { 1 };
    let index = name_norm.find(term_norm).unwrap_or(usize::MAX);
    let length_diff = name_norm.len().abs_diff(term_norm.len());
    (prefix, index, length_diff)
}

/// Filters, ranks, and paginates a product listing.
pub fn search(products: Vec<ProductRecord>, query: &ProductQuery) -> ProductPage {
    let per_page = match query.per_page {
        0 => DEFAULT_PER_PAGE,
        n => n.min(MAX_PER_PAGE),
    };
    let term_norm = normalize(query.term.trim());

    let mut matched: Vec<ProductRecord> = if term_norm.is_empty() {
        let mut all = products;
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
        all
    } else {
        let mut ranked: Vec<(ProductRecord, (u8, usize, usize))> = products
            .into_iter()
            .filter_map(|p| {
                let name_norm = normalize(&p.name);
                name_norm
                    .contains(&term_norm)
                    .then(|| {
                        let key = relevance(&name_norm, &term_norm);
                        (p, key)
                    })
            })
            .collect();
        ranked.sort_by(|(a, ka), (b, kb)| ka.cmp(kb).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
        ranked.into_iter().map(|(p, _)| p).collect()
    };

    let total_records = matched.len();
    let total_pages = total_records.div_ceil(per_page).max(1);
    let page = query.page.clamp(1, total_pages);

    let items: Vec<ProductRecord> = matched
        .drain(..)
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    ProductPage {
        items,
        page,
        per_page,
        total_pages,
        total_records,
    }
}
