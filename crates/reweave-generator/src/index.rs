//! Content index: sorting, filtering, pagination and taxonomy grouping.
//!
//! Built once from the complete document set after rendering has finished,
//! then only read. Every listing, feed and sitemap is derived from it.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

use chrono::Datelike;
use reweave_core::{Document, safe_slug};
use serde::Serialize;
use tracing::{info, warn};

/// Number of tags listed on the stats page.
pub const TOP_TAGS: usize = 10;

/// A category or tag with its public members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyGroup {
    pub name: String,
    /// Path-safe form of `name`.
    pub slug: String,
    /// Positions in [`ContentIndex::ordered`], ascending.
    pub members: Vec<usize>,
}

impl TaxonomyGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Insertion-ordered groups keyed by name.
#[derive(Debug, Default, Clone)]
struct Taxonomy {
    groups: Vec<TaxonomyGroup>,
    lookup: HashMap<String, usize>,
}

impl Taxonomy {
    fn add(&mut self, name: &str, position: usize) {
        let idx = *self.lookup.entry(name.to_string()).or_insert_with(|| {
            self.groups.push(TaxonomyGroup {
                name: name.to_string(),
                slug: safe_slug(name),
                members: Vec::new(),
            });
            self.groups.len() - 1
        });
        self.groups[idx].members.push(position);
    }

    fn get(&self, name: &str) -> Option<&TaxonomyGroup> {
        self.lookup.get(name).map(|&i| &self.groups[i])
    }
}

/// Aggregate numbers for the stats page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub total_posts: usize,
    /// Characters of tag-stripped content across public documents.
    pub total_chars: usize,
    /// Most used tags, most frequent first.
    pub top_tags: Vec<(String, usize)>,
    /// `YYYY-MM` buckets, newest first.
    pub timeline: Vec<(String, usize)>,
}

/// The ordered, grouped view of every document in a build.
#[derive(Debug)]
pub struct ContentIndex {
    ordered: Vec<Document>,
    excluded: Vec<Document>,
    page_size: usize,
    categories: Taxonomy,
    tags: Taxonomy,
    years: BTreeMap<i32, Vec<usize>>,
}

/// Pinned first, then newest first, then scan order.
pub fn compare_documents(a: &Document, b: &Document) -> Ordering {
    b.flags
        .pin
        .cmp(&a.flags.pin)
        .then_with(|| b.date.cmp(&a.date))
        .then_with(|| a.order.cmp(&b.order))
}

/// Split documents into first-seen slugs and later duplicates.
fn dedupe_slugs(mut documents: Vec<Document>) -> (Vec<Document>, Vec<Document>) {
    documents.sort_by_key(|d| d.order);

    let mut seen = HashSet::new();
    let (mut kept, mut duplicates) = (Vec::new(), Vec::new());
    for doc in documents {
        if seen.contains(&doc.slug) {
            warn!(
                slug = %doc.slug,
                path = %doc.source_path.display(),
                "duplicate slug, excluding document"
            );
            duplicates.push(doc);
        } else {
            seen.insert(doc.slug.clone());
            kept.push(doc);
        }
    }

    (kept, duplicates)
}

impl ContentIndex {
    /// Build the index. `page_size` values below one are treated as one.
    ///
    /// Public documents sharing a slug keep only the first in scan order;
    /// the rest are excluded.
    pub fn build(documents: Vec<Document>, page_size: usize) -> Self {
        let (public, mut excluded): (Vec<_>, Vec<_>) =
            documents.into_iter().partition(Document::is_public);
        let (mut ordered, duplicates) = dedupe_slugs(public);
        excluded.extend(duplicates);
        ordered.sort_by(compare_documents);
        excluded.sort_by_key(|d| d.order);

        let mut categories = Taxonomy::default();
        let mut tags = Taxonomy::default();
        let mut years: BTreeMap<i32, Vec<usize>> = BTreeMap::new();

        for (position, doc) in ordered.iter().enumerate() {
            if let Some(category) = &doc.category {
                categories.add(category, position);
            }
            for tag in &doc.tags {
                tags.add(tag, position);
            }
            years.entry(doc.date.year()).or_default().push(position);
        }

        let index = Self {
            ordered,
            excluded,
            page_size: page_size.max(1),
            categories,
            tags,
            years,
        };

        info!(
            public = index.ordered.len(),
            excluded = index.excluded.len(),
            pages = index.total_pages(),
            categories = index.categories.groups.len(),
            tags = index.tags.groups.len(),
            "content index built"
        );

        index
    }

    /// Public documents in listing order.
    pub fn ordered(&self) -> &[Document] {
        &self.ordered
    }

    /// Drafts and hidden documents, in scan order.
    pub fn excluded(&self) -> &[Document] {
        &self.excluded
    }

    /// Total documents, public or not.
    pub fn len(&self) -> usize {
        self.ordered.len() + self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(public / page_size)`.
    pub fn total_pages(&self) -> usize {
        self.ordered.len().div_ceil(self.page_size)
    }

    /// Documents on listing page `number` (1-indexed).
    pub fn page(&self, number: usize) -> Option<&[Document]> {
        if number == 0 || number > self.total_pages() {
            return None;
        }
        Some(paginate(&self.ordered, number, self.page_size).0)
    }

    /// Categories in first-seen order.
    pub fn categories(&self) -> &[TaxonomyGroup] {
        &self.categories.groups
    }

    /// Tags in first-seen order.
    pub fn tags(&self) -> &[TaxonomyGroup] {
        &self.tags.groups
    }

    pub fn category(&self, name: &str) -> Option<&TaxonomyGroup> {
        self.categories.get(name)
    }

    pub fn tag(&self, name: &str) -> Option<&TaxonomyGroup> {
        self.tags.get(name)
    }

    /// Resolve a group's members to documents, in listing order.
    pub fn members<'a>(&'a self, group: &'a TaxonomyGroup) -> impl Iterator<Item = &'a Document> {
        group.members.iter().map(|&i| &self.ordered[i])
    }

    /// Documents grouped by calendar year, newest year first.
    pub fn years_descending(&self) -> Vec<(i32, Vec<&Document>)> {
        self.years
            .iter()
            .rev()
            .map(|(&year, positions)| (year, positions.iter().map(|&i| &self.ordered[i]).collect()))
            .collect()
    }

    /// Neighbours of the document at `position`: the older one and the newer one.
    pub fn neighbors(&self, position: usize) -> (Option<&Document>, Option<&Document>) {
        let older = self.ordered.get(position + 1);
        let newer = position
            .checked_sub(1)
            .and_then(|i| self.ordered.get(i));
        (older, newer)
    }

    /// Aggregate counts over the public documents.
    pub fn stats(&self) -> SiteStats {
        let mut top: Vec<(String, usize)> = self
            .tags
            .groups
            .iter()
            .map(|g| (g.name.clone(), g.len()))
            .collect();
        // Stable: equal counts keep first-seen order.
        top.sort_by(|a, b| b.1.cmp(&a.1));
        top.truncate(TOP_TAGS);

        let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for doc in &self.ordered {
            *months.entry((doc.date.year(), doc.date.month())).or_default() += 1;
        }

        SiteStats {
            total_posts: self.ordered.len(),
            total_chars: self.ordered.iter().map(Document::char_count).sum(),
            top_tags: top,
            timeline: months
                .into_iter()
                .rev()
                .map(|((y, m), n)| (format!("{y:04}-{m:02}"), n))
                .collect(),
        }
    }
}

/// Paginate a slice of items.
///
/// Returns the items on `page` (1-indexed) and the total page count.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> (&[T], usize) {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let end = start.saturating_add(per_page).min(items.len());

    if page == 0 || start >= items.len() {
        (&[], total_pages)
    } else {
        (&items[start..end], total_pages)
    }
}
