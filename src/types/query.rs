use std::collections::BTreeSet;
use std::fmt::Display;

use serde::Serialize;

use super::models::platform::Platform;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModsSort {
    #[default]
    Downloads,
    RecentlyUpdated,
    RecentlyPublished,
}

pub fn sort_to_string(sorting: ModsSort) -> &'static str {
    match sorting {
        ModsSort::Downloads => "downloads",
        ModsSort::RecentlyUpdated => "recently_updated",
        ModsSort::RecentlyPublished => "recently_published",
    }
}

impl Display for ModsSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(sort_to_string(*self))
    }
}

/// Search, filter and paging parameters for the mod list. Doubles as the
/// cache key for list responses, so sets are ordered and compare by content.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct ModsQuery {
    query: Option<String>,
    platforms: BTreeSet<Platform>,
    tags: BTreeSet<String>,
    featured: Option<bool>,
    sorting: ModsSort,
    developer: Option<String>,
    page: usize,
    page_size: usize,
}

impl Default for ModsQuery {
    fn default() -> Self {
        ModsQuery::builder().build()
    }
}

impl ModsQuery {
    pub fn builder() -> ModsQueryBuilder {
        ModsQueryBuilder {
            inner: ModsQuery {
                query: None,
                platforms: BTreeSet::from([Platform::current()]),
                tags: BTreeSet::new(),
                featured: None,
                sorting: ModsSort::default(),
                developer: None,
                page: 0,
                page_size: DEFAULT_PAGE_SIZE,
            },
        }
    }

    /// Starts a builder from this query, e.g. to fetch the next page.
    pub fn to_builder(&self) -> ModsQueryBuilder {
        ModsQueryBuilder {
            inner: self.clone(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn platforms(&self) -> &BTreeSet<Platform> {
        &self.platforms
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn featured(&self) -> Option<bool> {
        self.featured
    }

    pub fn sorting(&self) -> ModsSort {
        self.sorting
    }

    pub fn developer(&self) -> Option<&str> {
        self.developer.as_deref()
    }

    /// Zero-based.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Query string pairs for `GET /v1/mods`. The index counts pages from 1.
    pub fn to_params(&self, game_version: Option<&str>) -> Vec<(String, String)> {
        let mut params = vec![];
        if let Some(gd) = game_version {
            params.push(("gd".to_string(), gd.to_string()));
        }
        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }
        if !self.platforms.is_empty() {
            params.push(("platforms".to_string(), join(&self.platforms)));
        }
        if !self.tags.is_empty() {
            params.push(("tags".to_string(), join(&self.tags)));
        }
        if let Some(featured) = self.featured {
            params.push(("featured".to_string(), featured.to_string()));
        }
        params.push(("sort".to_string(), sort_to_string(self.sorting).to_string()));
        if let Some(developer) = &self.developer {
            params.push(("developer".to_string(), developer.clone()));
        }
        params.push(("page".to_string(), self.page.saturating_add(1).to_string()));
        params.push(("per_page".to_string(), self.page_size.to_string()));
        params
    }
}

fn join<T: Display>(items: &BTreeSet<T>) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub struct ModsQueryBuilder {
    inner: ModsQuery,
}

impl ModsQueryBuilder {
    pub fn query(mut self, query: impl Into<String>) -> ModsQueryBuilder {
        let query = query.into();
        self.inner.query = if query.trim().is_empty() {
            None
        } else {
            Some(query)
        };
        self
    }

    /// Replaces the default (current platform) with the given set.
    pub fn platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> ModsQueryBuilder {
        self.inner.platforms = platforms.into_iter().collect();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> ModsQueryBuilder {
        self.inner.tags.insert(tag.into().trim().to_lowercase());
        self
    }

    pub fn tags<S: Into<String>>(self, tags: impl IntoIterator<Item = S>) -> ModsQueryBuilder {
        tags.into_iter().fold(self, |b, t| b.tag(t))
    }

    pub fn featured(mut self, featured: Option<bool>) -> ModsQueryBuilder {
        self.inner.featured = featured;
        self
    }

    pub fn sorting(mut self, sorting: ModsSort) -> ModsQueryBuilder {
        self.inner.sorting = sorting;
        self
    }

    pub fn developer(mut self, developer: Option<String>) -> ModsQueryBuilder {
        self.inner.developer = developer;
        self
    }

    pub fn page(mut self, page: usize) -> ModsQueryBuilder {
        self.inner.page = page;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> ModsQueryBuilder {
        self.inner.page_size = page_size.max(1);
        self
    }

    pub fn build(self) -> ModsQuery {
        self.inner
    }
}
