//! Catalog filtering, pagination and text scoring shared by the JSON API,
//! the rendered pages and both store backends.

use crate::dto::{CatalogParams, Pagination};
use crate::models::Video;
use mongodb::bson::{doc, Document};

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VideoFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub year: Option<i32>,
    pub trending: bool,
    pub featured: bool,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_number<T: std::str::FromStr>(value: &Option<String>, name: &str) -> Result<Option<T>, String> {
    match non_empty(value) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid {} parameter", name)),
        None => Ok(None),
    }
}

impl VideoFilter {
    pub fn from_params(params: &CatalogParams) -> Result<Self, String> {
        Ok(VideoFilter {
            category: non_empty(&params.category),
            genre: non_empty(&params.genre),
            language: non_empty(&params.language),
            year: parse_number(&params.year, "year")?,
            trending: params.trending.as_deref() == Some("true"),
            featured: params.featured.as_deref() == Some("true"),
        })
    }

    pub fn trending() -> Self {
        VideoFilter {
            trending: true,
            ..Default::default()
        }
    }

    pub fn featured() -> Self {
        VideoFilter {
            featured: true,
            ..Default::default()
        }
    }

    pub fn genre(genre: &str) -> Self {
        VideoFilter {
            genre: Some(genre.to_string()),
            ..Default::default()
        }
    }

    /// Equality filter; on array fields Mongo reads this as "contains element".
    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(category) = &self.category {
            filter.insert("categories", category);
        }
        if let Some(genre) = &self.genre {
            filter.insert("genres", genre);
        }
        if let Some(language) = &self.language {
            filter.insert("languages", language);
        }
        if let Some(year) = self.year {
            filter.insert("year", year);
        }
        if self.trending {
            filter.insert("isTrending", true);
        }
        if self.featured {
            filter.insert("isFeatured", true);
        }
        filter
    }

    pub fn matches(&self, video: &Video) -> bool {
        let contains = |values: &[String], wanted: &Option<String>| {
            wanted.as_ref().map_or(true, |w| values.iter().any(|v| v == w))
        };
        contains(&video.categories, &self.category)
            && contains(&video.genres, &self.genre)
            && contains(&video.languages, &self.language)
            && self.year.map_or(true, |y| video.year == y)
            && (!self.trending || video.is_trending)
            && (!self.featured || video.is_featured)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn parse(page: &Option<String>, limit: &Option<String>) -> Result<Self, String> {
        Ok(Self::new(
            parse_number(page, "page")?,
            parse_number(limit, "limit")?,
        ))
    }

    pub fn first(limit: u64) -> Self {
        Self::new(Some(1), Some(limit))
    }

    /// Saturates instead of overflowing; the store's skip is a signed 64-bit value.
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: page_count(total, self.limit),
        }
    }
}

pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Query words as the text index sees them. Words prefixed with `-` exclude.
#[derive(Debug, Default, PartialEq)]
pub struct SearchTerms {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl SearchTerms {
    pub fn parse(query: &str) -> Self {
        let mut terms = SearchTerms::default();
        for word in query.split_whitespace() {
            let lowered = word.trim_matches('"').to_lowercase();
            if let Some(negated) = lowered.strip_prefix('-') {
                if !negated.is_empty() {
                    terms.exclude.push(negated.to_string());
                }
            } else if !lowered.is_empty() {
                terms.include.push(lowered);
            }
        }
        terms
    }

    /// Relevance over title, description and cast; 0.0 means no match.
    pub fn score(&self, video: &Video) -> f64 {
        let mut words: Vec<String> = Vec::new();
        let mut push_words = |text: &str| {
            words.extend(
                text.split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .map(str::to_lowercase),
            )
        };
        push_words(&video.title);
        push_words(&video.description);
        for member in &video.cast {
            push_words(member);
        }

        if self.exclude.iter().any(|ex| words.contains(ex)) {
            return 0.0;
        }
        let hits = self
            .include
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count())
            .sum::<usize>();
        if words.is_empty() {
            0.0
        } else {
            hits as f64 / words.len() as f64 + hits as f64
        }
    }
}

/// How the watch page should play a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKind {
    Embed,
    File,
}

impl PlaybackKind {
    pub fn for_url(url: &str) -> Self {
        if url.contains("/embed/")
            || url.contains("player.")
            || url.contains("youtube.com")
            || url.contains("vimeo.com")
        {
            PlaybackKind::Embed
        } else {
            PlaybackKind::File
        }
    }
}
