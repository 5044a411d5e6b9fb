//! Turns optional search fields into a catalog filter.

use super::models::CatalogEntry;
use crate::error::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogField {
    Title,
    Artist,
    Year,
}

impl CatalogField {
    pub fn column(&self) -> &'static str {
        match self {
            CatalogField::Title => "title",
            CatalogField::Artist => "artist",
            CatalogField::Year => "year",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Number(i64),
}

/// `field = value`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub field: CatalogField,
    pub value: FilterValue,
}

/// Conjunction of equality predicates, always at least one.
///
/// Only [`build_filter`] creates these, so an unfiltered scan cannot be
/// requested by accident.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogFilter {
    predicates: Vec<Predicate>,
}

impl CatalogFilter {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.predicates
            .iter()
            .all(|predicate| match (&predicate.field, &predicate.value) {
                (CatalogField::Title, FilterValue::Text(title)) => &entry.title == title,
                (CatalogField::Artist, FilterValue::Text(artist)) => &entry.artist == artist,
                (CatalogField::Year, FilterValue::Number(year)) => entry.year == *year,
                _ => false,
            })
    }
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.is_empty())
}

/// Builds the filter for a catalog search.
///
/// Absent and empty fields are skipped, the others become equality predicates
/// in the order title, artist, year. `year` must parse as an integer.
pub fn build_filter(
    title: Option<&str>,
    artist: Option<&str>,
    year: Option<&str>,
) -> Result<CatalogFilter, ValidationError> {
    let mut predicates = Vec::with_capacity(3);

    if let Some(title) = non_empty(title) {
        predicates.push(Predicate {
            field: CatalogField::Title,
            value: FilterValue::Text(title.to_string()),
        });
    }
    if let Some(artist) = non_empty(artist) {
        predicates.push(Predicate {
            field: CatalogField::Artist,
            value: FilterValue::Text(artist.to_string()),
        });
    }
    if let Some(year) = non_empty(year) {
        let year = year
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidYear(year.to_string()))?;
        predicates.push(Predicate {
            field: CatalogField::Year,
            value: FilterValue::Number(year),
        });
    }

    if predicates.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(CatalogFilter { predicates })
}
