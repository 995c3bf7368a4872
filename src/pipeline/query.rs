//! Query builder: the organisation × year × SDG × keyword cross product.
//!
//! Queries are produced lazily in a fixed nesting order, so the order in
//! which URLs are first seen (and therefore kept) is deterministic for a
//! given selection and organisation list.

use crate::model::Organization;
use crate::selection::FilterSelection;

/// One search query and the context its result rows carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub organization: String,
    pub year: i32,
    pub sdg_code: String,
    pub keyword: String,
    /// Text sent to the search API.
    pub text: String,
}

/// Years from `current_year` down to `start_year`, inclusive.
///
/// Empty when the start year lies in the future.
pub fn year_range(start_year: i32, current_year: i32) -> impl Iterator<Item = i32> + Clone {
    (start_year..=current_year).rev()
}

/// Build every query for `orgs` under `selection`.
///
/// Nesting, outermost first: organisation, year (descending), SDG goal,
/// report keyword.
pub fn build_queries<'a>(
    selection: &'a FilterSelection,
    orgs: &'a [Organization],
    keywords: &'a [String],
    current_year: i32,
) -> impl Iterator<Item = SearchQuery> + 'a {
    let countries = selection.countries_joined();
    let years = year_range(selection.start_year(), current_year);

    orgs.iter().flat_map(move |org| {
        let countries = countries.clone();
        years.clone().flat_map(move |year| {
            let countries = countries.clone();
            selection.sdg_goals().iter().flat_map(move |sdg| {
                let countries = countries.clone();
                keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(move |keyword| SearchQuery {
                        organization: org.organisation_name.clone(),
                        year,
                        sdg_code: sdg.code.clone(),
                        keyword: keyword.clone(),
                        text: query_text(&org.organisation_name, year, &countries, &sdg.label, keyword),
                    })
            })
        })
    })
}

fn query_text(org: &str, year: i32, countries: &str, sdg_label: &str, keyword: &str) -> String {
    let year = year.to_string();
    [org, year.as_str(), countries, sdg_label, keyword]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{FilterInput, OptionLabels};

    fn selection(year: i32) -> FilterSelection {
        FilterInput {
            countries: vec!["Australia".into(), "New Zealand".into()],
            industries: vec!["Division A".into()],
            sdgs: vec!["13".into(), "7".into()],
            year: Some(year),
            document_types: vec!["AR".into()],
            frequency: Some("Annual".into()),
        }
        .validate(&OptionLabels::default())
        .unwrap()
    }

    fn org(name: &str) -> Organization {
        Organization {
            organisation_name: name.into(),
            division: "Division A".into(),
            industry: "Agriculture".into(),
        }
    }

    #[test]
    fn nesting_order_is_org_year_sdg_keyword() {
        let sel = selection(2023);
        let orgs = vec![org("GreenCo"), org("FarmCo")];
        let keywords = vec!["annual report".to_string(), "ESG report".to_string()];
        let queries: Vec<SearchQuery> = build_queries(&sel, &orgs, &keywords, 2024).collect();

        // 2 orgs × 2 years × 2 SDGs × 2 keywords
        assert_eq!(queries.len(), 16);
        assert_eq!(
            queries[0].text,
            "GreenCo 2024 Australia, New Zealand Climate Action annual report"
        );
        assert_eq!(queries[1].keyword, "ESG report");
        assert_eq!(queries[2].sdg_code, "7");
        assert_eq!(queries[4].year, 2023);
        assert_eq!(queries[8].organization, "FarmCo");
    }

    #[test]
    fn future_start_year_emits_nothing() {
        let sel = selection(2030);
        let orgs = vec![org("GreenCo")];
        let keywords = vec!["annual report".to_string()];
        assert_eq!(build_queries(&sel, &orgs, &keywords, 2024).count(), 0);
    }

    #[test]
    fn start_equal_to_current_is_one_year() {
        assert_eq!(year_range(2024, 2024).collect::<Vec<_>>(), vec![2024]);
        assert_eq!(year_range(2022, 2024).collect::<Vec<_>>(), vec![2024, 2023, 2022]);
    }

    #[test]
    fn no_orgs_no_queries() {
        let sel = selection(2020);
        let keywords = vec!["annual report".to_string()];
        assert_eq!(build_queries(&sel, &[], &keywords, 2024).count(), 0);
    }
}
