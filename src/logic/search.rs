//! Composition of candidate and job search queries.
//!
//! Every validated filter dimension yields a `Contribution`; contributions
//! are folded into the build context in a fixed order per search target so
//! the generated statement is deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::{DomainError, DomainResult};
use crate::logic::query_params::{
    rel, Column, Contribution, EagerLoad, ExperienceTotals, Join, Predicate, QueryParams,
    Relation,
};
use crate::model::{
    EducationFilter, ExperienceFilter, LanguageFilter, LocationFilter, LookupKey, SearchFilters,
    SearchParams, SkillsFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTarget {
    Candidates,
    Jobs,
}

impl SearchTarget {
    pub fn root(&self) -> Relation {
        match self {
            SearchTarget::Candidates => rel::CANDIDATES,
            SearchTarget::Jobs => rel::JOBS,
        }
    }

    /// Address join every search starts from; location filtering reuses it
    fn address_join(&self) -> Join {
        Join::outer(rel::ADDRESS, rel::ADDRESS.id(), self.root().col("address_id"))
    }

    fn summary_columns(&self) -> Vec<(&'static str, Column)> {
        let root = self.root();
        match self {
            SearchTarget::Candidates => vec![
                ("id", root.id()),
                ("first_name", root.col("first_name")),
                ("last_name", root.col("last_name")),
                ("city", rel::ADDRESS.col("city")),
            ],
            SearchTarget::Jobs => vec![
                ("id", root.id()),
                ("title", root.col("title")),
                ("company_id", root.col("company_id")),
                ("city", rel::ADDRESS.col("city")),
            ],
        }
    }

    fn base_eager_loads(&self) -> &'static [EagerLoad] {
        match self {
            SearchTarget::Candidates => &[EagerLoad::Address],
            SearchTarget::Jobs => &[EagerLoad::Company, EagerLoad::Address],
        }
    }

    /// Relations loaded by single-record lookups
    pub fn profile_eager_loads(&self) -> &'static [EagerLoad] {
        match self {
            SearchTarget::Candidates => &[
                EagerLoad::Address,
                EagerLoad::Experiences,
                EagerLoad::CandidateLanguages,
                EagerLoad::CandidateEducations,
            ],
            SearchTarget::Jobs => &[
                EagerLoad::Company,
                EagerLoad::Address,
                EagerLoad::Sector,
                EagerLoad::JobLanguages,
                EagerLoad::JobEducations,
            ],
        }
    }

    fn order_column(&self, name: &str) -> Option<Column> {
        let root = self.root();
        let allowed: &[&'static str] = match self {
            SearchTarget::Candidates => &["id", "created_at", "first_name", "last_name"],
            SearchTarget::Jobs => &["id", "created_at", "title", "required_experience_months"],
        };
        allowed
            .iter()
            .find(|column| **column == name)
            .map(|column| root.col(*column))
    }

    fn language_link(&self) -> (Relation, &'static str, EagerLoad) {
        match self {
            SearchTarget::Candidates => (
                rel::CANDIDATE_LANGUAGES,
                "candidate_id",
                EagerLoad::CandidateLanguages,
            ),
            SearchTarget::Jobs => (rel::JOB_LANGUAGES, "job_id", EagerLoad::JobLanguages),
        }
    }

    fn education_link(&self) -> (Relation, &'static str, EagerLoad) {
        match self {
            SearchTarget::Candidates => (
                rel::CANDIDATE_EDUCATIONS,
                "candidate_id",
                EagerLoad::CandidateEducations,
            ),
            SearchTarget::Jobs => (rel::JOB_EDUCATIONS, "job_id", EagerLoad::JobEducations),
        }
    }
}

/// Result shaping and paging for a search request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub minimal: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Option<String>,
    pub descending: bool,
}

impl SearchOptions {
    pub fn from_params(params: &SearchParams, config: &SearchConfig) -> Self {
        let (limit, offset) = config.page(params.limit, params.offset);
        Self {
            minimal: params.minimal,
            limit: Some(limit),
            offset,
            order_by: params.order_by.clone(),
            descending: params.desc,
        }
    }
}

fn lookup_predicate(relation: Relation, key: &LookupKey) -> Predicate {
    match key {
        LookupKey::Id(id) => Predicate::IdEq(relation.id(), *id),
        LookupKey::Name(name) => Predicate::eq_lower(relation.col("name"), name.clone()),
    }
}

pub fn location_contribution(target: SearchTarget, filter: &LocationFilter) -> Contribution {
    let predicate = match filter {
        LocationFilter::PostalCode(code) => {
            Predicate::text_eq(rel::ADDRESS.col("postal_code"), code.clone())
        }
        LocationFilter::Province(province) => {
            Predicate::eq_lower(rel::ADDRESS.col("province"), province.clone())
        }
    };
    Contribution::new()
        .join(target.address_join())
        .filter(predicate)
}

/// Experience filtering.
///
/// Sector alone joins the experience rows directly. With a months
/// requirement the durations are summed per candidate in a grouped
/// sub-query, and the sector restriction moves inside it so that only
/// matching rows are aggregated.
pub fn experience_contribution(
    target: SearchTarget,
    filter: &ExperienceFilter,
    today: NaiveDate,
) -> Contribution {
    match target {
        SearchTarget::Candidates => candidate_experience(filter, today),
        SearchTarget::Jobs => job_experience(filter),
    }
}

fn experience_sector_join() -> Join {
    Join::inner(
        rel::EXPERIENCE_SECTOR,
        rel::EXPERIENCE_SECTOR.id(),
        rel::EXPERIENCES.col("sector_id"),
    )
}

fn candidate_experience(filter: &ExperienceFilter, today: NaiveDate) -> Contribution {
    let root = rel::CANDIDATES;
    let contribution = Contribution::new().eager(EagerLoad::Experiences);

    match (filter.months, &filter.sector) {
        (Some(months), sector) => {
            let mut totals = ExperienceTotals {
                today,
                joins: Vec::new(),
                predicates: Vec::new(),
            };
            if let Some(sector) = sector {
                totals.joins.push(experience_sector_join());
                totals
                    .predicates
                    .push(lookup_predicate(rel::EXPERIENCE_SECTOR, sector));
            }
            contribution
                .join(Join::subquery(totals, root.id()))
                .filter(Predicate::IntervalAtLeastMonths(
                    ExperienceTotals::TOTAL,
                    months,
                ))
        }
        (None, Some(sector)) => contribution
            .join(Join::inner(
                rel::EXPERIENCES,
                rel::EXPERIENCES.col("candidate_id"),
                root.id(),
            ))
            .join(experience_sector_join())
            .filter(lookup_predicate(rel::EXPERIENCE_SECTOR, sector)),
        (None, None) => Contribution::new(),
    }
}

/// Jobs carry a sector and the experience they require: a job matches when
/// the searcher's months cover that requirement.
fn job_experience(filter: &ExperienceFilter) -> Contribution {
    let root = rel::JOBS;
    let mut contribution = Contribution::new();
    if let Some(sector) = &filter.sector {
        contribution = contribution
            .join(Join::inner(
                rel::JOB_SECTOR,
                rel::JOB_SECTOR.id(),
                root.col("sector_id"),
            ))
            .filter(lookup_predicate(rel::JOB_SECTOR, sector))
            .eager(EagerLoad::Sector);
    }
    if let Some(months) = filter.months {
        contribution = contribution.filter(Predicate::Le(
            root.col("required_experience_months"),
            months,
        ));
    }
    contribution
}

pub fn language_contribution(target: SearchTarget, filter: &LanguageFilter) -> Contribution {
    let (link, owner, load) = target.language_link();
    let mut contribution = Contribution::new()
        .join(Join::inner(link, link.col(owner), target.root().id()))
        .join(Join::inner(
            rel::LANGUAGES,
            rel::LANGUAGES.id(),
            link.col("language_id"),
        ))
        .filter(lookup_predicate(rel::LANGUAGES, &filter.language))
        .eager(load);

    if let Some(level) = filter.minimum_level {
        contribution = contribution
            .join(Join::inner(
                rel::LANGUAGE_LEVEL,
                rel::LANGUAGE_LEVEL.id(),
                link.col("level_id"),
            ))
            .filter(Predicate::Ge(
                rel::LANGUAGE_LEVEL.col("value"),
                level,
            ));
    }
    contribution
}

pub fn education_contribution(target: SearchTarget, filter: &EducationFilter) -> Contribution {
    let (link, owner, load) = target.education_link();
    let contribution = Contribution::new()
        .join(Join::inner(link, link.col(owner), target.root().id()))
        .join(Join::inner(
            rel::EDUCATIONS,
            rel::EDUCATIONS.id(),
            link.col("education_id"),
        ))
        .eager(load);

    match filter {
        EducationFilter::Name(name) => contribution.filter(Predicate::ContainsText(
            rel::EDUCATIONS.col("qualification"),
            name.clone(),
        )),
        EducationFilter::Level {
            minimum_level,
            sector,
        } => {
            let mut contribution = contribution;
            if let Some(level) = minimum_level {
                contribution = contribution
                    .join(Join::inner(
                        rel::EDUCATION_LEVEL,
                        rel::EDUCATION_LEVEL.id(),
                        rel::EDUCATIONS.col("level_id"),
                    ))
                    .filter(Predicate::Ge(
                        rel::EDUCATION_LEVEL.col("value"),
                        *level,
                    ));
            }
            if let Some(sector) = sector {
                contribution = contribution
                    .join(Join::inner(
                        rel::EDUCATION_SECTORS,
                        rel::EDUCATION_SECTORS.col("education_id"),
                        rel::EDUCATIONS.id(),
                    ))
                    .join(Join::inner(
                        rel::EDUCATION_SECTOR,
                        rel::EDUCATION_SECTOR.id(),
                        rel::EDUCATION_SECTORS.col("sector_id"),
                    ))
                    .filter(lookup_predicate(rel::EDUCATION_SECTOR, sector));
            }
            contribution
        }
    }
}

pub fn skills_contribution(target: SearchTarget, filter: &SkillsFilter) -> Contribution {
    let root = target.root();
    let mut contribution = Contribution::new();
    if !filter.skills.is_empty() {
        contribution = contribution.filter(Predicate::ArrayContains(
            root.col("skills"),
            filter.skills.clone(),
        ));
    }
    if let Some(availability) = filter.availability {
        contribution = contribution.filter(Predicate::ArrayContains(
            root.col("availability"),
            vec![availability.as_str().to_string()],
        ));
    }
    contribution
}

/// Contributions of every requested dimension, in application order
pub fn contributions(
    target: SearchTarget,
    filters: &SearchFilters,
    today: NaiveDate,
) -> Vec<Contribution> {
    let mut contributions = Vec::new();
    if let Some(location) = &filters.location {
        contributions.push(location_contribution(target, location));
    }
    if let Some(experience) = &filters.experience {
        contributions.push(experience_contribution(target, experience, today));
    }
    if let Some(language) = &filters.language {
        contributions.push(language_contribution(target, language));
    }
    if let Some(education) = &filters.education {
        contributions.push(education_contribution(target, education));
    }
    if let Some(skills) = &filters.skills {
        contributions.push(skills_contribution(target, skills));
    }
    contributions
}

/// Build the full search query for `target`
pub fn compose_search(
    target: SearchTarget,
    filters: &SearchFilters,
    options: &SearchOptions,
    today: NaiveDate,
) -> DomainResult<QueryParams> {
    let mut params = QueryParams::select(target.root());
    if options.minimal {
        params = params.columns(target.summary_columns());
    }
    params = params
        .join(target.address_join())
        .eager_all(target.base_eager_loads().iter().copied());

    params = contributions(target, filters, today)
        .into_iter()
        .fold(params, QueryParams::apply);

    if let Some(name) = options.order_by.as_deref() {
        let column = target.order_column(name).ok_or_else(|| {
            DomainError::validation(format!("cannot order by '{}'", name), &["order_by"])
        })?;
        params = params.order_by(column, options.descending);
    }

    Ok(params.paginate(options.limit, options.offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::query_params::JoinTarget;
    use crate::model::Availability;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
    }

    fn experience(months: Option<i32>, sector: Option<&str>) -> SearchFilters {
        SearchFilters {
            experience: Some(ExperienceFilter {
                months,
                sector: sector.map(LookupKey::parse),
            }),
            ..Default::default()
        }
    }

    fn compose(target: SearchTarget, filters: &SearchFilters) -> QueryParams {
        compose_search(target, filters, &SearchOptions::default(), today()).unwrap()
    }

    #[test]
    fn test_sector_only_joins_experience_rows_directly() {
        let params = compose(SearchTarget::Candidates, &experience(None, Some("IT")));

        assert_eq!(
            params.join_keys(),
            vec!["address", "experiences", "experience_sector"]
        );
        assert!(params
            .to_sql()
            .contains("WHERE lower(experience_sector.name) = $1 GROUP BY candidates.id"));
        assert_eq!(
            params.predicates(),
            &[Predicate::eq_lower(rel::EXPERIENCE_SECTOR.col("name"), "it")]
        );
    }

    #[test]
    fn test_months_builds_aggregation_subquery_with_sector_inside() {
        let params = compose(SearchTarget::Candidates, &experience(Some(24), Some("IT")));

        assert_eq!(params.join_keys(), vec!["address", "experience_totals"]);
        assert!(!params.suppresses_duplicate_rows());

        let sql = params.to_sql();
        assert!(sql.contains(
            " JOIN (SELECT experiences.candidate_id AS candidate_id, \
             sum(age(coalesce(experiences.end_date, $1::date), experiences.start_date)) AS total_experience \
             FROM experiences experiences \
             JOIN sectors experience_sector ON experience_sector.id = experiences.sector_id \
             WHERE lower(experience_sector.name) = $2 \
             GROUP BY experiences.candidate_id) experience_totals \
             ON experience_totals.candidate_id = candidates.id"
        ));
        assert!(sql.ends_with(
            "WHERE experience_totals.total_experience >= make_interval(months => $3)"
        ));
        assert_eq!(
            params.predicates(),
            &[Predicate::IntervalAtLeastMonths(ExperienceTotals::TOTAL, 24)]
        );
        match &params.joins()[1].target {
            JoinTarget::ExperienceTotals(totals) => {
                assert_eq!(totals.today, today());
                assert_eq!(
                    totals.predicates,
                    vec![Predicate::eq_lower(rel::EXPERIENCE_SECTOR.col("name"), "it")]
                );
            }
            other => panic!("unexpected join target {:?}", other),
        }
    }

    #[test]
    fn test_months_without_sector_aggregates_all_experience() {
        let sql = compose(SearchTarget::Candidates, &experience(Some(6), None)).to_sql();
        assert!(sql.contains(
            "FROM experiences experiences GROUP BY experiences.candidate_id) experience_totals"
        ));
        assert_eq!(sql.matches("JOIN sectors").count(), 0);
    }

    #[test]
    fn test_sector_paths_differ_in_joins_but_join_sectors_once() {
        let sector_only = compose(SearchTarget::Candidates, &experience(None, Some("IT")));
        let with_months = compose(SearchTarget::Candidates, &experience(Some(24), Some("IT")));

        assert!(!sector_only.has_join("experience_totals"));
        assert!(with_months.has_join("experience_totals"));
        assert_ne!(sector_only.join_keys(), with_months.join_keys());

        for params in [&sector_only, &with_months] {
            assert_eq!(params.to_sql().matches("JOIN sectors ").count(), 1);
        }
    }

    #[test]
    fn test_location_reuses_base_address_join() {
        let filters = SearchFilters {
            location: Some(LocationFilter::Province("madrid".into())),
            ..Default::default()
        };
        let params = compose(SearchTarget::Candidates, &filters);

        assert_eq!(params.join_keys(), vec!["address"]);
        assert!(params
            .to_sql()
            .ends_with("WHERE lower(address.province) = $1"));
        assert_eq!(
            params.predicates(),
            &[Predicate::eq_lower(rel::ADDRESS.col("province"), "madrid")]
        );
    }

    #[test]
    fn test_language_level_join_only_with_minimum_level() {
        let without = language_contribution(
            SearchTarget::Candidates,
            &LanguageFilter {
                language: LookupKey::Name("english".into()),
                minimum_level: None,
            },
        );
        assert_eq!(without.joins.len(), 2);
        assert_eq!(without.predicates.len(), 1);

        let with = language_contribution(
            SearchTarget::Candidates,
            &LanguageFilter {
                language: LookupKey::Id(3),
                minimum_level: Some(4),
            },
        );
        let keys: Vec<_> = with.joins.iter().map(Join::key).collect();
        assert_eq!(keys, vec!["candidate_languages", "languages", "language_level"]);
        assert_eq!(
            with.predicates[1],
            Predicate::Ge(rel::LANGUAGE_LEVEL.col("value"), 4)
        );
    }

    #[test]
    fn test_education_sector_chain() {
        let contribution = education_contribution(
            SearchTarget::Candidates,
            &EducationFilter::Level {
                minimum_level: Some(2),
                sector: Some(LookupKey::Name("health".into())),
            },
        );
        let keys: Vec<_> = contribution.joins.iter().map(Join::key).collect();
        assert_eq!(
            keys,
            vec![
                "candidate_educations",
                "educations",
                "education_level",
                "education_sectors",
                "education_sector"
            ]
        );
        assert_eq!(contribution.predicates.len(), 2);
        assert_eq!(contribution.eager_loads, vec![EagerLoad::CandidateEducations]);
    }

    #[test]
    fn test_education_name_uses_substring_match() {
        let contribution = education_contribution(
            SearchTarget::Jobs,
            &EducationFilter::Name("computer".into()),
        );
        assert_eq!(contribution.joins[0].key(), "job_educations");
        assert_eq!(
            contribution.predicates,
            vec![Predicate::ContainsText(
                rel::EDUCATIONS.col("qualification"),
                "computer".into()
            )]
        );
    }

    #[test]
    fn test_candidate_sequence_is_fixed() {
        let filters = SearchFilters {
            location: Some(LocationFilter::PostalCode("28001".into())),
            experience: Some(ExperienceFilter {
                months: None,
                sector: Some(LookupKey::Id(1)),
            }),
            language: Some(LanguageFilter {
                language: LookupKey::Id(2),
                minimum_level: None,
            }),
            education: Some(EducationFilter::Name("law".into())),
            skills: Some(SkillsFilter {
                skills: vec!["rust".into()],
                availability: Some(Availability::Remote),
            }),
        };
        let params = compose(SearchTarget::Candidates, &filters);

        assert_eq!(
            params.join_keys(),
            vec![
                "address",
                "experiences",
                "experience_sector",
                "candidate_languages",
                "languages",
                "candidate_educations",
                "educations"
            ]
        );
        assert_eq!(params.predicates().len(), 6);
        assert_eq!(
            params.eager_loads(),
            &[
                EagerLoad::Address,
                EagerLoad::Experiences,
                EagerLoad::CandidateLanguages,
                EagerLoad::CandidateEducations
            ]
        );
        assert!(params.suppresses_duplicate_rows());
    }

    #[test]
    fn test_job_search_filters_job_columns() {
        let filters = SearchFilters {
            experience: Some(ExperienceFilter {
                months: Some(12),
                sector: Some(LookupKey::Name("it".into())),
            }),
            skills: Some(SkillsFilter {
                skills: vec!["sql".into()],
                availability: None,
            }),
            ..Default::default()
        };
        let params = compose(SearchTarget::Jobs, &filters);

        assert_eq!(params.join_keys(), vec!["address", "job_sector"]);
        assert!(!params.has_join("experience_totals"));
        let sql = params.to_sql();
        assert!(sql.contains(
            "WHERE lower(job_sector.name) = $1 AND jobs.required_experience_months <= $2 \
             AND jobs.skills @> $3::text[]"
        ));
    }

    #[test]
    fn test_minimal_projection_keeps_filters_without_eager_loads() {
        let options = SearchOptions {
            minimal: true,
            ..Default::default()
        };
        let params = compose_search(
            SearchTarget::Candidates,
            &experience(Some(12), None),
            &options,
            today(),
        )
        .unwrap();

        assert!(params.eager_loads().is_empty());
        assert!(params.has_join("experience_totals"));
        assert!(params.to_sql().starts_with(
            "SELECT jsonb_build_object('id', candidates.id, 'first_name', candidates.first_name, \
             'last_name', candidates.last_name, 'city', address.city) AS record"
        ));
    }

    #[test]
    fn test_order_by_is_checked_against_allow_list() {
        let options = SearchOptions {
            order_by: Some("password".into()),
            ..Default::default()
        };
        let err = compose_search(
            SearchTarget::Candidates,
            &SearchFilters::default(),
            &options,
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let options = SearchOptions {
            order_by: Some("last_name".into()),
            descending: true,
            limit: Some(10),
            offset: Some(0),
            ..Default::default()
        };
        let sql = compose_search(
            SearchTarget::Candidates,
            &SearchFilters::default(),
            &options,
            today(),
        )
        .unwrap()
        .to_sql();
        assert!(sql.ends_with("ORDER BY candidates.last_name DESC LIMIT $1 OFFSET $2"));
    }
}
