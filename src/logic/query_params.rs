//! Build context for relational queries over the fixed catalog.
//!
//! A `QueryParams` collects the projection, joins, predicates and eager-load
//! directives of a single query and renders them into a `sqlx::QueryBuilder`
//! with every value bound. Every rendered statement yields exactly one `jsonb`
//! column per row, which the record accessor decodes into entities or scalars.

use chrono::NaiveDate;
use itertools::Itertools;
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashSet;

use crate::model::Id;

/// Rendered statement; all values are owned binds
pub type SqlBuilder = QueryBuilder<'static, Postgres>;

/// Tables of the relational catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Candidates,
    Companies,
    Jobs,
    Addresses,
    Sectors,
    Experiences,
    Languages,
    LanguageLevels,
    CandidateLanguages,
    JobLanguages,
    Educations,
    EducationLevels,
    CandidateEducations,
    JobEducations,
    EducationSectors,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Candidates => "candidates",
            Table::Companies => "companies",
            Table::Jobs => "jobs",
            Table::Addresses => "addresses",
            Table::Sectors => "sectors",
            Table::Experiences => "experiences",
            Table::Languages => "languages",
            Table::LanguageLevels => "language_levels",
            Table::CandidateLanguages => "candidate_languages",
            Table::JobLanguages => "job_languages",
            Table::Educations => "educations",
            Table::EducationLevels => "education_levels",
            Table::CandidateEducations => "candidate_educations",
            Table::JobEducations => "job_educations",
            Table::EducationSectors => "education_sectors",
        }
    }

    /// Joining this table from its owner can yield several rows per owner
    pub fn fans_out(&self) -> bool {
        matches!(
            self,
            Table::Experiences
                | Table::CandidateLanguages
                | Table::JobLanguages
                | Table::CandidateEducations
                | Table::JobEducations
                | Table::EducationSectors
        )
    }

    /// Entity name used in not-found errors
    pub fn entity_name(&self) -> &'static str {
        match self {
            Table::Users => "User",
            Table::Candidates => "Candidate",
            Table::Companies => "Company",
            Table::Jobs => "Job",
            Table::Addresses => "Address",
            Table::Sectors => "Sector",
            Table::Experiences => "Experience",
            Table::Languages => "Language",
            Table::LanguageLevels => "Language level",
            Table::Educations => "Education",
            Table::EducationLevels => "Education level",
            Table::CandidateLanguages
            | Table::JobLanguages
            | Table::CandidateEducations
            | Table::JobEducations
            | Table::EducationSectors => "Association",
        }
    }
}

/// A table under an alias. The alias is the join identity, so one table can
/// take part in a query under several roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relation {
    pub table: Table,
    pub alias: &'static str,
}

impl Relation {
    pub const fn new(table: Table, alias: &'static str) -> Self {
        Self { table, alias }
    }

    pub const fn col(&self, name: &'static str) -> Column {
        Column {
            relation: self.alias,
            name,
        }
    }

    pub const fn id(&self) -> Column {
        self.col("id")
    }
}

/// Relations used by the search and accessor paths
pub mod rel {
    use super::{Relation, Table};

    pub const USERS: Relation = Relation::new(Table::Users, "users");
    pub const CANDIDATES: Relation = Relation::new(Table::Candidates, "candidates");
    pub const COMPANIES: Relation = Relation::new(Table::Companies, "companies");
    pub const JOBS: Relation = Relation::new(Table::Jobs, "jobs");
    pub const SECTORS: Relation = Relation::new(Table::Sectors, "sectors");
    pub const ADDRESS: Relation = Relation::new(Table::Addresses, "address");
    pub const EXPERIENCES: Relation = Relation::new(Table::Experiences, "experiences");
    pub const EXPERIENCE_SECTOR: Relation = Relation::new(Table::Sectors, "experience_sector");
    pub const JOB_SECTOR: Relation = Relation::new(Table::Sectors, "job_sector");
    pub const CANDIDATE_LANGUAGES: Relation =
        Relation::new(Table::CandidateLanguages, "candidate_languages");
    pub const JOB_LANGUAGES: Relation = Relation::new(Table::JobLanguages, "job_languages");
    pub const LANGUAGES: Relation = Relation::new(Table::Languages, "languages");
    pub const LANGUAGE_LEVEL: Relation = Relation::new(Table::LanguageLevels, "language_level");
    pub const CANDIDATE_EDUCATIONS: Relation =
        Relation::new(Table::CandidateEducations, "candidate_educations");
    pub const JOB_EDUCATIONS: Relation = Relation::new(Table::JobEducations, "job_educations");
    pub const EDUCATIONS: Relation = Relation::new(Table::Educations, "educations");
    pub const EDUCATION_LEVEL: Relation = Relation::new(Table::EducationLevels, "education_level");
    pub const EDUCATION_SECTORS: Relation =
        Relation::new(Table::EducationSectors, "education_sectors");
    pub const EDUCATION_SECTOR: Relation = Relation::new(Table::Sectors, "education_sector");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub relation: &'static str,
    pub name: &'static str,
}

impl Column {
    fn render(&self) -> String {
        format!("{}.{}", self.relation, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(Column),
    Lower(Column),
}

impl Operand {
    fn render(&self) -> String {
        match self {
            Operand::Column(col) => col.render(),
            Operand::Lower(col) => format!("lower({})", col.render()),
        }
    }
}

/// Boolean expressions; a query's predicates are AND-ed together
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Key column equals the given id
    IdEq(Column, Id),
    TextEq(Operand, String),
    Ge(Column, i32),
    Le(Column, i32),
    /// Case-insensitive substring match, needle already lowercased
    ContainsText(Column, String),
    /// Array column contains every given element
    ArrayContains(Column, Vec<String>),
    /// Interval column is at least the given number of months
    IntervalAtLeastMonths(Column, i32),
}

impl Predicate {
    pub fn text_eq(column: Column, value: impl Into<String>) -> Self {
        Predicate::TextEq(Operand::Column(column), value.into())
    }

    pub fn eq_lower(column: Column, value: impl Into<String>) -> Self {
        Predicate::TextEq(Operand::Lower(column), value.into())
    }

    fn push_sql(&self, b: &mut SqlBuilder) {
        match self {
            Predicate::IdEq(col, id) => {
                b.push(col.render()).push(" = ").push_bind(*id);
            }
            Predicate::TextEq(operand, value) => {
                b.push(operand.render()).push(" = ").push_bind(value.clone());
            }
            Predicate::Ge(col, value) => {
                b.push(col.render()).push(" >= ").push_bind(*value);
            }
            Predicate::Le(col, value) => {
                b.push(col.render()).push(" <= ").push_bind(*value);
            }
            Predicate::ContainsText(col, needle) => {
                b.push(format!("lower({}) LIKE ", col.render()))
                    .push_bind(format!("%{}%", escape_like(needle)));
            }
            Predicate::ArrayContains(col, values) => {
                b.push(col.render())
                    .push(" @> ")
                    .push_bind(values.clone())
                    .push("::text[]");
            }
            Predicate::IntervalAtLeastMonths(col, months) => {
                b.push(col.render())
                    .push(" >= make_interval(months => ")
                    .push_bind(*months)
                    .push(")");
            }
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Per-candidate sum of experience durations, optionally restricted by the
/// joins and predicates given (used for the sector pre-filter).
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceTotals {
    /// Open-ended experience rows are counted up to this date
    pub today: NaiveDate,
    pub joins: Vec<Join>,
    pub predicates: Vec<Predicate>,
}

impl ExperienceTotals {
    pub const ALIAS: &'static str = "experience_totals";
    pub const CANDIDATE_ID: Column = Column {
        relation: Self::ALIAS,
        name: "candidate_id",
    };
    pub const TOTAL: Column = Column {
        relation: Self::ALIAS,
        name: "total_experience",
    };

    fn push_sql(&self, b: &mut SqlBuilder) {
        let exp = rel::EXPERIENCES;
        b.push(format!(
            "(SELECT {alias}.candidate_id AS candidate_id, sum(age(coalesce({alias}.end_date, ",
            alias = exp.alias
        ));
        b.push_bind(self.today);
        b.push(format!(
            "::date), {alias}.start_date)) AS total_experience FROM {table} {alias}",
            alias = exp.alias,
            table = exp.table.name()
        ));
        for join in &self.joins {
            join.push_sql(b);
        }
        push_where(b, &self.predicates);
        b.push(format!(" GROUP BY {}.candidate_id)", exp.alias));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Relation(Relation),
    ExperienceTotals(ExperienceTotals),
}

impl JoinTarget {
    /// Identity used for join deduplication
    pub fn key(&self) -> &'static str {
        match self {
            JoinTarget::Relation(relation) => relation.alias,
            JoinTarget::ExperienceTotals(_) => ExperienceTotals::ALIAS,
        }
    }

    fn fans_out(&self) -> bool {
        match self {
            JoinTarget::Relation(relation) => relation.table.fans_out(),
            // One row per candidate
            JoinTarget::ExperienceTotals(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub target: JoinTarget,
    /// Column equalities, AND-ed
    pub on: Vec<(Column, Column)>,
    pub outer: bool,
}

impl Join {
    pub fn inner(relation: Relation, left: Column, right: Column) -> Self {
        Self {
            target: JoinTarget::Relation(relation),
            on: vec![(left, right)],
            outer: false,
        }
    }

    pub fn outer(relation: Relation, left: Column, right: Column) -> Self {
        Self {
            outer: true,
            ..Self::inner(relation, left, right)
        }
    }

    pub fn subquery(totals: ExperienceTotals, owner_id: Column) -> Self {
        Self {
            target: JoinTarget::ExperienceTotals(totals),
            on: vec![(ExperienceTotals::CANDIDATE_ID, owner_id)],
            outer: false,
        }
    }

    pub fn key(&self) -> &'static str {
        self.target.key()
    }

    fn push_sql(&self, b: &mut SqlBuilder) {
        b.push(if self.outer { " LEFT JOIN " } else { " JOIN " });
        match &self.target {
            JoinTarget::Relation(relation) => {
                b.push(format!("{} {}", relation.table.name(), relation.alias));
            }
            JoinTarget::ExperienceTotals(totals) => {
                totals.push_sql(b);
                b.push(" ").push(ExperienceTotals::ALIAS);
            }
        }
        let on = self
            .on
            .iter()
            .map(|(left, right)| format!("{} = {}", left.render(), right.render()))
            .join(" AND ");
        b.push(" ON ").push(on);
    }
}

/// Related rows materialised inside the same statement as a JSON field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EagerLoad {
    Address,
    Sector,
    Company,
    Experiences,
    CandidateLanguages,
    JobLanguages,
    CandidateEducations,
    JobEducations,
}

impl EagerLoad {
    /// Field name of the loaded relation in the decoded record
    pub fn field(&self) -> &'static str {
        match self {
            EagerLoad::Address => "address",
            EagerLoad::Sector => "sector",
            EagerLoad::Company => "company",
            EagerLoad::Experiences => "experiences",
            EagerLoad::CandidateLanguages | EagerLoad::JobLanguages => "languages",
            EagerLoad::CandidateEducations | EagerLoad::JobEducations => "educations",
        }
    }

    fn render(&self, root: &str) -> String {
        match self {
            EagerLoad::Address => format!(
                "(SELECT to_jsonb(eager_address.*) FROM addresses eager_address \
                 WHERE eager_address.id = {root}.address_id)"
            ),
            EagerLoad::Sector => format!(
                "(SELECT to_jsonb(eager_sector.*) FROM sectors eager_sector \
                 WHERE eager_sector.id = {root}.sector_id)"
            ),
            EagerLoad::Company => format!(
                "(SELECT to_jsonb(eager_company.*) FROM companies eager_company \
                 WHERE eager_company.id = {root}.company_id)"
            ),
            EagerLoad::Experiences => format!(
                "(SELECT coalesce(jsonb_agg(to_jsonb(eager_experiences.*) \
                 ORDER BY eager_experiences.start_date DESC), '[]'::jsonb) \
                 FROM experiences eager_experiences \
                 WHERE eager_experiences.candidate_id = {root}.id)"
            ),
            EagerLoad::CandidateLanguages => render_language_load("candidate_languages", "candidate_id", root),
            EagerLoad::JobLanguages => render_language_load("job_languages", "job_id", root),
            EagerLoad::CandidateEducations => render_education_load("candidate_educations", "candidate_id", root),
            EagerLoad::JobEducations => render_education_load("job_educations", "job_id", root),
        }
    }
}

fn render_language_load(link: &str, owner: &str, root: &str) -> String {
    format!(
        "(SELECT coalesce(jsonb_agg(jsonb_build_object(\
         'language_id', eager_languages.id, 'language', eager_languages.name, \
         'level', eager_levels.name, 'level_value', eager_levels.value) \
         ORDER BY eager_languages.name), '[]'::jsonb) \
         FROM {link} eager_link \
         JOIN languages eager_languages ON eager_languages.id = eager_link.language_id \
         JOIN language_levels eager_levels ON eager_levels.id = eager_link.level_id \
         WHERE eager_link.{owner} = {root}.id)"
    )
}

fn render_education_load(link: &str, owner: &str, root: &str) -> String {
    format!(
        "(SELECT coalesce(jsonb_agg(jsonb_build_object(\
         'education_id', eager_educations.id, 'qualification', eager_educations.qualification, \
         'level', eager_levels.name, 'level_value', eager_levels.value) \
         ORDER BY eager_levels.value DESC), '[]'::jsonb) \
         FROM {link} eager_link \
         JOIN educations eager_educations ON eager_educations.id = eager_link.education_id \
         JOIN education_levels eager_levels ON eager_levels.id = eager_educations.level_id \
         WHERE eager_link.{owner} = {root}.id)"
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Whole root row plus eager-loaded relations
    Entity,
    /// Named columns, possibly from joined relations
    Columns(Vec<(&'static str, Column)>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy {
    pub column: Column,
    pub descending: bool,
}

/// Joins, predicates and eager loads produced by one filter dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub joins: Vec<Join>,
    pub predicates: Vec<Predicate>,
    pub eager_loads: Vec<EagerLoad>,
}

impl Contribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eager(mut self, load: EagerLoad) -> Self {
        self.eager_loads.push(load);
        self
    }
}

fn push_where(b: &mut SqlBuilder, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        b.push(if i == 0 { " WHERE " } else { " AND " });
        predicate.push_sql(b);
    }
}

/// Build context for a single query.
///
/// Invariant: `seen_join_targets` holds exactly the keys of `joins`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    root: Relation,
    projection: Projection,
    joins: Vec<Join>,
    seen_join_targets: HashSet<&'static str>,
    predicates: Vec<Predicate>,
    eager_loads: Vec<EagerLoad>,
    result_is_scalar: bool,
    suppress_duplicate_rows: bool,
    order_by: Vec<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QueryParams {
    pub fn select(root: Relation) -> Self {
        Self {
            root,
            projection: Projection::Entity,
            joins: Vec::new(),
            seen_join_targets: HashSet::new(),
            predicates: Vec::new(),
            eager_loads: Vec::new(),
            result_is_scalar: false,
            suppress_duplicate_rows: false,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Switch to a tuple projection. Eager loads are dropped since there is
    /// no entity to attach them to; joins and predicates are kept.
    pub fn columns(mut self, columns: Vec<(&'static str, Column)>) -> Self {
        self.projection = Projection::Columns(columns);
        self.eager_loads.clear();
        self
    }

    /// Return only the first projected column (the root id for entities)
    pub fn scalar(mut self) -> Self {
        self.result_is_scalar = true;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.suppress_duplicate_rows = true;
        self
    }

    pub fn is_minimal(&self) -> bool {
        matches!(self.projection, Projection::Columns(_))
    }

    /// Insert `join` unless a join with the same target already exists
    pub fn add_join(&mut self, join: Join) {
        if self.seen_join_targets.insert(join.key()) {
            if join.target.fans_out() {
                self.suppress_duplicate_rows = true;
            }
            self.joins.push(join);
        }
    }

    pub fn add_join_list(&mut self, joins: impl IntoIterator<Item = Join>) {
        for join in joins {
            self.add_join(join);
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.add_join(join);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn eager(mut self, load: EagerLoad) -> Self {
        if !self.is_minimal() && !self.eager_loads.contains(&load) {
            self.eager_loads.push(load);
        }
        self
    }

    pub fn eager_all(self, loads: impl IntoIterator<Item = EagerLoad>) -> Self {
        loads.into_iter().fold(self, Self::eager)
    }

    /// Fold one dimension's contribution into the context
    pub fn apply(mut self, contribution: Contribution) -> Self {
        let Contribution {
            joins,
            predicates,
            eager_loads,
        } = contribution;
        self.add_join_list(joins);
        self.predicates.extend(predicates);
        self.eager_all(eager_loads)
    }

    pub fn order_by(mut self, column: Column, descending: bool) -> Self {
        self.order_by.push(OrderBy { column, descending });
        self
    }

    pub fn paginate(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn root(&self) -> Relation {
        self.root
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn join_keys(&self) -> Vec<&'static str> {
        self.joins.iter().map(Join::key).collect()
    }

    pub fn has_join(&self, key: &str) -> bool {
        self.seen_join_targets.contains(key)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn eager_loads(&self) -> &[EagerLoad] {
        &self.eager_loads
    }

    pub fn result_is_scalar(&self) -> bool {
        self.result_is_scalar
    }

    pub fn suppresses_duplicate_rows(&self) -> bool {
        self.suppress_duplicate_rows
    }

    /// Render into a builder ready for `build_query_scalar`
    pub fn to_query(&self) -> SqlBuilder {
        let root = self.root.alias;
        let mut b = QueryBuilder::new("SELECT ");
        b.push(self.render_record())
            .push(" AS record FROM ")
            .push(format!("{} {}", self.root.table.name(), root));

        for join in &self.joins {
            join.push_sql(&mut b);
        }
        push_where(&mut b, &self.predicates);

        if self.suppress_duplicate_rows {
            // Grouping by primary keys collapses fan-out rows while keeping
            // every projected column functionally dependent on the group
            let mut keys = vec![format!("{}.id", root)];
            if let Projection::Columns(columns) = &self.projection {
                for (_, col) in columns {
                    let key = format!("{}.id", col.relation);
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            b.push(" GROUP BY ").push(keys.join(", "));
        }

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|o| {
                    format!(
                        "{} {}",
                        o.column.render(),
                        if o.descending { "DESC" } else { "ASC" }
                    )
                })
                .join(", ");
            b.push(" ORDER BY ").push(order);
        }
        if let Some(limit) = self.limit {
            b.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = self.offset {
            b.push(" OFFSET ").push_bind(offset);
        }
        b
    }

    /// Statement text with `$n` placeholders
    pub fn to_sql(&self) -> String {
        self.to_query().sql().to_owned()
    }

    fn render_record(&self) -> String {
        let root = self.root.alias;
        match &self.projection {
            Projection::Entity if self.result_is_scalar => format!("to_jsonb({}.id)", root),
            Projection::Entity if self.eager_loads.is_empty() => format!("to_jsonb({}.*)", root),
            Projection::Entity => {
                let fields = self
                    .eager_loads
                    .iter()
                    .map(|load| format!("'{}', {}", load.field(), load.render(root)))
                    .join(", ");
                format!("to_jsonb({}.*) || jsonb_build_object({})", root, fields)
            }
            Projection::Columns(columns) if self.result_is_scalar => match columns.first() {
                Some((_, col)) => format!("to_jsonb({})", col.render()),
                None => format!("to_jsonb({}.id)", root),
            },
            Projection::Columns(columns) => {
                let fields = columns
                    .iter()
                    .map(|(name, col)| format!("'{}', {}", name, col.render()))
                    .join(", ");
                format!("jsonb_build_object({})", fields)
            }
        }
    }
}

/// Single-row lookup by primary key
pub fn by_id(root: Relation, id: Id) -> QueryParams {
    QueryParams::select(root).filter(Predicate::IdEq(root.id(), id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience_join() -> Join {
        Join::inner(
            rel::EXPERIENCES,
            rel::EXPERIENCES.col("candidate_id"),
            rel::CANDIDATES.id(),
        )
    }

    fn address_join() -> Join {
        Join::outer(
            rel::ADDRESS,
            rel::ADDRESS.id(),
            rel::CANDIDATES.col("address_id"),
        )
    }

    #[test]
    fn test_add_join_is_idempotent_and_keeps_first_occurrence_order() {
        let mut params = QueryParams::select(rel::CANDIDATES);
        params.add_join_list(vec![
            address_join(),
            experience_join(),
            address_join(),
            Join::inner(
                rel::EXPERIENCE_SECTOR,
                rel::EXPERIENCE_SECTOR.id(),
                rel::EXPERIENCES.col("sector_id"),
            ),
            experience_join(),
        ]);

        assert_eq!(
            params.join_keys(),
            vec!["address", "experiences", "experience_sector"]
        );
        for key in params.join_keys() {
            assert!(params.has_join(key));
        }
        assert_eq!(params.seen_join_targets.len(), params.joins().len());
    }

    #[test]
    fn test_first_writer_wins_on_duplicate_target() {
        let mut params = QueryParams::select(rel::CANDIDATES);
        params.add_join(address_join());
        params.add_join(Join::inner(
            rel::ADDRESS,
            rel::ADDRESS.id(),
            rel::JOBS.col("address_id"),
        ));

        assert_eq!(params.joins().len(), 1);
        assert!(params.joins()[0].outer);
    }

    #[test]
    fn test_same_table_under_two_aliases_joins_twice() {
        let params = QueryParams::select(rel::CANDIDATES)
            .join(Join::inner(
                rel::EXPERIENCE_SECTOR,
                rel::EXPERIENCE_SECTOR.id(),
                rel::EXPERIENCES.col("sector_id"),
            ))
            .join(Join::inner(
                rel::EDUCATION_SECTOR,
                rel::EDUCATION_SECTOR.id(),
                rel::EDUCATION_SECTORS.col("sector_id"),
            ));

        assert_eq!(params.joins().len(), 2);
    }

    #[test]
    fn test_fan_out_join_enables_duplicate_suppression() {
        let plain = QueryParams::select(rel::CANDIDATES).join(address_join());
        assert!(!plain.suppresses_duplicate_rows());

        let fanned = plain.join(experience_join());
        assert!(fanned.suppresses_duplicate_rows());
        assert!(fanned.to_sql().ends_with(" GROUP BY candidates.id"));
    }

    #[test]
    fn test_minimal_projection_skips_eager_loads_but_keeps_filters() {
        let params = QueryParams::select(rel::CANDIDATES)
            .eager(EagerLoad::Experiences)
            .columns(vec![
                ("id", rel::CANDIDATES.id()),
                ("city", rel::ADDRESS.col("city")),
            ])
            .apply(
                Contribution::new()
                    .join(address_join())
                    .filter(Predicate::text_eq(rel::ADDRESS.col("postal_code"), "28001"))
                    .eager(EagerLoad::Address),
            );

        assert!(params.eager_loads().is_empty());
        assert_eq!(params.predicates().len(), 1);

        assert_eq!(
            params.to_sql(),
            "SELECT jsonb_build_object('id', candidates.id, 'city', address.city) AS record \
             FROM candidates candidates LEFT JOIN addresses address ON address.id = candidates.address_id \
             WHERE address.postal_code = $1"
        );
    }

    #[test]
    fn test_entity_projection_renders_eager_loads() {
        let sql = QueryParams::select(rel::JOBS)
            .eager(EagerLoad::Company)
            .eager(EagerLoad::JobLanguages)
            .eager(EagerLoad::Company)
            .to_sql();

        assert!(sql.starts_with("SELECT to_jsonb(jobs.*) || jsonb_build_object('company', (SELECT"));
        assert!(sql.contains("'languages', (SELECT coalesce(jsonb_agg("));
        assert!(sql.contains("WHERE eager_link.job_id = jobs.id"));
        assert_eq!(sql.matches("'company'").count(), 1);
    }

    #[test]
    fn test_scalar_projection_selects_first_column() {
        let sql = QueryParams::select(rel::CANDIDATES)
            .columns(vec![
                ("user_id", rel::CANDIDATES.col("user_id")),
                ("id", rel::CANDIDATES.id()),
            ])
            .scalar()
            .to_sql();
        assert_eq!(
            sql,
            "SELECT to_jsonb(candidates.user_id) AS record FROM candidates candidates"
        );

        let entity = by_id(rel::JOBS, 4).scalar().to_sql();
        assert!(entity.starts_with("SELECT to_jsonb(jobs.id) AS record"));
    }

    #[test]
    fn test_pagination_and_ordering_pass_through() {
        let sql = QueryParams::select(rel::CANDIDATES)
            .filter(Predicate::ArrayContains(
                rel::CANDIDATES.col("skills"),
                vec!["rust".into()],
            ))
            .order_by(rel::CANDIDATES.col("created_at"), true)
            .paginate(Some(20), Some(40))
            .to_sql();

        assert_eq!(
            sql,
            "SELECT to_jsonb(candidates.*) AS record FROM candidates candidates \
             WHERE candidates.skills @> $1::text[] \
             ORDER BY candidates.created_at DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_contains_text_escapes_wildcards() {
        let sql = QueryParams::select(rel::EDUCATIONS)
            .filter(Predicate::ContainsText(
                rel::EDUCATIONS.col("qualification"),
                "100%_pure".into(),
            ))
            .to_sql();
        assert!(sql.ends_with("WHERE lower(educations.qualification) LIKE $1"));
        assert_eq!(escape_like("100%_pure"), "100\\%\\_pure");
    }

    #[test]
    fn test_grouping_includes_joined_projection_relations() {
        let sql = QueryParams::select(rel::CANDIDATES)
            .columns(vec![
                ("id", rel::CANDIDATES.id()),
                ("city", rel::ADDRESS.col("city")),
            ])
            .join(address_join())
            .join(experience_join())
            .to_sql();
        assert!(sql.ends_with(" GROUP BY candidates.id, address.id"));
    }
}
