use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::error::DomainResult;
use crate::logic::constraints::finish_write;
use crate::logic::query_params::QueryParams;
use crate::model::{
    Availability, CandidateUpdate, Id, JobUpdate, NewAddress, NewCandidate, NewCompany,
    NewEducationRecord, NewExperience, NewJob, NewLanguageSkill, NewUser,
};
use crate::store::traits::{OwnershipStore, RecordStore, ResourceKind, WriteStore};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(20))
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        log::info!("Database migrations applied");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }
}

fn normalize_skills(skills: &[String]) -> Vec<String> {
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn availability_names(availability: &[Availability]) -> Vec<String> {
    availability.iter().map(|a| a.as_str().to_string()).collect()
}

/// Existing sector with this name, or a new one
async fn sector_id(conn: &mut PgConnection, name: &str) -> Result<Id, sqlx::Error> {
    let name = name.trim().to_lowercase();
    let inserted = sqlx::query_scalar::<_, Id>(
        "INSERT INTO sectors (name) VALUES ($1) \
         ON CONFLICT ON CONSTRAINT sectors_name_key DO NOTHING RETURNING id",
    )
    .bind(&name)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(id) => Ok(id),
        None => {
            sqlx::query_scalar::<_, Id>("SELECT id FROM sectors WHERE name = $1")
                .bind(&name)
                .fetch_one(&mut *conn)
                .await
        }
    }
}

async fn address_id(conn: &mut PgConnection, address: &NewAddress) -> Result<Id, sqlx::Error> {
    let address = address.normalized();
    let inserted = sqlx::query_scalar::<_, Id>(
        "INSERT INTO addresses (postal_code, province, city) VALUES ($1, $2, $3) \
         ON CONFLICT ON CONSTRAINT addresses_location_key DO NOTHING RETURNING id",
    )
    .bind(&address.postal_code)
    .bind(&address.province)
    .bind(&address.city)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(id) => Ok(id),
        None => {
            sqlx::query_scalar::<_, Id>(
                "SELECT id FROM addresses WHERE postal_code = $1 AND province = $2 AND city = $3",
            )
            .bind(&address.postal_code)
            .bind(&address.province)
            .bind(&address.city)
            .fetch_one(&mut *conn)
            .await
        }
    }
}

async fn optional_address(
    conn: &mut PgConnection,
    address: Option<&NewAddress>,
) -> Result<Option<Id>, sqlx::Error> {
    match address {
        Some(address) => Ok(Some(address_id(conn, address).await?)),
        None => Ok(None),
    }
}

async fn optional_sector(
    conn: &mut PgConnection,
    sector: Option<&str>,
) -> Result<Option<Id>, sqlx::Error> {
    match sector.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Ok(Some(sector_id(conn, name).await?)),
        None => Ok(None),
    }
}

async fn insert_candidate(
    conn: &mut PgConnection,
    candidate: &NewCandidate,
) -> Result<Id, sqlx::Error> {
    let address_id = optional_address(conn, candidate.address.as_ref()).await?;
    sqlx::query_scalar::<_, Id>(
        r#"
        INSERT INTO candidates (user_id, first_name, last_name, headline, skills, availability, address_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(candidate.user_id)
    .bind(candidate.first_name.trim())
    .bind(candidate.last_name.trim())
    .bind(candidate.headline.as_deref())
    .bind(normalize_skills(&candidate.skills))
    .bind(availability_names(&candidate.availability))
    .bind(address_id)
    .fetch_one(&mut *conn)
    .await
}

/// Lock the row for the rest of the transaction; false when it does not exist
async fn lock_row(conn: &mut PgConnection, sql: &str, id: Id) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_scalar::<_, Id>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn apply_candidate_update(
    conn: &mut PgConnection,
    id: Id,
    update: &CandidateUpdate,
) -> Result<bool, sqlx::Error> {
    // Nothing may be created for a candidate that is not there
    if !lock_row(conn, "SELECT id FROM candidates WHERE id = $1 FOR UPDATE", id).await? {
        return Ok(false);
    }
    let address_id = optional_address(conn, update.address.as_ref()).await?;
    let result = sqlx::query(
        r#"
        UPDATE candidates SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            headline = COALESCE($4, headline),
            skills = COALESCE($5, skills),
            availability = COALESCE($6, availability),
            address_id = COALESCE($7, address_id)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(update.first_name.as_deref().map(str::trim))
    .bind(update.last_name.as_deref().map(str::trim))
    .bind(update.headline.as_deref())
    .bind(update.skills.as_deref().map(normalize_skills))
    .bind(update.availability.as_deref().map(availability_names))
    .bind(address_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn insert_experience(
    conn: &mut PgConnection,
    candidate_id: Id,
    experience: &NewExperience,
) -> Result<Id, sqlx::Error> {
    let sector_id = optional_sector(conn, experience.sector.as_deref()).await?;
    sqlx::query_scalar::<_, Id>(
        r#"
        INSERT INTO experiences (candidate_id, sector_id, title, company_name, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(candidate_id)
    .bind(sector_id)
    .bind(experience.title.trim())
    .bind(experience.company_name.trim())
    .bind(experience.start_date)
    .bind(experience.end_date)
    .fetch_one(&mut *conn)
    .await
}

async fn insert_company(conn: &mut PgConnection, company: &NewCompany) -> Result<Id, sqlx::Error> {
    let address_id = optional_address(conn, company.address.as_ref()).await?;
    sqlx::query_scalar::<_, Id>(
        "INSERT INTO companies (user_id, name, description, address_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(company.user_id)
    .bind(company.name.trim())
    .bind(company.description.as_deref())
    .bind(address_id)
    .fetch_one(&mut *conn)
    .await
}

async fn insert_job(conn: &mut PgConnection, company_id: Id, job: &NewJob) -> Result<Id, sqlx::Error> {
    let sector_id = optional_sector(conn, job.sector.as_deref()).await?;
    let address_id = optional_address(conn, job.address.as_ref()).await?;

    let id = sqlx::query_scalar::<_, Id>(
        r#"
        INSERT INTO jobs (company_id, title, description, skills, availability, sector_id,
                          required_experience_months, address_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(company_id)
    .bind(job.title.trim())
    .bind(job.description.as_deref())
    .bind(normalize_skills(&job.skills))
    .bind(availability_names(&job.availability))
    .bind(sector_id)
    .bind(job.required_experience_months)
    .bind(address_id)
    .fetch_one(&mut *conn)
    .await?;

    for language in &job.languages {
        sqlx::query("INSERT INTO job_languages (job_id, language_id, level_id) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(language.language_id)
            .bind(language.level_id)
            .execute(&mut *conn)
            .await?;
    }
    for education_id in &job.educations {
        sqlx::query("INSERT INTO job_educations (job_id, education_id) VALUES ($1, $2)")
            .bind(id)
            .bind(*education_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

async fn apply_job_update(
    conn: &mut PgConnection,
    id: Id,
    update: &JobUpdate,
) -> Result<bool, sqlx::Error> {
    if !lock_row(conn, "SELECT id FROM jobs WHERE id = $1 FOR UPDATE", id).await? {
        return Ok(false);
    }
    let sector_id = optional_sector(conn, update.sector.as_deref()).await?;
    let address_id = optional_address(conn, update.address.as_ref()).await?;
    let result = sqlx::query(
        r#"
        UPDATE jobs SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            skills = COALESCE($4, skills),
            availability = COALESCE($5, availability),
            sector_id = COALESCE($6, sector_id),
            required_experience_months = COALESCE($7, required_experience_months),
            address_id = COALESCE($8, address_id)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(update.title.as_deref().map(str::trim))
    .bind(update.description.as_deref())
    .bind(update.skills.as_deref().map(normalize_skills))
    .bind(update.availability.as_deref().map(availability_names))
    .bind(sector_id)
    .bind(update.required_experience_months)
    .bind(address_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn delete_row(conn: &mut PgConnection, sql: &str, id: Id) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(sql).bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait::async_trait]
impl RecordStore for PostgresStore {
    async fn query_records(&self, query: &QueryParams) -> Result<Vec<Value>> {
        let mut builder = query.to_query();
        log::debug!("{}", builder.sql());

        builder
            .build_query_scalar::<Value>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to execute query")
    }
}

#[async_trait::async_trait]
impl OwnershipStore for PostgresStore {
    async fn owner_of(&self, kind: ResourceKind, id: Id) -> Result<Option<Id>> {
        let sql = match kind {
            ResourceKind::User => "SELECT id FROM users WHERE id = $1",
            ResourceKind::Candidate => "SELECT user_id FROM candidates WHERE id = $1",
            ResourceKind::Company => "SELECT user_id FROM companies WHERE id = $1",
            ResourceKind::Job => {
                "SELECT companies.user_id FROM jobs \
                 JOIN companies ON companies.id = jobs.company_id WHERE jobs.id = $1"
            }
        };
        sqlx::query_scalar::<_, Id>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to resolve owner of {:?} {}", kind, id))
    }
}

#[async_trait::async_trait]
impl WriteStore for PostgresStore {
    async fn create_user(&self, user: NewUser) -> DomainResult<Id> {
        let mut tx = self.begin().await?;
        let result = sqlx::query_scalar::<_, Id>(
            "INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user.username.trim())
        .bind(user.email.trim().to_lowercase())
        .bind(user.role.as_str())
        .fetch_one(&mut *tx)
        .await;
        finish_write(tx, result).await
    }

    async fn delete_user(&self, id: Id) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let result = delete_row(&mut *tx, "DELETE FROM users WHERE id = $1", id).await;
        finish_write(tx, result).await
    }

    async fn create_candidate(&self, candidate: NewCandidate) -> DomainResult<Id> {
        let mut tx = self.begin().await?;
        let result = insert_candidate(&mut *tx, &candidate).await;
        finish_write(tx, result).await
    }

    async fn update_candidate(&self, id: Id, update: CandidateUpdate) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let result = apply_candidate_update(&mut *tx, id, &update).await;
        finish_write(tx, result).await
    }

    async fn delete_candidate(&self, id: Id) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let result = delete_row(&mut *tx, "DELETE FROM candidates WHERE id = $1", id).await;
        finish_write(tx, result).await
    }

    async fn add_experience(
        &self,
        candidate_id: Id,
        experience: NewExperience,
    ) -> DomainResult<Id> {
        let mut tx = self.begin().await?;
        let result = insert_experience(&mut *tx, candidate_id, &experience).await;
        finish_write(tx, result).await
    }

    async fn add_language(
        &self,
        candidate_id: Id,
        language: NewLanguageSkill,
    ) -> DomainResult<()> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "INSERT INTO candidate_languages (candidate_id, language_id, level_id) VALUES ($1, $2, $3)",
        )
        .bind(candidate_id)
        .bind(language.language_id)
        .bind(language.level_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
        finish_write(tx, result).await
    }

    async fn add_education(
        &self,
        candidate_id: Id,
        education: NewEducationRecord,
    ) -> DomainResult<()> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "INSERT INTO candidate_educations (candidate_id, education_id) VALUES ($1, $2)",
        )
        .bind(candidate_id)
        .bind(education.education_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
        finish_write(tx, result).await
    }

    async fn create_company(&self, company: NewCompany) -> DomainResult<Id> {
        let mut tx = self.begin().await?;
        let result = insert_company(&mut *tx, &company).await;
        finish_write(tx, result).await
    }

    async fn create_job(&self, company_id: Id, job: NewJob) -> DomainResult<Id> {
        let mut tx = self.begin().await?;
        let result = insert_job(&mut *tx, company_id, &job).await;
        finish_write(tx, result).await
    }

    async fn update_job(&self, id: Id, update: JobUpdate) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let result = apply_job_update(&mut *tx, id, &update).await;
        finish_write(tx, result).await
    }

    async fn delete_job(&self, id: Id) -> DomainResult<bool> {
        let mut tx = self.begin().await?;
        let result = delete_row(&mut *tx, "DELETE FROM jobs WHERE id = $1", id).await;
        finish_write(tx, result).await
    }
}
