use anyhow::Result;
use serde_json::Value;

use crate::error::DomainResult;
use crate::logic::query_params::QueryParams;
use crate::model::{
    CandidateUpdate, Id, JobUpdate, NewCandidate, NewCompany, NewEducationRecord, NewExperience,
    NewJob, NewLanguageSkill, NewUser,
};

/// Resources whose owning user can be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    Candidate,
    Company,
    /// Owned through the posting company
    Job,
}

/// Read side: executes composed queries, one JSON record per row
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn query_records(&self, query: &QueryParams) -> Result<Vec<Value>>;
}

#[async_trait::async_trait]
pub trait OwnershipStore: Send + Sync {
    /// User id owning the resource, `None` when the resource does not exist
    async fn owner_of(&self, kind: ResourceKind, id: Id) -> Result<Option<Id>>;
}

/// Write side. Each operation runs in one transaction; integrity violations
/// come back already translated into domain errors.
#[async_trait::async_trait]
pub trait WriteStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> DomainResult<Id>;
    async fn delete_user(&self, id: Id) -> DomainResult<bool>;

    async fn create_candidate(&self, candidate: NewCandidate) -> DomainResult<Id>;
    async fn update_candidate(&self, id: Id, update: CandidateUpdate) -> DomainResult<bool>;
    async fn delete_candidate(&self, id: Id) -> DomainResult<bool>;
    async fn add_experience(&self, candidate_id: Id, experience: NewExperience)
        -> DomainResult<Id>;
    async fn add_language(&self, candidate_id: Id, language: NewLanguageSkill)
        -> DomainResult<()>;
    async fn add_education(&self, candidate_id: Id, education: NewEducationRecord)
        -> DomainResult<()>;

    async fn create_company(&self, company: NewCompany) -> DomainResult<Id>;

    async fn create_job(&self, company_id: Id, job: NewJob) -> DomainResult<Id>;
    async fn update_job(&self, id: Id, update: JobUpdate) -> DomainResult<bool>;
    async fn delete_job(&self, id: Id) -> DomainResult<bool>;
}

/// Combined trait for all store operations
pub trait Store: RecordStore + OwnershipStore + WriteStore {}

impl<T> Store for T where T: RecordStore + OwnershipStore + WriteStore {}
