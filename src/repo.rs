use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("subject code already exists")] DuplicateCode,
    #[error("department does not exist")] UnknownDepartment,
    #[error("department is still referenced by subjects")] DepartmentInUse,
    #[error("storage failure: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait DepartmentRepo: Send + Sync {
    async fn list_departments(&self) -> RepoResult<Vec<Department>>;
    async fn get_department(&self, id: Id) -> RepoResult<Department>;
    async fn create_department(&self, new: NewDepartment) -> RepoResult<Department>;
    async fn update_department(&self, id: Id, upd: UpdateDepartment) -> RepoResult<Department>;
    /// Fails with `DepartmentInUse` while any subject references `id`.
    async fn delete_department(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait SubjectRepo: Send + Sync {
    async fn list_subjects(&self, filter: SubjectFilter) -> RepoResult<Vec<Subject>>;
    async fn get_subject(&self, id: Id) -> RepoResult<Subject>;
    async fn create_subject(&self, new: NewSubject) -> RepoResult<Subject>;
    async fn update_subject(&self, id: Id, upd: UpdateSubject) -> RepoResult<Subject>;
    async fn delete_subject(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: DepartmentRepo + SubjectRepo {}

impl<T> Repo for T where T: DepartmentRepo + SubjectRepo {}

/// Timestamp for a mutation of a row last touched at `previous`.
/// Always strictly later than `previous`, even when the clock has not moved.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous { now } else { previous + Duration::microseconds(1) }
}

pub mod inmem {
    use super::*;

    #[derive(Default)]
    struct State {
        departments: BTreeMap<Id, Department>,
        subjects: BTreeMap<Id, Subject>,
        next_department_id: Id,
        next_subject_id: Id,
    }

    /// Process-local store enforcing the same constraints as the SQL schema.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    impl State {
        fn code_taken(&self, code: &str, except: Option<Id>) -> bool {
            self.subjects.values().any(|s| s.code == code && Some(s.id) != except)
        }
    }

    #[async_trait]
    impl DepartmentRepo for InMemRepo {
        async fn list_departments(&self) -> RepoResult<Vec<Department>> {
            Ok(self.read()?.departments.values().cloned().collect())
        }

        async fn get_department(&self, id: Id) -> RepoResult<Department> {
            self.read()?.departments.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_department(&self, new: NewDepartment) -> RepoResult<Department> {
            let mut s = self.write()?;
            s.next_department_id += 1;
            let now = Utc::now();
            let department = Department {
                id: s.next_department_id,
                code: new.code,
                name: new.name,
                description: new.description,
                created_at: now,
                updated_at: now,
            };
            s.departments.insert(department.id, department.clone());
            Ok(department)
        }

        async fn update_department(&self, id: Id, upd: UpdateDepartment) -> RepoResult<Department> {
            let mut s = self.write()?;
            let department = s.departments.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(code) = upd.code { department.code = code; }
            if let Some(name) = upd.name { department.name = name; }
            if let Some(description) = upd.description { department.description = Some(description); }
            department.updated_at = next_updated_at(department.updated_at);
            Ok(department.clone())
        }

        async fn delete_department(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if !s.departments.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if s.subjects.values().any(|sub| sub.department_id == id) {
                return Err(RepoError::DepartmentInUse);
            }
            s.departments.remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl SubjectRepo for InMemRepo {
        async fn list_subjects(&self, filter: SubjectFilter) -> RepoResult<Vec<Subject>> {
            let s = self.read()?;
            let needle = filter.search.as_deref().map(str::to_lowercase);
            let matches = s.subjects.values()
                .filter(|sub| filter.department_id.map_or(true, |d| sub.department_id == d))
                .filter(|sub| match &needle {
                    Some(n) => sub.name.to_lowercase().contains(n) || sub.code.to_lowercase().contains(n),
                    None => true,
                })
                .skip(filter.offset.max(0) as usize);
            let v: Vec<_> = match filter.limit {
                Some(limit) => matches.take(limit.max(0) as usize).cloned().collect(),
                None => matches.cloned().collect(),
            };
            Ok(v)
        }

        async fn get_subject(&self, id: Id) -> RepoResult<Subject> {
            self.read()?.subjects.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_subject(&self, new: NewSubject) -> RepoResult<Subject> {
            let mut s = self.write()?;
            if !s.departments.contains_key(&new.department_id) {
                return Err(RepoError::UnknownDepartment);
            }
            if s.code_taken(&new.code, None) {
                return Err(RepoError::DuplicateCode);
            }
            s.next_subject_id += 1;
            let now = Utc::now();
            let subject = Subject {
                id: s.next_subject_id,
                department_id: new.department_id,
                name: new.name,
                code: new.code,
                description: new.description,
                created_at: now,
                updated_at: now,
            };
            s.subjects.insert(subject.id, subject.clone());
            Ok(subject)
        }

        async fn update_subject(&self, id: Id, upd: UpdateSubject) -> RepoResult<Subject> {
            let mut s = self.write()?;

            // constraint checks before taking the mutable borrow
            if !s.subjects.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            if let Some(department_id) = upd.department_id {
                if !s.departments.contains_key(&department_id) {
                    return Err(RepoError::UnknownDepartment);
                }
            }
            if let Some(ref code) = upd.code {
                if s.code_taken(code, Some(id)) {
                    return Err(RepoError::DuplicateCode);
                }
            }

            let subject = s.subjects.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(department_id) = upd.department_id { subject.department_id = department_id; }
            if let Some(name) = upd.name { subject.name = name; }
            if let Some(code) = upd.code { subject.code = code; }
            if let Some(description) = upd.description { subject.description = Some(description); }
            subject.updated_at = next_updated_at(subject.updated_at);
            Ok(subject.clone())
        }

        async fn delete_subject(&self, id: Id) -> RepoResult<()> {
            self.write()?.subjects.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
        }
    }
}

pub mod pg {
    use super::*;
    use sqlx::migrate::Migrator;
    use sqlx::{Pool, Postgres};

    static MIGRATOR: Migrator = sqlx::migrate!();

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        /// Apply pending schema migrations.
        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            MIGRATOR.run(&self.pool).await
        }
    }

    fn map_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::DuplicateCode,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepoError::UnknownDepartment,
            _ => RepoError::Internal(e.to_string()),
        }
    }

    /// `%`/`_` are literal in user search text.
    fn like_pattern(search: &str) -> String {
        let escaped = search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    }

    #[async_trait]
    impl DepartmentRepo for PgRepo {
        async fn list_departments(&self) -> RepoResult<Vec<Department>> {
            sqlx::query_as::<_, Department>(
                "SELECT id, code, name, description, created_at, updated_at FROM departments ORDER BY id"
            )
            .fetch_all(&self.pool).await.map_err(map_err)
        }

        async fn get_department(&self, id: Id) -> RepoResult<Department> {
            sqlx::query_as::<_, Department>(
                "SELECT id, code, name, description, created_at, updated_at FROM departments WHERE id = $1"
            )
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn create_department(&self, new: NewDepartment) -> RepoResult<Department> {
            sqlx::query_as::<_, Department>(
                "INSERT INTO departments (code, name, description) VALUES ($1, $2, $3) \
                 RETURNING id, code, name, description, created_at, updated_at"
            )
            .bind(&new.code)
            .bind(&new.name)
            .bind(&new.description)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn update_department(&self, id: Id, upd: UpdateDepartment) -> RepoResult<Department> {
            sqlx::query_as::<_, Department>(
                "UPDATE departments SET \
                    code = COALESCE($2, code), \
                    name = COALESCE($3, name), \
                    description = COALESCE($4, description), \
                    updated_at = GREATEST(now(), updated_at + interval '1 microsecond') \
                 WHERE id = $1 \
                 RETURNING id, code, name, description, created_at, updated_at"
            )
            .bind(id)
            .bind(upd.code.as_ref())
            .bind(upd.name.as_ref())
            .bind(upd.description.as_ref())
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn delete_department(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM departments WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await
                .map_err(|e| match map_err(e) {
                    // ON DELETE RESTRICT fired
                    RepoError::UnknownDepartment => RepoError::DepartmentInUse,
                    other => other,
                })?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SubjectRepo for PgRepo {
        async fn list_subjects(&self, filter: SubjectFilter) -> RepoResult<Vec<Subject>> {
            sqlx::query_as::<_, Subject>(
                "SELECT id, department_id, name, code, description, created_at, updated_at FROM subjects \
                 WHERE ($1::integer IS NULL OR department_id = $1) \
                   AND ($2::text IS NULL OR name ILIKE $2 OR code ILIKE $2) \
                 ORDER BY id \
                 LIMIT $3 OFFSET $4"
            )
            .bind(filter.department_id)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.limit)
            .bind(filter.offset.max(0))
            .fetch_all(&self.pool).await.map_err(map_err)
        }

        async fn get_subject(&self, id: Id) -> RepoResult<Subject> {
            sqlx::query_as::<_, Subject>(
                "SELECT id, department_id, name, code, description, created_at, updated_at FROM subjects WHERE id = $1"
            )
            .bind(id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn create_subject(&self, new: NewSubject) -> RepoResult<Subject> {
            sqlx::query_as::<_, Subject>(
                "INSERT INTO subjects (department_id, name, code, description) VALUES ($1, $2, $3, $4) \
                 RETURNING id, department_id, name, code, description, created_at, updated_at"
            )
            .bind(new.department_id)
            .bind(&new.name)
            .bind(&new.code)
            .bind(&new.description)
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn update_subject(&self, id: Id, upd: UpdateSubject) -> RepoResult<Subject> {
            sqlx::query_as::<_, Subject>(
                "UPDATE subjects SET \
                    department_id = COALESCE($2, department_id), \
                    name = COALESCE($3, name), \
                    code = COALESCE($4, code), \
                    description = COALESCE($5, description), \
                    updated_at = GREATEST(now(), updated_at + interval '1 microsecond') \
                 WHERE id = $1 \
                 RETURNING id, department_id, name, code, description, created_at, updated_at"
            )
            .bind(id)
            .bind(upd.department_id)
            .bind(upd.name.as_ref())
            .bind(upd.code.as_ref())
            .bind(upd.description.as_ref())
            .fetch_one(&self.pool).await.map_err(map_err)
        }

        async fn delete_subject(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM subjects WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

}
