//! Marketplace operations
//!
//! Students apply to projects posted by companies, deliver work, and get it
//! reviewed. Every operation here is expressed as statements against a
//! [`Database`]; none of them touch the document directly.
//!
//! Operations that check something and then write (duplicate email, repeat
//! application, double review, status cascades) run under one lock so two
//! callers cannot interleave between the check and the write.

mod model;
mod work;

pub use model::{
    Decision, NewProject, NewReview, NewUser, ProjectDetail, ProjectPatch, ProjectQuery, Role,
    Viewer,
};

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::storage::{Record, DEFAULT_COLLECTIONS};

const PROJECT_BY_ID: &str = "SELECT * FROM projects WHERE id = ?";

const PROJECT_WITH_COMPANY: &str = "
    SELECT p.*, u.name as company_name, u.university as company_university
    FROM projects p
    JOIN users u ON p.company_id = u.id
    WHERE p.id = ?";

/// Business layer over one database
pub struct Marketplace<'db> {
    db: &'db Database,
    ops: Mutex<()>,
}

impl<'db> Marketplace<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            ops: Mutex::new(()),
        }
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declare every marketplace collection
    pub fn init_schema(&self) -> Result<()> {
        let script: String = DEFAULT_COLLECTIONS
            .iter()
            .map(|name| format!("CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY);\n", name))
            .collect();
        self.db.exec(&script)
    }

    // ========== Users ==========

    /// Create an account and return its id
    pub fn register_user(&self, user: NewUser) -> Result<String> {
        if user.email.trim().is_empty()
            || user.password_hash.is_empty()
            || user.name.trim().is_empty()
        {
            return Err(Error::Invalid("All fields are required".to_string()));
        }

        let email = user.email.trim().to_lowercase();
        if user.role == Role::Student && !email.ends_with(".edu") {
            return Err(Error::Invalid(
                "Students must use a university email (.edu domain)".to_string(),
            ));
        }
        let organization = organization_from_email(&email, user.role)?;

        let _guard = self.lock();
        if self.find_user_by_email(&email).is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let id = new_id();
        self.db
            .prepare(
                "INSERT INTO users (id, email, password_hash, name, role, university, verified)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .run(&[
                json!(id),
                json!(email),
                json!(user.password_hash),
                json!(user.name),
                json!(user.role.as_str()),
                json!(organization),
                json!(true),
            ])?;

        info!(user_id = %id, role = %user.role, "registered user");
        Ok(id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<Record> {
        self.db
            .prepare("SELECT * FROM users WHERE email = ?")
            .get(&[json!(email.trim().to_lowercase())])
    }

    pub fn get_user(&self, id: &str) -> Option<Record> {
        self.db
            .prepare("SELECT * FROM users WHERE id = ?")
            .get(&[json!(id)])
    }

    // ========== Projects ==========

    /// Post a new open project for a company
    pub fn create_project(&self, company_id: &str, project: NewProject) -> Result<Record> {
        if project.title.trim().is_empty()
            || project.description.trim().is_empty()
            || project.skills.trim().is_empty()
        {
            return Err(Error::Invalid(
                "Title, description, and skills are required".to_string(),
            ));
        }

        let id = new_id();
        self.db
            .prepare(
                "INSERT INTO projects (id, company_id, title, description, skills, status)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .run(&[
                json!(id),
                json!(company_id),
                json!(project.title),
                json!(project.description),
                json!(project.skills),
                json!("open"),
            ])?;

        info!(project_id = %id, company_id, "created project");
        self.project(&id)
    }

    /// Change the fields present in `patch`, owner only
    pub fn update_project(&self, company_id: &str, id: &str, patch: ProjectPatch) -> Result<Record> {
        let _guard = self.lock();
        let project = self.project(id)?;
        if text(&project, "company_id") != Some(company_id) {
            return Err(Error::Forbidden(
                "Not authorized to update this project".to_string(),
            ));
        }

        self.db
            .prepare(
                "UPDATE projects SET
                   title = COALESCE(?, title),
                   description = COALESCE(?, description),
                   skills = COALESCE(?, skills),
                   status = COALESCE(?, status)
                 WHERE id = ?",
            )
            .run(&[
                json!(patch.title),
                json!(patch.description),
                json!(patch.skills),
                json!(patch.status),
                json!(id),
            ])?;

        self.project(id)
    }

    /// Public listing, newest first
    pub fn list_projects(&self, query: &ProjectQuery) -> Vec<Record> {
        let mut sql = String::from(
            "SELECT p.*, u.name as company_name, u.university as company_university
             FROM projects p
             JOIN users u ON p.company_id = u.id
             WHERE 1=1 AND p.status = ?",
        );
        let mut params = vec![json!(query.status.as_deref().unwrap_or("open"))];

        if let Some(skills) = query.skills.as_deref().filter(|s| !s.is_empty()) {
            sql.push_str(" AND p.skills LIKE ?");
            params.push(json!(format!("%{}%", skills)));
        }
        sql.push_str(" ORDER BY p.created_at DESC");

        self.db.prepare(&sql).all(&params)
    }

    /// A company's own projects with application and submission counts
    pub fn company_projects(&self, company_id: &str) -> Vec<Record> {
        let applications = self
            .db
            .prepare("SELECT * FROM applications WHERE project_id = ?");
        let submissions = self
            .db
            .prepare("SELECT * FROM submissions WHERE project_id = ?");

        self.db
            .prepare("SELECT * FROM projects WHERE company_id = ? ORDER BY created_at DESC")
            .all(&[json!(company_id)])
            .into_iter()
            .map(|mut project| {
                let id = project.get("id").cloned().unwrap_or(Value::Null);
                let params = [id];
                project.insert(
                    "application_count".to_string(),
                    json!(applications.all(&params).len()),
                );
                project.insert(
                    "submission_count".to_string(),
                    json!(submissions.all(&params).len()),
                );
                project
            })
            .collect()
    }

    /// A project plus whatever applications the viewer may see
    pub fn project_detail(&self, viewer: &Viewer, id: &str) -> Result<ProjectDetail> {
        let project = self
            .db
            .prepare(PROJECT_WITH_COMPANY)
            .get(&[json!(id)])
            .ok_or_else(|| Error::NotFound("Project".to_string()))?;

        let application = match viewer.role {
            Role::Student => self
                .db
                .prepare("SELECT * FROM applications WHERE project_id = ? AND student_id = ?")
                .get(&[json!(id), json!(viewer.id)]),
            Role::Company => None,
        };

        let owner = viewer.role == Role::Company
            && text(&project, "company_id") == Some(viewer.id.as_str());
        let applications = if owner {
            self.db
                .prepare(
                    "SELECT a.*, u.name as student_name, u.email as student_email,
                            u.university as student_university
                     FROM applications a
                     JOIN users u ON a.student_id = u.id
                     WHERE a.project_id = ?
                     ORDER BY a.created_at DESC",
                )
                .all(&[json!(id)])
        } else {
            Vec::new()
        };

        Ok(ProjectDetail {
            project,
            application,
            applications,
        })
    }

    fn project(&self, id: &str) -> Result<Record> {
        self.db
            .prepare(PROJECT_BY_ID)
            .get(&[json!(id)])
            .ok_or_else(|| Error::NotFound("Project".to_string()))
    }

    /// Set a project's status; used by the cascades
    fn set_project_status(&self, project_id: &Value, status: &str) -> Result<()> {
        self.db
            .prepare("UPDATE projects SET status = ? WHERE id = ?")
            .run(&[json!(status), project_id.clone()])?;
        info!(project_id = %project_id, status, "project status changed");
        Ok(())
    }
}

/// Organisation name from the email domain
///
/// Students get every label but the `.edu` suffix (`cs.mit.edu` becomes
/// `Cs Mit`); companies get the first label (`acme.com` becomes `Acme`).
pub fn organization_from_email(email: &str, role: Role) -> Result<String> {
    let domain = email
        .split_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| Error::Invalid("Email must contain a domain".to_string()))?;

    let labels: Vec<&str> = domain.split('.').collect();
    let kept = match role {
        Role::Student => &labels[..labels.len().saturating_sub(1)],
        Role::Company => &labels[..1],
    };

    Ok(kept
        .iter()
        .map(|label| capitalize(label))
        .collect::<Vec<_>>()
        .join(" "))
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn text<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}
