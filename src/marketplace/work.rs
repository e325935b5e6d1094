//! Applications, submissions and reviews

use serde_json::{json, Value};
use tracing::info;

use super::{new_id, text, Decision, Marketplace, NewReview, Role, Viewer};
use crate::error::{Error, Result};
use crate::storage::Record;

const APPLICATION_BY_ID: &str = "SELECT * FROM applications WHERE id = ?";
const SUBMISSION_BY_ID: &str = "SELECT * FROM submissions WHERE id = ?";
const REVIEW_FOR_SUBMISSION: &str = "SELECT * FROM reviews WHERE submission_id = ?";

impl Marketplace<'_> {
    // ========== Applications ==========

    /// Apply to an open project, once per student
    pub fn apply(&self, student_id: &str, project_id: &str, message: Option<&str>) -> Result<Record> {
        let _guard = self.lock();
        let project = self.project(project_id)?;
        if text(&project, "status") != Some("open") {
            return Err(Error::Invalid(
                "Project is not open for applications".to_string(),
            ));
        }

        let existing = self
            .db
            .prepare("SELECT * FROM applications WHERE project_id = ? AND student_id = ?")
            .get(&[json!(project_id), json!(student_id)]);
        if existing.is_some() {
            return Err(Error::Conflict(
                "You have already applied to this project".to_string(),
            ));
        }

        let id = new_id();
        self.db
            .prepare(
                "INSERT INTO applications (id, project_id, student_id, message, status)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .run(&[
                json!(id),
                json!(project_id),
                json!(student_id),
                json!(message.filter(|m| !m.is_empty())),
                json!("pending"),
            ])?;

        info!(application_id = %id, project_id, student_id, "application received");
        self.fetch(APPLICATION_BY_ID, &id, "Application")
    }

    /// A student's applications, newest first
    pub fn student_applications(&self, student_id: &str) -> Vec<Record> {
        let mut rows = self
            .db
            .prepare(
                "SELECT a.*, p.title as project_title, u.name as company_name
                 FROM applications a
                 JOIN projects p ON a.project_id = p.id
                 JOIN users u ON p.company_id = u.id
                 WHERE a.student_id = ?
                 ORDER BY a.created_at DESC",
            )
            .all(&[json!(student_id)]);

        // The application's own status shadows the joined project's
        let project = self.db.prepare(super::PROJECT_BY_ID);
        for row in &mut rows {
            let id = row.get("project_id").cloned().unwrap_or(Value::Null);
            let status = project
                .get(&[id])
                .and_then(|p| p.get("status").cloned())
                .unwrap_or(Value::Null);
            row.insert("project_status".to_string(), status);
        }
        rows
    }

    /// Accept or reject an application; accepting starts the project
    pub fn decide_application(
        &self,
        company_id: &str,
        application_id: &str,
        decision: Decision,
    ) -> Result<Record> {
        let _guard = self.lock();
        let application = self
            .db
            .prepare(
                "SELECT a.*, p.company_id
                 FROM applications a
                 JOIN projects p ON a.project_id = p.id
                 WHERE a.id = ?",
            )
            .get(&[json!(application_id)])
            .ok_or_else(|| Error::NotFound("Application".to_string()))?;

        if text(&application, "company_id") != Some(company_id) {
            return Err(Error::Forbidden(
                "Not authorized to update this application".to_string(),
            ));
        }

        self.db
            .prepare("UPDATE applications SET status = ? WHERE id = ?")
            .run(&[json!(decision.as_str()), json!(application_id)])?;
        info!(application_id, decision = decision.as_str(), "application decided");

        if decision == Decision::Accepted {
            let project_id = application.get("project_id").cloned().unwrap_or(Value::Null);
            self.set_project_status(&project_id, "in_progress")?;
        }

        self.fetch(APPLICATION_BY_ID, application_id, "Application")
    }

    // ========== Submissions ==========

    /// Deliver work on a project the student was accepted for
    pub fn submit_work(
        &self,
        student_id: &str,
        project_id: &str,
        content: &str,
        file_url: Option<&str>,
    ) -> Result<Record> {
        let _guard = self.lock();
        let project = self.project(project_id)?;
        let accepted = self
            .db
            .prepare(
                "SELECT * FROM applications
                 WHERE project_id = ? AND student_id = ? AND status = 'accepted'",
            )
            .get(&[project["id"].clone(), json!(student_id)]);
        if accepted.is_none() {
            return Err(Error::Forbidden(
                "You must have an accepted application to submit work".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(Error::Invalid("Submission content is required".to_string()));
        }

        let id = new_id();
        self.db
            .prepare(
                "INSERT INTO submissions (id, project_id, student_id, content, file_url, status)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .run(&[
                json!(id),
                json!(project_id),
                json!(student_id),
                json!(content),
                json!(file_url.filter(|u| !u.is_empty())),
                json!("submitted"),
            ])?;

        info!(submission_id = %id, project_id, student_id, "work submitted");
        self.fetch(SUBMISSION_BY_ID, &id, "Submission")
    }

    /// A student's submissions with their reviews, newest first
    pub fn student_submissions(&self, student_id: &str) -> Vec<Record> {
        self.db
            .prepare(
                "SELECT s.*, p.title as project_title, u.name as company_name,
                        r.rating, r.feedback
                 FROM submissions s
                 JOIN projects p ON s.project_id = p.id
                 JOIN users u ON p.company_id = u.id
                 LEFT JOIN reviews r ON s.id = r.submission_id
                 WHERE s.student_id = ?
                 ORDER BY s.created_at DESC",
            )
            .all(&[json!(student_id)])
    }

    /// Every submission on a project, for its owner
    pub fn project_submissions(&self, company_id: &str, project_id: &str) -> Result<Vec<Record>> {
        let project = self.project(project_id)?;
        if text(&project, "company_id") != Some(company_id) {
            return Err(Error::Forbidden(
                "Not authorized to view these submissions".to_string(),
            ));
        }

        Ok(self
            .db
            .prepare(
                "SELECT s.*, u.name as student_name, u.email as student_email,
                        r.rating, r.feedback
                 FROM submissions s
                 JOIN users u ON s.student_id = u.id
                 LEFT JOIN reviews r ON s.id = r.submission_id
                 WHERE s.project_id = ?
                 ORDER BY s.created_at DESC",
            )
            .all(&[json!(project_id)]))
    }

    /// One submission, visible to its author and the project owner
    pub fn submission_detail(&self, viewer: &Viewer, id: &str) -> Result<Record> {
        let mut submission = self
            .db
            .prepare(
                "SELECT s.*, p.title as project_title, p.company_id,
                        u.name as student_name, u.email as student_email,
                        r.rating, r.feedback
                 FROM submissions s
                 JOIN projects p ON s.project_id = p.id
                 JOIN users u ON s.student_id = u.id
                 LEFT JOIN reviews r ON s.id = r.submission_id
                 WHERE s.id = ?",
            )
            .get(&[json!(id)])
            .ok_or_else(|| Error::NotFound("Submission".to_string()))?;

        let owner_field = match viewer.role {
            Role::Student => "student_id",
            Role::Company => "company_id",
        };
        if text(&submission, owner_field) != Some(viewer.id.as_str()) {
            return Err(Error::Forbidden(
                "Not authorized to view this submission".to_string(),
            ));
        }

        // The submission's own created_at shadows the joined review's
        if let Some(review) = self.db.prepare(REVIEW_FOR_SUBMISSION).get(&[json!(id)]) {
            if let Some(date) = review.get("created_at") {
                submission.insert("review_date".to_string(), date.clone());
            }
        }
        Ok(submission)
    }

    // ========== Reviews ==========

    /// Rate a submission once; approval completes the project
    pub fn review_submission(
        &self,
        company_id: &str,
        submission_id: &str,
        review: NewReview,
    ) -> Result<Record> {
        let _guard = self.lock();
        let submission = self
            .db
            .prepare(
                "SELECT s.*, p.company_id
                 FROM submissions s
                 JOIN projects p ON s.project_id = p.id
                 WHERE s.id = ?",
            )
            .get(&[json!(submission_id)])
            .ok_or_else(|| Error::NotFound("Submission".to_string()))?;

        if text(&submission, "company_id") != Some(company_id) {
            return Err(Error::Forbidden(
                "Not authorized to review this submission".to_string(),
            ));
        }
        if self
            .db
            .prepare(REVIEW_FOR_SUBMISSION)
            .get(&[json!(submission_id)])
            .is_some()
        {
            return Err(Error::Conflict(
                "Submission has already been reviewed".to_string(),
            ));
        }
        if !(1..=5).contains(&review.rating) {
            return Err(Error::Invalid("Rating must be between 1 and 5".to_string()));
        }

        let id = new_id();
        self.db
            .prepare(
                "INSERT INTO reviews (id, submission_id, rating, feedback)
                 VALUES (?, ?, ?, ?)",
            )
            .run(&[
                json!(id),
                json!(submission_id),
                json!(review.rating),
                json!(review.feedback.filter(|f| !f.is_empty())),
            ])?;

        let status = review
            .status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "approved".to_string());
        self.db
            .prepare("UPDATE submissions SET status = ? WHERE id = ?")
            .run(&[json!(status), json!(submission_id)])?;
        info!(submission_id, rating = review.rating, status = %status, "submission reviewed");

        if status == "approved" {
            let project_id = submission.get("project_id").cloned().unwrap_or(Value::Null);
            self.set_project_status(&project_id, "completed")?;
        }

        self.fetch("SELECT * FROM reviews WHERE id = ?", &id, "Review")
    }

    fn fetch(&self, sql: &str, id: &str, what: &str) -> Result<Record> {
        self.db
            .prepare(sql)
            .get(&[json!(id)])
            .ok_or_else(|| Error::NotFound(what.to_string()))
    }
}
