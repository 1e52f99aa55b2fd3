/*
 * Responsibility
 * - Courses request/response DTOs (create, resource generation, announcements)
 */
use serde::{Deserialize, Serialize};

use crate::repos::course_repo::{CourseDoc, CourseStatus, ModuleDoc};
use crate::services::content::ResourceSet;
use crate::services::record_id::RecordId;

const MAX_TITLE_LEN: usize = 200;
const MAX_MODULES: usize = 100;
const MAX_CONTENT_LEN: usize = 20_000;

#[derive(Debug, Deserialize)]
pub struct ModuleInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modules: Vec<ModuleInput>,
}

impl CreateCourseRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title is required");
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err("title must be <= 200 chars");
        }
        if self.modules.len() > MAX_MODULES {
            return Err("at most 100 modules");
        }
        if self.modules.iter().any(|m| m.title.trim().is_empty()) {
            return Err("every module needs a title");
        }
        Ok(())
    }

    pub fn into_modules(self) -> (String, String, Vec<ModuleDoc>) {
        let modules = self
            .modules
            .into_iter()
            .map(|m| ModuleDoc {
                title: m.title.trim().to_string(),
                content: m.content,
            })
            .collect();
        (self.title.trim().to_string(), self.description, modules)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResourcesRequest {
    /// Source text for generation; the course modules are used when absent.
    #[serde(default)]
    pub content: Option<String>,
}

impl GenerateResourcesRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(content) = &self.content
            && content.len() > MAX_CONTENT_LEN
        {
            return Err("content must be <= 20000 chars");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl AnnouncementRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title is required");
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err("title must be <= 200 chars");
        }
        if self.body.len() > MAX_CONTENT_LEN {
            return Err("body must be <= 20000 chars");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: RecordId,
    pub educator_id: RecordId,
    pub title: String,
    pub description: String,
    pub modules: Vec<ModuleDoc>,
    pub status: CourseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSet>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CourseDoc> for CourseResponse {
    fn from(course: CourseDoc) -> Self {
        Self {
            id: course.id,
            educator_id: course.educator_id,
            title: course.title,
            description: course.description,
            modules: course.modules,
            status: course.status,
            resources: course.resources,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_titles() {
        let req: CreateCourseRequest = serde_json::from_str(
            r#"{"title": "Rust", "modules": [{"title": "Ownership"}, {"title": " "}]}"#,
        )
        .unwrap();
        assert_eq!(req.validate(), Err("every module needs a title"));

        let req: CreateCourseRequest = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert_eq!(req.validate(), Err("title is required"));
    }

    #[test]
    fn into_modules_trims_titles() {
        let req: CreateCourseRequest = serde_json::from_str(
            r#"{"title": " Rust ", "description": "d", "modules": [{"title": " Traits ", "content": "c"}]}"#,
        )
        .unwrap();
        let (title, description, modules) = req.into_modules();
        assert_eq!(title, "Rust");
        assert_eq!(description, "d");
        assert_eq!(modules[0].title, "Traits");
        assert_eq!(modules[0].content, "c");
    }
}
