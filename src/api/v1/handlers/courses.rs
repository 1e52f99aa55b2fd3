/*
 * Responsibility
 * - /courses handlers: listing, authoring, lifecycle, resources, enrolment, announcements
 * - Ownership is part of every educator filter, so another educator's course is a 404
 */
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::api::v1::dto::courses::{
    AnnouncementRequest, CourseResponse, CreateCourseRequest, GenerateResourcesRequest,
};
use crate::api::v1::extractors::{AsEducator, AsLearner, Authenticated, CourseId, JsonBody};
use crate::api::v1::response::{Applied, Envelope};
use crate::error::AppError;
use crate::repos::course_repo::{self, CourseStatus};
use crate::repos::{notification_repo, progress_repo, user_repo};
use crate::services::auth::Role;
use crate::services::content::{GenerationContext, ResourceSet, sanitize};
use crate::services::notify::OutboundMessage;
use crate::services::record_id::RecordId;
use crate::services::transition::{self, SourceStates};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CourseList {
    courses: Vec<CourseResponse>,
    count: usize,
}

pub async fn list_courses(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Envelope<CourseList>, AppError> {
    let store = state.store.as_ref();
    let courses = match auth.claim.role {
        Role::Educator => course_repo::list_for_educator(store, &auth.claim.subject_id).await?,
        Role::Learner => course_repo::list_published(store).await?,
    };

    let courses: Vec<CourseResponse> = courses.into_iter().map(Into::into).collect();
    Ok(Envelope::ok(CourseList {
        count: courses.len(),
        courses,
    }))
}

#[derive(Debug, Serialize)]
pub struct OneCourse {
    course: CourseResponse,
}

pub async fn create_course(
    State(state): State<AppState>,
    auth: AsEducator,
    JsonBody(req): JsonBody<CreateCourseRequest>,
) -> Result<Envelope<OneCourse>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let (title, description, modules) = req.into_modules();

    let course = course_repo::create(
        state.store.as_ref(),
        &auth.claim.subject_id,
        &title,
        &description,
        modules,
        Utc::now(),
    )
    .await?;
    tracing::info!(course_id = %course.id, "course created");

    Ok(Envelope::created(OneCourse {
        course: course.into(),
    }))
}

/// Educators see their own courses in any state; learners only published ones.
pub async fn get_course(
    State(state): State<AppState>,
    auth: Authenticated,
    course: CourseId,
) -> Result<Envelope<OneCourse>, AppError> {
    let filter = match auth.claim.role {
        Role::Educator => course_repo::owned_by(&course.reference, &auth.claim.subject_id),
        Role::Learner => course_repo::published(&course.reference),
    };

    let found = course_repo::find(state.store.as_ref(), &filter)
        .await?
        .ok_or_else(|| AppError::not_found(course.resource()))?;

    Ok(Envelope::ok(OneCourse {
        course: found.into(),
    }))
}

fn lifecycle_guard(target: CourseStatus) -> SourceStates {
    SourceStates {
        field: course_repo::STATUS_FIELD,
        allowed: target
            .reachable_from()
            .iter()
            .map(|s| Value::String(s.as_str().to_string()))
            .collect(),
        target: target.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    status: CourseStatus,
}

async fn move_course(
    state: &AppState,
    auth: &AsEducator,
    course: &CourseId,
    target: CourseStatus,
) -> Result<Envelope<Applied<StatusView>>, AppError> {
    let result = transition::execute_guarded(
        state.store.as_ref(),
        course.resource(),
        &course_repo::owned_by(&course.reference, &auth.claim.subject_id),
        &lifecycle_guard(target),
        &course_repo::move_to(target, Utc::now()),
    )
    .await?;

    if result.modified {
        tracing::info!(course_id = %course.id(), status = %target, "course status changed");
    }
    Ok(Applied::new(result, StatusView { status: target }))
}

pub async fn publish_course(
    State(state): State<AppState>,
    auth: AsEducator,
    course: CourseId,
) -> Result<Envelope<Applied<StatusView>>, AppError> {
    move_course(&state, &auth, &course, CourseStatus::Published).await
}

pub async fn unpublish_course(
    State(state): State<AppState>,
    auth: AsEducator,
    course: CourseId,
) -> Result<Envelope<Applied<StatusView>>, AppError> {
    move_course(&state, &auth, &course, CourseStatus::Draft).await
}

pub async fn archive_course(
    State(state): State<AppState>,
    auth: AsEducator,
    course: CourseId,
) -> Result<Envelope<Applied<StatusView>>, AppError> {
    move_course(&state, &auth, &course, CourseStatus::Archived).await
}

#[derive(Debug, Serialize)]
pub struct ResourcesView {
    resources: ResourceSet,
}

pub async fn generate_resources(
    State(state): State<AppState>,
    auth: AsEducator,
    course: CourseId,
    JsonBody(req): JsonBody<GenerateResourcesRequest>,
) -> Result<Envelope<Applied<ResourcesView>>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let store = state.store.as_ref();
    let filter = course_repo::owned_by(&course.reference, &auth.claim.subject_id);

    let found = course_repo::find(store, &filter)
        .await?
        .ok_or_else(|| AppError::not_found(course.resource()))?;

    let content = match req.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => found
            .modules
            .iter()
            .map(|m| format!("{}\n{}", m.title, m.content))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    if content.trim().is_empty() {
        return Err(AppError::validation(
            "course has no content to generate resources from",
        ));
    }

    let context = GenerationContext {
        course_title: found.title,
        description: found.description,
    };
    let resources = sanitize(state.generator.generate(&content, &context).await?);

    let result = transition::execute(
        store,
        course.resource(),
        &filter,
        &course_repo::attach_resources(&resources, Utc::now())?,
    )
    .await?;
    tracing::info!(
        course_id = %course.id(),
        generator = state.generator.backend_name(),
        categories = resources.len(),
        "course resources generated"
    );

    Ok(Applied::new(result, ResourcesView { resources }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    course_id: RecordId,
}

pub async fn enroll(
    State(state): State<AppState>,
    auth: AsLearner,
    course: CourseId,
) -> Result<Envelope<Applied<EnrollmentView>>, AppError> {
    let store = state.store.as_ref();
    if course_repo::find(store, &course_repo::published(&course.reference))
        .await?
        .is_none()
    {
        return Err(AppError::not_found(course.resource()));
    }

    let (filter, update) = progress_repo::enroll(&auth.claim.subject_id, course.id(), Utc::now());
    let result = transition::execute(store, progress_repo::COLLECTION, &filter, &update).await?;
    if result.modified {
        tracing::info!(course_id = %course.id(), learner = %auth.claim.subject_id, "learner enrolled");
    }

    Ok(Applied::new(
        result,
        EnrollmentView {
            course_id: course.id().clone(),
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct AnnouncementReport {
    recipients: usize,
    stored: usize,
    delivered: usize,
}

/// Store one notification per enrolled learner and hand each to the notifier.
///
/// Per-learner failures are logged and counted, never fatal: one bad write or
/// delivery does not stop the remaining learners. `stored` and `delivered` report
/// how many of `recipients` got the in-app notification and the outbound message.
pub async fn announce(
    State(state): State<AppState>,
    auth: AsEducator,
    course: CourseId,
    JsonBody(req): JsonBody<AnnouncementRequest>,
) -> Result<Envelope<AnnouncementReport>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let store = state.store.as_ref();

    let found = course_repo::find(
        store,
        &course_repo::owned_by(&course.reference, &auth.claim.subject_id),
    )
    .await?
    .ok_or_else(|| AppError::not_found(course.resource()))?;

    let title = format!("{}: {}", found.title, req.title.trim());
    let learners = progress_repo::enrolled_learners(store, course.id()).await?;
    let mut stored = 0;
    let mut delivered = 0;

    for learner in &learners {
        match notification_repo::create(store, learner, &title, &req.body, Utc::now()).await {
            Ok(_) => stored += 1,
            Err(err) => {
                tracing::error!(learner = %learner, error = %err, "announcement not stored")
            }
        }

        let user = match user_repo::get(store, learner).await {
            Ok(Some(user)) => user,
            Ok(None) => continue,
            Err(err) => {
                tracing::error!(learner = %learner, error = %err, "announcement recipient lookup failed");
                continue;
            }
        };
        let message = OutboundMessage {
            recipient: user.email,
            subject: title.clone(),
            body: req.body.clone(),
        };
        match state.notifier.send(&message).await {
            Ok(report) if report.success => delivered += 1,
            Ok(report) => {
                tracing::warn!(learner = %learner, details = %report.details, "announcement refused")
            }
            Err(err) => tracing::warn!(learner = %learner, error = %err, "announcement delivery failed"),
        }
    }

    tracing::info!(
        course_id = %course.id(),
        recipients = learners.len(),
        stored,
        delivered,
        "announcement sent"
    );
    Ok(Envelope::ok(AnnouncementReport {
        recipients: learners.len(),
        stored,
        delivered,
    }))
}
