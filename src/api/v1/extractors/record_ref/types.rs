/*
 * Responsibility
 * - One tag type per addressable collection, and the alias handlers take
 *
 * Everything `pub` here is re-exported through mod.rs.
 */
use super::core::{Collection, RecordPath};
use crate::repos::{course_repo, notification_repo, quiz_repo};

// courses
pub enum CourseTag {}
impl Collection for CourseTag {
    const NAME: &'static str = course_repo::COLLECTION;
    const RESOURCE: &'static str = "course";
}
pub type CourseId = RecordPath<CourseTag>;

// quizzes
pub enum QuizTag {}
impl Collection for QuizTag {
    const NAME: &'static str = quiz_repo::COLLECTION;
    const RESOURCE: &'static str = "quiz";
}
pub type QuizId = RecordPath<QuizTag>;

// notifications
pub enum NotificationTag {}
impl Collection for NotificationTag {
    const NAME: &'static str = notification_repo::COLLECTION;
    const RESOURCE: &'static str = "notification";
}
pub type NotificationId = RecordPath<NotificationTag>;
