pub mod course_plans;
pub mod courses;
pub mod users;
