pub mod dashboard;
pub mod notification;
pub mod organization;
pub mod report;
pub mod user;
