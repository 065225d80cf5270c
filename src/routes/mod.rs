pub mod auth;
pub mod health;
pub mod obstacles;
pub mod organization_manager;
pub mod organizations;
pub mod pilot;
pub mod registrar;
pub mod reports;
pub mod users;
