// --- HTTP Handlers ---
//
// One module per resource. Every handler takes the resolved `AuthUser` (except
// the public ones), checks the role it needs, and scopes every repository call
// to `auth.organization_id`.

pub mod admin;
pub mod ads;
pub mod analytics;
pub mod auth;
pub mod campaigns;
pub mod files;
pub mod integrations;
pub mod notifications;
pub mod onboarding;
pub mod reports;
pub mod subscriptions;
pub mod team;
pub mod users;
