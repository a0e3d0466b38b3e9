// --- Domain Services ---
//
// Logic shared by several handlers, kept free of HTTP types.

pub mod activity;
pub mod analytics;
pub mod billing;
pub mod reports;
