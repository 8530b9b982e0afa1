// Application tracking: a user's job applications, their statuses and
// pipeline statistics. Gmail-derived records land here too.

pub mod handlers;
pub mod statistics;
pub mod store;
