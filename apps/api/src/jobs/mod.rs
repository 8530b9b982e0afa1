// Jobs: listings attached to a company, with a many-to-many applicant set.

pub mod handlers;
pub mod store;
