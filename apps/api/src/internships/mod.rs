// Internship listings: a cached proxy of the public SimplifyJobs feed, the
// `populate-jobs` import into `job_postings`, and queries over that table.

pub mod feed;
pub mod handlers;
pub mod store;
