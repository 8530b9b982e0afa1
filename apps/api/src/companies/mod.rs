// Companies: CRUD, get-or-create with logo discovery, LLM-assisted
// identification, and the seed list used by `populate-companies`.

pub mod handlers;
pub mod identify;
pub mod logo;
pub mod prompts;
pub mod seed;
pub mod store;
