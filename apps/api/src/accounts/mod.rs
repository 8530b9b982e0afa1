// Accounts: registration, password login, JWT issue/refresh/verify, and the
// request extractor that resolves a bearer token (ours or Supabase's) to a user.

pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod users;

pub use extractor::AuthUser;
