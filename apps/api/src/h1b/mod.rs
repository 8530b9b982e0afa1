// H1B LCA disclosure data: bulk JSON import with duplicate-key fallback, and
// public read endpoints.

pub mod handlers;
pub mod import;
pub mod store;
