pub mod application;
pub mod company;
pub mod email;
pub mod h1b;
pub mod job;
pub mod posting;
pub mod profile;
pub mod user;
