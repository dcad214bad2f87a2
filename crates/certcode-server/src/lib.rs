//! certcode server library.
//!
//! Issues, redeems and revokes single-use certificate codes:
//! - admin creates batches of codes (`/erstelle`)
//! - a holder validates a code and redeems it with a name and e-mail
//!   (`/valide`, `/generiere`), which renders a PDF and PNG certificate
//! - codes can be deleted by the admin or, once redeemed, by their owner

pub mod auth;
pub mod config;
pub mod render;
pub mod routes;
pub mod storage;
pub mod tls;
