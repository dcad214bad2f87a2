//! `SQLite` storage for certificate codes.
//!
//! The repository is the only component that touches the `certificates`
//! table; everything else goes through the methods on [`CertificateDatabase`].

mod db;
mod models;
mod queries;


pub use db::{CertificateDatabase, DatabaseError};
pub use models::*;
