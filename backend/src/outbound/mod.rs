//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **firebase**: Firebase Authentication and Firestore over their REST APIs
//!
//! Adapters are thin translators between domain types and wire formats. They
//! contain no business logic.

pub mod firebase;
