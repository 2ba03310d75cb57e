//! Firebase outbound adapters.
//!
//! Thin reqwest clients for the Identity Toolkit and Firestore REST APIs,
//! implementing the `IdentityProvider` and `RegistrationStore` ports.

mod auth;
mod dto;
mod firestore;
mod settings;

pub use auth::{FirebaseIdentityProvider, FirebaseIdentityProviderFactory};
pub use firestore::FirestoreRegistrationStore;
pub use settings::{ApiKey, FirebaseConfigError, FirebaseSettings};

/// Whitespace-compacted, length-capped excerpt of an error body.
fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::body_preview;

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(200);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }
}
