/// Router Module Index
///
/// Routes are grouped by who may call them. Access control for the API
/// groups happens in the handlers through the `SessionUser` extractor; the
/// page group sits behind the route guard in `crate::middleware`.

/// Routes accessible to anyone: health, rule listing, status lookup.
pub mod public;

/// Approval workflow and rule authoring. Requires an approved session.
pub mod admin;

/// Browser pages, including the redirect targets of the route guard.
pub mod pages;
