/// Router Module Index
///
/// Routes are grouped by resource. Guards are expressed as extractors on the handlers,
/// so a protected handler cannot be mounted without its check.

/// The listings resource: index, detail, create, edit, update, delete.
pub mod listings;

/// Reviews nested under a listing.
pub mod reviews;

/// Signup, login and logout.
pub mod users;
