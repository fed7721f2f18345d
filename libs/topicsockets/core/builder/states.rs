/// Type-state markers for the builder pattern
///
/// These types track at compile time whether the URL has been set, so
/// `build()` only exists on fully specified builders. `HasUrl` carries
/// the URL itself; a builder that type-checks cannot be missing one.

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
pub struct HasUrl {
    pub(crate) url: String,
}
impl UrlState for HasUrl {}
