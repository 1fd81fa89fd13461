use crate::common::PATH_SEPARATOR;
use crate::errors::{DocketError, DocketResult, ErrorKind};
use std::fmt::Display;

/// The backend address of a collection: the application's namespace prefix
/// followed by the collection name.
///
/// Names may address a sub-collection with slash separated segments, e.g.
/// `lists/<list id>/items`. The prefix applies to the whole path, so
/// `APP00_ADMIN_` + `lists/a1/items` becomes `APP00_ADMIN_lists/a1/items`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    name: String,
    full_path: String,
}

impl CollectionPath {
    /// Validates `name` and joins it with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidCollectionName] if the name is empty,
    /// contains whitespace, starts or ends with `/` or has an empty segment,
    /// or if the prefix contains whitespace or `/`.
    pub fn new(prefix: &str, name: &str) -> DocketResult<CollectionPath> {
        validate_prefix(prefix)?;
        validate_collection_name(name)?;
        Ok(CollectionPath {
            name: name.to_string(),
            full_path: format!("{}{}", prefix, name),
        })
    }

    /// The collection name as the application wrote it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prefixed path that reaches the backend.
    pub fn as_str(&self) -> &str {
        &self.full_path
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path)
    }
}

pub(crate) fn validate_collection_name(name: &str) -> DocketResult<()> {
    if name.is_empty() {
        log::error!("Collection name cannot be empty");
        return Err(DocketError::new(
            "Collection name cannot be empty",
            ErrorKind::InvalidCollectionName,
        ));
    }

    if name.chars().any(char::is_whitespace) {
        log::error!("Collection name '{}' contains whitespace", name);
        return Err(DocketError::new(
            &format!("Collection name '{}' contains whitespace", name),
            ErrorKind::InvalidCollectionName,
        ));
    }

    if name.starts_with(PATH_SEPARATOR) || name.ends_with(PATH_SEPARATOR) {
        log::error!("Collection name '{}' cannot start or end with '/'", name);
        return Err(DocketError::new(
            &format!("Collection name '{}' cannot start or end with '/'", name),
            ErrorKind::InvalidCollectionName,
        ));
    }

    if name.split(PATH_SEPARATOR).any(str::is_empty) {
        log::error!("Collection name '{}' has an empty path segment", name);
        return Err(DocketError::new(
            &format!("Collection name '{}' has an empty path segment", name),
            ErrorKind::InvalidCollectionName,
        ));
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> DocketResult<()> {
    if prefix.chars().any(|c| c.is_whitespace() || c == PATH_SEPARATOR) {
        log::error!("Namespace prefix '{}' cannot contain whitespace or '/'", prefix);
        return Err(DocketError::new(
            &format!("Namespace prefix '{}' cannot contain whitespace or '/'", prefix),
            ErrorKind::InvalidCollectionName,
        ));
    }
    Ok(())
}
