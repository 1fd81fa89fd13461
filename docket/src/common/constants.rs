// doc constants
pub const DOC_ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const RESERVED_FIELDS: [&str; 1] = [DOC_ID];

// batch constants
pub const MAX_BATCH_SIZE: usize = 500;

// collection constants
pub const PATH_SEPARATOR: char = '/';

// event constants
pub const DOCKET_EVENT: &str = "docket_event";

// storage constants
pub const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;
pub const MEMORY_URL_SCHEME: &str = "memory://";

// list constants
pub const LISTS_COLLECTION: &str = "MesListes";
pub const FIELD_KEY_PREFIX: &str = "field";
pub const IS_FAVORITE: &str = "isFavorite";
pub const USER_ID: &str = "userId";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_LIST_COLOR: &str = "blue";

pub const DOCKET_VERSION: &str = env!("CARGO_PKG_VERSION");
