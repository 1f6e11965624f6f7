mod bson;
mod collection;
mod errors;

pub use bson::{at_db_precision, optional_bson_datetime, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};
