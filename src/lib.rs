#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::store::Storage;

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

/// Build the server. The storage backend is chosen and connected during
/// ignition, according to the loaded config.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Build the server around an existing storage backend, skipping store
/// selection entirely.
pub fn rocket_for_storage(storage: Storage) -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .manage(storage)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Get a client for the configured MongoDB instance (test version).
#[cfg(test)]
async fn test_db_client() -> mongodb::Client {
    let db_uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn test_database_name() -> String {
    let random: u32 = rand::random();
    format!("polls_test{random}")
}

/// A local client over a fresh in-memory store, plus a handle on that store.
#[cfg(test)]
async fn memory_client() -> (rocket::local::asynchronous::Client, Storage) {
    log4rs_test_utils::test_logging::init_logging_once_for(["polls_backend"], None, None);

    let storage = Storage::new(store::MemoryStore::new());
    let client = rocket::local::asynchronous::Client::tracked(rocket_for_storage(storage.clone()))
        .await
        .unwrap();
    (client, storage)
}
