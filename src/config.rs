use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::{MemoryStore, MongoStore, Storage};

/// Which backend holds polls and votes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB, configured by [`DbConfig`]. Deleting polls needs a replica set.
    #[default]
    Mongodb,
    /// Process memory. Nothing survives a restart.
    Memory,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    storage: StorageBackend,
}

impl Config {
    /// The configured storage backend.
    pub fn storage(&self) -> StorageBackend {
        self.storage
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Using {:?} storage", config.storage);

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// Configuration for the database.
#[derive(Debug, Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

/// A fairing that opens the configured storage backend, performs any setup
/// it needs, and places a [`Storage`] handle into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let backend = match rocket.state::<Config>() {
            Some(config) => config.storage(),
            None => {
                error!("Storage requires the application config to be loaded first");
                return Err(rocket);
            }
        };

        let storage = match backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; nothing will persist");
                Storage::new(MemoryStore::new())
            }
            StorageBackend::Mongodb => {
                // Load the config.
                let config = match rocket.figment().extract::<DbConfig>() {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Failed to load database config");
                        rocket::config::pretty_print_error(e);
                        return Err(rocket);
                    }
                };
                info!("Loaded database config, connecting...");
                // Construct the connection.
                let client = match MongoClient::with_uri_str(&config.db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                // Ensure the required indexes exist.
                let store = match MongoStore::new(client, &config.db_name).await {
                    Ok(store) => store,
                    Err(e) => {
                        error!("Failed to prepare database '{}': {e}", config.db_name);
                        return Err(rocket);
                    }
                };
                info!("...database connection online!");
                Storage::new(store)
            }
        };

        // Manage the state.
        rocket = rocket.manage(storage);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::error::ErrorKind;
    use rocket::figment::{
        providers::{Format, Toml},
        Figment,
    };

    use super::*;

    #[test]
    fn storage_defaults_to_mongodb() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(config.storage(), StorageBackend::Mongodb);
    }

    #[test]
    fn storage_backend_is_lowercase() {
        let config: Config = Figment::from(Toml::string(r#"storage = "memory""#))
            .extract()
            .unwrap();
        assert_eq!(config.storage(), StorageBackend::Memory);

        let bad = Figment::from(Toml::string(r#"storage = "Postgres""#)).extract::<Config>();
        assert!(bad.is_err());
    }

    #[test]
    fn db_name_has_a_default() {
        let config: DbConfig = Figment::from(Toml::string(r#"db_uri = "mongodb://db:27017""#))
            .extract()
            .unwrap();
        assert_eq!(config.db_uri, "mongodb://db:27017");
        assert_eq!(config.db_name, "polls");

        assert!(Figment::new().extract::<DbConfig>().is_err());
    }

    #[rocket::async_test]
    async fn memory_backend_ignites_without_a_database() {
        let figment = rocket::Config::figment().merge(("storage", "memory"));
        let rocket = rocket::custom(figment)
            .attach(ConfigFairing)
            .attach(StoreFairing)
            .ignite()
            .await
            .unwrap();

        assert_eq!(
            rocket.state::<Config>().unwrap().storage(),
            StorageBackend::Memory
        );
        assert!(rocket.state::<Storage>().is_some());
    }

    #[rocket::async_test]
    async fn store_needs_config_first() {
        let figment = rocket::Config::figment().merge(("storage", "memory"));
        let err = rocket::custom(figment)
            .attach(StoreFairing)
            .ignite()
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FailedFairings(_)));
    }
}
