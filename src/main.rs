use log::{error, info, LevelFilter};
use polls_backend::config::Config;
use thiserror::Error;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum Error {
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
    #[error(transparent)]
    Rocket(#[from] rocket::Error),
}

async fn run() -> Result<(), Error> {
    info!("Configuring server...");
    let rocket = polls_backend::build().ignite().await?;
    if let Some(config) = rocket.state::<Config>() {
        info!("...server configured with {:?} storage", config.storage());
    }

    // Our own fairing reports requests from here on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    let result = match log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers()) {
        Ok(()) => {
            info!("Initialised logging");
            run().await
        }
        Err(e) => Err(Error::Logging(e.to_string())),
    };

    if let Err(err) = result {
        // Logging may be the thing that failed.
        eprintln!("{err}");
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
