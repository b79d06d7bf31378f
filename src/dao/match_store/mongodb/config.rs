use std::env;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const MONGO_URI_ENV: &str = "MONGO_URI";
const MONGO_DB_ENV: &str = "MONGO_DB";
const DEFAULT_DATABASE_NAME: &str = "typerace";

/// Parsed connection settings for the MongoDB backend.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection URI.
    pub options: ClientOptions,
    /// Database holding the match and user collections.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri` into client options, targeting `db_name` or the default
    /// database when none is given.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DATABASE_NAME).to_owned(),
        })
    }

    /// Read the connection settings from `MONGO_URI` and the optional
    /// `MONGO_DB` environment variables.
    pub async fn from_env() -> MongoResult<Self> {
        let uri =
            env::var(MONGO_URI_ENV).map_err(|_| MongoDaoError::MissingEnvVar { var: MONGO_URI_ENV })?;
        let db = env::var(MONGO_DB_ENV).ok();
        Self::from_uri(&uri, db.as_deref()).await
    }
}
