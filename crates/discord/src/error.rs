#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discord bot token is not configured")]
    MissingToken,

    #[error("discord: {0}")]
    Discord(#[from] Box<serenity::Error>),

    #[error(transparent)]
    Config(#[from] chatcast_config::Error),

    #[error("watch list write task failed: {0}")]
    Persist(#[from] tokio::task::JoinError),
}

impl From<serenity::Error> for Error {
    fn from(err: serenity::Error) -> Self {
        Self::Discord(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
