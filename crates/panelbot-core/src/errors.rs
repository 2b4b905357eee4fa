/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the bot core
/// can handle failures consistently (fatal-to-start vs logged-and-dropped vs
/// surfaced to the requesting chat).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport rejected our credentials. Fatal to `Bot::start`.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A send/receive/registration failure. Logged, never retried.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    /// Domain-service failure. Displays bare so the literal message can be
    /// forwarded to the requesting chat.
    #[error("{0}")]
    Service(String),
}

pub type Result<T> = std::result::Result<T, Error>;
