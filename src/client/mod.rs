pub mod connection;
pub mod engine;
pub mod presenter;

pub use connection::ServerConnection;
pub use engine::{spawn_engine, DisconnectReason, EngineHandle, EngineSettings, EngineState, SyncEngine};
pub use presenter::{ChannelPresenter, Notice, Outcome, Presenter, UiEvent};
