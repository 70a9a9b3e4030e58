// Per-connection reader thread
// Blocks on one slot's stream and relays whatever arrives to the other slot

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::session::Session;
use crate::network::protocol::{Message, Sentinel, Slot};
use crate::network::InputError;

/// Spawn the reader for `slot`. The thread ends once the slot is vacated.
pub fn spawn_reader(session: Arc<Session>, slot: Slot) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("session-{}-slot-{}", session.id(), slot))
        .spawn(move || run_reader(&session, slot))
}

/// Reader loop body, usable without a thread in tests
pub fn run_reader(session: &Session, slot: Slot) {
    while session.is_occupied(slot) {
        match session.get_player_input(slot) {
            Ok(message) => {
                relay(session, slot, &message);
                if !session.is_running() {
                    break;
                }
            }
            Err(InputError::PlayerQuit) => {
                session.disconnect_player(slot);
                break;
            }
            Err(InputError::EndOfStream) => {
                debug!("Session {}: slot {} closed its stream", session.id(), slot);
                break;
            }
            Err(InputError::Transient(e)) => {
                debug!("Session {}: slot {} read retry: {}", session.id(), slot, e);
            }
            Err(InputError::Stream(e)) => {
                warn!("Session {}: slot {} stream error: {}", session.id(), slot, e);
                break;
            }
            Err(InputError::SlotVacant(_)) => break,
        }
    }

    if !session.is_running() {
        session.kick(slot);
        session.stop_session(slot);
    } else if session.is_occupied(slot) {
        session.disconnect_player(slot);
    }
}

/// Forward to the opponent, or tell a lone player nobody is there yet
fn relay(session: &Session, from: Slot, message: &Message) {
    if session.is_max_players() {
        session.send_player_data(message, from.other());
    } else {
        session.send_player_data(&Message::control(Sentinel::OtherPlayerNotReady), from);
    }
}
