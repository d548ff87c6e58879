use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::RoomError;
use crate::questions::QuestionProvider;
use crate::room::Room;
use crate::types::*;

/// Characters for room codes (no 0/O, 1/I/L)
const CODE_CHARS: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const CODE_LENGTH: usize = 6;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Process-wide mapping from room code to room
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
    provider: Arc<dyn QuestionProvider>,
    game_config: GameConfig,
}

impl RoomRegistry {
    pub fn new(provider: Arc<dyn QuestionProvider>, game_config: GameConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            provider,
            game_config,
        }
    }

    /// Create a room with `admin` as its first participant
    pub async fn create_room(&self, secret: &str, admin: &str) -> Result<Arc<Room>, RoomError> {
        if secret.is_empty() {
            return Err(RoomError::InvalidInput("password must not be empty".to_string()));
        }
        if admin.is_empty() {
            return Err(RoomError::InvalidInput("admin nickname must not be empty".to_string()));
        }

        let mut rooms = self.rooms.write().await;
        let id = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let room = Arc::new(Room::new(
            id.clone(),
            secret,
            admin.to_string(),
            self.game_config.clone(),
            self.provider.clone(),
        ));
        rooms.insert(id.clone(), room.clone());

        tracing::info!("Created room {} for admin {}", id, admin);
        Ok(room)
    }

    pub async fn get_room(&self, id: &str) -> Result<Arc<Room>, RoomError> {
        self.rooms
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(id.to_string()))
    }

    /// Summaries of every room. Room locks are taken one at a time after the
    /// registry lock is released.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            summaries.push(room.summary().await);
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub async fn register_participant(
        &self,
        room_id: &str,
        secret: &str,
        nick: &str,
    ) -> Result<(), RoomError> {
        let room = self.get_room(room_id).await?;
        room.register(secret, nick).await
    }
}
