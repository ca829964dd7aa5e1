pub mod errors;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod server;
pub mod storage;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use logging::init_logging;
pub use registry::{CreatedRoom, JoinedRoom, RoomError, RoomId, RoomRegistry, RoomSummary};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use storage::{MemoryStore, RoomStore, StorageError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_provides_shared_registry() {
        let ctx = AppContext::new_for_tests();

        let registry = ctx.registry();
        assert_eq!(registry.room_count(), 0);

        let created = registry.create_room("Alice").expect("create room");
        assert_eq!(ctx.registry().room_count(), 1, "registry is shared");
        assert!(ctx.registry().get_room(&created.room_id).is_ok());
    }
}
