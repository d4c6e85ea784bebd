/// Provider account linking and token refresh.
pub mod credential_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Dealing cards, marking cells and moving the item cursor.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Auto-play on the player's device.
pub mod playback_service;
/// Ordered best-effort persistence of session changes.
pub mod session_mirror;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor with back-off.
pub mod storage_supervisor;
