use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Music Bingo Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::session_stream,
        crate::routes::game::create_game,
        crate::routes::game::current_game,
        crate::routes::game::toggle_cell,
        crate::routes::game::advance,
        crate::routes::playback::list_devices,
        crate::routes::playback::start_playback,
        crate::routes::playback::stop_playback,
        crate::routes::playback::next_item,
        crate::routes::playback::previous_item,
        crate::routes::credentials::credential_status,
        crate::routes::credentials::upsert_credentials,
        crate::routes::credentials::delete_credentials,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::AdvanceRequest,
            crate::dto::game::SessionSnapshot,
            crate::dto::game::CardSummary,
            crate::dto::game::CellSummary,
            crate::dto::game::ItemSummary,
            crate::dto::game::SessionPhaseDto,
            crate::dto::playback::StartPlaybackRequest,
            crate::dto::playback::DeviceSummary,
            crate::dto::playback::PlaybackStarted,
            crate::dto::playback::SkipResponse,
            crate::dto::playback::PlaybackStatusEvent,
            crate::playback::PlaybackStatus,
            crate::dto::credentials::UpsertCredentialsRequest,
            crate::dto::credentials::CredentialStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "games", description = "Dealing cards and marking cells"),
        (name = "playback", description = "Auto-play on the player's music device"),
        (name = "credentials", description = "Music provider account linking"),
    )
)]
pub struct ApiDoc;
