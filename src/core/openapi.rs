use utoipa::OpenApi;

use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::list_files,
    ),
    components(
        schemas(
            // Shared
            Meta,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            // Files
            files_dtos::FileResponseDto,
        )
    ),
    tags(
        (name = "files", description = "Stored PDF files and full-text search"),
    ),
    info(
        title = "PDF Vault API",
        version = "0.1.0",
        description = "Read-only JSON access to uploaded PDFs",
    )
)]
pub struct ApiDoc;
