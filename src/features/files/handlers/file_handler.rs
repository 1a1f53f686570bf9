use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    response::{Html, Redirect},
    Json,
};
use axum_extra::extract::{CookieJar, Form, FormRejection};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{DeleteFilesForm, FileResponseDto, SearchQuery, UPLOAD_FIELD};
use crate::features::files::services::FileService;
use crate::shared::flash::{self, FlashMessage};
use crate::shared::templates::{render_template, INDEX_TEMPLATE};
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::validation::first_message;

/// Context for `templates/index.html`
#[derive(Serialize)]
struct IndexPage<'a> {
    files: Vec<FileResponseDto>,
    messages: Vec<FlashMessage>,
    search_query: Option<&'a str>,
}

fn log_failure(action: &str, e: &AppError) {
    if e.is_user_error() {
        warn!("{} rejected: {}", action, e);
    } else {
        error!("{} failed: {}", action, e);
    }
}

/// List page with optional full-text search.
///
/// A database failure is shown as a message above an empty list rather than
/// failing the page.
pub async fn index(
    State(service): State<Arc<FileService>>,
    Query(query): Query<SearchQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>)> {
    let (jar, mut messages) = flash::take(jar);
    let search = query.term();

    if let Some(term) = search {
        messages.push(FlashMessage::success(format!(
            "Search results for '{}'.",
            term
        )));
    }

    let files = match service.list_files(search).await {
        Ok(files) => files,
        Err(e) => {
            log_failure("Listing", &e);
            messages.push(FlashMessage::error(format!(
                "Database or search error: {}",
                e.detail()
            )));
            Vec::new()
        }
    };

    let html = render_template(
        INDEX_TEMPLATE,
        IndexPage {
            files,
            messages,
            search_query: search,
        },
    )?;

    Ok((jar, Html(html)))
}

/// Pull the `pdfFile` part out of the form; other fields are ignored
async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::Validation(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field: {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {}", e)))?;

        return Ok((file_name, data));
    }

    Err(no_file_part())
}

fn no_file_part() -> AppError {
    AppError::Validation("No file part in the request.".to_string())
}

/// Upload a PDF, then redirect to the list page
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    jar: CookieJar,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> (CookieJar, Redirect) {
    let result = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok((file_name, data)) => service.upload_pdf(&file_name, data).await,
            Err(e) => Err(e),
        },
        Err(rejection) => {
            debug!("Upload body is not a multipart form: {}", rejection);
            Err(no_file_part())
        }
    };

    let message = match result {
        Ok(_) => FlashMessage::success("File uploaded and parsed successfully!"),
        Err(e) => {
            log_failure("Upload", &e);
            if e.is_user_error() {
                FlashMessage::error(e.user_message())
            } else {
                FlashMessage::error(format!("Upload failed: {}", e.detail()))
            }
        }
    };

    (flash::push(jar, message), Redirect::to("/"))
}

/// Delete the selected files from storage and the database
pub async fn delete_files(
    State(service): State<Arc<FileService>>,
    jar: CookieJar,
    form: std::result::Result<Form<DeleteFilesForm>, FormRejection>,
) -> (CookieJar, Redirect) {
    // An unreadable body carries no usable selection
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Unreadable delete form: {}", rejection);
            DeleteFilesForm::default()
        }
    };

    if let Err(e) = form.validate() {
        let message = first_message(&e);
        warn!("Delete rejected: {}", message);
        return (
            flash::push(jar, FlashMessage::warning(message)),
            Redirect::to("/"),
        );
    }

    let message = match service.delete_files(&form.selected_files).await {
        Ok(count) => FlashMessage::success(format!(
            "{} file(s) deleted from storage and database.",
            count
        )),
        Err(e) => {
            log_failure("Delete", &e);
            FlashMessage::error(format!("Failed to delete files: {}", e.detail()))
        }
    };

    (flash::push(jar, message), Redirect::to("/"))
}

/// List stored files as JSON
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(SearchQuery),
    responses(
        (status = 200, description = "Files, newest first", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 500, description = "Database error")
    )
)]
pub async fn list_files(
    State(service): State<Arc<FileService>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>> {
    let files = service.list_files(query.term()).await?;
    let total = files.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(files),
        None,
        Some(Meta { total }),
    )))
}
