use axum::{Json, extract::State, http::StatusCode};

use crate::{
    editor::{FormInput, ListEditor},
    error::AppError,
    models::{
        Certification, ContactRequest, Education, Experience, Message, Profile, Project,
        SkillCategory,
    },
    store::StoreState,
};

/// get_profile
///
/// [Public Route] The site owner's profile, or 404 while none has been saved.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "No profile saved yet")
    )
)]
pub async fn get_profile(State(store): State<StoreState>) -> Result<Json<Profile>, AppError> {
    ListEditor::<Profile>::new(store)
        .load_single()
        .await
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// get_education
///
/// [Public Route] Education entries in insertion order.
#[utoipa::path(
    get,
    path = "/api/education",
    responses((status = 200, description = "Education entries", body = [Education]))
)]
pub async fn get_education(State(store): State<StoreState>) -> Result<Json<Vec<Education>>, AppError> {
    Ok(Json(ListEditor::<Education>::new(store).try_load().await?))
}

/// get_experiences
///
/// [Public Route] Internships and jobs in insertion order.
#[utoipa::path(
    get,
    path = "/api/experiences",
    responses((status = 200, description = "Experience entries", body = [Experience]))
)]
pub async fn get_experiences(
    State(store): State<StoreState>,
) -> Result<Json<Vec<Experience>>, AppError> {
    Ok(Json(ListEditor::<Experience>::new(store).try_load().await?))
}

#[utoipa::path(
    get,
    path = "/api/projects",
    responses((status = 200, description = "Projects", body = [Project]))
)]
pub async fn get_projects(State(store): State<StoreState>) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(ListEditor::<Project>::new(store).try_load().await?))
}

#[utoipa::path(
    get,
    path = "/api/skills",
    responses((status = 200, description = "Skill categories", body = [SkillCategory]))
)]
pub async fn get_skills(
    State(store): State<StoreState>,
) -> Result<Json<Vec<SkillCategory>>, AppError> {
    Ok(Json(ListEditor::<SkillCategory>::new(store).try_load().await?))
}

#[utoipa::path(
    get,
    path = "/api/certifications",
    responses((status = 200, description = "Certifications", body = [Certification]))
)]
pub async fn get_certifications(
    State(store): State<StoreState>,
) -> Result<Json<Vec<Certification>>, AppError> {
    Ok(Json(ListEditor::<Certification>::new(store).try_load().await?))
}

/// create_message
///
/// [Public Route] JSON counterpart of the contact form. Blank fields are rejected with
/// 400 before anything is stored.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored", body = Message),
        (status = 400, description = "A required field is blank")
    )
)]
pub async fn create_message(
    State(store): State<StoreState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let form = FormInput::from([
        ("name".to_string(), payload.name),
        ("email".to_string(), payload.email),
        ("message".to_string(), payload.message),
    ]);

    let message = ListEditor::<Message>::new(store).create(&form).await?;
    tracing::info!(message_id = message.id, "contact message received via api");
    Ok((StatusCode::CREATED, Json(message)))
}
