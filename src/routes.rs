use axum::{
    extract::{Form, Multipart, Path, Query, State},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use jiff::civil::Date;
use serde::Deserialize;

use crate::{
    AppState, admin, booking,
    error::{AppError, AppResult},
    models::{MovieForm, ReservationForm, ReservationType, SlotForm, Status},
    session::{AdminSession, ClientKey, Session, take_login_attempt},
    store, templates,
};

const TOO_MANY_ATTEMPTS: &str = "Too many attempts. Wait a few minutes and try again.";

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let today = today(&state);
    let movies = state
        .store
        .movies_with_schedule()
        .await?
        .into_iter()
        .map(|movie| {
            let next = booking::next_screening(&movie.schedule, today);
            templates::HomeMovie { movie, next }
        })
        .collect::<Vec<_>>();
    Ok(Html(templates::home_page(&movies)))
}

#[derive(Debug, Deserialize)]
pub struct MovieQuery {
    movie_id: Option<String>,
}

pub async fn booking_mode(
    State(state): State<AppState>,
    Query(q): Query<MovieQuery>,
) -> AppResult<Html<String>> {
    let movies = state.store.list_movies().await?;
    let selected = q.movie_id.as_deref().and_then(|id| id.trim().parse().ok());
    Ok(Html(templates::booking_page(&movies, selected)))
}

#[derive(Debug, Deserialize)]
pub struct BookingChoice {
    #[serde(default)]
    movie_id: String,
    #[serde(default)]
    rtype: String,
}

pub async fn booking_choose(Form(choice): Form<BookingChoice>) -> Redirect {
    match ReservationType::from_code(&choice.rtype) {
        Some(rtype) => Redirect::to(&reserve_url(rtype, choice.movie_id.trim())),
        None => Redirect::to("/booking"),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReserveAliasQuery {
    #[serde(default)]
    rtype: String,
    #[serde(default, rename = "movieId", alias = "movie_id")]
    movie_id: String,
}

/// `/reserve?rtype=group&movieId=3` forwards to `/reserve/group?movie_id=3`.
pub async fn reserve_alias(Query(q): Query<ReserveAliasQuery>) -> Redirect {
    match ReservationType::from_code(&q.rtype) {
        Some(rtype) => Redirect::to(&reserve_url(rtype, q.movie_id.trim())),
        None => Redirect::to("/booking"),
    }
}

pub async fn reserve_form(
    State(state): State<AppState>,
    Path(rtype): Path<String>,
    Query(q): Query<MovieQuery>,
    uri: Uri,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let Some(rtype) = ReservationType::from_code(&rtype) else {
        return Ok(Redirect::to("/booking").into_response());
    };
    if let Some(redirect) = teacher_gate(rtype, &jar, &uri) {
        return Ok(redirect);
    }

    let movies = state.store.list_movies().await?;
    let movie_id = match q.movie_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => booking::parse_movie_id(raw)?,
        None => match movies.first() {
            Some(first) => first.id,
            None => return Ok(Redirect::to("/booking").into_response()),
        },
    };
    let movie = state
        .store
        .movie_with_schedule(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("movie", movie_id))?;

    let form = ReservationForm { movie_id: movie_id.to_string(), ..Default::default() };
    let view = templates::ReserveView {
        rtype,
        movie: &movie,
        movies: &movies,
        selected_date: booking::default_date(&movie.schedule, today(&state)),
        form: &form,
        error: None,
    };
    Ok(Html(templates::reserve_page(&view)).into_response())
}

pub async fn reserve_submit(
    State(state): State<AppState>,
    Path(rtype): Path<String>,
    uri: Uri,
    jar: SignedCookieJar,
    Form(form): Form<ReservationForm>,
) -> AppResult<Response> {
    let Some(rtype) = ReservationType::from_code(&rtype) else {
        return Ok(Redirect::to("/booking").into_response());
    };
    if let Some(redirect) = teacher_gate(rtype, &jar, &uri) {
        return Ok(redirect);
    }

    let err = match booking::book(&state.store, rtype, &form).await {
        Ok(created) => return Ok(Redirect::to(&format!("/tickets/{}", created.id)).into_response()),
        Err(err) if err.is_form_error() => err,
        Err(err) => return Err(err),
    };

    let movie_id = booking::parse_movie_id(&form.movie_id)?;
    let movie = state
        .store
        .movie_with_schedule(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("movie", movie_id))?;
    let movies = state.store.list_movies().await?;
    let selected_date = form
        .date
        .trim()
        .parse::<Date>()
        .ok()
        .or_else(|| booking::default_date(&movie.schedule, today(&state)));

    let view = templates::ReserveView {
        rtype,
        movie: &movie,
        movies: &movies,
        selected_date,
        form: &form,
        error: Some(err.user_message()),
    };
    Ok((err.status_code(), Html(templates::reserve_page(&view))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    agree: Option<String>,
}

pub async fn consent_form(Query(q): Query<NextQuery>) -> Html<String> {
    Html(templates::consent_page(&safe_next(q.next.as_deref()), None))
}

pub async fn consent_submit(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(q): Query<NextQuery>,
    Form(form): Form<ConsentForm>,
) -> Response {
    let next = safe_next(q.next.as_deref());
    if form.agree.as_deref() != Some("on") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(templates::consent_page(&next, Some("Agree to the terms to continue booking."))),
        )
            .into_response();
    }
    let session = Session::from_jar(&jar).with_consent();
    (session.store(jar, &state.config), Redirect::to(&next)).into_response()
}

pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "no route");
    let message = format!("There is no page at {}.", uri.path());
    (StatusCode::NOT_FOUND, Html(templates::not_found_page(&message))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    tab: Option<String>,
}

pub async fn tickets(
    State(state): State<AppState>,
    Query(q): Query<TabQuery>,
) -> AppResult<Response> {
    let tab = match q.tab.as_deref() {
        None | Some("") => ReservationType::Normal,
        Some(raw) => match ReservationType::from_code(raw) {
            Some(tab) => tab,
            None => return Ok(Redirect::to("/tickets?tab=normal").into_response()),
        },
    };
    let rows = state.store.list_reservations(tab).await?;
    Ok(Html(templates::tickets_page(tab, &rows, &state.config.timezone)).into_response())
}

pub async fn ticket_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let r = state
        .store
        .get_reservation(&id)
        .await?
        .ok_or_else(|| AppError::not_found("reservation", &id))?;
    Ok(Html(templates::ticket_page(&r, &state.config.timezone)))
}

pub async fn ticket_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<TabQuery>,
) -> AppResult<Redirect> {
    let existing = state.store.get_reservation(&id).await?;
    let removed = state.store.delete_reservation(&id).await?;
    tracing::info!(ticket_id = %id, removed, "reservation delete requested");

    let tab = existing
        .as_ref()
        .and_then(|r| ReservationType::from_code(&r.rtype))
        .or_else(|| q.tab.as_deref().and_then(ReservationType::from_code))
        .unwrap_or(ReservationType::Normal);
    Ok(Redirect::to(&format!("/tickets?tab={}", tab.as_code())))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    code: String,
}

pub async fn teacher_login_form(Query(q): Query<NextQuery>) -> Html<String> {
    Html(templates::teacher_login_page(&safe_next(q.next.as_deref()), None))
}

pub async fn teacher_login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    jar: SignedCookieJar,
    Query(q): Query<NextQuery>,
    Form(form): Form<CodeForm>,
) -> Response {
    let next = safe_next(q.next.as_deref());
    if !take_login_attempt(&state.login_limiter, "teacher", &client) {
        tracing::warn!(client = %client, "teacher login throttled");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Html(templates::teacher_login_page(&next, Some(TOO_MANY_ATTEMPTS))),
        )
            .into_response();
    }

    match admin::verify_teacher(&state.config, Session::from_jar(&jar), &form.code) {
        Ok(session) => (session.store(jar, &state.config), Redirect::to(&next)).into_response(),
        Err(err) => (
            StatusCode::UNAUTHORIZED,
            Html(templates::teacher_login_page(&next, Some(&err.user_message()))),
        )
            .into_response(),
    }
}

pub async fn teacher_logout(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = Session::from_jar(&jar).without_teacher();
    (session.store(jar, &state.config), Redirect::to("/")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    password: String,
}

pub async fn admin_login_form(jar: SignedCookieJar) -> Response {
    if Session::from_jar(&jar).is_admin(store::now_sec()) {
        return Redirect::to("/admin").into_response();
    }
    Html(templates::admin_login_page(None)).into_response()
}

pub async fn admin_login(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    jar: SignedCookieJar,
    Form(form): Form<PasswordForm>,
) -> Response {
    if !take_login_attempt(&state.login_limiter, "admin", &client) {
        tracing::warn!(client = %client, "admin login throttled");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Html(templates::admin_login_page(Some(TOO_MANY_ATTEMPTS))),
        )
            .into_response();
    }

    let session = Session::from_jar(&jar);
    match admin::login(&state.config, session, &form.password, store::now_sec()) {
        Ok(session) => (session.store(jar, &state.config), Redirect::to("/admin")).into_response(),
        Err(err) => (
            StatusCode::UNAUTHORIZED,
            Html(templates::admin_login_page(Some(&err.user_message()))),
        )
            .into_response(),
    }
}

pub async fn admin_logout(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = admin::logout(Session::from_jar(&jar));
    (session.store(jar, &state.config), Redirect::to("/admin/login")).into_response()
}

pub async fn admin_dashboard(
    _: AdminSession,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    let dash = admin::dashboard(&state.store).await?;
    Ok(Html(templates::admin_dashboard_page(&dash, &state.config.timezone)))
}

pub async fn admin_movies(
    _: AdminSession,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    let movies = state.store.movie_summaries().await?;
    Ok(Html(templates::admin_movies_page(&movies, &MovieForm::default(), None)))
}

pub async fn admin_movie_create(
    _: AdminSession,
    State(state): State<AppState>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    match admin::create_movie(&state.store, &form).await {
        Ok(created) => Ok(Redirect::to(&format!("/admin/movies/{}", created.id)).into_response()),
        Err(err) if err.is_form_error() => {
            let movies = state.store.movie_summaries().await?;
            let body = templates::admin_movies_page(&movies, &form, Some(&err.user_message()));
            Ok((err.status_code(), Html(body)).into_response())
        },
        Err(err) => Err(err),
    }
}

pub async fn admin_movie(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    render_admin_movie(&state, id, None).await
}

pub async fn admin_movie_update(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    match admin::update_movie(&state.store, id, &form).await {
        Ok(_) => Ok(Redirect::to(&format!("/admin/movies/{id}")).into_response()),
        Err(err) if err.is_form_error() => render_admin_movie(&state, id, Some(err)).await,
        Err(err) => Err(err),
    }
}

pub async fn admin_movie_delete(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    match admin::delete_movie(&state.store, id).await {
        Ok(()) => Ok(Redirect::to("/admin/movies").into_response()),
        Err(err) if err.is_form_error() => render_admin_movie(&state, id, Some(err)).await,
        Err(err) => Err(err),
    }
}

pub async fn admin_screening_add(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<SlotForm>,
) -> AppResult<Response> {
    match admin::add_screening(&state.store, id, &form).await {
        Ok(_) => Ok(Redirect::to(&format!("/admin/movies/{id}")).into_response()),
        Err(err) if err.is_form_error() => render_admin_movie(&state, id, Some(err)).await,
        Err(err) => Err(err),
    }
}

pub async fn admin_screening_delete(
    _: AdminSession,
    State(state): State<AppState>,
    Path((id, date)): Path<(i32, String)>,
) -> AppResult<Redirect> {
    let removed = state.store.delete_screening(id, &date).await?;
    tracing::info!(movie_id = id, date = %date, removed, "screening delete requested");
    Ok(Redirect::to(&format!("/admin/movies/{id}")))
}

pub async fn admin_poster_upload(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload = None;
    while let Some(field) =
        multipart.next_field().await.map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() != Some("poster") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| AppError::validation(e.body_text()))?;
        upload = Some((file_name, bytes));
    }

    let result = match upload {
        Some((file_name, bytes)) => {
            admin::save_poster(&state.store, &state.config, id, &file_name, &bytes).await
        },
        None => Err(AppError::validation("Choose a poster file.")),
    };
    match result {
        Ok(_) => Ok(Redirect::to(&format!("/admin/movies/{id}")).into_response()),
        Err(err) if err.is_form_error() => render_admin_movie(&state, id, Some(err)).await,
        Err(err) => Err(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    status: String,
}

pub async fn admin_ticket_status(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> AppResult<Redirect> {
    let status = Status::from_code(form.status.trim()).ok_or_else(|| {
        AppError::validation(format!("'{}' is not a reservation status.", form.status))
    })?;
    state.store.set_status(&id, status).await?;
    tracing::info!(ticket_id = %id, status = status.as_code(), "reservation status changed");
    Ok(Redirect::to("/admin"))
}

pub async fn admin_ticket_delete(
    _: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let removed = state.store.delete_reservation(&id).await?;
    tracing::info!(ticket_id = %id, removed, "reservation deleted by admin");
    Ok(Redirect::to("/admin"))
}

pub async fn admin_export(
    _: AdminSession,
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> AppResult<Response> {
    let movie_id = file
        .strip_suffix(".csv")
        .and_then(|id| id.parse::<i32>().ok())
        .ok_or_else(|| AppError::not_found("export", &file))?;
    let body = admin::export_csv(&state.store, movie_id).await?;
    let disposition = format!("attachment; filename=\"{}\"", admin::export_file_name(movie_id));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn render_admin_movie(
    state: &AppState,
    id: i32,
    error: Option<AppError>,
) -> AppResult<Response> {
    let movie = state
        .store
        .movie_with_schedule(id)
        .await?
        .ok_or_else(|| AppError::not_found("movie", id))?;
    let reservations = state.store.reservations_for_movie(id).await?;
    let status = error.as_ref().map(AppError::status_code).unwrap_or(StatusCode::OK);
    let view = templates::AdminMovieView {
        movie: &movie,
        reservations: &reservations,
        error: error.map(|e| e.user_message()),
    };
    Ok((status, Html(templates::admin_movie_page(&view, &state.config.timezone))).into_response())
}

/// Teacher reservations need a teacher-verified session.
fn teacher_gate(rtype: ReservationType, jar: &SignedCookieJar, uri: &Uri) -> Option<Response> {
    if rtype != ReservationType::Teacher || Session::from_jar(jar).teacher_verified {
        return None;
    }
    let here = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/booking");
    let target = format!("/teacher/login?next={}", urlencoding::encode(here));
    Some(Redirect::to(&target).into_response())
}

/// Only same-site paths are accepted as post-login targets.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n.to_string(),
        _ => "/booking".to_string(),
    }
}

fn reserve_url(rtype: ReservationType, movie_id: &str) -> String {
    if movie_id.is_empty() {
        format!("/reserve/{}", rtype.as_code())
    } else {
        format!("/reserve/{}?movie_id={}", rtype.as_code(), urlencoding::encode(movie_id))
    }
}

fn today(state: &AppState) -> Date {
    jiff::Timestamp::now().to_zoned(state.config.timezone.clone()).date()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };

    use super::*;
    use crate::test_support;

    async fn seed_movie(server: &TestServer, title: &str, schedule: &str) -> i32 {
        let resp = server
            .post("/admin/movies")
            .form(&[("title", title), ("schedule", schedule)])
            .await;
        resp.assert_status(StatusCode::SEE_OTHER);
        let location = resp.header("location");
        location.to_str().unwrap().trim_start_matches("/admin/movies/").parse().unwrap()
    }

    async fn reserve_normal(
        server: &TestServer,
        movie_id: i32,
        student_id: &str,
    ) -> axum_test::TestResponse {
        let movie_id = movie_id.to_string();
        server
            .post("/reserve/normal")
            .form(&[
                ("movie_id", movie_id.as_str()),
                ("date", "2025-03-14"),
                ("student_id", student_id),
                ("student_name", "Kim Minji"),
            ])
            .await
    }

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/reserve/teacher?movie_id=1")), "/reserve/teacher?movie_id=1");
        assert_eq!(safe_next(Some("//evil.example")), "/booking");
        assert_eq!(safe_next(Some("https://evil.example")), "/booking");
        assert_eq!(safe_next(None), "/booking");
    }

    #[tokio::test]
    async fn healthz_and_home_render() {
        let (server, _) = test_support::server().await;
        server.get("/healthz").await.assert_text("ok");
        server.get("/").await.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_path_renders_not_found_page() {
        let (server, _) = test_support::server().await;
        let resp = server.get("/no-such-page").await;
        resp.assert_status(StatusCode::NOT_FOUND);
        assert!(resp.text().contains("Not found"));
        assert!(resp.text().contains("/no-such-page"));
    }

    #[tokio::test]
    async fn reserve_query_alias_redirects_to_path() {
        let (server, _) = test_support::server().await;

        let resp = server
            .get("/reserve")
            .add_query_param("rtype", "Group")
            .add_query_param("movieId", "3")
            .await;
        resp.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(resp.header("location"), "/reserve/group?movie_id=3");

        let resp = server.get("/reserve").add_query_param("rtype", "vip").await;
        assert_eq!(resp.header("location"), "/booking");
    }

    #[tokio::test]
    async fn consent_needs_the_checkbox() {
        let (server, _) = test_support::server().await;
        server.get("/consent").await.assert_status_ok();

        let refused = server.post("/consent?next=/booking").form(&[("agree", "")]).await;
        refused.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(refused.text().contains("role=\"alert\""));

        let accepted = server.post("/consent?next=/booking").form(&[("agree", "on")]).await;
        accepted.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(accepted.header("location"), "/booking");
    }

    #[tokio::test]
    async fn reserve_page_switches_movie_by_query() {
        let (server, _) = test_support::admin_server().await;
        seed_movie(&server, "Inside Out 2", "2025-03-14 16:30 Auditorium").await;
        let wonka = seed_movie(&server, "Wonka", "2025-04-02 18:00 Gym").await;

        let page = server.get("/reserve/normal").add_query_param("movie_id", wonka).await;
        page.assert_status_ok();
        let body = page.text();
        assert!(body.contains("method=\"get\""));
        assert!(body.contains(&format!("name=\"movie_id\" value=\"{wonka}\"")));
        assert!(body.contains("2025-04-02"));
        assert!(!body.contains("2025-03-14"));
    }

    #[tokio::test]
    async fn booking_example_round_trip() {
        let (server, _) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Inside Out 2", "2025-03-14 16:30 Auditorium").await;

        let resp = reserve_normal(&server, movie_id, "30215").await;
        resp.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(resp.header("location"), "/tickets/25031430215");

        let detail = server.get("/tickets/25031430215").await;
        detail.assert_status_ok();
        assert!(detail.text().contains("Inside Out 2"));

        let listing = server.get("/tickets").add_query_param("tab", "normal").await;
        assert!(listing.text().contains("25031430215"));

        let deleted = server.post("/tickets/25031430215/delete").await;
        deleted.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(deleted.header("location"), "/tickets?tab=normal");

        let listing = server.get("/tickets").add_query_param("tab", "normal").await;
        assert!(!listing.text().contains("25031430215"));
        server.get("/tickets/25031430215").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_booking_rerenders_form_with_error() {
        let (server, _) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Inside Out 2", "2025-03-14 16:30 Auditorium").await;
        let movie_id = movie_id.to_string();

        let resp = server
            .post("/reserve/normal")
            .form(&[
                ("movie_id", movie_id.as_str()),
                ("date", "2025-03-15"),
                ("student_id", "30215"),
                ("student_name", "Kim Minji"),
            ])
            .await;
        resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.text().contains("role=\"alert\""));
        assert!(resp.text().contains("Kim Minji"));

        let listing = server.get("/tickets?tab=normal").await;
        assert!(!listing.text().contains("30215"));
    }

    #[tokio::test]
    async fn duplicate_booking_is_refused() {
        let (server, _) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Inside Out 2", "2025-03-14 16:30 Auditorium").await;

        reserve_normal(&server, movie_id, "30215").await.assert_status(StatusCode::SEE_OTHER);
        reserve_normal(&server, movie_id, "30215").await.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_tab_redirects_to_normal() {
        let (server, _) = test_support::server().await;
        let resp = server.get("/tickets?tab=vip").await;
        resp.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(resp.header("location"), "/tickets?tab=normal");
        server.get("/tickets").await.assert_status_ok();
    }

    #[tokio::test]
    async fn booking_choice_redirects_to_reserve_form() {
        let (server, _) = test_support::server().await;
        let resp = server.post("/booking").form(&[("movie_id", "3"), ("rtype", "group")]).await;
        assert_eq!(resp.header("location"), "/reserve/group?movie_id=3");

        let resp = server.get("/reserve/vip").await;
        assert_eq!(resp.header("location"), "/booking");
    }

    #[tokio::test]
    async fn teacher_reservations_need_passcode() {
        let (server, state) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Wonka", "2025-03-14 10:00 Gym").await;

        let resp = server.get(&format!("/reserve/teacher?movie_id={movie_id}")).await;
        resp.assert_status(StatusCode::SEE_OTHER);
        let location = resp.header("location");
        assert!(location.to_str().unwrap().starts_with("/teacher/login?next="));

        let next = format!("/reserve/teacher?movie_id={movie_id}");
        server
            .post(&format!("/teacher/login?next={}", urlencoding::encode(&next)))
            .form(&[("code", "wrong")])
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let resp = server
            .post(&format!("/teacher/login?next={}", urlencoding::encode(&next)))
            .form(&[("code", state.config.teacher_passcode.as_str())])
            .await;
        assert_eq!(resp.header("location"), next.as_str());

        server.get(&next).await.assert_status_ok();
    }

    #[tokio::test]
    async fn admin_routes_redirect_without_session() {
        let (server, state) = test_support::server().await;

        for path in ["/admin", "/admin/movies", "/admin/movies/1", "/admin/export/1.csv"] {
            let resp = server.get(path).await;
            resp.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(resp.header("location"), "/admin/login");
        }

        let resp = server.post("/admin/movies").form(&[("title", "Sneaky")]).await;
        assert_eq!(resp.header("location"), "/admin/login");
        assert!(state.store.list_movies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_password_sets_no_session() {
        let (server, _) = test_support::server().await;
        let resp = server.post("/admin/login").form(&[("password", "guess")]).await;
        resp.assert_status(StatusCode::UNAUTHORIZED);
        assert!(resp.text().contains("incorrect"));

        server.get("/admin").await.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn login_is_throttled() {
        let (server, state) = test_support::server().await;
        for _ in 0..state.config.login_burst {
            let resp = server.post("/admin/login").form(&[("password", "guess")]).await;
            resp.assert_status(StatusCode::UNAUTHORIZED);
        }
        let resp = server
            .post("/admin/login")
            .form(&[("password", state.config.admin_password.as_str())])
            .await;
        resp.assert_status(StatusCode::TOO_MANY_REQUESTS);
        server.get("/admin").await.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn logout_ends_admin_session() {
        let (server, _) = test_support::admin_server().await;
        server.get("/admin").await.assert_status_ok();
        server.get("/admin/logout").await.assert_status(StatusCode::SEE_OTHER);
        server.get("/admin").await.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn csv_export_download() {
        let (server, _) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Inside Out 2", "2025-03-14 16:30 Auditorium").await;
        reserve_normal(&server, movie_id, "30215").await;
        reserve_normal(&server, movie_id, "30216").await;

        let resp = server.get(&format!("/admin/export/{movie_id}.csv")).await;
        resp.assert_status_ok();
        assert!(resp.header("content-type").to_str().unwrap().starts_with("text/csv"));
        let disposition = resp.header("content-disposition");
        let expected = format!("reservations-movie-{movie_id}.csv");
        assert!(disposition.to_str().unwrap().contains(&expected));

        let text = resp.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,type,student_id,student_name,date,time,hall"));

        server.get("/admin/export/abc.csv").await.assert_status(StatusCode::NOT_FOUND);
        server.get("/admin/export/999.csv").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_manages_schedule_and_status() {
        let (server, state) = test_support::admin_server().await;
        let movie_id = seed_movie(&server, "Inside Out 2", "").await;

        server
            .post(&format!("/admin/movies/{movie_id}/schedule"))
            .form(&[("date", "2025-03-14"), ("time", "16:30"), ("hall", "Auditorium")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        server
            .post(&format!("/admin/movies/{movie_id}/schedule"))
            .form(&[("date", "not-a-date"), ("time", "16:30"), ("hall", "Auditorium")])
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.store.schedule(movie_id).await.unwrap().len(), 1);

        reserve_normal(&server, movie_id, "30215").await.assert_status(StatusCode::SEE_OTHER);
        server
            .post("/admin/tickets/25031430215/status")
            .form(&[("status", "rejected")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        let r = state.store.get_reservation("25031430215").await.unwrap().unwrap();
        assert_eq!(r.status, "rejected");

        server
            .post(&format!("/admin/movies/{movie_id}/delete"))
            .await
            .assert_status(StatusCode::CONFLICT);

        server.post("/admin/tickets/25031430215/delete").await.assert_status(StatusCode::SEE_OTHER);
        server
            .post(&format!("/admin/movies/{movie_id}/schedule/2025-03-14/delete"))
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert!(state.store.schedule(movie_id).await.unwrap().is_empty());

        let deleted = server.post(&format!("/admin/movies/{movie_id}/delete")).await;
        deleted.assert_status(StatusCode::SEE_OTHER);
        assert!(state.store.get_movie(movie_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn poster_upload_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let (server, state) = test_support::admin_server_with_posters(dir.path()).await;
        let movie_id = seed_movie(&server, "Wonka", "").await;

        let form = MultipartForm::new().add_part(
            "poster",
            Part::bytes(b"GIF89a".to_vec()).file_name("wonka.gif").mime_type("image/gif"),
        );
        server
            .post(&format!("/admin/movies/{movie_id}/poster"))
            .multipart(form)
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let movie = state.store.get_movie(movie_id).await.unwrap().unwrap();
        let poster = movie.poster.unwrap();
        assert_eq!(poster, format!("/posters/movie-{movie_id}.gif"));
        server.get(&poster).await.assert_status_ok();
    }
}
