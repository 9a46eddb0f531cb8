use jiff::{Timestamp, civil::Date, tz::TimeZone};
use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::{movie, reservation},
    models::{
        Dashboard, MovieForm, MovieSummary, MovieWithSchedule, ReservationForm, ReservationType,
        Slot, Status,
    },
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const SITE_NAME: &str = "School Cinema";

const INPUT: &str = "mt-1 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const LABEL: &str = "block text-sm font-medium text-gray-700";
const BUTTON: &str = "rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";
const DANGER: &str = "rounded-md bg-red-600 px-3 py-1 text-sm font-semibold text-white hover:bg-red-700";
const CARD: &str = "bg-white shadow rounded-lg p-6";

pub struct HomeMovie {
    pub movie: MovieWithSchedule,
    pub next: Option<Slot>,
}

pub struct ReserveView<'a> {
    pub rtype: ReservationType,
    pub movie: &'a MovieWithSchedule,
    pub movies: &'a [movie::Model],
    pub selected_date: Option<Date>,
    pub form: &'a ReservationForm,
    pub error: Option<String>,
}

pub struct AdminMovieView<'a> {
    pub movie: &'a MovieWithSchedule,
    pub reservations: &'a [reservation::Model],
    pub error: Option<String>,
}

pub fn home_page(movies: &[HomeMovie]) -> String {
    page(
        SITE_NAME,
        html! {
            div class="max-w-5xl mx-auto px-6 py-10" {
                h1 class="text-3xl font-bold text-gray-900" { "Now showing" }
                p class="mt-2 text-gray-600" { "Pick a movie and reserve a seat for the next screening." }

                @if movies.is_empty() {
                    div class=(format!("mt-8 {CARD}")) {
                        p class="text-gray-600" { "No movies are scheduled yet." }
                    }
                } @else {
                    div class="mt-8 grid gap-6 sm:grid-cols-2 lg:grid-cols-3" {
                        @for item in movies {
                            (movie_card(item))
                        }
                    }
                }
            }
        },
    )
}

fn movie_card(item: &HomeMovie) -> Markup {
    let m = &item.movie.movie;
    html! {
        div class="bg-white shadow rounded-lg overflow-hidden flex flex-col" {
            img class="h-72 w-full object-cover" src=(poster_or_placeholder(m)) alt=(m.title);
            div class="p-4 flex-1 flex flex-col" {
                h2 class="text-lg font-semibold text-gray-900" { (m.title) }
                p class="text-sm text-gray-500" { (m.genre) " · " (m.rating) " · " (m.duration) " min" }
                @if let Some(next) = &item.next {
                    p class="mt-2 text-sm text-gray-700" { "Next: " (next.date) " " (next.time_label()) " · " (next.hall) }
                } @else {
                    p class="mt-2 text-sm text-gray-500" { "No upcoming screenings" }
                }
                a class=(format!("mt-4 text-center {BUTTON}")) href=(format!("/booking?movie_id={}", m.id)) { "Reserve" }
            }
        }
    }
}

pub fn booking_page(movies: &[movie::Model], selected: Option<i32>) -> String {
    page(
        "Book a screening",
        html! {
            div class="max-w-xl mx-auto px-6 py-10" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { "Book a screening" }
                    p class="mt-1 text-sm text-gray-600" {
                        "Booking means you accept the "
                        a class="text-blue-600 hover:text-blue-800" href="/consent?next=/booking" { "booking terms" }
                        "."
                    }
                    @if movies.is_empty() {
                        p class="mt-4 text-gray-600" { "There is nothing to book yet." }
                    } @else {
                        form class="mt-6 space-y-6" method="post" action="/booking" {
                            div {
                                label class=(LABEL) for="movie_id" { "Movie" }
                                select class=(INPUT) name="movie_id" id="movie_id" {
                                    @for m in movies {
                                        option value=(m.id) selected[selected == Some(m.id)] { (m.title) }
                                    }
                                }
                            }
                            fieldset {
                                legend class=(LABEL) { "Reservation type" }
                                @for (i, t) in ReservationType::ALL.iter().enumerate() {
                                    label class="mt-2 flex items-center gap-2 text-gray-700" {
                                        input type="radio" name="rtype" value=(t.as_code()) checked[i == 0];
                                        (t.label())
                                    }
                                }
                            }
                            button class=(format!("w-full {BUTTON}")) type="submit" { "Continue" }
                        }
                    }
                }
            }
        },
    )
}

pub fn reserve_page(view: &ReserveView<'_>) -> String {
    let movie = &view.movie.movie;
    let form = view.form;
    let action = format!("/reserve/{}", view.rtype.as_code());
    let no_dates = view.movie.schedule.is_empty();

    page(
        &format!("{} reservation", view.rtype.label()),
        html! {
            div class="max-w-xl mx-auto px-6 py-10" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { (view.rtype.label()) " reservation" }
                    p class="mt-1 text-gray-600" { (movie.title) }

                    @if let Some(error) = &view.error {
                        (alert(error))
                    }
                    @if no_dates {
                        (alert("This movie has no screenings to book yet."))
                    }

                    form class="mt-6 flex items-end gap-3" method="get" action=(action) {
                        div class="flex-1" {
                            label class=(LABEL) for="movie_id" { "Movie" }
                            select class=(INPUT) name="movie_id" id="movie_id" {
                                @for m in view.movies {
                                    option value=(m.id) selected[m.id == movie.id] { (m.title) }
                                }
                            }
                        }
                        button class="rounded-md border border-gray-300 px-4 py-2 text-gray-700 hover:bg-gray-50" type="submit" {
                            "Change"
                        }
                    }

                    form class="mt-6 space-y-5" method="post" action=(action) {
                        input type="hidden" name="movie_id" value=(movie.id);
                        div {
                            label class=(LABEL) for="date" { "Screening" }
                            select class=(INPUT) name="date" id="date" required {
                                @for slot in &view.movie.schedule {
                                    option value=(slot.date) selected[Some(slot.date) == view.selected_date] {
                                        (slot.date) " " (slot.time_label()) " · " (slot.hall)
                                    }
                                }
                            }
                        }
                        (text_field("student_id", "Student number", &form.student_id, true))
                        (text_field("student_name", "Student name", &form.student_name, true))

                        @match view.rtype {
                            ReservationType::Normal => {},
                            ReservationType::Group => {
                                (text_field("group_name", "Group name", form.group_name.as_deref().unwrap_or_default(), true))
                                div {
                                    label class=(LABEL) for="group_size" { "Group size (at least 5)" }
                                    input class=(INPUT) type="number" min="5" name="group_size" id="group_size"
                                        value=(form.group_size.as_deref().unwrap_or("5"));
                                }
                            },
                            ReservationType::Teacher => {
                                (text_field("teacher_name", "Supervising teacher", form.teacher_name.as_deref().unwrap_or_default(), true))
                                (text_field("class_info", "Class", form.class_info.as_deref().unwrap_or_default(), false))
                            },
                        }

                        button class=(format!("w-full {BUTTON}")) type="submit" disabled[no_dates] { "Reserve" }
                    }
                }
            }
        },
    )
}

pub fn tickets_page(tab: ReservationType, rows: &[reservation::Model], tz: &TimeZone) -> String {
    page(
        "Reservations",
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                h1 class="text-3xl font-bold text-gray-900" { "Reservations" }
                nav class="mt-6 flex gap-2" {
                    @for t in ReservationType::ALL {
                        @let active = t == tab;
                        a class=(if active { "rounded-md bg-blue-600 px-3 py-1 text-white" } else { "rounded-md bg-gray-200 px-3 py-1 text-gray-700" })
                            href=(format!("/tickets?tab={}", t.as_code())) { (t.label()) }
                    }
                }
                @if rows.is_empty() {
                    div class=(format!("mt-6 {CARD}")) { p class="text-gray-600" { "No reservations yet." } }
                } @else {
                    div class="mt-6 space-y-3" {
                        @for r in rows {
                            div class=(format!("{CARD} flex items-center justify-between gap-4")) {
                                div {
                                    a class="font-mono text-blue-700 hover:text-blue-900" href=(format!("/tickets/{}", r.id)) { (r.id) }
                                    p class="text-sm text-gray-700" { (r.movie_title) " · " (r.date) " " (r.time) " · " (r.hall) }
                                    p class="text-xs text-gray-500" { (r.student_name) " · booked " (local_time(r.created_at, tz)) }
                                }
                                (delete_ticket_form(r))
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn ticket_page(r: &reservation::Model, tz: &TimeZone) -> String {
    page(
        &format!("Ticket {}", r.id),
        html! {
            div class="max-w-xl mx-auto px-6 py-10" {
                div class=(CARD) {
                    p class="text-sm text-gray-500" { "Ticket" }
                    h1 class="font-mono text-3xl font-bold text-gray-900" { (r.id) }
                    dl class="mt-6 grid grid-cols-3 gap-y-2 text-sm" {
                        (row("Movie", &r.movie_title))
                        (row("Date", &r.date))
                        (row("Time", &r.time))
                        (row("Hall", &r.hall))
                        (row("Type", type_label(&r.rtype)))
                        (row("Student", &format!("{} ({})", r.student_name, r.student_id)))
                        @if let Some(name) = &r.group_name { (row("Group", name)) }
                        @if let Some(size) = r.group_size { (row("Group size", &size.to_string())) }
                        @if let Some(name) = &r.teacher_name { (row("Teacher", name)) }
                        @if let Some(class) = &r.class_info { (row("Class", class)) }
                        (row("Status", &r.status))
                        (row("Booked", &local_time(r.created_at, tz)))
                    }
                    div class="mt-6 flex justify-between items-center" {
                        a class="text-blue-600 hover:text-blue-800" href=(format!("/tickets?tab={}", r.rtype)) { "All reservations" }
                        (delete_ticket_form(r))
                    }
                }
            }
        },
    )
}

pub fn teacher_login_page(next: &str, error: Option<&str>) -> String {
    let action = format!("/teacher/login?next={}", urlencoding::encode(next));
    login_page("Teacher verification", "Passcode", "code", &action, error)
}

pub fn consent_page(next: &str, error: Option<&str>) -> String {
    let action = format!("/consent?next={}", urlencoding::encode(next));
    page(
        "Booking terms",
        html! {
            div class="max-w-xl mx-auto px-6 py-16" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { "Booking terms" }
                    @if let Some(error) = error { (alert(error)) }
                    ul class="mt-4 list-disc space-y-2 pl-5 text-gray-700" {
                        li { "Your student number and name are stored with the reservation." }
                        li { "Reservations are listed publicly by ticket number, date and hall." }
                        li { "Staff may reject or delete a reservation at any time." }
                    }
                    form class="mt-6 space-y-4" method="post" action=(action) {
                        label class="flex items-center gap-2 text-gray-700" {
                            input type="checkbox" name="agree" id="agree";
                            "I agree to these terms"
                        }
                        button class=(format!("w-full {BUTTON}")) type="submit" { "Continue" }
                    }
                }
            }
        },
    )
}

pub fn admin_login_page(error: Option<&str>) -> String {
    login_page("Admin login", "Password", "password", "/admin/login", error)
}

fn login_page(title: &str, label: &str, field: &str, action: &str, error: Option<&str>) -> String {
    page(
        title,
        html! {
            div class="max-w-md mx-auto px-6 py-16" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { (title) }
                    @if let Some(error) = error { (alert(error)) }
                    form class="mt-6 space-y-4" method="post" action=(action) {
                        div {
                            label class=(LABEL) for=(field) { (label) }
                            input class=(INPUT) type="password" name=(field) id=(field) required autofocus;
                        }
                        button class=(format!("w-full {BUTTON}")) type="submit" { "Sign in" }
                    }
                }
            }
        },
    )
}

pub fn admin_dashboard_page(dash: &Dashboard, tz: &TimeZone) -> String {
    let c = dash.counts;
    admin_page(
        "Dashboard",
        html! {
            div class="grid grid-cols-2 gap-4 sm:grid-cols-4" {
                (stat("Total", c.total))
                (stat("Confirmed", c.confirmed))
                (stat("Pending", c.pending))
                (stat("Rejected", c.rejected))
            }

            h2 class="mt-10 text-xl font-semibold text-gray-900" { "Movies" }
            (movie_table(&dash.movies))

            h2 class="mt-10 text-xl font-semibold text-gray-900" { "Latest reservations" }
            @if dash.latest.is_empty() {
                p class="mt-4 text-gray-600" { "No reservations yet." }
            } @else {
                (reservation_table(&dash.latest, tz))
            }
        },
    )
}

pub fn admin_movies_page(movies: &[MovieSummary], form: &MovieForm, error: Option<&str>) -> String {
    admin_page(
        "Movies",
        html! {
            (movie_table(movies))

            div class=(format!("mt-10 {CARD}")) {
                h2 class="text-xl font-semibold text-gray-900" { "Add a movie" }
                @if let Some(error) = error { (alert(error)) }
                form class="mt-4 space-y-4" method="post" action="/admin/movies" {
                    (movie_fields(form))
                    button class=(BUTTON) type="submit" { "Add movie" }
                }
            }
        },
    )
}

pub fn admin_movie_page(view: &AdminMovieView<'_>, tz: &TimeZone) -> String {
    let m = &view.movie.movie;
    let edit = MovieForm {
        title: m.title.clone(),
        genre: m.genre.clone(),
        rating: m.rating.clone(),
        duration: m.duration.to_string(),
        poster: m.poster.clone().unwrap_or_default(),
        schedule: String::new(),
    };

    admin_page(
        &m.title,
        html! {
            @if let Some(error) = &view.error { (alert(error)) }

            div class="grid gap-6 md:grid-cols-2" {
                div class=(CARD) {
                    h2 class="text-lg font-semibold text-gray-900" { "Details" }
                    form class="mt-4 space-y-4" method="post" action=(format!("/admin/movies/{}", m.id)) {
                        (movie_fields(&edit))
                        button class=(BUTTON) type="submit" { "Save" }
                    }
                    form class="mt-6" method="post" action=(format!("/admin/movies/{}/poster", m.id)) enctype="multipart/form-data" {
                        label class=(LABEL) for="poster_file" { "Upload poster" }
                        input class="mt-1 block text-sm" type="file" name="poster" id="poster_file" accept="image/*" required;
                        button class=(format!("mt-2 {BUTTON}")) type="submit" { "Upload" }
                    }
                    form class="mt-6" method="post" action=(format!("/admin/movies/{}/delete", m.id)) {
                        button class=(DANGER) type="submit" { "Delete movie" }
                    }
                }

                div class=(CARD) {
                    h2 class="text-lg font-semibold text-gray-900" { "Schedule" }
                    ul class="mt-4 space-y-2" {
                        @for slot in &view.movie.schedule {
                            li class="flex items-center justify-between text-sm" {
                                span { (slot.date) " " (slot.time_label()) " · " (slot.hall) }
                                form method="post" action=(format!("/admin/movies/{}/schedule/{}/delete", m.id, slot.date)) {
                                    button class="text-red-600 hover:text-red-800" type="submit" { "Remove" }
                                }
                            }
                        }
                    }
                    form class="mt-6 grid grid-cols-3 gap-2" method="post" action=(format!("/admin/movies/{}/schedule", m.id)) {
                        input class=(INPUT) type="date" name="date" required;
                        input class=(INPUT) type="time" name="time" required;
                        input class=(INPUT) type="text" name="hall" placeholder="Hall" required;
                        button class=(format!("col-span-3 {BUTTON}")) type="submit" { "Save screening" }
                    }
                }
            }

            div class="mt-10 flex items-center justify-between" {
                h2 class="text-xl font-semibold text-gray-900" { "Reservations" }
                a class="text-blue-600 hover:text-blue-800" href=(format!("/admin/export/{}.csv", m.id)) { "Export CSV" }
            }
            @if view.reservations.is_empty() {
                p class="mt-4 text-gray-600" { "No reservations for this movie." }
            } @else {
                (reservation_table(view.reservations, tz))
            }
        },
    )
}

pub fn not_found_page(message: &str) -> String {
    page(
        "Not found",
        html! {
            div class="max-w-xl mx-auto px-6 py-16" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { "Not found" }
                    p class="mt-4 text-gray-700" { (message) }
                    a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Home" }
                }
            }
        },
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Error",
        html! {
            div class="max-w-xl mx-auto px-6 py-16" {
                div class=(CARD) {
                    h1 class="text-2xl font-bold text-gray-900" { "Error" }
                    p class="mt-4 text-gray-700" { (message) }
                    a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                }
            }
        },
    )
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (SITE_NAME) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                header class="bg-white shadow" {
                    nav class="max-w-5xl mx-auto px-6 py-4 flex items-center gap-6" {
                        a class="font-bold text-gray-900" href="/" { (SITE_NAME) }
                        a class="text-gray-600 hover:text-gray-900" href="/booking" { "Book" }
                        a class="text-gray-600 hover:text-gray-900" href="/tickets" { "Reservations" }
                        a class="ml-auto text-gray-600 hover:text-gray-900" href="/admin" { "Admin" }
                    }
                }
                main { (body) }
            }
        }
    }
    .into_string()
}

fn admin_page(title: &str, body: Markup) -> String {
    page(
        title,
        html! {
            div class="max-w-5xl mx-auto px-6 py-10" {
                div class="flex items-center justify-between" {
                    h1 class="text-3xl font-bold text-gray-900" { (title) }
                    div class="flex gap-4 text-sm" {
                        a class="text-blue-600 hover:text-blue-800" href="/admin" { "Dashboard" }
                        a class="text-blue-600 hover:text-blue-800" href="/admin/movies" { "Movies" }
                        a class="text-gray-500 hover:text-gray-700" href="/admin/logout" { "Log out" }
                    }
                }
                div class="mt-8" { (body) }
            }
        },
    )
}

fn movie_fields(form: &MovieForm) -> Markup {
    html! {
        (text_field("title", "Title", &form.title, true))
        div class="grid grid-cols-3 gap-2" {
            (text_field("genre", "Genre", &form.genre, false))
            (text_field("rating", "Rating", &form.rating, false))
            (text_field("duration", "Minutes", &form.duration, false))
        }
        (text_field("poster", "Poster URL", &form.poster, false))
        div {
            label class=(LABEL) for="schedule" { "Add screenings (one per line: YYYY-MM-DD HH:MM Hall)" }
            textarea class=(INPUT) name="schedule" id="schedule" rows="3" { (form.schedule) }
        }
    }
}

fn movie_table(movies: &[MovieSummary]) -> Markup {
    html! {
        table class="mt-4 w-full bg-white shadow rounded-lg text-sm" {
            thead class="text-left text-gray-500" {
                tr { th class="p-3" { "Title" } th class="p-3" { "Screenings" } th class="p-3" { "Reservations" } th class="p-3" {} }
            }
            tbody {
                @for s in movies {
                    tr class="border-t" {
                        td class="p-3" { a class="text-blue-700 hover:text-blue-900" href=(format!("/admin/movies/{}", s.movie.id)) { (s.movie.title) } }
                        td class="p-3" { (s.screenings) }
                        td class="p-3" { (s.reservations) }
                        td class="p-3" { a class="text-blue-600 hover:text-blue-800" href=(format!("/admin/export/{}.csv", s.movie.id)) { "CSV" } }
                    }
                }
            }
        }
    }
}

fn reservation_table(rows: &[reservation::Model], tz: &TimeZone) -> Markup {
    html! {
        table class="mt-4 w-full bg-white shadow rounded-lg text-sm" {
            thead class="text-left text-gray-500" {
                tr {
                    th class="p-3" { "Ticket" } th class="p-3" { "Type" } th class="p-3" { "Movie" }
                    th class="p-3" { "Screening" } th class="p-3" { "Student" } th class="p-3" { "Booked" }
                    th class="p-3" { "Status" } th class="p-3" {}
                }
            }
            tbody {
                @for r in rows {
                    tr class="border-t" {
                        td class="p-3 font-mono" { a href=(format!("/tickets/{}", r.id)) { (r.id) } }
                        td class="p-3" { (type_label(&r.rtype)) }
                        td class="p-3" { (r.movie_title) }
                        td class="p-3" { (r.date) " " (r.time) " · " (r.hall) }
                        td class="p-3" { (r.student_name) " (" (r.student_id) ")" }
                        td class="p-3" { (local_time(r.created_at, tz)) }
                        td class="p-3" {
                            form class="flex gap-1" method="post" action=(format!("/admin/tickets/{}/status", r.id)) {
                                select class="rounded border-gray-300 text-sm" name="status" {
                                    @for s in Status::ALL {
                                        option value=(s.as_code()) selected[s.as_code() == r.status] { (s.as_code()) }
                                    }
                                }
                                button class="text-blue-600 hover:text-blue-800" type="submit" { "Set" }
                            }
                        }
                        td class="p-3" {
                            form method="post" action=(format!("/admin/tickets/{}/delete", r.id)) {
                                button class="text-red-600 hover:text-red-800" type="submit" { "Delete" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn delete_ticket_form(r: &reservation::Model) -> Markup {
    html! {
        form method="post" action=(format!("/tickets/{}/delete?tab={}", r.id, r.rtype)) {
            button class=(DANGER) type="submit" { "Cancel" }
        }
    }
}

fn text_field(name: &str, label: &str, value: &str, required: bool) -> Markup {
    html! {
        div {
            label class=(LABEL) for=(name) { (label) }
            input class=(INPUT) type="text" name=(name) id=(name) value=(value) required[required];
        }
    }
}

fn alert(message: &str) -> Markup {
    html! {
        div class="mt-4 rounded-md border border-red-200 bg-red-50 px-4 py-3 text-sm text-red-700" role="alert" { (message) }
    }
}

fn stat(label: &str, value: u64) -> Markup {
    html! {
        div class=(CARD) {
            p class="text-sm text-gray-500" { (label) }
            p class="text-2xl font-bold text-gray-900" { (value) }
        }
    }
}

fn row(label: &str, value: &str) -> Markup {
    html! {
        dt class="text-gray-500" { (label) }
        dd class="col-span-2 text-gray-900" { (value) }
    }
}

fn type_label(code: &str) -> &str {
    ReservationType::from_code(code).map(ReservationType::label).unwrap_or(code)
}

fn poster_or_placeholder(m: &movie::Model) -> String {
    match &m.poster {
        Some(p) if !p.is_empty() => p.clone(),
        _ => format!("https://picsum.photos/seed/movie-{}/400/600", m.id),
    }
}

fn local_time(unix: i64, tz: &TimeZone) -> String {
    Timestamp::from_second(unix)
        .map(|ts| ts.to_zoned(tz.clone()).strftime("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
