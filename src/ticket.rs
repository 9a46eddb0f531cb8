use jiff::civil::Date;

/// Builds the ticket id `YYMMDD<student_id>` for a reservation.
pub fn ticket_id(date: Date, student_id: &str) -> String {
    format!(
        "{:02}{:02}{:02}{}",
        i32::from(date.year()).rem_euclid(100),
        date.month(),
        date.day(),
        student_id
    )
}
