//! Wording of every outbound notification.

pub const USER_SUBJECT: &str = "Medication Reminder";
pub const CARETAKER_SUBJECT: &str = "Ward's Medication Reminder";

/// The reminder text sent to the patient.
pub fn user_reminder(med_name: &str, dosage: &str, time: &str) -> String {
    format!("Reminder: Take your medication '{med_name}' (Dosage: {dosage}) at {time}.")
}

pub fn caretaker_sms(user_message: &str) -> String {
    format!("Your ward has a reminder: {user_message}")
}

pub fn caretaker_email(user_message: &str) -> String {
    format!("Your ward: {user_message}")
}

/// Sent to the caretaker by SMS once, when a medication is scheduled.
pub fn caretaker_schedule_notice(med_name: &str, dosage: &str, time: &str) -> String {
    format!("Your ward has a reminder: {med_name} (Dosage: {dosage}) at {time}.")
}

/// Email counterpart of [`caretaker_schedule_notice`]; the subject already names the ward.
pub fn caretaker_schedule_email(med_name: &str, dosage: &str, time: &str) -> String {
    format!("Reminder: {med_name} (Dosage: {dosage}) at {time}.")
}
