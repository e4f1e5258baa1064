//! Subject and body text for every notification the register sends.

use crate::notify::traits::Notification;
use crate::visitor::record::{VisitRecord, format_timestamp};
use std::fmt::Write;

pub const SIGN_IN_SUBJECT: &str = "Sign In Confirmation";
pub const SIGN_OUT_SUBJECT: &str = "Sign Out Confirmation";
pub const DAILY_SUMMARY_SUBJECT: &str = "Daily Visitor Sign Out Summary";
pub const TEST_SUBJECT: &str = "Test Email";

fn push_details(body: &mut String, name: &str, record: &VisitRecord) {
    let _ = writeln!(body, "Full Name: {name}");
    let _ = writeln!(body, "Company: {}", record.company);
    let _ = writeln!(body, "Mobile Number: {}", record.mobile_number);
    let _ = writeln!(body, "Site Contact: {}", record.site_contact);
}

pub fn sign_in(name: &str, record: &VisitRecord) -> Notification {
    let mut body = String::from("Visitor Sign-In Confirmation:\n\n");
    push_details(&mut body, name, record);
    let _ = writeln!(
        body,
        "Sign In Time: {}",
        format_timestamp(record.sign_in_time())
    );
    Notification::new(SIGN_IN_SUBJECT, body).about(name)
}

pub fn sign_out(name: &str, record: &VisitRecord) -> Notification {
    let mut body = String::from("Visitor Sign-Out Confirmation:\n\n");
    push_details(&mut body, name, record);
    if let Some(at) = record.sign_out_time() {
        let _ = writeln!(body, "Sign Out Time: {}", format_timestamp(at));
    }
    Notification::new(SIGN_OUT_SUBJECT, body).about(name)
}

/// One block per overdue visitor, blocks separated by a blank line.
pub fn daily_summary(overdue: &[(String, VisitRecord)]) -> Notification {
    let mut body = String::from("The following visitors have not signed out:\n\n");
    for (name, record) in overdue {
        push_details(&mut body, name, record);
        let _ = writeln!(
            body,
            "Sign In Time: {}\n",
            format_timestamp(record.sign_in_time())
        );
    }
    Notification::new(DAILY_SUMMARY_SUBJECT, body)
}

pub fn test_message() -> Notification {
    Notification::new(
        TEST_SUBJECT,
        "This is a test email to check the email configuration.",
    )
}
