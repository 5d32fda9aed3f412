use client_core::{PhotoAttachment, WorkflowSurface};
use shared::protocol::{Assignment, Category, Complaint, User, Worker};

pub fn complaint_line(complaint: &Complaint) -> String {
    let title = complaint.title.as_deref().unwrap_or("(untitled)");
    let mut line = format!(
        "#{} [{}] {} (support {})",
        complaint.id, complaint.status, title, complaint.support_count
    );
    if let Some(category) = &complaint.category {
        line.push_str(&format!(" category={}", category.name));
    }
    if let Some(reason) = &complaint.reject_reason {
        line.push_str(&format!(" reason=\"{reason}\""));
    }
    if let Some(photo) = complaint.representative_photo() {
        line.push_str(&format!(" photo={}", photo.photo_url));
    }
    line
}

pub fn assignment_line(assignment: &Assignment) -> String {
    let title = assignment.complaint.title.as_deref().unwrap_or("(untitled)");
    let mut line = format!(
        "job #{} [{}] complaint #{} {}",
        assignment.id,
        assignment.status,
        assignment.complaint_id(),
        title
    );
    if !assignment.solution_photo_urls.is_empty() {
        line.push_str(&format!(" solution={}", assignment.solution_photo_urls.join(",")));
    }
    line
}

pub fn worker_line(worker: &Worker) -> String {
    format!("employee #{} {}", worker.user_id, worker.full_name)
}

pub fn category_line(category: &Category) -> String {
    format!("{} {}", category.id, category.name)
}

pub fn photo_summary(photos: &PhotoAttachment) -> String {
    match photos {
        PhotoAttachment::Skipped => "no photos attached".to_string(),
        PhotoAttachment::Attached(count) => format!("{count} photo(s) attached"),
        PhotoAttachment::Failed(message) => {
            format!("complaint saved but photo upload failed: {message}")
        }
    }
}

pub fn profile_line(user: &User) -> String {
    let status = if user.profile_completed {
        "complete"
    } else {
        "incomplete"
    };
    format!("profile of {} is {status}", user.email)
}

pub fn user_summary(user: &User, surface: &WorkflowSurface) -> String {
    let name = user.full_name.as_deref().unwrap_or("-");
    let operations: Vec<String> = surface
        .operations
        .iter()
        .map(|op| format!("{op:?}"))
        .collect();
    format!(
        "{} <{}> role={} home={:?}\noperations: {}",
        name,
        user.email,
        user.role,
        surface.home,
        operations.join(", ")
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
