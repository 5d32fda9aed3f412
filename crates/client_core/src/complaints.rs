use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use shared::{
    domain::{ComplaintId, FeedSort, GeoPoint, PhotoId},
    protocol::{Category, Complaint, ComplaintDraft, CreateComplaintRequest},
};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ValidationError},
    list_state::ComplaintList,
    transport::ApiTransport,
};

const DEFAULT_PHOTO_MIME: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(filename: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type,
            bytes,
        }
    }

    fn into_part(self) -> Result<Part, ClientError> {
        let mime = self
            .mime_type
            .unwrap_or_else(|| DEFAULT_PHOTO_MIME.to_string());
        Ok(Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&mime)?)
    }
}

pub(crate) fn photo_form(files: Vec<PhotoUpload>) -> Result<Form, ClientError> {
    files.into_iter().try_fold(Form::new(), |form, file| {
        Ok(form.part("files", file.into_part()?))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoAttachment {
    Skipped,
    Attached(usize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedComplaint {
    pub complaint: Complaint,
    pub photos: PhotoAttachment,
}

#[derive(Serialize)]
struct FeedQuery {
    sort: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
}

pub fn validate_draft(draft: &ComplaintDraft) -> Result<CreateComplaintRequest, ValidationError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    let description = draft.description.trim();
    if description.is_empty() {
        return Err(ValidationError::MissingDescription);
    }
    let category_id = draft.category_id.ok_or(ValidationError::MissingCategory)?;
    let location = draft.location.ok_or(ValidationError::MissingLocation)?;

    Ok(CreateComplaintRequest {
        title: title.to_string(),
        description: description.to_string(),
        category_id,
        latitude: location.latitude,
        longitude: location.longitude,
        is_anonymous: draft.is_anonymous,
    })
}

#[derive(Clone)]
pub struct ComplaintRepository {
    transport: Arc<ApiTransport>,
}

impl ComplaintRepository {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    pub async fn create(&self, draft: &ComplaintDraft) -> Result<Complaint, ClientError> {
        let request = validate_draft(draft)?;
        let complaint: Complaint = self
            .transport
            .post("/complaints")
            .json(&request)
            .send_json()
            .await?;
        info!(
            complaint_id = complaint.id.0,
            category_id = request.category_id.0,
            "complaints: created"
        );
        Ok(normalize_complaint(&self.transport, complaint))
    }

    pub async fn attach_photos(
        &self,
        complaint_id: ComplaintId,
        files: Vec<PhotoUpload>,
    ) -> Result<(), ClientError> {
        if files.is_empty() {
            return Ok(());
        }
        let count = files.len();
        let form = photo_form(files)?;
        self.transport
            .post(&format!("/complaints/{complaint_id}/photos"))
            .multipart(form)
            .send_unit()
            .await?;
        info!(complaint_id = complaint_id.0, count, "complaints: photos attached");
        Ok(())
    }

    /// Creates the complaint, then attaches photos if any were picked.
    ///
    /// A failed upload does not undo the creation; it is reported through
    /// [`PhotoAttachment::Failed`].
    pub async fn submit(
        &self,
        draft: &ComplaintDraft,
        files: Vec<PhotoUpload>,
    ) -> Result<SubmittedComplaint, ClientError> {
        let complaint = self.create(draft).await?;
        if files.is_empty() {
            return Ok(SubmittedComplaint {
                complaint,
                photos: PhotoAttachment::Skipped,
            });
        }

        let count = files.len();
        let photos = match self.attach_photos(complaint.id, files).await {
            Ok(()) => PhotoAttachment::Attached(count),
            Err(err) => {
                warn!(
                    complaint_id = complaint.id.0,
                    "complaints: created but photo upload failed: {err}"
                );
                PhotoAttachment::Failed(err.user_message("Photos could not be uploaded."))
            }
        };
        Ok(SubmittedComplaint { complaint, photos })
    }

    pub async fn list_mine(&self) -> Result<Vec<Complaint>, ClientError> {
        let complaints: Vec<Complaint> = self.transport.get("/complaints/my").send_json().await?;
        Ok(self.normalize_all(complaints))
    }

    pub async fn list_feed(
        &self,
        sort: FeedSort,
        origin: Option<GeoPoint>,
    ) -> Result<Vec<Complaint>, ClientError> {
        let origin = origin.filter(|_| sort == FeedSort::Nearby);
        let query = FeedQuery {
            sort: sort.as_str(),
            lat: origin.map(|origin| origin.latitude),
            lon: origin.map(|origin| origin.longitude),
        };
        let complaints: Vec<Complaint> = self
            .transport
            .get("/complaints/feed")
            .query(&query)
            .send_json()
            .await?;
        Ok(self.normalize_all(complaints))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        let categories: Vec<Category> = self.transport.get("/categories").send_json().await?;
        Ok(categories
            .into_iter()
            .filter(|category| category.is_active)
            .collect())
    }

    pub async fn delete(&self, id: ComplaintId) -> Result<(), ClientError> {
        self.transport
            .delete(&format!("/complaints/{id}"))
            .send_unit()
            .await?;
        info!(complaint_id = id.0, "complaints: deleted");
        Ok(())
    }

    pub async fn delete_photo(&self, photo_id: PhotoId) -> Result<(), ClientError> {
        self.transport
            .delete(&format!("/complaints/photos/{photo_id}"))
            .send_unit()
            .await?;
        info!(photo_id = photo_id.0, "complaints: photo deleted");
        Ok(())
    }

    pub async fn delete_from(
        &self,
        list: &mut ComplaintList,
        id: ComplaintId,
    ) -> Result<(), ClientError> {
        self.delete(id).await?;
        list.remove(id);
        Ok(())
    }

    pub async fn delete_photo_from(
        &self,
        list: &mut ComplaintList,
        photo_id: PhotoId,
    ) -> Result<(), ClientError> {
        self.delete_photo(photo_id).await?;
        list.remove_photo(photo_id);
        Ok(())
    }

    pub fn resolve_photo_url(&self, raw: &str) -> String {
        self.transport.resolve_photo_url(raw)
    }

    fn normalize_all(&self, complaints: Vec<Complaint>) -> Vec<Complaint> {
        complaints
            .into_iter()
            .map(|complaint| normalize_complaint(&self.transport, complaint))
            .collect()
    }
}

pub(crate) fn normalize_complaint(transport: &ApiTransport, complaint: Complaint) -> Complaint {
    let mut complaint = complaint.with_tagged_photos();
    for photo in complaint
        .photos
        .iter_mut()
        .chain(complaint.resolution_photos.iter_mut())
    {
        photo.photo_url = transport.resolve_photo_url(&photo.photo_url);
    }
    complaint
}

#[cfg(test)]
#[path = "tests/complaints_tests.rs"]
mod tests;
