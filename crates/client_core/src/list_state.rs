use shared::{
    domain::{ComplaintId, PhotoId},
    protocol::{Complaint, SupportOutcome},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintList {
    items: Vec<Complaint>,
}

impl ComplaintList {
    pub fn new(items: Vec<Complaint>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Complaint] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ComplaintId) -> Option<&Complaint> {
        self.items.iter().find(|complaint| complaint.id == id)
    }

    pub fn replace_all(&mut self, items: Vec<Complaint>) {
        self.items = items;
    }

    pub fn merge(&mut self, complaint: Complaint) -> bool {
        match self.items.iter_mut().find(|item| item.id == complaint.id) {
            Some(slot) => {
                *slot = complaint;
                true
            }
            None => {
                self.items.insert(0, complaint);
                false
            }
        }
    }

    pub fn remove(&mut self, id: ComplaintId) -> Option<Complaint> {
        let index = self.items.iter().position(|complaint| complaint.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn remove_photo(&mut self, photo_id: PhotoId) -> bool {
        for complaint in &mut self.items {
            let before = complaint.photos.len() + complaint.resolution_photos.len();
            complaint.photos.retain(|photo| photo.id != photo_id);
            complaint.resolution_photos.retain(|photo| photo.id != photo_id);
            if complaint.photos.len() + complaint.resolution_photos.len() != before {
                return true;
            }
        }
        false
    }

    pub fn apply_support(&mut self, id: ComplaintId, outcome: SupportOutcome) -> bool {
        match self.items.iter_mut().find(|complaint| complaint.id == id) {
            Some(complaint) => {
                complaint.support_count = outcome.support_count;
                true
            }
            None => false,
        }
    }
}

impl From<Vec<Complaint>> for ComplaintList {
    fn from(items: Vec<Complaint>) -> Self {
        Self::new(items)
    }
}
