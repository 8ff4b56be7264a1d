/// Placeholder written into any field that cannot be extracted from a card.
pub const SENTINEL: &str = "N/A";

/// One job listing, flattened to the twelve columns of the destination sheet.
/// All fields are plain strings; missing source data carries [`SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub title: String,
    pub posted_time: String,
    pub location: String,
    pub description: String,
    pub experience_level: String,
    pub budget: String,
    pub project_type: String,
    pub contract_type: String,
    /// Comma-and-space joined skill tags, or [`SENTINEL`] when none are listed.
    pub skills: String,
    pub activity: String,
    pub client_info: String,
    /// Absolute listing URL; doubles as the record's dedup identity.
    pub link: String,
}

impl JobRecord {
    /// Flatten to the sheet's column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.posted_time.clone(),
            self.location.clone(),
            self.description.clone(),
            self.experience_level.clone(),
            self.budget.clone(),
            self.project_type.clone(),
            self.contract_type.clone(),
            self.skills.clone(),
            self.activity.clone(),
            self.client_info.clone(),
            self.link.clone(),
        ]
    }
}
