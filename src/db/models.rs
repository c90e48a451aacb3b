use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
}

/// The UI categories are mapped onto these types by the catalog query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Safari,
    Beach,
    Cultural,
    Adventure,
    Luxury,
    Mixed,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Safari => "safari",
            PackageType::Beach => "beach",
            PackageType::Cultural => "cultural",
            PackageType::Adventure => "adventure",
            PackageType::Luxury => "luxury",
            PackageType::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safari" => Some(PackageType::Safari),
            "beach" => Some(PackageType::Beach),
            "cultural" => Some(PackageType::Cultural),
            "adventure" => Some(PackageType::Adventure),
            "luxury" => Some(PackageType::Luxury),
            "mixed" => Some(PackageType::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub hero_image: Option<String>,
    /// Free-form nested records: location, overview, wildlife,
    /// bestTimeToVisit, thingsToKnow, whatToPack, accommodation, activities
    pub sections: serde_json::Value,
    pub highlights: Vec<String>,
    pub fun_facts: Vec<String>,
    pub images: Vec<String>,
    pub is_published: bool,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub package_type: PackageType,
    pub description: String,
    pub pricing: f64,
    pub days_of_travel: i64,
    pub max_capacity: i64,
    pub current_bookings: i64,
    pub images: Vec<String>,
    pub is_active: bool,
    pub destination: Option<DestinationSummary>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: String,
    pub rating: i64,
    pub text: String,
    pub trip_type: Option<String>,
    pub is_approved: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub bucket: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub alt: Option<String>,
    pub is_hero: bool,
    pub display_order: i64,
    pub package_id: Option<String>,
    pub destination_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistedEmail {
    pub email: String,
    pub is_used: bool,
    pub used_by: Option<String>,
}
