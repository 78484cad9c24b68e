//! Data models for the application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Public,
    Official,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Public => "Public User",
            Role::Official => "Health Official",
        }
    }
}

/// Lifecycle state of a health report.
///
/// `Pending` is the initial state; `Resolved` and `Rejected` are terminal in
/// practice, although officials may write any state at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Verified,
    Investigating,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending Review",
            ReportStatus::Verified => "Verified",
            ReportStatus::Investigating => "Under Investigation",
            ReportStatus::Resolved => "Resolved",
            ReportStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "disease_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiseaseType {
    Respiratory,
    Waterborne,
    Vector,
    HeatRelated,
    Skin,
    Cardiovascular,
    MentalHealth,
    Other,
}

impl DiseaseType {
    pub fn label(&self) -> &'static str {
        match self {
            DiseaseType::Respiratory => "Respiratory Issues",
            DiseaseType::Waterborne => "Waterborne Diseases",
            DiseaseType::Vector => "Vector-borne Diseases",
            DiseaseType::HeatRelated => "Heat-related Illness",
            DiseaseType::Skin => "Skin Conditions",
            DiseaseType::Cardiovascular => "Cardiovascular Issues",
            DiseaseType::MentalHealth => "Mental Health Issues",
            DiseaseType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "environmental_cause", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentalCause {
    AirPollution,
    WaterContamination,
    Heatwave,
    Flooding,
    Drought,
    PoorSanitation,
    WastePollution,
    ClimateStress,
    Unknown,
}

impl EnvironmentalCause {
    pub fn label(&self) -> &'static str {
        match self {
            EnvironmentalCause::AirPollution => "Air Pollution",
            EnvironmentalCause::WaterContamination => "Contaminated Water",
            EnvironmentalCause::Heatwave => "Extreme Heat/Heatwave",
            EnvironmentalCause::Flooding => "Flooding",
            EnvironmentalCause::Drought => "Drought",
            EnvironmentalCause::PoorSanitation => "Poor Sanitation",
            EnvironmentalCause::WastePollution => "Waste Pollution",
            EnvironmentalCause::ClimateStress => "General Climate Stress",
            EnvironmentalCause::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "advisory_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ReportUpdate,
    Advisory,
    Response,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(max = 150))]
    pub username: String,
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[validate(length(max = 200))]
    pub organization: Option<String>,
    #[validate(length(max = 15))]
    pub phone: Option<String>,
}

fn default_role() -> Role {
    Role::Public
}

// =============================================================================
// Health Report
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealthReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub disease_type: DiseaseType,
    pub symptoms: String,
    pub environmental_cause: EnvironmentalCause,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub affected_count: i32,
    pub additional_notes: String,
    pub status: ReportStatus,
    pub official_notes: String,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReport {
    pub disease_type: DiseaseType,
    #[validate(length(max = 5000))]
    pub symptoms: String,
    pub environmental_cause: EnvironmentalCause,
    #[validate(length(max = 200))]
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_affected_count")]
    #[validate(range(min = 1))]
    pub affected_count: i32,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub additional_notes: String,
}

fn default_affected_count() -> i32 {
    1
}

/// Official review of a report. Omitted notes keep the stored notes.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewReport {
    pub status: ReportStatus,
    #[validate(length(max = 5000))]
    pub official_notes: Option<String>,
}

/// Point on the public map widget
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MapPoint {
    pub id: Uuid,
    pub disease_type: DiseaseType,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ReportStatus,
}

// =============================================================================
// Advisory
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Advisory {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: AdvisoryPriority,
    pub region: String,
    pub related_cause: EnvironmentalCause,
    pub preventive_measures: String,
    pub issued_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueAdvisory {
    #[validate(length(max = 200))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: String,
    #[serde(default)]
    pub priority: AdvisoryPriority,
    #[validate(length(max = 200))]
    pub region: String,
    pub related_cause: EnvironmentalCause,
    #[validate(length(max = 10000))]
    pub preventive_measures: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_is_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryIssued {
    pub advisory: Advisory,
    /// Users who received a broadcast notification
    pub notified_users: usize,
}

// =============================================================================
// Notification
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_report_id: Option<Uuid>,
    pub related_advisory_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_report_id: Option<Uuid>,
    pub related_advisory_id: Option<Uuid>,
}

// =============================================================================
// Dashboards & Analytics
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HomeStats {
    pub total_reports: i64,
    pub resolved_reports: i64,
    pub active_advisories: i64,
    pub recent_advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReporterDashboard {
    pub reports: Vec<HealthReport>,
    pub unread_notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfficialDashboard {
    pub pending_count: i64,
    pub verified_count: i64,
    pub resolved_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount<K> {
    pub key: K,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct LocationCount {
    pub location: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_reports: i64,
    pub by_disease: Vec<CategoryCount<DiseaseType>>,
    pub by_cause: Vec<CategoryCount<EnvironmentalCause>>,
    pub by_status: Vec<CategoryCount<ReportStatus>>,
    pub daily: Vec<DailyCount>,
    pub top_locations: Vec<LocationCount>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::Investigating).unwrap(),
            "\"investigating\""
        );
        let status: ReportStatus = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(status, ReportStatus::Resolved);
        assert!(serde_json::from_str::<ReportStatus>("\"closed\"").is_err());
    }

    #[test]
    fn test_status_display_uses_label() {
        assert_eq!(ReportStatus::Pending.to_string(), "Pending Review");
        assert_eq!(ReportStatus::Investigating.to_string(), "Under Investigation");
    }

    #[test]
    fn test_submit_report_defaults() {
        let input: SubmitReport = serde_json::from_value(serde_json::json!({
            "disease_type": "heat_related",
            "symptoms": "Dizziness",
            "environmental_cause": "heatwave",
            "location": "Old Town"
        }))
        .unwrap();
        assert_eq!(input.affected_count, 1);
        assert_eq!(input.additional_notes, "");
        assert_eq!(input.latitude, None);
        assert_eq!(input.disease_type, DiseaseType::HeatRelated);
    }

    #[test]
    fn test_issue_advisory_defaults() {
        let input: IssueAdvisory = serde_json::from_value(serde_json::json!({
            "title": "Boil water",
            "description": "Tap water contaminated",
            "region": "Lakeside",
            "related_cause": "water_contamination",
            "preventive_measures": "Boil before drinking"
        }))
        .unwrap();
        assert!(input.is_active);
        assert_eq!(input.priority, AdvisoryPriority::Medium);
        assert!(input.expires_at.is_none());
    }

    #[test]
    fn test_register_user_defaults_to_public() {
        let input: RegisterUser =
            serde_json::from_value(serde_json::json!({ "username": "amara" })).unwrap();
        assert_eq!(input.role, Role::Public);
    }
}
