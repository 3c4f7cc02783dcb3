//! Core request/response types shared by the AI client and the fallback table

use serde::{Deserialize, Serialize};

/// Where the user currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    Workplace,
    Home,
    Outside,
    Studying,
    School,
    Commuting,
    JobHunting,
}

impl Situation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Situation::Workplace => "workplace",
            Situation::Home => "home",
            Situation::Outside => "outside",
            Situation::Studying => "studying",
            Situation::School => "school",
            Situation::Commuting => "commuting",
            Situation::JobHunting => "job_hunting",
        }
    }

    /// Japanese label used in prompts.
    pub fn label_ja(&self) -> &'static str {
        match self {
            Situation::Workplace => "職場",
            Situation::Home => "家",
            Situation::Outside => "外出先",
            Situation::Studying => "勉強中",
            Situation::School => "学校",
            Situation::Commuting => "通勤中",
            Situation::JobHunting => "就職・転職活動中",
        }
    }
}

impl std::str::FromStr for Situation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workplace" => Ok(Situation::Workplace),
            "home" => Ok(Situation::Home),
            "outside" => Ok(Situation::Outside),
            "studying" => Ok(Situation::Studying),
            "school" => Ok(Situation::School),
            "commuting" => Ok(Situation::Commuting),
            "job_hunting" => Ok(Situation::JobHunting),
            _ => Err(()),
        }
    }
}

/// Optional audience refinement for prompts and fallback filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Student,
    OfficeWorker,
    MiddleSchool,
    Housewife,
    Elderly,
    JobSeeker,
    CareerChanger,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Student => "student",
            AgeGroup::OfficeWorker => "office_worker",
            AgeGroup::MiddleSchool => "middle_school",
            AgeGroup::Housewife => "housewife",
            AgeGroup::Elderly => "elderly",
            AgeGroup::JobSeeker => "job_seeker",
            AgeGroup::CareerChanger => "career_changer",
        }
    }

    /// Japanese audience description used in prompts.
    pub fn label_ja(&self) -> &'static str {
        match self {
            AgeGroup::Student => "学生",
            AgeGroup::OfficeWorker => "20-40代の社会人",
            AgeGroup::MiddleSchool => "中学生",
            AgeGroup::Housewife => "主婦・主夫",
            AgeGroup::Elderly => "シニア世代",
            AgeGroup::JobSeeker => "就職活動中の方",
            AgeGroup::CareerChanger => "転職活動中の方",
        }
    }

    /// Whether this audience gets the job-hunting suggestion track.
    pub fn is_job_hunting(&self) -> bool {
        matches!(self, AgeGroup::JobSeeker | AgeGroup::CareerChanger)
    }
}

impl std::str::FromStr for AgeGroup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(AgeGroup::Student),
            "office_worker" => Ok(AgeGroup::OfficeWorker),
            "middle_school" => Ok(AgeGroup::MiddleSchool),
            "housewife" => Ok(AgeGroup::Housewife),
            "elderly" => Ok(AgeGroup::Elderly),
            "job_seeker" => Ok(AgeGroup::JobSeeker),
            "career_changer" => Ok(AgeGroup::CareerChanger),
            _ => Err(()),
        }
    }
}

/// Suggestion category. Serialized with the Japanese labels the frontend and
/// the model both use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "認知的")]
    Cognitive,
    #[serde(rename = "行動的")]
    Behavioral,
}

impl Category {
    /// Lenient mapping for model output ("行動的", "認知的または行動的", ...).
    pub fn from_label(label: &str) -> Self {
        if label.contains("行動") && !label.contains("認知") {
            Category::Behavioral
        } else {
            Category::Cognitive
        }
    }
}

/// Supported break lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDuration {
    Short,
    Medium,
    Long,
}

impl BreakDuration {
    pub fn minutes(self) -> u32 {
        match self {
            BreakDuration::Short => 5,
            BreakDuration::Medium => 15,
            BreakDuration::Long => 30,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            5 => Some(BreakDuration::Short),
            15 => Some(BreakDuration::Medium),
            30 => Some(BreakDuration::Long),
            _ => None,
        }
    }
}

/// One micro-break activity suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub category: Category,
    pub steps: Vec<String>,
}

/// Validated suggestion query.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub situation: Situation,
    pub duration: BreakDuration,
    pub age_group: Option<AgeGroup>,
    pub location: String,
}

/// Fresh unique suggestion ID.
pub fn new_id() -> String {
    format!("sg_{}", uuid::Uuid::new_v4().as_simple())
}
