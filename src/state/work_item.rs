use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a unit of extraction: a case and, optionally, one of its
/// teaching points
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    pub case_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_point: Option<String>,
}

impl WorkKey {
    pub fn new(case_name: impl Into<String>, teaching_point: Option<String>) -> Self {
        Self {
            case_name: case_name.into(),
            teaching_point,
        }
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.teaching_point {
            Some(tp) => write!(f, "{} / {}", self.case_name, tp),
            None => write!(f, "{}", self.case_name),
        }
    }
}

/// A unit of required extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Repository page that lists the case
    pub course_url: String,

    /// Visible name of the case link
    pub case_name: String,

    /// Teaching point section to extract, if the row names one
    pub teaching_point: Option<String>,
}

impl WorkItem {
    pub fn key(&self) -> WorkKey {
        WorkKey::new(self.case_name.clone(), self.teaching_point.clone())
    }
}
