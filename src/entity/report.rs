use serde_json::json;

use super::stage::StageActions;

#[derive(Debug)]
pub struct Report {
    pub location: String,
    pub disk: String,
    pub root_uuid: Option<String>,
    pub summary: Box<StageActions>,
    pub duration: std::time::Duration,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "location": self.location,
            "disk": self.disk,
            "rootUuid": self.root_uuid,
            "summary": self.summary,
            "elapsedTime": self.duration,
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json_string())
    }
}

#[test]
fn test_report_json() {
    use super::action::ActionBootstrap;

    let mut summary = StageActions::default();
    summary.bootstrap.push(ActionBootstrap::GenFstab);

    let report = Report {
        location: "/mnt".into(),
        disk: "/dev/sda".into(),
        root_uuid: Some("abcd".into()),
        summary: Box::new(summary),
        duration: std::time::Duration::from_secs(20),
    };

    let value = report.to_json();
    assert_eq!("/mnt", value["location"]);
    assert_eq!("abcd", value["rootUuid"]);
    assert_eq!("genfstab", value["summary"]["stage-bootstrap"][0]);
    assert!(value["summary"].get("stage-partition").is_none());
}
